//! Shader resource: compiled bytecode for one pipeline stage.

use std::io::{Read, Write};

use crate::codec;
use crate::error::Result;
use crate::gfx::ShaderStage;

/// A shader bytecode blob as produced by the offline shader compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderResource {
    pub stage: ShaderStage,
    pub bytecode: Vec<u8>,
}

impl ShaderResource {
    #[must_use]
    pub fn new(stage: ShaderStage, bytecode: Vec<u8>) -> Self {
        Self { stage, bytecode }
    }

    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        1 + codec::bytes_size(self.bytecode.len())
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_u8(w, self.stage.tag())?;
        codec::write_bytes(w, &self.bytecode)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let stage = ShaderStage::from_tag(codec::read_u8(r)?)?;
        let bytecode = codec::read_bytes(r)?;
        Ok(Self { stage, bytecode })
    }
}
