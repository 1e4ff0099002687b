//! Prefab resource: an ordered list of mesh paths composed into one
//! spawnable unit.

use std::io::{Read, Write};

use crate::codec;
use crate::error::Result;

/// Prefab description referencing its meshes by path, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrefabResource {
    pub meshes: Vec<String>,
}

impl PrefabResource {
    #[must_use]
    pub fn new(meshes: Vec<String>) -> Self {
        Self { meshes }
    }

    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        2 + self.meshes.iter().map(|m| codec::str_size(m)).sum::<u64>()
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_u16(w, self.meshes.len() as u16)?;
        for mesh in &self.meshes {
            codec::write_str(w, mesh)?;
        }
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let count = codec::read_u16(r)?;
        let mut meshes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            meshes.push(codec::read_str(r)?);
        }
        Ok(Self { meshes })
    }
}
