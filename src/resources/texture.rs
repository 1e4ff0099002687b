//! Texture resource: pixel data plus the creation parameters the backend
//! needs to upload it.

use std::io::{Read, Write};

use crate::codec;
use crate::error::{EngineError, Result};
use crate::gfx::{TextureDesc, TextureFlags, TextureFormat};

/// CPU-side texture data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureResource {
    pub desc: TextureDesc,
    /// Raw pixels for every declared mip level, tightly packed.
    pub pixels: Vec<u8>,
}

impl TextureResource {
    #[must_use]
    pub fn new(desc: TextureDesc, pixels: Vec<u8>) -> Self {
        Self { desc, pixels }
    }

    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        2 + 2 + 1 + 1 + 4 + codec::bytes_size(self.pixels.len())
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_u16(w, self.desc.width)?;
        codec::write_u16(w, self.desc.height)?;
        codec::write_u8(w, self.desc.format.tag())?;
        codec::write_u8(w, self.desc.mip_count)?;
        codec::write_u32(w, self.desc.flags.bits())?;
        codec::write_bytes(w, &self.pixels)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let width = codec::read_u16(r)?;
        let height = codec::read_u16(r)?;
        let format = TextureFormat::from_tag(codec::read_u8(r)?)?;
        let mip_count = codec::read_u8(r)?;
        let bits = codec::read_u32(r)?;
        let flags = TextureFlags::from_bits(bits)
            .ok_or_else(|| EngineError::Decode(format!("unknown texture flag bits {bits:#x}")))?;
        let pixels = codec::read_bytes(r)?;
        Ok(Self {
            desc: TextureDesc {
                width,
                height,
                format,
                mip_count,
                flags,
            },
            pixels,
        })
    }
}
