//! Geometry resource: raw vertex/index buffers plus the vertex layout needed
//! to upload them.

use std::io::{Read, Write};

use crate::codec;
use crate::error::{EngineError, Result};
use crate::gfx::{AttributeFormat, IndexType, VertexAttribute, VertexLayout, VertexSemantic};

/// CPU-side geometry data, deep-copied from the caller at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryResource {
    pub layout: VertexLayout,
    pub vertex_count: u32,
    /// Interleaved vertex bytes, `vertex_count * layout.stride()` long.
    pub vertex_data: Vec<u8>,
    pub index_type: IndexType,
    pub index_data: Vec<u8>,
}

impl GeometryResource {
    /// Builds a record from typed vertex/index slices.
    pub fn from_pod<V: bytemuck::Pod>(
        layout: VertexLayout,
        vertices: &[V],
        indices: &[u16],
    ) -> Self {
        Self {
            layout,
            vertex_count: vertices.len() as u32,
            vertex_data: bytemuck::cast_slice(vertices).to_vec(),
            index_type: IndexType::U16,
            index_data: bytemuck::cast_slice(indices).to_vec(),
        }
    }

    /// Number of indices in the index buffer.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_data.len() as u32 / self.index_type.byte_size()
    }

    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        1 + 2 * self.layout.attributes.len() as u64
            + 4
            + codec::bytes_size(self.vertex_data.len())
            + 1
            + codec::bytes_size(self.index_data.len())
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_u8(w, self.layout.attributes.len() as u8)?;
        for attr in &self.layout.attributes {
            codec::write_u8(w, attr.semantic.tag())?;
            codec::write_u8(w, attr.format.tag())?;
        }
        codec::write_u32(w, self.vertex_count)?;
        codec::write_bytes(w, &self.vertex_data)?;
        codec::write_u8(w, self.index_type.tag())?;
        codec::write_bytes(w, &self.index_data)?;
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let attr_count = codec::read_u8(r)?;
        let mut attributes = Vec::with_capacity(attr_count as usize);
        for _ in 0..attr_count {
            let semantic = VertexSemantic::from_tag(codec::read_u8(r)?)?;
            let format = AttributeFormat::from_tag(codec::read_u8(r)?)?;
            attributes.push(VertexAttribute { semantic, format });
        }
        let layout = VertexLayout::new(attributes);
        let vertex_count = codec::read_u32(r)?;
        let vertex_data = codec::read_bytes(r)?;
        let expected = u64::from(vertex_count) * u64::from(layout.stride());
        if vertex_data.len() as u64 != expected {
            return Err(EngineError::Decode(format!(
                "geometry vertex data length {} does not match {vertex_count} vertices of stride {}",
                vertex_data.len(),
                layout.stride()
            )));
        }
        let index_type = IndexType::from_tag(codec::read_u8(r)?)?;
        let index_data = codec::read_bytes(r)?;
        if index_data.len() as u32 % index_type.byte_size() != 0 {
            return Err(EngineError::Decode(format!(
                "geometry index data length {} is not a multiple of the index width",
                index_data.len()
            )));
        }
        Ok(Self {
            layout,
            vertex_count,
            vertex_data,
            index_type,
            index_data,
        })
    }
}
