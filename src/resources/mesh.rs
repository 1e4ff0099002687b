//! Mesh resource: a material path plus one or more geometry paths, each with
//! its own local transform.

use std::io::{Read, Write};

use glam::Mat4;
use smallvec::SmallVec;

use crate::codec;
use crate::error::Result;

/// One geometry reference inside a mesh, with its local transform.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    pub path: String,
    pub transform: Mat4,
}

/// Mesh description referencing a material and its geometries by path.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshResource {
    pub material: String,
    pub geometries: SmallVec<[MeshGeometry; 4]>,
}

impl MeshResource {
    /// Single-geometry convenience constructor.
    #[must_use]
    pub fn single(material: &str, geometry: &str, transform: Mat4) -> Self {
        Self {
            material: material.to_owned(),
            geometries: SmallVec::from_vec(vec![MeshGeometry {
                path: geometry.to_owned(),
                transform,
            }]),
        }
    }

    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        codec::str_size(&self.material)
            + 2
            + self
                .geometries
                .iter()
                .map(|g| codec::str_size(&g.path) + 64)
                .sum::<u64>()
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_str(w, &self.material)?;
        codec::write_u16(w, self.geometries.len() as u16)?;
        for geometry in &self.geometries {
            codec::write_str(w, &geometry.path)?;
            codec::write_mat4(w, &geometry.transform)?;
        }
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let material = codec::read_str(r)?;
        let count = codec::read_u16(r)?;
        let mut geometries = SmallVec::with_capacity(count as usize);
        for _ in 0..count {
            let path = codec::read_str(r)?;
            let transform = codec::read_mat4(r)?;
            geometries.push(MeshGeometry { path, transform });
        }
        Ok(Self {
            material,
            geometries,
        })
    }
}
