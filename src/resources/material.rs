//! Material resource: shader paths plus a set of named, typed uniform
//! parameters. Sampler parameters reference texture paths resolved when the
//! material is realized as a GPU program.

use std::io::{Read, Write};

use glam::{Mat3, Mat4, Vec4};

use crate::codec;
use crate::error::{EngineError, Result};
use crate::hash::hash_str;

/// A typed uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialValue {
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    /// Virtual path of the texture bound to this sampler.
    Sampler(String),
}

impl MaterialValue {
    fn tag(&self) -> u8 {
        match self {
            Self::Vec4(_) => 0,
            Self::Mat3(_) => 1,
            Self::Mat4(_) => 2,
            Self::Sampler(_) => 3,
        }
    }

    fn payload_size(&self) -> u64 {
        match self {
            Self::Vec4(_) => 16,
            Self::Mat3(_) => 36,
            Self::Mat4(_) => 64,
            Self::Sampler(path) => codec::str_size(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MaterialParam {
    name_hash: u32,
    value: MaterialValue,
}

/// Ordered set of material parameters, keyed by name hash.
///
/// Insertion order is preserved: sampler parameters map by index onto the
/// texture array of the realized material asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialParams {
    entries: Vec<MaterialParam>,
}

impl MaterialParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, name: &str, value: MaterialValue) {
        let name_hash = hash_str(name);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name_hash == name_hash) {
            entry.value = value;
        } else {
            self.entries.push(MaterialParam { name_hash, value });
        }
    }

    pub fn set_vec4(&mut self, name: &str, v: Vec4) {
        self.set(name, MaterialValue::Vec4(v));
    }

    pub fn set_mat3(&mut self, name: &str, m: Mat3) {
        self.set(name, MaterialValue::Mat3(m));
    }

    pub fn set_mat4(&mut self, name: &str, m: Mat4) {
        self.set(name, MaterialValue::Mat4(m));
    }

    pub fn set_sampler(&mut self, name: &str, texture_path: &str) {
        self.set(name, MaterialValue::Sampler(texture_path.to_owned()));
    }

    /// Looks a parameter up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MaterialValue> {
        let name_hash = hash_str(name);
        self.entries
            .iter()
            .find(|e| e.name_hash == name_hash)
            .map(|e| &e.value)
    }

    /// Texture paths of every sampler parameter, in insertion order.
    pub fn sampler_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match &e.value {
            MaterialValue::Sampler(path) => Some(path.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Material description: one shader per stage, plus uniform parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialResource {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub params: MaterialParams,
}

impl MaterialResource {
    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        codec::str_size(&self.vertex_shader)
            + codec::str_size(&self.fragment_shader)
            + 2
            + self
                .params
                .entries
                .iter()
                .map(|e| 4 + 1 + e.value.payload_size())
                .sum::<u64>()
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        codec::write_str(w, &self.vertex_shader)?;
        codec::write_str(w, &self.fragment_shader)?;
        codec::write_u16(w, self.params.entries.len() as u16)?;
        for entry in &self.params.entries {
            codec::write_u32(w, entry.name_hash)?;
            codec::write_u8(w, entry.value.tag())?;
            match &entry.value {
                MaterialValue::Vec4(v) => {
                    for f in v.to_array() {
                        codec::write_f32(w, f)?;
                    }
                }
                MaterialValue::Mat3(m) => codec::write_mat3(w, m)?,
                MaterialValue::Mat4(m) => codec::write_mat4(w, m)?,
                MaterialValue::Sampler(path) => codec::write_str(w, path)?,
            }
        }
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let vertex_shader = codec::read_str(r)?;
        let fragment_shader = codec::read_str(r)?;
        let count = codec::read_u16(r)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_hash = codec::read_u32(r)?;
            let tag = codec::read_u8(r)?;
            let value = match tag {
                0 => {
                    let mut f = [0f32; 4];
                    for v in &mut f {
                        *v = codec::read_f32(r)?;
                    }
                    MaterialValue::Vec4(Vec4::from_array(f))
                }
                1 => MaterialValue::Mat3(codec::read_mat3(r)?),
                2 => MaterialValue::Mat4(codec::read_mat4(r)?),
                3 => MaterialValue::Sampler(codec::read_str(r)?),
                tag => {
                    return Err(EngineError::UnknownTag {
                        what: "material parameter",
                        tag,
                    });
                }
            };
            entries.push(MaterialParam { name_hash, value });
        }
        Ok(Self {
            vertex_shader,
            fragment_shader,
            params: MaterialParams { entries },
        })
    }
}
