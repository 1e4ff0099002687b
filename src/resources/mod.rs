//! Resource Records
//!
//! A *resource* is the serializable, path-addressed payload of a store entry
//! before it is realized as a GPU object. The six kinds form a small
//! dependency DAG: materials name shader and texture paths, meshes name a
//! material and geometry paths, prefabs name mesh paths.
//!
//! [`ResourceData`] is the tagged union over all kinds. Every variant is a
//! self-describing little-endian binary record with a stable encoded size,
//! which the pak writer relies on for offset precomputation.

mod geometry;
mod material;
mod mesh;
mod prefab;
mod shader;
mod texture;

pub use geometry::GeometryResource;
pub use material::{MaterialParams, MaterialResource, MaterialValue};
pub use mesh::{MeshGeometry, MeshResource};
pub use prefab::PrefabResource;
pub use shader::ShaderResource;
pub use texture::TextureResource;

use std::io::{Read, Write};

use crate::error::{EngineError, Result};

/// Discriminant of a [`ResourceData`] variant, also the kind byte stored in
/// pak index entries so archives are self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Shader,
    Texture,
    Material,
    Mesh,
    Prefab,
}

impl ResourceKind {
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Geometry => 0,
            Self::Shader => 1,
            Self::Texture => 2,
            Self::Material => 3,
            Self::Mesh => 4,
            Self::Prefab => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::Geometry,
            1 => Self::Shader,
            2 => Self::Texture,
            3 => Self::Material,
            4 => Self::Mesh,
            5 => Self::Prefab,
            tag => {
                return Err(EngineError::UnknownTag {
                    what: "resource kind",
                    tag,
                });
            }
        })
    }

    /// Lowercase display name used in diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Shader => "shader",
            Self::Texture => "texture",
            Self::Material => "material",
            Self::Mesh => "mesh",
            Self::Prefab => "prefab",
        }
    }
}

/// The polymorphic payload of a resource store entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
    Geometry(GeometryResource),
    Shader(ShaderResource),
    Texture(TextureResource),
    Material(MaterialResource),
    Mesh(MeshResource),
    Prefab(PrefabResource),
}

impl ResourceData {
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Geometry(_) => ResourceKind::Geometry,
            Self::Shader(_) => ResourceKind::Shader,
            Self::Texture(_) => ResourceKind::Texture,
            Self::Material(_) => ResourceKind::Material,
            Self::Mesh(_) => ResourceKind::Mesh,
            Self::Prefab(_) => ResourceKind::Prefab,
        }
    }

    /// Exact byte length [`encode`](Self::encode) will produce.
    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        match self {
            Self::Geometry(r) => r.encoded_size(),
            Self::Shader(r) => r.encoded_size(),
            Self::Texture(r) => r.encoded_size(),
            Self::Material(r) => r.encoded_size(),
            Self::Mesh(r) => r.encoded_size(),
            Self::Prefab(r) => r.encoded_size(),
        }
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Self::Geometry(r) => r.encode(w),
            Self::Shader(r) => r.encode(w),
            Self::Texture(r) => r.encode(w),
            Self::Material(r) => r.encode(w),
            Self::Mesh(r) => r.encode(w),
            Self::Prefab(r) => r.encode(w),
        }
    }

    /// Decodes a record whose kind is already known (from a pak index entry
    /// or from the `load_<kind>` entry point used).
    pub fn decode<R: Read>(kind: ResourceKind, r: &mut R) -> Result<Self> {
        Ok(match kind {
            ResourceKind::Geometry => Self::Geometry(GeometryResource::decode(r)?),
            ResourceKind::Shader => Self::Shader(ShaderResource::decode(r)?),
            ResourceKind::Texture => Self::Texture(TextureResource::decode(r)?),
            ResourceKind::Material => Self::Material(MaterialResource::decode(r)?),
            ResourceKind::Mesh => Self::Mesh(MeshResource::decode(r)?),
            ResourceKind::Prefab => Self::Prefab(PrefabResource::decode(r)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        AttributeFormat, IndexType, ShaderStage, TextureDesc, TextureFlags, TextureFormat,
        VertexAttribute, VertexLayout, VertexSemantic,
    };
    use glam::{Mat4, Vec4};
    use smallvec::smallvec;
    use std::io::Cursor;

    fn round_trip(data: &ResourceData) {
        let mut buf = Vec::new();
        data.encode(&mut buf).unwrap();
        assert_eq!(
            buf.len() as u64,
            data.encoded_size(),
            "encoded_size must match actual encoding for {:?}",
            data.kind()
        );
        let decoded = ResourceData::decode(data.kind(), &mut Cursor::new(buf)).unwrap();
        assert_eq!(&decoded, data);
    }

    #[test]
    fn geometry_record_round_trips() {
        let layout = VertexLayout::new(vec![
            VertexAttribute {
                semantic: VertexSemantic::Position,
                format: AttributeFormat::F32x3,
            },
            VertexAttribute {
                semantic: VertexSemantic::TexCoord0,
                format: AttributeFormat::F32x2,
            },
        ]);
        round_trip(&ResourceData::Geometry(GeometryResource {
            layout,
            vertex_count: 4,
            vertex_data: (0..80u8).collect(),
            index_type: IndexType::U16,
            index_data: vec![0, 0, 1, 0, 2, 0, 2, 0, 1, 0, 3, 0],
        }));
    }

    #[test]
    fn shader_record_round_trips() {
        round_trip(&ResourceData::Shader(ShaderResource {
            stage: ShaderStage::Fragment,
            bytecode: vec![0xDE, 0xAD, 0xBE, 0xEF],
        }));
    }

    #[test]
    fn texture_record_round_trips() {
        round_trip(&ResourceData::Texture(TextureResource {
            desc: TextureDesc {
                width: 2,
                height: 2,
                format: TextureFormat::Rgba8,
                mip_count: 1,
                flags: TextureFlags::CLAMP_U | TextureFlags::SRGB,
            },
            pixels: vec![255; 16],
        }));
    }

    #[test]
    fn material_record_round_trips() {
        let mut params = MaterialParams::new();
        params.set_vec4("u_color", Vec4::new(1.0, 0.0, 0.0, 1.0));
        params.set_mat4("u_model", Mat4::IDENTITY);
        params.set_sampler("s_albedo", "textures/albedo.tex");
        round_trip(&ResourceData::Material(MaterialResource {
            vertex_shader: "shaders/v.shader".into(),
            fragment_shader: "shaders/f.shader".into(),
            params,
        }));
    }

    #[test]
    fn mesh_record_round_trips() {
        round_trip(&ResourceData::Mesh(MeshResource {
            material: "materials/red.mat".into(),
            geometries: smallvec![
                MeshGeometry {
                    path: "models/cube.geom".into(),
                    transform: Mat4::IDENTITY,
                },
                MeshGeometry {
                    path: "models/lid.geom".into(),
                    transform: Mat4::from_translation(glam::Vec3::Y),
                },
            ],
        }));
    }

    #[test]
    fn prefab_record_round_trips() {
        round_trip(&ResourceData::Prefab(PrefabResource {
            meshes: vec!["meshes/a.mesh".into(), "meshes/b.mesh".into()],
        }));
    }

    #[test]
    fn kind_tags_are_stable() {
        for kind in [
            ResourceKind::Geometry,
            ResourceKind::Shader,
            ResourceKind::Texture,
            ResourceKind::Material,
            ResourceKind::Mesh,
            ResourceKind::Prefab,
        ] {
            assert_eq!(ResourceKind::from_tag(kind.tag()).unwrap(), kind);
        }
        assert!(ResourceKind::from_tag(6).is_err());
    }
}
