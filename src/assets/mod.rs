//! Typed Asset Records
//!
//! An *asset* is the GPU-backed realization of a resource store entry:
//! buffers, compiled shaders, textures and linked programs, plus the handles
//! of every dependency resolved during creation.
//!
//! Assets live in per-kind [`RefRegistry`](crate::registry::RefRegistry)
//! tables owned by the [`Context`](crate::Context), keyed by the content
//! hash of the originating resource — the same hash reverses back into the
//! store when the asset is destroyed. The dependency handles stored here are
//! what cascading destruction walks: destroying a mesh releases its material
//! and geometries, destroying the material releases its shaders and sampler
//! textures, and each release at refcount zero also releases the underlying
//! store entry.

use glam::Mat4;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::gfx::{BufferId, ProgramId, ShaderId, ShaderStage, TextureDesc, TextureId};

new_key_type! {
    /// Handle to a GPU geometry asset.
    pub struct GeometryHandle;
    /// Handle to a compiled shader asset.
    pub struct ShaderHandle;
    /// Handle to a GPU texture asset.
    pub struct TextureHandle;
    /// Handle to a linked material asset.
    pub struct MaterialHandle;
    /// Handle to a composed mesh asset.
    pub struct MeshHandle;
    /// Handle to a composed prefab asset.
    pub struct PrefabHandle;
}

/// Vertex and index buffers uploaded from a geometry resource.
#[derive(Debug, Clone)]
pub struct GeometryAsset {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// A compiled GPU shader.
#[derive(Debug, Clone)]
pub struct ShaderAsset {
    pub shader: ShaderId,
    pub stage: ShaderStage,
}

/// An uploaded GPU texture.
#[derive(Debug, Clone)]
pub struct TextureAsset {
    pub texture: TextureId,
    pub desc: TextureDesc,
}

/// A linked program plus the shader and texture assets it resolved.
///
/// `textures` matches the material resource's sampler parameters by index.
#[derive(Debug, Clone)]
pub struct MaterialAsset {
    pub program: ProgramId,
    pub vertex_shader: ShaderHandle,
    pub fragment_shader: ShaderHandle,
    pub textures: Vec<TextureHandle>,
}

/// A material plus one or more geometries with their local transforms.
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub material: MaterialHandle,
    pub geometries: SmallVec<[(GeometryHandle, Mat4); 4]>,
}

/// An ordered list of resolved mesh assets.
#[derive(Debug, Clone)]
pub struct PrefabAsset {
    pub meshes: Vec<MeshHandle>,
}
