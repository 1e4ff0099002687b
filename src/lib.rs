#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! # mengine
//!
//! A handle-based resource and entity registry layer for 3D applications.
//!
//! The crate provides:
//!
//! - **Resource store**: path-addressed, reference-counted, serializable
//!   resource records (geometry, shader, texture, material, mesh, prefab)
//!   with content-hash deduplication.
//! - **Typed asset registries**: GPU-backed realizations of those resources,
//!   created through a pluggable [`GraphicsBackend`], with cascading
//!   reference-counted destruction across the dependency graph
//!   (prefab → mesh → material → shader/texture, mesh → geometry).
//! - **Pak archives**: a binary container bundling serialized resources with
//!   a hash-indexed offset table for random access loading.
//! - **Entity/component registry**: bitmask-typed components attached to
//!   reference-counted entities, with mask queries.
//! - **[`Context`]**: the explicitly-constructed facade owning every
//!   registry, with a per-frame deferred-free queue drained by
//!   [`Context::update`].
//!
//! Handles are generation-checked slot map keys: a stale handle is detected
//! rather than silently aliasing a recycled slot. Slots released mid-frame
//! are not reused until the next `update` call.

pub mod assets;
pub mod codec;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod gfx;
pub mod hash;
pub mod pak;
pub mod registry;
pub mod resources;
pub mod store;
#[cfg(feature = "sync")]
pub mod sync;

pub use assets::{
    GeometryAsset, GeometryHandle, MaterialAsset, MaterialHandle, MeshAsset, MeshHandle,
    PrefabAsset, PrefabHandle, ShaderAsset, ShaderHandle, TextureAsset, TextureHandle,
};
pub use config::EngineConfig;
pub use context::{Context, DebugFlags, EngineStats};
pub use entity::{ComponentHandle, EntityHandle, COMPONENT_TYPE_COUNT};
pub use error::{EngineError, Result};
pub use gfx::{
    AttributeFormat, BufferId, GraphicsBackend, HeadlessBackend, HeadlessCounters, IndexType,
    ProgramId, ShaderId,
    ShaderStage, TextureDesc, TextureFlags, TextureFormat, TextureId, VertexAttribute,
    VertexLayout, VertexSemantic, ViewId,
};
pub use hash::PathHash;
pub use resources::{
    GeometryResource, MaterialParams, MaterialResource, MaterialValue, MeshGeometry, MeshResource,
    PrefabResource, ResourceData, ResourceKind, ShaderResource, TextureResource,
};
pub use store::{ResourceHandle, ResourceInfo};
#[cfg(feature = "sync")]
pub use sync::SharedContext;
