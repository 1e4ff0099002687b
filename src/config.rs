//! Engine Configuration
//!
//! Per-kind slot capacities for every registry owned by a
//! [`Context`](crate::Context). Capacities bound slot-table growth;
//! exceeding one yields
//! [`EngineError::CapacityExhausted`](crate::EngineError::CapacityExhausted)
//! rather than unbounded allocation.

/// Registry capacities and engine-wide limits.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Resource store slots (all kinds share one store).
    pub max_resources: usize,
    /// GPU geometry assets.
    pub max_geometries: usize,
    /// GPU shader assets.
    pub max_shaders: usize,
    /// GPU texture assets.
    pub max_textures: usize,
    /// Linked material programs.
    pub max_materials: usize,
    /// Composed mesh assets.
    pub max_meshes: usize,
    /// Composed prefab assets.
    pub max_prefabs: usize,
    /// Simultaneously loaded pak archives.
    pub max_paks: usize,
    /// Live entities.
    pub max_entities: usize,
    /// Live components across all types.
    pub max_components: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_resources: 4096,
            max_geometries: 1024,
            max_shaders: 256,
            max_textures: 512,
            max_materials: 512,
            max_meshes: 1024,
            max_prefabs: 256,
            max_paks: 16,
            max_entities: 1024,
            max_components: 4096,
        }
    }
}
