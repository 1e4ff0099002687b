//! Engine Context
//!
//! [`Context`] is the facade owning every registry: the resource store, the
//! six typed asset registries, the pak system and the entity world. It is an
//! explicitly constructed value — build one at your composition root and
//! pass it where it is needed; tests can hold several isolated instances.
//!
//! # Frame contract
//!
//! Call [`Context::update`] exactly once per frame, after the frame's
//! submissions are complete. Destruction at refcount zero tears GPU objects
//! and dependencies down immediately, but the slot index itself is only
//! reclaimed by `update`, so a handle used earlier in the same frame can
//! never start pointing at a different object mid-frame.
//!
//! # Reference semantics
//!
//! `create_<kind>(resource_handle)` consumes the store reference the caller
//! acquired from `load_<kind>`/`create_<kind>_resource`; the asset holds it
//! until the asset itself is destroyed. The canonical call shape is
//! `ctx.create_mesh(ctx.load_mesh("cube.mesh")?)?`.

use std::fs::File;
use std::io::{self, BufReader};

use bitflags::bitflags;

use crate::assets::{
    GeometryAsset, GeometryHandle, MaterialAsset, MaterialHandle, MeshAsset, MeshHandle,
    PrefabAsset, PrefabHandle, ShaderAsset, ShaderHandle, TextureAsset, TextureHandle,
};
use crate::config::EngineConfig;
use crate::entity::{ComponentHandle, EntityHandle, EntityWorld};
use crate::error::{EngineError, Result};
use crate::gfx::{GraphicsBackend, ViewId};
use crate::hash::PathHash;
use crate::pak::PakSystem;
use crate::registry::{RefRegistry, Release};
use crate::resources::{
    GeometryResource, MaterialResource, MeshResource, PrefabResource, ResourceData, ResourceKind,
    ShaderResource, TextureResource,
};
use crate::store::{ResourceHandle, ResourceInfo, ResourceStore};

use std::any::Any;

bitflags! {
    /// Per-update debug switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DebugFlags: u32 {
        /// Log a stats snapshot this frame.
        const STATS = 1 << 0;
        /// Log every live resource path with its refcount this frame.
        const RESOURCES = 1 << 1;
    }
}

/// Stats listings are capped so a runaway scene cannot flood the log.
const MAX_STATS_ENTRIES: usize = 100;

/// Snapshot of live object counts, plus per-resource refcounts.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub frame: u64,
    pub num_resources: usize,
    pub num_geometries: usize,
    pub num_shaders: usize,
    pub num_textures: usize,
    pub num_materials: usize,
    pub num_meshes: usize,
    pub num_prefabs: usize,
    pub num_paks: usize,
    pub num_entities: usize,
    pub num_components: usize,
    /// Path and refcount per live resource, capped at 100 entries.
    pub resource_refs: Vec<ResourceInfo>,
}

/// The engine facade: every registry, one owner.
pub struct Context {
    backend: Box<dyn GraphicsBackend + Send>,
    store: ResourceStore,
    paks: PakSystem,
    geometries: RefRegistry<GeometryHandle, GeometryAsset>,
    shaders: RefRegistry<ShaderHandle, ShaderAsset>,
    textures: RefRegistry<TextureHandle, TextureAsset>,
    materials: RefRegistry<MaterialHandle, MaterialAsset>,
    meshes: RefRegistry<MeshHandle, MeshAsset>,
    prefabs: RefRegistry<PrefabHandle, PrefabAsset>,
    world: EntityWorld,
    frame: u64,
    shut_down: bool,
}

impl Context {
    #[must_use]
    pub fn new(config: &EngineConfig, backend: Box<dyn GraphicsBackend + Send>) -> Self {
        Self {
            backend,
            store: ResourceStore::new(config.max_resources),
            paks: PakSystem::new(config.max_paks),
            geometries: RefRegistry::new("geometry", config.max_geometries),
            shaders: RefRegistry::new("shader", config.max_shaders),
            textures: RefRegistry::new("texture", config.max_textures),
            materials: RefRegistry::new("material", config.max_materials),
            meshes: RefRegistry::new("mesh", config.max_meshes),
            prefabs: RefRegistry::new("prefab", config.max_prefabs),
            world: EntityWorld::new(config.max_entities, config.max_components),
            frame: 0,
            shut_down: false,
        }
    }

    /// Frames elapsed, i.e. completed [`update`](Self::update) calls.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ========================================================================
    // Resource store
    // ========================================================================

    /// Find-or-create a bare store entry for a path. The payload is attached
    /// later by a typed create or a load.
    pub fn create_resource(&mut self, path: &str) -> Result<ResourceHandle> {
        self.store.create(path).map(|(handle, _)| handle)
    }

    pub fn create_geometry_resource(
        &mut self,
        path: &str,
        data: GeometryResource,
    ) -> Result<ResourceHandle> {
        self.create_typed_resource(path, ResourceData::Geometry(data))
    }

    pub fn create_shader_resource(
        &mut self,
        path: &str,
        data: ShaderResource,
    ) -> Result<ResourceHandle> {
        self.create_typed_resource(path, ResourceData::Shader(data))
    }

    pub fn create_texture_resource(
        &mut self,
        path: &str,
        data: TextureResource,
    ) -> Result<ResourceHandle> {
        self.create_typed_resource(path, ResourceData::Texture(data))
    }

    pub fn create_material_resource(
        &mut self,
        path: &str,
        data: MaterialResource,
    ) -> Result<ResourceHandle> {
        self.create_typed_resource(path, ResourceData::Material(data))
    }

    pub fn create_mesh_resource(
        &mut self,
        path: &str,
        data: MeshResource,
    ) -> Result<ResourceHandle> {
        self.create_typed_resource(path, ResourceData::Mesh(data))
    }

    pub fn create_prefab_resource(
        &mut self,
        path: &str,
        data: PrefabResource,
    ) -> Result<ResourceHandle> {
        self.create_typed_resource(path, ResourceData::Prefab(data))
    }

    fn create_typed_resource(&mut self, path: &str, data: ResourceData) -> Result<ResourceHandle> {
        let (handle, fresh) = self.store.create(path)?;
        if fresh {
            self.store.attach(handle, data);
        } else {
            // First writer wins: the resident payload is kept.
            log::debug!("create_resource: \"{path}\" already resident, new data discarded");
        }
        Ok(handle)
    }

    pub fn load_geometry(&mut self, path: &str) -> Result<ResourceHandle> {
        self.load_resource(path, ResourceKind::Geometry)
    }

    pub fn load_shader(&mut self, path: &str) -> Result<ResourceHandle> {
        self.load_resource(path, ResourceKind::Shader)
    }

    pub fn load_texture(&mut self, path: &str) -> Result<ResourceHandle> {
        self.load_resource(path, ResourceKind::Texture)
    }

    pub fn load_material(&mut self, path: &str) -> Result<ResourceHandle> {
        self.load_resource(path, ResourceKind::Material)
    }

    pub fn load_mesh(&mut self, path: &str) -> Result<ResourceHandle> {
        self.load_resource(path, ResourceKind::Mesh)
    }

    pub fn load_prefab(&mut self, path: &str) -> Result<ResourceHandle> {
        self.load_resource(path, ResourceKind::Prefab)
    }

    fn load_resource(&mut self, path: &str, kind: ResourceKind) -> Result<ResourceHandle> {
        let (handle, fresh) = self.store.create(path)?;
        if !fresh {
            // Already resident: verify the payload is what the caller asked for.
            if let Some(entry) = self.store.get(handle)
                && let Some(data) = &entry.data
                && data.kind() != kind
            {
                let actual = data.kind();
                self.store.release(handle);
                return Err(EngineError::ResourceTypeMismatch {
                    path: path.to_owned(),
                    expected: kind,
                    actual,
                });
            }
            return Ok(handle);
        }

        let hash = PathHash::of(path);
        let loaded = match self.paks.read_entry(path, hash, kind) {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Self::load_loose_file(path, kind),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(data) => {
                self.store.attach(handle, data);
                Ok(handle)
            }
            Err(e) => {
                // Roll the bare entry back so a failed load leaves no ghost.
                self.store.release(handle);
                Err(e)
            }
        }
    }

    /// Loads a record that is not indexed by any pak directly from the
    /// filesystem. Loose files hold exactly the record encoding a pak
    /// payload would.
    fn load_loose_file(path: &str, kind: ResourceKind) -> Result<ResourceData> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::ResourceNotFound {
                    path: path.to_owned(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        ResourceData::decode(kind, &mut reader)
    }

    /// Decrements a store entry's refcount. Stale handles log and no-op.
    pub fn destroy_resource(&mut self, handle: ResourceHandle) {
        if matches!(self.store.release(handle), Release::Invalid) {
            log::warn!("destroy_resource: stale resource handle");
        }
    }

    fn release_store_by_hash(&mut self, hash: PathHash) {
        match self.store.find(hash) {
            Some(handle) => self.destroy_resource(handle),
            None => log::warn!("resource {hash} was already released"),
        }
    }

    /// Path and refcount of every live resource, optionally sorted by path.
    #[must_use]
    pub fn resource_info(&self, sort: bool) -> Vec<ResourceInfo> {
        self.store.info(sort)
    }

    /// Payload of a live resource entry, if one is attached.
    #[must_use]
    pub fn resource_data(&self, handle: ResourceHandle) -> Option<&ResourceData> {
        self.store.get(handle).and_then(|entry| entry.data.as_ref())
    }

    // ========================================================================
    // Typed assets: geometry / shader / texture
    // ========================================================================

    /// Realizes a geometry resource as GPU vertex/index buffers.
    pub fn create_geometry(&mut self, resource: ResourceHandle) -> Result<GeometryHandle> {
        let hash = self.resource_hash(resource)?;
        if let Some(existing) = self.geometries.find(hash) {
            self.geometries.retain(existing);
            self.store.release(resource);
            return Ok(existing);
        }
        let (path, vertex_buffer, index_buffer, vertex_count, index_count) = {
            let entry = self
                .store
                .get(resource)
                .ok_or(EngineError::InvalidHandle { kind: "resource" })?;
            let data = entry.data.as_ref().ok_or_else(|| EngineError::MissingPayload {
                path: entry.path.clone(),
            })?;
            let ResourceData::Geometry(res) = data else {
                return Err(EngineError::ResourceTypeMismatch {
                    path: entry.path.clone(),
                    expected: ResourceKind::Geometry,
                    actual: data.kind(),
                });
            };
            let vb = self
                .backend
                .create_vertex_buffer(&res.vertex_data, &res.layout)?;
            let ib = self
                .backend
                .create_index_buffer(&res.index_data, res.index_type)?;
            (
                entry.path.clone(),
                vb,
                ib,
                res.vertex_count,
                res.index_count(),
            )
        };
        let handle = self.geometries.insert(
            hash,
            GeometryAsset {
                vertex_buffer,
                index_buffer,
                vertex_count,
                index_count,
            },
        )?;
        log::debug!("create_geometry: \"{path}\" ({vertex_count} vertices, {index_count} indices)");
        Ok(handle)
    }

    /// Compiles/uploads a shader resource to the backend.
    pub fn create_shader(&mut self, resource: ResourceHandle) -> Result<ShaderHandle> {
        let hash = self.resource_hash(resource)?;
        if let Some(existing) = self.shaders.find(hash) {
            self.shaders.retain(existing);
            self.store.release(resource);
            return Ok(existing);
        }
        let (shader, stage) = {
            let entry = self
                .store
                .get(resource)
                .ok_or(EngineError::InvalidHandle { kind: "resource" })?;
            let data = entry.data.as_ref().ok_or_else(|| EngineError::MissingPayload {
                path: entry.path.clone(),
            })?;
            let ResourceData::Shader(res) = data else {
                return Err(EngineError::ResourceTypeMismatch {
                    path: entry.path.clone(),
                    expected: ResourceKind::Shader,
                    actual: data.kind(),
                });
            };
            (
                self.backend.create_shader(&res.bytecode, res.stage)?,
                res.stage,
            )
        };
        self.shaders.insert(hash, ShaderAsset { shader, stage })
    }

    /// Uploads a texture resource to the backend.
    pub fn create_texture(&mut self, resource: ResourceHandle) -> Result<TextureHandle> {
        let hash = self.resource_hash(resource)?;
        if let Some(existing) = self.textures.find(hash) {
            self.textures.retain(existing);
            self.store.release(resource);
            return Ok(existing);
        }
        let (texture, desc) = {
            let entry = self
                .store
                .get(resource)
                .ok_or(EngineError::InvalidHandle { kind: "resource" })?;
            let data = entry.data.as_ref().ok_or_else(|| EngineError::MissingPayload {
                path: entry.path.clone(),
            })?;
            let ResourceData::Texture(res) = data else {
                return Err(EngineError::ResourceTypeMismatch {
                    path: entry.path.clone(),
                    expected: ResourceKind::Texture,
                    actual: data.kind(),
                });
            };
            (
                self.backend.create_texture(&res.desc, &res.pixels)?,
                res.desc,
            )
        };
        self.textures.insert(hash, TextureAsset { texture, desc })
    }

    /// Destroys a geometry asset; at refcount zero the GPU buffers go and
    /// the originating store entry is released.
    pub fn destroy_geometry(&mut self, handle: GeometryHandle) {
        let hash = self.geometries.hash_of(handle);
        match self.geometries.release(handle) {
            Release::Invalid => log::warn!("destroy_geometry: stale geometry handle"),
            Release::Retained(_) => {}
            Release::Freed(asset) => {
                self.backend.destroy_buffer(asset.vertex_buffer);
                self.backend.destroy_buffer(asset.index_buffer);
                if let Some(hash) = hash {
                    self.release_store_by_hash(hash);
                }
            }
        }
    }

    pub fn destroy_shader(&mut self, handle: ShaderHandle) {
        let hash = self.shaders.hash_of(handle);
        match self.shaders.release(handle) {
            Release::Invalid => log::warn!("destroy_shader: stale shader handle"),
            Release::Retained(_) => {}
            Release::Freed(asset) => {
                self.backend.destroy_shader(asset.shader);
                if let Some(hash) = hash {
                    self.release_store_by_hash(hash);
                }
            }
        }
    }

    pub fn destroy_texture(&mut self, handle: TextureHandle) {
        let hash = self.textures.hash_of(handle);
        match self.textures.release(handle) {
            Release::Invalid => log::warn!("destroy_texture: stale texture handle"),
            Release::Retained(_) => {}
            Release::Freed(asset) => {
                self.backend.destroy_texture(asset.texture);
                if let Some(hash) = hash {
                    self.release_store_by_hash(hash);
                }
            }
        }
    }

    // ========================================================================
    // Typed assets: material / mesh / prefab (composite)
    // ========================================================================

    /// Realizes a material: both shaders are loaded and compiled, the
    /// program linked, then every sampler parameter resolved to a texture.
    ///
    /// No rollback on mid-creation failure: dependencies resolved before
    /// the failure stay resident (refcounted) and are reclaimed when their
    /// last reference goes away.
    pub fn create_material(&mut self, resource: ResourceHandle) -> Result<MaterialHandle> {
        let hash = self.resource_hash(resource)?;
        if let Some(existing) = self.materials.find(hash) {
            self.materials.retain(existing);
            self.store.release(resource);
            return Ok(existing);
        }
        let (path, mat) = self.clone_material(resource)?;

        let vs_res = self.load_shader(&mat.vertex_shader)?;
        let vertex_shader = self.create_shader(vs_res)?;
        let fs_res = self.load_shader(&mat.fragment_shader)?;
        let fragment_shader = self.create_shader(fs_res)?;

        let vs_id = self
            .shaders
            .get(vertex_shader)
            .ok_or(EngineError::InvalidHandle { kind: "shader" })?
            .shader;
        let fs_id = self
            .shaders
            .get(fragment_shader)
            .ok_or(EngineError::InvalidHandle { kind: "shader" })?
            .shader;
        let program = self.backend.create_program(vs_id, fs_id)?;

        let mut textures = Vec::new();
        for texture_path in mat.params.sampler_paths() {
            let tex_res = self.load_texture(texture_path)?;
            textures.push(self.create_texture(tex_res)?);
        }

        let handle = self.materials.insert(
            hash,
            MaterialAsset {
                program,
                vertex_shader,
                fragment_shader,
                textures,
            },
        )?;
        log::debug!(
            "create_material: \"{path}\" linked with {} sampler(s)",
            mat.params.sampler_paths().count()
        );
        Ok(handle)
    }

    /// Realizes a mesh: its material and every geometry, transforms copied
    /// verbatim.
    pub fn create_mesh(&mut self, resource: ResourceHandle) -> Result<MeshHandle> {
        let hash = self.resource_hash(resource)?;
        if let Some(existing) = self.meshes.find(hash) {
            self.meshes.retain(existing);
            self.store.release(resource);
            return Ok(existing);
        }
        let (path, mesh) = self.clone_mesh(resource)?;

        let mat_res = self.load_material(&mesh.material)?;
        let material = self.create_material(mat_res)?;

        let mut geometries = smallvec::SmallVec::new();
        for geometry in &mesh.geometries {
            let geo_res = self.load_geometry(&geometry.path)?;
            geometries.push((self.create_geometry(geo_res)?, geometry.transform));
        }

        let handle = self.meshes.insert(
            hash,
            MeshAsset {
                material,
                geometries,
            },
        )?;
        log::debug!("create_mesh: \"{path}\" ({} geometries)", mesh.geometries.len());
        Ok(handle)
    }

    /// Realizes a prefab: every mesh path, in order.
    pub fn create_prefab(&mut self, resource: ResourceHandle) -> Result<PrefabHandle> {
        let hash = self.resource_hash(resource)?;
        if let Some(existing) = self.prefabs.find(hash) {
            self.prefabs.retain(existing);
            self.store.release(resource);
            return Ok(existing);
        }
        let (path, prefab) = self.clone_prefab(resource)?;

        let mut meshes = Vec::with_capacity(prefab.meshes.len());
        for mesh_path in &prefab.meshes {
            let mesh_res = self.load_mesh(mesh_path)?;
            meshes.push(self.create_mesh(mesh_res)?);
        }

        let handle = self.prefabs.insert(hash, PrefabAsset { meshes })?;
        log::debug!("create_prefab: \"{path}\" ({} meshes)", prefab.meshes.len());
        Ok(handle)
    }

    /// Destroys a material; at zero the program, both shaders and every
    /// sampler texture are destroyed in cascade.
    pub fn destroy_material(&mut self, handle: MaterialHandle) {
        let hash = self.materials.hash_of(handle);
        match self.materials.release(handle) {
            Release::Invalid => log::warn!("destroy_material: stale material handle"),
            Release::Retained(_) => {}
            Release::Freed(asset) => {
                self.backend.destroy_program(asset.program);
                self.destroy_shader(asset.vertex_shader);
                self.destroy_shader(asset.fragment_shader);
                for texture in asset.textures {
                    self.destroy_texture(texture);
                }
                if let Some(hash) = hash {
                    self.release_store_by_hash(hash);
                }
            }
        }
    }

    /// Destroys a mesh; at zero its material and geometries cascade.
    pub fn destroy_mesh(&mut self, handle: MeshHandle) {
        let hash = self.meshes.hash_of(handle);
        match self.meshes.release(handle) {
            Release::Invalid => log::warn!("destroy_mesh: stale mesh handle"),
            Release::Retained(_) => {}
            Release::Freed(asset) => {
                self.destroy_material(asset.material);
                for (geometry, _) in asset.geometries {
                    self.destroy_geometry(geometry);
                }
                if let Some(hash) = hash {
                    self.release_store_by_hash(hash);
                }
            }
        }
    }

    /// Destroys a prefab; at zero every mesh cascades.
    pub fn destroy_prefab(&mut self, handle: PrefabHandle) {
        let hash = self.prefabs.hash_of(handle);
        match self.prefabs.release(handle) {
            Release::Invalid => log::warn!("destroy_prefab: stale prefab handle"),
            Release::Retained(_) => {}
            Release::Freed(asset) => {
                for mesh in asset.meshes {
                    self.destroy_mesh(mesh);
                }
                if let Some(hash) = hash {
                    self.release_store_by_hash(hash);
                }
            }
        }
    }

    /// Submits one draw per geometry of a mesh, using its material program.
    pub fn submit_mesh(&mut self, view: ViewId, mesh: MeshHandle) {
        let Some(asset) = self.meshes.get(mesh) else {
            log::warn!("submit_mesh: stale mesh handle");
            return;
        };
        let Some(material) = self.materials.get(asset.material) else {
            log::warn!("submit_mesh: mesh references a destroyed material");
            return;
        };
        let program = material.program;
        for _ in 0..asset.geometries.len() {
            self.backend.submit(view, program);
        }
    }

    fn resource_hash(&self, resource: ResourceHandle) -> Result<PathHash> {
        self.store
            .hash_of(resource)
            .ok_or(EngineError::InvalidHandle { kind: "resource" })
    }

    fn clone_material(&self, resource: ResourceHandle) -> Result<(String, MaterialResource)> {
        let entry = self
            .store
            .get(resource)
            .ok_or(EngineError::InvalidHandle { kind: "resource" })?;
        let data = entry.data.as_ref().ok_or_else(|| EngineError::MissingPayload {
            path: entry.path.clone(),
        })?;
        let ResourceData::Material(res) = data else {
            return Err(EngineError::ResourceTypeMismatch {
                path: entry.path.clone(),
                expected: ResourceKind::Material,
                actual: data.kind(),
            });
        };
        Ok((entry.path.clone(), res.clone()))
    }

    fn clone_mesh(&self, resource: ResourceHandle) -> Result<(String, MeshResource)> {
        let entry = self
            .store
            .get(resource)
            .ok_or(EngineError::InvalidHandle { kind: "resource" })?;
        let data = entry.data.as_ref().ok_or_else(|| EngineError::MissingPayload {
            path: entry.path.clone(),
        })?;
        let ResourceData::Mesh(res) = data else {
            return Err(EngineError::ResourceTypeMismatch {
                path: entry.path.clone(),
                expected: ResourceKind::Mesh,
                actual: data.kind(),
            });
        };
        Ok((entry.path.clone(), res.clone()))
    }

    fn clone_prefab(&self, resource: ResourceHandle) -> Result<(String, PrefabResource)> {
        let entry = self
            .store
            .get(resource)
            .ok_or(EngineError::InvalidHandle { kind: "resource" })?;
        let data = entry.data.as_ref().ok_or_else(|| EngineError::MissingPayload {
            path: entry.path.clone(),
        })?;
        let ResourceData::Prefab(res) = data else {
            return Err(EngineError::ResourceTypeMismatch {
                path: entry.path.clone(),
                expected: ResourceKind::Prefab,
                actual: data.kind(),
            });
        };
        Ok((entry.path.clone(), res.clone()))
    }

    // ========================================================================
    // Pak archives
    // ========================================================================

    /// Writes every payload-bearing resident resource into a new pak file.
    pub fn create_pak(&mut self, path: &str) -> Result<usize> {
        PakSystem::write_pak(path, &self.store)
    }

    /// Loads a pak's index; subsequent `load_<kind>` calls resolve through
    /// it before falling back to loose files.
    pub fn load_pak(&mut self, path: &str) -> Result<usize> {
        self.paks.load(path)
    }

    /// Unloads a pak: destroys whatever indexed entries are still resident,
    /// drops the index records and closes the file. Returns how many
    /// resident entries were destroyed.
    pub fn unload_pak(&mut self, path: &str) -> Result<usize> {
        let hashes = self.paks.unload(path)?;
        let mut destroyed = 0;
        for hash in hashes {
            if let Some(handle) = self.store.find(hash) {
                self.destroy_resource(handle);
                destroyed += 1;
            }
        }
        Ok(destroyed)
    }

    // ========================================================================
    // Entities and components
    // ========================================================================

    pub fn create_entity(&mut self) -> Result<EntityHandle> {
        self.world.create_entity()
    }

    pub fn create_component(&mut self, payload: Box<dyn Any + Send>) -> Result<ComponentHandle> {
        self.world.create_component(payload)
    }

    pub fn add_component(
        &mut self,
        entity: EntityHandle,
        bit: u32,
        component: ComponentHandle,
    ) -> Result<()> {
        self.world.add_component(entity, bit, component)
    }

    #[must_use]
    pub fn component_data(&self, entity: EntityHandle, bit: u32) -> Option<&dyn Any> {
        self.world.component_data(entity, bit)
    }

    #[must_use]
    pub fn component<T: Any>(&self, entity: EntityHandle, bit: u32) -> Option<&T> {
        self.world.component(entity, bit)
    }

    pub fn destroy_entity(&mut self, entity: EntityHandle) {
        self.world.destroy_entity(entity);
    }

    pub fn destroy_component(&mut self, component: ComponentHandle) {
        self.world.destroy_component(component);
    }

    /// Every live entity whose mask contains at least the requested bits.
    #[must_use]
    pub fn query_entities(&self, mask: u32) -> Vec<EntityHandle> {
        self.world.query(mask)
    }

    // ========================================================================
    // Frame lifecycle and introspection
    // ========================================================================

    /// Per-frame bookkeeping: drains every deferred-free queue. Call once
    /// per frame, after submissions are complete.
    pub fn update(&mut self, flags: DebugFlags) {
        self.frame += 1;
        let freed = self.store.drain_deferred()
            + self.geometries.drain_deferred()
            + self.shaders.drain_deferred()
            + self.textures.drain_deferred()
            + self.materials.drain_deferred()
            + self.meshes.drain_deferred()
            + self.prefabs.drain_deferred()
            + self.world.drain_deferred();
        if freed > 0 {
            log::trace!("update: frame {} reclaimed {freed} slot(s)", self.frame);
        }
        if flags.contains(DebugFlags::STATS) {
            let stats = self.stats();
            log::info!(
                "frame {}: {} resources, {} geometries, {} shaders, {} textures, \
                 {} materials, {} meshes, {} prefabs, {} paks, {} entities, {} components",
                stats.frame,
                stats.num_resources,
                stats.num_geometries,
                stats.num_shaders,
                stats.num_textures,
                stats.num_materials,
                stats.num_meshes,
                stats.num_prefabs,
                stats.num_paks,
                stats.num_entities,
                stats.num_components,
            );
        }
        if flags.contains(DebugFlags::RESOURCES) {
            for info in self.resource_info(true) {
                log::info!("  [{}] {}", info.refs, info.path);
            }
        }
    }

    /// Live counts per kind, plus per-resource refcounts (capped at 100).
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let mut resource_refs = self.store.info(false);
        resource_refs.truncate(MAX_STATS_ENTRIES);
        EngineStats {
            frame: self.frame,
            num_resources: self.store.len(),
            num_geometries: self.geometries.len(),
            num_shaders: self.shaders.len(),
            num_textures: self.textures.len(),
            num_materials: self.materials.len(),
            num_meshes: self.meshes.len(),
            num_prefabs: self.prefabs.len(),
            num_paks: self.paks.len(),
            num_entities: self.world.entity_count(),
            num_components: self.world.component_count(),
            resource_refs,
        }
    }

    /// Tears down every remaining object, composites first so GPU objects
    /// are destroyed exactly once. Also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        let stats = self.stats();
        if stats.num_resources + stats.num_meshes + stats.num_materials + stats.num_prefabs > 0 {
            log::warn!(
                "shutdown with live objects: {} resources, {} meshes, {} materials, {} prefabs",
                stats.num_resources,
                stats.num_meshes,
                stats.num_materials,
                stats.num_prefabs,
            );
        }

        self.prefabs.drain_all();
        self.meshes.drain_all();
        for material in self.materials.drain_all() {
            self.backend.destroy_program(material.program);
        }
        for shader in self.shaders.drain_all() {
            self.backend.destroy_shader(shader.shader);
        }
        for texture in self.textures.drain_all() {
            self.backend.destroy_texture(texture.texture);
        }
        for geometry in self.geometries.drain_all() {
            self.backend.destroy_buffer(geometry.vertex_buffer);
            self.backend.destroy_buffer(geometry.index_buffer);
        }
        self.store.drain_all();
        self.world.drain_all();
        for path in self.paks.loaded_paths() {
            if let Err(e) = self.paks.unload(&path) {
                log::warn!("shutdown: failed to unload pak \"{path}\": {e}");
            }
        }
        log::debug!("shutdown complete after {} frame(s)", self.frame);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.shutdown();
    }
}
