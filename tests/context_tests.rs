//! Context Lifecycle Tests
//!
//! Tests for:
//! - Resource store deduplication and first-writer-wins through the facade
//! - Typed asset creation against the headless backend
//! - Cascading destruction: prefab → mesh → material → shader/texture
//! - Shared dependencies surviving partial destruction
//! - Deferred slot reclamation at the frame boundary
//! - Stats reporting

use glam::{Mat4, Vec4};
use mengine::{
    AttributeFormat, Context, DebugFlags, EngineConfig, EngineError, GeometryResource,
    HeadlessBackend, HeadlessCounters, MaterialParams, MaterialResource, MeshResource,
    PrefabResource, ShaderResource, ShaderStage, TextureDesc, TextureFlags, TextureFormat,
    TextureResource, VertexAttribute, VertexLayout, VertexSemantic,
};

fn new_context() -> (Context, HeadlessCounters) {
    let backend = HeadlessBackend::new();
    let counters = backend.counters();
    let context = Context::new(&EngineConfig::default(), Box::new(backend));
    (context, counters)
}

fn position_layout() -> VertexLayout {
    VertexLayout::new(vec![VertexAttribute {
        semantic: VertexSemantic::Position,
        format: AttributeFormat::F32x3,
    }])
}

fn quad_geometry() -> GeometryResource {
    let vertices: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];
    GeometryResource::from_pod(position_layout(), &vertices, &[0, 1, 2, 2, 3, 0])
}

fn red_material() -> MaterialResource {
    let mut params = MaterialParams::new();
    params.set_vec4("u_color", Vec4::new(1.0, 0.0, 0.0, 1.0));
    MaterialResource {
        vertex_shader: "shaders/v.shader".to_owned(),
        fragment_shader: "shaders/f.shader".to_owned(),
        params,
    }
}

fn checker_texture() -> TextureResource {
    TextureResource::new(
        TextureDesc {
            width: 2,
            height: 2,
            format: TextureFormat::Rgba8,
            mip_count: 1,
            flags: TextureFlags::empty(),
        },
        vec![0xAB; 16],
    )
}

/// Stages the standard cube scene: geometry, both shaders, a flat red
/// material and a single-geometry mesh. The returned handles are the
/// caller-held store references.
fn stage_cube_scene(ctx: &mut Context) -> Vec<mengine::ResourceHandle> {
    vec![
        ctx.create_geometry_resource("meshes/cube.geom", quad_geometry())
            .unwrap(),
        ctx.create_shader_resource(
            "shaders/v.shader",
            ShaderResource::new(ShaderStage::Vertex, b"vs-bytecode".to_vec()),
        )
        .unwrap(),
        ctx.create_shader_resource(
            "shaders/f.shader",
            ShaderResource::new(ShaderStage::Fragment, b"fs-bytecode".to_vec()),
        )
        .unwrap(),
        ctx.create_material_resource("materials/red.mat", red_material())
            .unwrap(),
        ctx.create_mesh_resource(
            "meshes/cube.mesh",
            MeshResource::single("materials/red.mat", "meshes/cube.geom", Mat4::IDENTITY),
        )
        .unwrap(),
    ]
}

// ============================================================================
// Resource Store Semantics
// ============================================================================

#[test]
fn loading_same_path_twice_returns_same_handle() {
    let (mut ctx, _) = new_context();
    ctx.create_geometry_resource("a.geom", quad_geometry())
        .unwrap();

    let first = ctx.load_geometry("a.geom").unwrap();
    let second = ctx.load_geometry("a.geom").unwrap();
    assert_eq!(first, second);
    assert_eq!(ctx.stats().num_resources, 1);
}

#[test]
fn load_with_wrong_kind_is_rejected() {
    let (mut ctx, _) = new_context();
    ctx.create_geometry_resource("a.geom", quad_geometry())
        .unwrap();

    assert!(matches!(
        ctx.load_texture("a.geom"),
        Err(EngineError::ResourceTypeMismatch { .. })
    ));
    // The failed load did not leak a reference.
    let info = ctx.resource_info(false);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].refs, 1);
}

#[test]
fn load_of_unknown_path_reports_not_found() {
    let (mut ctx, _) = new_context();
    let err = ctx.load_mesh("does/not/exist.mesh").unwrap_err();
    assert!(matches!(err, EngineError::ResourceNotFound { .. }));
    assert_eq!(ctx.stats().num_resources, 0);
}

#[test]
fn destroying_stale_resource_handle_is_a_noop() {
    let (mut ctx, _) = new_context();
    let handle = ctx
        .create_geometry_resource("a.geom", quad_geometry())
        .unwrap();
    ctx.destroy_resource(handle);
    ctx.update(DebugFlags::empty());
    // Second destroy on the drained slot must not panic or corrupt anything.
    ctx.destroy_resource(handle);
    assert_eq!(ctx.stats().num_resources, 0);
}

// ============================================================================
// Asset Creation and the Dependency Chain
// ============================================================================

#[test]
fn mesh_creation_resolves_full_dependency_chain() {
    let (mut ctx, counters) = new_context();
    stage_cube_scene(&mut ctx);

    let mesh_res = ctx.load_mesh("meshes/cube.mesh").unwrap();
    let mesh = ctx.create_mesh(mesh_res).unwrap();

    let stats = ctx.stats();
    assert_eq!(stats.num_geometries, 1);
    assert_eq!(stats.num_shaders, 2);
    assert_eq!(stats.num_materials, 1);
    assert_eq!(stats.num_meshes, 1);

    // Vertex + index buffer, two shaders, one linked program.
    assert_eq!(counters.live_buffers(), 2);
    assert_eq!(counters.live_shaders(), 2);
    assert_eq!(counters.live_programs(), 1);

    ctx.submit_mesh(mengine::ViewId(0), mesh);
    assert_eq!(counters.submissions(), 1);
}

#[test]
fn creating_same_mesh_twice_dedups_the_asset() {
    let (mut ctx, counters) = new_context();
    stage_cube_scene(&mut ctx);

    let res_a = ctx.load_mesh("meshes/cube.mesh").unwrap();
    let mesh_a = ctx.create_mesh(res_a).unwrap();
    let res_b = ctx.load_mesh("meshes/cube.mesh").unwrap();
    let mesh_b = ctx.create_mesh(res_b).unwrap();

    assert_eq!(mesh_a, mesh_b);
    assert_eq!(ctx.stats().num_meshes, 1);
    assert_eq!(counters.live_programs(), 1);

    // Two creates need two destroys.
    ctx.destroy_mesh(mesh_a);
    assert_eq!(counters.live_programs(), 1);
    ctx.destroy_mesh(mesh_b);
    assert_eq!(counters.live_programs(), 0);
}

#[test]
fn create_with_wrong_resource_kind_is_rejected() {
    let (mut ctx, _) = new_context();
    let handle = ctx
        .create_geometry_resource("a.geom", quad_geometry())
        .unwrap();
    assert!(matches!(
        ctx.create_texture(handle),
        Err(EngineError::ResourceTypeMismatch { .. })
    ));
}

#[test]
fn create_without_payload_is_rejected() {
    let (mut ctx, _) = new_context();
    let handle = ctx.create_resource("bare.geom").unwrap();
    assert!(matches!(
        ctx.create_geometry(handle),
        Err(EngineError::MissingPayload { .. })
    ));
}

// ============================================================================
// Cascading Destruction
// ============================================================================

#[test]
fn destroying_mesh_cascades_to_every_gpu_object() {
    let (mut ctx, counters) = new_context();
    let staged = stage_cube_scene(&mut ctx);

    let mesh_res = ctx.load_mesh("meshes/cube.mesh").unwrap();
    let mesh = ctx.create_mesh(mesh_res).unwrap();

    ctx.destroy_mesh(mesh);
    assert_eq!(counters.live_buffers(), 0);
    assert_eq!(counters.live_shaders(), 0);
    assert_eq!(counters.live_programs(), 0);

    // Drop the staged references too; after the frame boundary the store
    // is completely empty.
    for handle in staged {
        ctx.destroy_resource(handle);
    }
    ctx.update(DebugFlags::empty());
    let stats = ctx.stats();
    assert_eq!(stats.num_resources, 0);
    assert_eq!(stats.num_meshes, 0);
    assert_eq!(stats.num_materials, 0);
    assert_eq!(stats.num_shaders, 0);
    assert_eq!(stats.num_geometries, 0);
}

#[test]
fn shared_texture_survives_until_last_material_goes() {
    let (mut ctx, counters) = new_context();
    ctx.create_shader_resource(
        "shaders/v.shader",
        ShaderResource::new(ShaderStage::Vertex, b"vs".to_vec()),
    )
    .unwrap();
    ctx.create_shader_resource(
        "shaders/f.shader",
        ShaderResource::new(ShaderStage::Fragment, b"fs".to_vec()),
    )
    .unwrap();
    ctx.create_texture_resource("textures/checker.tex", checker_texture())
        .unwrap();

    let make_material = |ctx: &mut Context, path: &str| {
        let mut material = red_material();
        material.params.set_sampler("s_albedo", "textures/checker.tex");
        let res = ctx.create_material_resource(path, material).unwrap();
        ctx.create_material(res).unwrap()
    };
    let mat_a = make_material(&mut ctx, "materials/a.mat");
    let mat_b = make_material(&mut ctx, "materials/b.mat");

    // Both materials resolved the same texture asset.
    assert_eq!(counters.live_textures(), 1);
    assert_eq!(ctx.stats().num_textures, 1);

    ctx.destroy_material(mat_a);
    assert_eq!(counters.live_textures(), 1, "texture still shared");
    ctx.destroy_material(mat_b);
    assert_eq!(counters.live_textures(), 0);
}

#[test]
fn prefab_cascades_through_meshes() {
    let (mut ctx, counters) = new_context();
    let staged = stage_cube_scene(&mut ctx);
    let prefab_staged = ctx
        .create_prefab_resource(
            "prefabs/crate.prefab",
            PrefabResource::new(vec!["meshes/cube.mesh".to_owned()]),
        )
        .unwrap();

    let prefab_res = ctx.load_prefab("prefabs/crate.prefab").unwrap();
    let prefab = ctx.create_prefab(prefab_res).unwrap();
    assert_eq!(ctx.stats().num_meshes, 1);
    assert_eq!(counters.live_programs(), 1);

    ctx.destroy_prefab(prefab);
    assert_eq!(counters.live_programs(), 0);
    assert_eq!(counters.live_buffers(), 0);

    ctx.destroy_resource(prefab_staged);
    for handle in staged {
        ctx.destroy_resource(handle);
    }
    ctx.update(DebugFlags::empty());
    assert_eq!(ctx.stats().num_resources, 0);
}

// ============================================================================
// Frame Boundary Semantics
// ============================================================================

#[test]
fn released_slot_is_reclaimed_only_at_update() {
    let (mut ctx, _) = new_context();
    let handle = ctx
        .create_geometry_resource("a.geom", quad_geometry())
        .unwrap();

    ctx.destroy_resource(handle);
    // Gone from the live view immediately...
    assert_eq!(ctx.stats().num_resources, 0);
    assert_eq!(ctx.frame(), 0);

    ctx.update(DebugFlags::empty());
    assert_eq!(ctx.frame(), 1);

    // ...and a fresh create of the same path yields a distinct handle.
    let reborn = ctx
        .create_geometry_resource("a.geom", quad_geometry())
        .unwrap();
    assert_ne!(handle, reborn);
}

#[test]
fn stats_lists_resource_refcounts() {
    let (mut ctx, _) = new_context();
    ctx.create_geometry_resource("a.geom", quad_geometry())
        .unwrap();
    ctx.load_geometry("a.geom").unwrap();

    let stats = ctx.stats();
    assert_eq!(stats.resource_refs.len(), 1);
    assert_eq!(stats.resource_refs[0].path, "a.geom");
    assert_eq!(stats.resource_refs[0].refs, 2);
}

// ============================================================================
// Entities and Components
// ============================================================================

#[derive(Debug, PartialEq)]
struct Health(u32);

#[test]
fn components_round_trip_through_the_context() {
    let (mut ctx, _) = new_context();
    let entity = ctx.create_entity().unwrap();
    let health = ctx.create_component(Box::new(Health(100))).unwrap();
    ctx.add_component(entity, 0, health).unwrap();

    assert_eq!(ctx.component::<Health>(entity, 0), Some(&Health(100)));
    assert!(ctx.component::<String>(entity, 0).is_none());

    let matching = ctx.query_entities(0b1);
    assert_eq!(matching, vec![entity]);

    ctx.destroy_entity(entity);
    ctx.update(DebugFlags::empty());
    assert_eq!(ctx.stats().num_entities, 0);
    assert_eq!(ctx.stats().num_components, 0);
}

#[test]
fn shutdown_releases_everything_exactly_once() {
    let (mut ctx, counters) = new_context();
    stage_cube_scene(&mut ctx);
    let mesh_res = ctx.load_mesh("meshes/cube.mesh").unwrap();
    ctx.create_mesh(mesh_res).unwrap();
    assert_eq!(counters.live_programs(), 1);

    ctx.shutdown();
    assert_eq!(counters.live_buffers(), 0);
    assert_eq!(counters.live_shaders(), 0);
    assert_eq!(counters.live_textures(), 0);
    assert_eq!(counters.live_programs(), 0);

    // Drop runs shutdown again; the guard makes it a no-op.
    drop(ctx);
    assert_eq!(counters.live_programs(), 0);
}
