//! Pak Archive Tests
//!
//! Tests for:
//! - Writing a pak from staged resources and reloading it in a fresh context
//! - Index integrity: entry count, kind byte verification
//! - Load/unload lifecycle errors (double load, unload of unknown pak)
//! - Unload destroying resident entries
//! - Malformed indexes rejected without leaving dangling index records
//! - Loose-file fallback when no pak indexes a path

use glam::{Mat4, Vec4};
use mengine::codec;
use mengine::{
    AttributeFormat, Context, DebugFlags, EngineConfig, EngineError, GeometryResource,
    HeadlessBackend, HeadlessCounters, MaterialParams, MaterialResource, MeshResource, PathHash,
    ResourceData, ShaderResource, ShaderStage, VertexAttribute, VertexLayout, VertexSemantic,
};
use tempfile::TempDir;

fn new_context() -> (Context, HeadlessCounters) {
    let backend = HeadlessBackend::new();
    let counters = backend.counters();
    let context = Context::new(&EngineConfig::default(), Box::new(backend));
    (context, counters)
}

fn quad_geometry() -> GeometryResource {
    let layout = VertexLayout::new(vec![VertexAttribute {
        semantic: VertexSemantic::Position,
        format: AttributeFormat::F32x3,
    }]);
    let vertices: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];
    GeometryResource::from_pod(layout, &vertices, &[0, 1, 2, 2, 3, 0])
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

/// Stages the cube scene and writes it into `<dir>/scene.pak`, returning the
/// pak path. The staging context is dropped, so the reload below starts cold.
fn write_scene_pak(dir: &TempDir) -> String {
    let pak_path = dir
        .path()
        .join("scene.pak")
        .to_string_lossy()
        .into_owned();
    let (mut ctx, _) = new_context();
    ctx.create_geometry_resource("meshes/cube.geom", quad_geometry())
        .unwrap();
    ctx.create_shader_resource(
        "shaders/v.shader",
        ShaderResource::new(ShaderStage::Vertex, b"vs-bytecode".to_vec()),
    )
    .unwrap();
    ctx.create_shader_resource(
        "shaders/f.shader",
        ShaderResource::new(ShaderStage::Fragment, b"fs-bytecode".to_vec()),
    )
    .unwrap();
    ctx.create_material_resource("materials/red.mat", red_material())
        .unwrap();
    ctx.create_mesh_resource(
        "meshes/cube.mesh",
        MeshResource::single("materials/red.mat", "meshes/cube.geom", Mat4::IDENTITY),
    )
    .unwrap();

    let written = ctx.create_pak(&pak_path).unwrap();
    assert_eq!(written, 5);
    pak_path
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn pak_round_trips_a_full_scene() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, counters) = new_context();
    assert_eq!(ctx.load_pak(&pak_path).unwrap(), 5);

    // Everything resolves out of the pak, down to the mesh's full chain.
    let mesh_res = ctx.load_mesh("meshes/cube.mesh").unwrap();
    let _mesh = ctx.create_mesh(mesh_res).unwrap();

    let stats = ctx.stats();
    assert_eq!(stats.num_paks, 1);
    assert_eq!(stats.num_geometries, 1);
    assert_eq!(stats.num_shaders, 2);
    assert_eq!(stats.num_materials, 1);
    assert_eq!(stats.num_meshes, 1);
    assert_eq!(counters.live_programs(), 1);
}

#[test]
fn pak_payload_matches_what_was_written() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, _) = new_context();
    ctx.load_pak(&pak_path).unwrap();

    let handle = ctx.load_geometry("meshes/cube.geom").unwrap();
    let entry = ctx
        .resource_info(false)
        .into_iter()
        .find(|i| i.path == "meshes/cube.geom")
        .unwrap();
    assert_eq!(entry.refs, 1);

    // Decoded record is valid enough to upload: stride checks in the
    // headless backend would reject corrupted vertex data.
    ctx.create_geometry(handle).unwrap();
    assert_eq!(ctx.stats().num_geometries, 1);
}

#[test]
fn reloaded_payloads_equal_the_staged_originals() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, _) = new_context();
    ctx.load_pak(&pak_path).unwrap();

    // Every record must come back exactly as staged, field for field.
    let geo = ctx.load_geometry("meshes/cube.geom").unwrap();
    assert_eq!(
        ctx.resource_data(geo),
        Some(&ResourceData::Geometry(quad_geometry()))
    );
    let vs = ctx.load_shader("shaders/v.shader").unwrap();
    assert_eq!(
        ctx.resource_data(vs),
        Some(&ResourceData::Shader(ShaderResource::new(
            ShaderStage::Vertex,
            b"vs-bytecode".to_vec()
        )))
    );
    let fs = ctx.load_shader("shaders/f.shader").unwrap();
    assert_eq!(
        ctx.resource_data(fs),
        Some(&ResourceData::Shader(ShaderResource::new(
            ShaderStage::Fragment,
            b"fs-bytecode".to_vec()
        )))
    );
    let mat = ctx.load_material("materials/red.mat").unwrap();
    assert_eq!(
        ctx.resource_data(mat),
        Some(&ResourceData::Material(red_material()))
    );
    let mesh = ctx.load_mesh("meshes/cube.mesh").unwrap();
    assert_eq!(
        ctx.resource_data(mesh),
        Some(&ResourceData::Mesh(MeshResource::single(
            "materials/red.mat",
            "meshes/cube.geom",
            Mat4::IDENTITY
        )))
    );
}

#[test]
fn loading_wrong_kind_from_pak_is_rejected() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, _) = new_context();
    ctx.load_pak(&pak_path).unwrap();

    // The index kind byte catches the mismatch before any payload read.
    assert!(matches!(
        ctx.load_texture("meshes/cube.geom"),
        Err(EngineError::ResourceTypeMismatch { .. })
    ));
    assert_eq!(ctx.stats().num_resources, 0);
}

// ============================================================================
// Load/Unload Lifecycle
// ============================================================================

#[test]
fn double_load_of_same_pak_is_an_error() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, _) = new_context();
    ctx.load_pak(&pak_path).unwrap();
    assert!(matches!(
        ctx.load_pak(&pak_path),
        Err(EngineError::PakAlreadyLoaded { .. })
    ));
}

#[test]
fn unload_of_unknown_pak_is_an_error() {
    let (mut ctx, _) = new_context();
    assert!(matches!(
        ctx.unload_pak("never_loaded.pak"),
        Err(EngineError::PakNotLoaded { .. })
    ));
}

#[test]
fn unload_destroys_resident_entries() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, _) = new_context();
    ctx.load_pak(&pak_path).unwrap();
    ctx.load_geometry("meshes/cube.geom").unwrap();
    ctx.load_shader("shaders/v.shader").unwrap();
    assert_eq!(ctx.stats().num_resources, 2);

    let destroyed = ctx.unload_pak(&pak_path).unwrap();
    assert_eq!(destroyed, 2);
    assert_eq!(ctx.stats().num_resources, 0);
    assert_eq!(ctx.stats().num_paks, 0);

    // With the pak gone and no loose file, the path no longer resolves.
    ctx.update(DebugFlags::empty());
    assert!(matches!(
        ctx.load_geometry("meshes/cube.geom"),
        Err(EngineError::ResourceNotFound { .. })
    ));
}

#[test]
fn pak_can_be_reloaded_after_unload() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, _) = new_context();
    ctx.load_pak(&pak_path).unwrap();
    ctx.unload_pak(&pak_path).unwrap();
    assert_eq!(ctx.load_pak(&pak_path).unwrap(), 5);
    ctx.load_mesh("meshes/cube.mesh").unwrap();
    assert_eq!(ctx.stats().num_resources, 1);
}

// ============================================================================
// Malformed Archives
// ============================================================================

/// Writes an archive whose second index entry carries a negative offset;
/// the first entry is well-formed and indexes `orphan.geom`.
fn write_broken_pak(dir: &TempDir) -> String {
    let pak_path = dir
        .path()
        .join("broken.pak")
        .to_string_lossy()
        .into_owned();
    let pak_hash = PathHash::of(&pak_path);

    let mut bytes = Vec::new();
    codec::write_u32(&mut bytes, 2).unwrap();
    codec::write_u32(&mut bytes, PathHash::of("orphan.geom").0).unwrap();
    codec::write_u8(&mut bytes, 0).unwrap();
    codec::write_u32(&mut bytes, pak_hash.0).unwrap();
    codec::write_i64(&mut bytes, 38).unwrap();
    codec::write_u32(&mut bytes, PathHash::of("bad.geom").0).unwrap();
    codec::write_u8(&mut bytes, 0).unwrap();
    codec::write_u32(&mut bytes, pak_hash.0).unwrap();
    codec::write_i64(&mut bytes, -1).unwrap();
    std::fs::write(&pak_path, &bytes).unwrap();
    pak_path
}

#[test]
fn malformed_index_leaves_no_dangling_entries() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_broken_pak(&dir);

    let (mut ctx, _) = new_context();
    assert!(matches!(
        ctx.load_pak(&pak_path),
        Err(EngineError::MalformedPak { .. })
    ));
    assert_eq!(ctx.stats().num_paks, 0);

    // The well-formed first entry must not linger in the shared index:
    // its path falls through to the loose-file lookup like any other.
    assert!(matches!(
        ctx.load_geometry("orphan.geom"),
        Err(EngineError::ResourceNotFound { .. })
    ));
}

#[test]
fn unknown_kind_tag_rejects_the_whole_index() {
    let dir = TempDir::new().unwrap();
    let pak_path = dir
        .path()
        .join("badkind.pak")
        .to_string_lossy()
        .into_owned();
    let pak_hash = PathHash::of(&pak_path);

    let mut bytes = Vec::new();
    codec::write_u32(&mut bytes, 2).unwrap();
    codec::write_u32(&mut bytes, PathHash::of("first.geom").0).unwrap();
    codec::write_u8(&mut bytes, 0).unwrap();
    codec::write_u32(&mut bytes, pak_hash.0).unwrap();
    codec::write_i64(&mut bytes, 38).unwrap();
    codec::write_u32(&mut bytes, PathHash::of("second.geom").0).unwrap();
    codec::write_u8(&mut bytes, 0xFF).unwrap();
    codec::write_u32(&mut bytes, pak_hash.0).unwrap();
    codec::write_i64(&mut bytes, 60).unwrap();
    std::fs::write(&pak_path, &bytes).unwrap();

    let (mut ctx, _) = new_context();
    assert!(matches!(
        ctx.load_pak(&pak_path),
        Err(EngineError::MalformedPak { .. })
    ));
    assert!(matches!(
        ctx.load_geometry("first.geom"),
        Err(EngineError::ResourceNotFound { .. })
    ));
}

// ============================================================================
// Loose Files
// ============================================================================

#[test]
fn loose_file_loads_when_no_pak_indexes_the_path() {
    let dir = TempDir::new().unwrap();
    let loose_path = dir
        .path()
        .join("standalone.geom")
        .to_string_lossy()
        .into_owned();

    // A loose file holds exactly one encoded record.
    let record = ResourceData::Geometry(quad_geometry());
    let mut bytes = Vec::new();
    record.encode(&mut bytes).unwrap();
    std::fs::write(&loose_path, &bytes).unwrap();

    let (mut ctx, counters) = new_context();
    let handle = ctx.load_geometry(&loose_path).unwrap();
    ctx.create_geometry(handle).unwrap();
    assert_eq!(counters.live_buffers(), 2);
}

#[test]
fn pak_takes_priority_over_loose_files() {
    let dir = TempDir::new().unwrap();
    let pak_path = write_scene_pak(&dir);

    let (mut ctx, _) = new_context();
    ctx.load_pak(&pak_path).unwrap();
    // No file named "meshes/cube.geom" exists on disk; the pak serves it.
    let handle = ctx.load_geometry("meshes/cube.geom").unwrap();
    assert!(ctx.create_geometry(handle).is_ok());
}
