//! Graphics Backend Interface
//!
//! The registry layer never talks to a graphics API directly. It hands raw
//! buffers, bytecode and pixel blobs to a [`GraphicsBackend`] and stores the
//! opaque ids it gets back. The backend is an external collaborator: render
//! code submits the same ids for drawing.
//!
//! [`HeadlessBackend`] is a bookkeeping-only implementation for tests and
//! headless tooling (asset cooking, validation) that tracks live object
//! counts without touching a GPU.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bitflags::bitflags;
use rustc_hash::FxHashSet;

use crate::error::{EngineError, Result};

// ============================================================================
// Opaque GPU object ids
// ============================================================================

macro_rules! gpu_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u64);
    };
}

gpu_id!(
    /// Opaque vertex or index buffer id.
    BufferId
);
gpu_id!(
    /// Opaque compiled shader id.
    ShaderId
);
gpu_id!(
    /// Opaque texture id.
    TextureId
);
gpu_id!(
    /// Opaque linked program id.
    ProgramId
);

/// Render view a draw call is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ViewId(pub u16);

// ============================================================================
// Vertex layout description
// ============================================================================

/// What a vertex attribute feeds in the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    Bitangent,
    Color0,
    Color1,
    TexCoord0,
    TexCoord1,
    TexCoord2,
    TexCoord3,
}

impl VertexSemantic {
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Tangent => 2,
            Self::Bitangent => 3,
            Self::Color0 => 4,
            Self::Color1 => 5,
            Self::TexCoord0 => 6,
            Self::TexCoord1 => 7,
            Self::TexCoord2 => 8,
            Self::TexCoord3 => 9,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::Position,
            1 => Self::Normal,
            2 => Self::Tangent,
            3 => Self::Bitangent,
            4 => Self::Color0,
            5 => Self::Color1,
            6 => Self::TexCoord0,
            7 => Self::TexCoord1,
            8 => Self::TexCoord2,
            9 => Self::TexCoord3,
            tag => {
                return Err(EngineError::UnknownTag {
                    what: "vertex semantic",
                    tag,
                });
            }
        })
    }
}

/// In-memory format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    U8x4,
    U8x4Norm,
    I16x2,
    F32x2,
    F32x3,
    F32x4,
}

impl AttributeFormat {
    /// Byte size of one attribute value.
    #[must_use]
    pub fn byte_size(self) -> u32 {
        match self {
            Self::U8x4 | Self::U8x4Norm | Self::I16x2 => 4,
            Self::F32x2 => 8,
            Self::F32x3 => 12,
            Self::F32x4 => 16,
        }
    }

    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::U8x4 => 0,
            Self::U8x4Norm => 1,
            Self::I16x2 => 2,
            Self::F32x2 => 3,
            Self::F32x3 => 4,
            Self::F32x4 => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::U8x4,
            1 => Self::U8x4Norm,
            2 => Self::I16x2,
            3 => Self::F32x2,
            4 => Self::F32x3,
            5 => Self::F32x4,
            tag => {
                return Err(EngineError::UnknownTag {
                    what: "attribute format",
                    tag,
                });
            }
        })
    }
}

/// One attribute of a vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    pub format: AttributeFormat,
}

/// Interleaved vertex layout: attributes in buffer order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    #[must_use]
    pub fn new(attributes: Vec<VertexAttribute>) -> Self {
        Self { attributes }
    }

    /// Byte stride of one interleaved vertex.
    #[must_use]
    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(|a| a.format.byte_size()).sum()
    }
}

/// Index buffer element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    #[must_use]
    pub fn byte_size(self) -> u32 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::U16 => 0,
            Self::U32 => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::U16),
            1 => Ok(Self::U32),
            tag => Err(EngineError::UnknownTag {
                what: "index type",
                tag,
            }),
        }
    }
}

// ============================================================================
// Shader and texture descriptions
// ============================================================================

/// Pipeline stage a shader blob targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Vertex => 0,
            Self::Fragment => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Vertex),
            1 => Ok(Self::Fragment),
            tag => Err(EngineError::UnknownTag {
                what: "shader stage",
                tag,
            }),
        }
    }
}

/// Pixel format of a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Bgra8,
    R8,
    Rg8,
    Rgba16F,
}

impl TextureFormat {
    /// Bytes per pixel.
    #[must_use]
    pub fn byte_size(self) -> u32 {
        match self {
            Self::R8 => 1,
            Self::Rg8 => 2,
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Rgba16F => 8,
        }
    }

    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Rgba8 => 0,
            Self::Bgra8 => 1,
            Self::R8 => 2,
            Self::Rg8 => 3,
            Self::Rgba16F => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::Rgba8,
            1 => Self::Bgra8,
            2 => Self::R8,
            3 => Self::Rg8,
            4 => Self::Rgba16F,
            tag => {
                return Err(EngineError::UnknownTag {
                    what: "texture format",
                    tag,
                });
            }
        })
    }
}

bitflags! {
    /// Sampling and usage flags carried by a texture resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureFlags: u32 {
        const RENDER_TARGET = 1 << 0;
        const CLAMP_U       = 1 << 1;
        const CLAMP_V       = 1 << 2;
        const POINT_SAMPLE  = 1 << 3;
        const SRGB          = 1 << 4;
    }
}

/// Creation parameters of a texture, serialized alongside its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u16,
    pub height: u16,
    pub format: TextureFormat,
    pub mip_count: u8,
    pub flags: TextureFlags,
}

// ============================================================================
// Backend trait
// ============================================================================

/// The graphics API abstraction the registries create GPU objects through.
///
/// All methods that create objects may fail (device loss, invalid blobs);
/// destroy methods are infallible fire-and-forget, matching how render
/// backends queue deletions.
pub trait GraphicsBackend {
    fn create_vertex_buffer(&mut self, data: &[u8], layout: &VertexLayout) -> Result<BufferId>;
    fn create_index_buffer(&mut self, data: &[u8], index_type: IndexType) -> Result<BufferId>;
    fn create_shader(&mut self, bytecode: &[u8], stage: ShaderStage) -> Result<ShaderId>;
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId>;
    fn create_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId>;

    fn destroy_buffer(&mut self, buffer: BufferId);
    fn destroy_shader(&mut self, shader: ShaderId);
    fn destroy_texture(&mut self, texture: TextureId);
    fn destroy_program(&mut self, program: ProgramId);

    /// Submits a draw using the given program to a view.
    fn submit(&mut self, view: ViewId, program: ProgramId);
}

// ============================================================================
// Headless backend
// ============================================================================

#[derive(Default)]
struct HeadlessShared {
    live_buffers: AtomicUsize,
    live_shaders: AtomicUsize,
    live_textures: AtomicUsize,
    live_programs: AtomicUsize,
    submissions: AtomicUsize,
}

/// Live-object counters of a [`HeadlessBackend`], cloneable so tests can keep
/// inspecting them after the backend moved into a `Context`.
#[derive(Clone, Default)]
pub struct HeadlessCounters {
    shared: Arc<HeadlessShared>,
}

impl HeadlessCounters {
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.shared.live_buffers.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn live_shaders(&self) -> usize {
        self.shared.live_shaders.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.shared.live_textures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.shared.live_programs.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn submissions(&self) -> usize {
        self.shared.submissions.load(Ordering::Relaxed)
    }
}

/// A [`GraphicsBackend`] that creates nothing and tracks everything.
///
/// Hands out sequential ids and keeps live-object sets, so registry tests
/// can assert that cascading destruction released every GPU object.
#[derive(Default)]
pub struct HeadlessBackend {
    next_id: u64,
    buffers: FxHashSet<u64>,
    shaders: FxHashSet<u64>,
    textures: FxHashSet<u64>,
    programs: FxHashSet<u64>,
    counters: HeadlessCounters,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter handle that stays readable after the backend is boxed away.
    #[must_use]
    pub fn counters(&self) -> HeadlessCounters {
        self.counters.clone()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_vertex_buffer(&mut self, data: &[u8], layout: &VertexLayout) -> Result<BufferId> {
        let stride = layout.stride();
        if stride > 0 && data.len() as u32 % stride != 0 {
            return Err(EngineError::Graphics(format!(
                "vertex data length {} is not a multiple of stride {stride}",
                data.len()
            )));
        }
        let id = self.next();
        self.buffers.insert(id);
        self.counters.shared.live_buffers.fetch_add(1, Ordering::Relaxed);
        Ok(BufferId(id))
    }

    fn create_index_buffer(&mut self, data: &[u8], index_type: IndexType) -> Result<BufferId> {
        if data.len() as u32 % index_type.byte_size() != 0 {
            return Err(EngineError::Graphics(format!(
                "index data length {} does not match index width",
                data.len()
            )));
        }
        let id = self.next();
        self.buffers.insert(id);
        self.counters.shared.live_buffers.fetch_add(1, Ordering::Relaxed);
        Ok(BufferId(id))
    }

    fn create_shader(&mut self, bytecode: &[u8], _stage: ShaderStage) -> Result<ShaderId> {
        if bytecode.is_empty() {
            return Err(EngineError::Graphics("empty shader bytecode".into()));
        }
        let id = self.next();
        self.shaders.insert(id);
        self.counters.shared.live_shaders.fetch_add(1, Ordering::Relaxed);
        Ok(ShaderId(id))
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<TextureId> {
        let expected =
            u64::from(desc.width) * u64::from(desc.height) * u64::from(desc.format.byte_size());
        if !desc.flags.contains(TextureFlags::RENDER_TARGET) && (pixels.len() as u64) < expected {
            return Err(EngineError::Graphics(format!(
                "texture pixel data too short: {} < {expected}",
                pixels.len()
            )));
        }
        let id = self.next();
        self.textures.insert(id);
        self.counters.shared.live_textures.fetch_add(1, Ordering::Relaxed);
        Ok(TextureId(id))
    }

    fn create_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId> {
        if !self.shaders.contains(&vertex.0) || !self.shaders.contains(&fragment.0) {
            return Err(EngineError::Graphics(
                "program links a destroyed shader".into(),
            ));
        }
        let id = self.next();
        self.programs.insert(id);
        self.counters.shared.live_programs.fetch_add(1, Ordering::Relaxed);
        Ok(ProgramId(id))
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer.0) {
            self.counters.shared.live_buffers.fetch_sub(1, Ordering::Relaxed);
        } else {
            log::warn!("destroy_buffer: unknown buffer id {}", buffer.0);
        }
    }

    fn destroy_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader.0) {
            self.counters.shared.live_shaders.fetch_sub(1, Ordering::Relaxed);
        } else {
            log::warn!("destroy_shader: unknown shader id {}", shader.0);
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.0) {
            self.counters.shared.live_textures.fetch_sub(1, Ordering::Relaxed);
        } else {
            log::warn!("destroy_texture: unknown texture id {}", texture.0);
        }
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program.0) {
            self.counters.shared.live_programs.fetch_sub(1, Ordering::Relaxed);
        } else {
            log::warn!("destroy_program: unknown program id {}", program.0);
        }
    }

    fn submit(&mut self, _view: ViewId, program: ProgramId) {
        if !self.programs.contains(&program.0) {
            log::warn!("submit: unknown program id {}", program.0);
            return;
        }
        self.counters.shared.submissions.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_tracks_live_objects() {
        let mut backend = HeadlessBackend::new();
        let counters = backend.counters();

        let layout = VertexLayout::new(vec![VertexAttribute {
            semantic: VertexSemantic::Position,
            format: AttributeFormat::F32x3,
        }]);
        let vb = backend.create_vertex_buffer(&[0u8; 36], &layout).unwrap();
        assert_eq!(counters.live_buffers(), 1);

        backend.destroy_buffer(vb);
        assert_eq!(counters.live_buffers(), 0);
    }

    #[test]
    fn program_requires_live_shaders() {
        let mut backend = HeadlessBackend::new();
        let vs = backend.create_shader(b"vs", ShaderStage::Vertex).unwrap();
        let fs = backend.create_shader(b"fs", ShaderStage::Fragment).unwrap();
        backend.destroy_shader(fs);
        assert!(backend.create_program(vs, fs).is_err());
    }

    #[test]
    fn vertex_buffer_length_must_match_stride() {
        let mut backend = HeadlessBackend::new();
        let layout = VertexLayout::new(vec![VertexAttribute {
            semantic: VertexSemantic::Position,
            format: AttributeFormat::F32x3,
        }]);
        assert!(backend.create_vertex_buffer(&[0u8; 10], &layout).is_err());
    }
}
