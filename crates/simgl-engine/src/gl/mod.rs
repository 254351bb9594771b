//! Immediate-mode GPU API seam.
//!
//! [`Gl`] is the narrow slice of the WebGL2 / GLES 3.0 call surface the
//! rendering layer needs. Handle types are associated types so a backend can
//! hand out whatever its native objects are.
//!
//! Backends:
//! - [`HeadlessGl`]: records every call; used by tests and the studio.
//! - `GlowGl` (feature `glow`): forwards to a real GL context via `glow`.
//!
//! All methods take `&self`. A GL context is a single-threaded, interior
//! mutable object; callers must not share one across threads.

pub mod consts;
mod headless;
mod types;

#[cfg(feature = "glow")]
mod glow;

use std::fmt;

pub use headless::{FakeProgram, GlCall, HeadlessGl, RecordedUniform};
pub use types::{lookup, ArrayKind, Decomposition, GlType, GlTypeInfo, SemanticType};

#[cfg(feature = "glow")]
pub use self::glow::GlowGl;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn raw(self) -> u32 {
        match self {
            Self::Vertex => consts::VERTEX_SHADER,
            Self::Fragment => consts::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Buffer binding point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

impl BufferTarget {
    pub const fn raw(self) -> u32 {
        match self {
            Self::Array => consts::ARRAY_BUFFER,
            Self::ElementArray => consts::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// One entry of `getActiveAttrib` / `getActiveUniform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub name: String,
    /// Raw GL type enum.
    pub ty: u32,
    /// Declared array length (1 for non-arrays).
    pub size: i32,
}

/// Flat uniform payload, tagged by its scalar kind.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformData<'a> {
    F32(&'a [f32]),
    I32(&'a [i32]),
    U32(&'a [u32]),
}

/// The GPU calls the rendering layer issues.
pub trait Gl {
    type Shader: Copy + fmt::Debug;
    type Program: Copy + fmt::Debug + PartialEq;
    type Buffer: Copy + fmt::Debug + PartialEq;
    type VertexArray: Copy + fmt::Debug + PartialEq;
    type UniformLocation: Clone + fmt::Debug;

    // ── shaders and programs ─────────────────────────────────────────────
    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    // ── introspection ────────────────────────────────────────────────────
    fn active_attribute_count(&self, program: Self::Program) -> u32;
    fn active_attribute(&self, program: Self::Program, index: u32) -> Option<ActiveInfo>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn active_uniform_count(&self, program: Self::Program) -> u32;
    fn active_uniform(&self, program: Self::Program, index: u32) -> Option<ActiveInfo>;
    fn uniform_location(&self, program: Self::Program, name: &str)
    -> Option<Self::UniformLocation>;

    // ── buffers and vertex arrays ────────────────────────────────────────
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>);
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: u32);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vao: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vao: Self::VertexArray);

    /// `vertexAttribPointer` for float slots, `vertexAttribIPointer` for
    /// integer slots (chosen by `data_type`).
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        stride: i32,
        offset: i32,
    );
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

    // ── uniforms and draws ───────────────────────────────────────────────
    /// Writes `data` to `location`. Matrices are row-major and uploaded with
    /// transpose.
    fn uniform(&self, location: &Self::UniformLocation, ty: GlType, data: UniformData<'_>);

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32);
    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instances: i32,
    );
}
