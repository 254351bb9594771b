//! Error types.
//!
//! Every failure in this crate is a setup or contract bug, never a transient
//! condition, so nothing here is retried. Errors are raised synchronously at
//! the call site and carried to the application boundary as [`RenderError`].

use thiserror::Error;

use crate::arena::ArenaError;
use crate::gl::{GlType, ShaderStage};

/// The fatal error kind of the rendering layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    // ── type registry ────────────────────────────────────────────────────
    /// The GPU reported a type enum with no registered entry.
    #[error("unknown GPU type 0x{0:04X}")]
    UnknownType(u32),

    /// The GPU type has no application-level value type (samplers).
    #[error("GPU type {0} has no semantic value type")]
    UnsupportedSemanticType(GlType),

    // ── shader builds ────────────────────────────────────────────────────
    #[error("could not compile {stage} shader:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program failed to link:\n{log}")]
    ShaderLink { log: String },

    /// The GPU refused to hand out an object handle.
    #[error("unable to create {what}: {reason}")]
    GpuAllocation { what: &'static str, reason: String },

    // ── binding reconciliation ───────────────────────────────────────────
    #[error("shader has no binding called `{name}`")]
    BindingNotFound { name: String },

    #[error("binding `{name}` expects {expected} but the shader declares {actual}")]
    BindingTypeMismatch {
        name: String,
        expected: GlType,
        actual: GlType,
    },

    #[error("no instance data supplied for instance attribute `{name}`")]
    MissingInstanceData { name: String },

    #[error("render object has no uniform called `{name}`")]
    UnknownUniform { name: String },

    #[error("uniform `{name}` has {len} element(s), index {index} is out of range")]
    UniformIndexOutOfRange { name: String, index: usize, len: usize },

    // ── resource integrity ───────────────────────────────────────────────
    #[error("resource cache inconsistency: {0}")]
    CacheInconsistency(String),

    #[error("render object `{0}` already loaded")]
    AlreadyLoaded(String),

    #[error("render object `{0}` is not loaded")]
    NotLoaded(String),

    #[error("instance already loaded into an engine")]
    InstanceAlreadyAttached,

    #[error("instance is not attached to this engine")]
    InstanceNotAttached,

    #[error("signal already activated")]
    SignalAlreadyActivated,

    #[error(transparent)]
    Arena(#[from] ArenaError),

    // ── topology ─────────────────────────────────────────────────────────
    #[error("unsupported topology 0x{0:04X}")]
    UnsupportedTopology(u32),

    #[error("malformed index data: {0}")]
    MalformedIndices(String),

    #[error("malformed vertex data: {0}")]
    MalformedVertices(String),

    // ── surfaces ─────────────────────────────────────────────────────────
    #[error("GPU context unavailable for surface `{0}`")]
    GpuContextUnavailable(String),
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
