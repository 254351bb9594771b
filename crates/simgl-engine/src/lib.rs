//! simgl engine crate.
//!
//! A thin 2-D rendering layer over an immediate-mode GPU API: shader
//! introspection, binding reconciliation, per-context GPU resource caching
//! and a shader-grouped draw loop across multiple surfaces.

pub mod arena;
pub mod coords;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod gl;
pub mod logging;
pub mod mesh;
pub mod render;
pub mod shader;
pub mod sync;
pub mod time;

pub use error::{RenderError, Result};
