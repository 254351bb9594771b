//! Render contexts, the resource cache, render objects and the engine that
//! drives them.
//!
//! Ownership: the engine owns contexts; a context owns its cache and the
//! objects drawn through it; the caller owns instances and surfaces.
//!
//! Frame flow: `RenderEngine::render` → each context → each shader bucket
//! (program bound once) → each object in registration order.

mod cache;
mod context;
mod engine;
mod object;
mod surface;
mod uniform;

pub use cache::ResourceCache;
pub use context::{ObjectId, RenderContext};
pub use engine::{EngineId, ObjectHandle, RenderEngine, RenderInstance, RenderWorld};
pub use object::{MeshObject, RenderObject};
pub use surface::{Surface, SurfaceId};
pub use uniform::UniformValue;
