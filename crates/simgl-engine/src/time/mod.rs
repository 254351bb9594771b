//! Frame pacing.
//!
//! The engine has no scheduler of its own; the application drives
//! `RenderEngine::render` from a `FrameTicker`.

mod ticker;

pub use ticker::{FrameTicker, FrameTime, DEFAULT_FRAME_INTERVAL};
