//! 2-D math used to drive shader uniforms.
//!
//! World space is +X right, +Y up, in arbitrary units. Matrices are
//! row-major `[f32; 16]` and uploaded with transpose.

mod mat4;
mod transform;
mod vec2;
mod viewport;

pub use mat4::{model_matrix, projection_matrix, view_matrix, Mat4};
pub use transform::Transform2D;
pub use vec2::Vec2;
pub use viewport::Viewport;
