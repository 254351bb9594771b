use super::Vec2;

/// Position, rotation (radians, counter-clockwise) and scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Transform2D {
    pub const IDENTITY: Self = Self { position: Vec2::zero(), rotation: 0.0, scale: Vec2::one() };

    #[inline]
    pub const fn new(position: Vec2, rotation: f32, scale: Vec2) -> Self {
        Self { position, rotation, scale }
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
