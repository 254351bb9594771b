use super::Vec2;

/// Region of a surface an instance draws into, in surface pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub position: Vec2,
    pub size: Vec2,
}

impl Viewport {
    #[inline]
    pub const fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    /// Viewport covering a whole `width` × `height` surface.
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(Vec2::zero(), Vec2::new(width as f32, height as f32))
    }
}
