use core::ops::Mul;

use bytemuck::{Pod, Zeroable};

use super::Transform2D;

/// Row-major 4×4 matrix.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4([f32; 16]);

impl Mat4 {
    pub const ZERO: Self = Self([0.0; 16]);

    #[rustfmt::skip]
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]);

    #[inline]
    pub const fn from_rows(m: [f32; 16]) -> Self {
        Self(m)
    }

    #[inline]
    pub fn as_array(&self) -> &[f32; 16] {
        &self.0
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.0[row * 4 + col]
    }

    pub fn translation(x: f32, y: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[3] = x;
        m.0[7] = y;
        m
    }

    pub fn scale(x: f32, y: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[0] = x;
        m.0[5] = y;
        m
    }

    /// Counter-clockwise rotation about Z.
    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut m = Self::IDENTITY;
        m.0[0] = c;
        m.0[1] = -s;
        m.0[4] = s;
        m.0[5] = c;
        m
    }

    /// Applies the matrix to the point `(x, y, 0, 1)`.
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let m = &self.0;
        (m[0] * x + m[1] * y + m[3], m[4] * x + m[5] * y + m[7])
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = (0..4).map(|k| self.at(row, k) * rhs.at(k, col)).sum();
            }
        }
        Mat4(out)
    }
}

/// Object to world: scale, then rotate, then translate.
pub fn model_matrix(t: &Transform2D) -> Mat4 {
    Mat4::translation(t.position.x, t.position.y)
        * Mat4::rotation_z(t.rotation)
        * Mat4::scale(t.scale.x, t.scale.y)
}

/// World to camera: the inverse of the camera's model matrix.
pub fn view_matrix(camera: &Transform2D) -> Mat4 {
    let sx = if camera.scale.x != 0.0 { 1.0 / camera.scale.x } else { 0.0 };
    let sy = if camera.scale.y != 0.0 { 1.0 / camera.scale.y } else { 0.0 };
    Mat4::scale(sx, sy)
        * Mat4::rotation_z(-camera.rotation)
        * Mat4::translation(-camera.position.x, -camera.position.y)
}

/// Camera to clip: a `width` × `height` region centred on the camera fills
/// the clip square.
pub fn projection_matrix(width: f32, height: f32) -> Mat4 {
    Mat4::scale(2.0 / width, 2.0 / height)
}
