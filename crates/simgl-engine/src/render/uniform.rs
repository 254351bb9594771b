use crate::coords::Mat4;
use crate::gl::{SemanticType, UniformData};

/// A typed uniform value, one variant per [`SemanticType`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    UInt(u32),
    UVec2([u32; 2]),
    UVec3([u32; 3]),
    UVec4([u32; 4]),
    Bool(bool),
    BVec2([bool; 2]),
    BVec3([bool; 3]),
    BVec4([bool; 4]),
    /// Row-major.
    Mat2([f32; 4]),
    /// Row-major.
    Mat3([f32; 9]),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Scalar(_) => SemanticType::Scalar,
            Self::Vec2(_) => SemanticType::Vec2,
            Self::Vec3(_) => SemanticType::Vec3,
            Self::Vec4(_) => SemanticType::Vec4,
            Self::Int(_) => SemanticType::Int,
            Self::IVec2(_) => SemanticType::IVec2,
            Self::IVec3(_) => SemanticType::IVec3,
            Self::IVec4(_) => SemanticType::IVec4,
            Self::UInt(_) => SemanticType::UInt,
            Self::UVec2(_) => SemanticType::UVec2,
            Self::UVec3(_) => SemanticType::UVec3,
            Self::UVec4(_) => SemanticType::UVec4,
            Self::Bool(_) => SemanticType::Bool,
            Self::BVec2(_) => SemanticType::BVec2,
            Self::BVec3(_) => SemanticType::BVec3,
            Self::BVec4(_) => SemanticType::BVec4,
            Self::Mat2(_) => SemanticType::Mat2,
            Self::Mat3(_) => SemanticType::Mat3,
            Self::Mat4(_) => SemanticType::Mat4,
        }
    }

    /// All-zero value of `ty`.
    pub fn zero(ty: SemanticType) -> Self {
        match ty {
            SemanticType::Scalar => Self::Scalar(0.0),
            SemanticType::Vec2 => Self::Vec2([0.0; 2]),
            SemanticType::Vec3 => Self::Vec3([0.0; 3]),
            SemanticType::Vec4 => Self::Vec4([0.0; 4]),
            SemanticType::Int => Self::Int(0),
            SemanticType::IVec2 => Self::IVec2([0; 2]),
            SemanticType::IVec3 => Self::IVec3([0; 3]),
            SemanticType::IVec4 => Self::IVec4([0; 4]),
            SemanticType::UInt => Self::UInt(0),
            SemanticType::UVec2 => Self::UVec2([0; 2]),
            SemanticType::UVec3 => Self::UVec3([0; 3]),
            SemanticType::UVec4 => Self::UVec4([0; 4]),
            SemanticType::Bool => Self::Bool(false),
            SemanticType::BVec2 => Self::BVec2([false; 2]),
            SemanticType::BVec3 => Self::BVec3([false; 3]),
            SemanticType::BVec4 => Self::BVec4([false; 4]),
            SemanticType::Mat2 => Self::Mat2([0.0; 4]),
            SemanticType::Mat3 => Self::Mat3([0.0; 9]),
            SemanticType::Mat4 => Self::Mat4(Mat4::ZERO),
        }
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Mat4(m)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Scalar(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        Self::Vec2(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4(v)
    }
}

/// Flattened uniform array, ready for one `uniform*v` call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UniformBuffer {
    F32(Vec<f32>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl UniformBuffer {
    /// Flattens `values`, which must all share one semantic type.
    pub(crate) fn flatten(values: &[UniformValue]) -> Self {
        let mut f = Vec::new();
        let mut i = Vec::new();
        let mut u = Vec::new();
        for v in values {
            match v {
                UniformValue::Scalar(x) => f.push(*x),
                UniformValue::Vec2(x) => f.extend_from_slice(x),
                UniformValue::Vec3(x) => f.extend_from_slice(x),
                UniformValue::Vec4(x) => f.extend_from_slice(x),
                UniformValue::Mat2(x) => f.extend_from_slice(x),
                UniformValue::Mat3(x) => f.extend_from_slice(x),
                UniformValue::Mat4(m) => f.extend_from_slice(m.as_array()),
                UniformValue::Int(x) => i.push(*x),
                UniformValue::IVec2(x) => i.extend_from_slice(x),
                UniformValue::IVec3(x) => i.extend_from_slice(x),
                UniformValue::IVec4(x) => i.extend_from_slice(x),
                UniformValue::Bool(x) => i.push(*x as i32),
                UniformValue::BVec2(x) => i.extend(x.iter().map(|b| *b as i32)),
                UniformValue::BVec3(x) => i.extend(x.iter().map(|b| *b as i32)),
                UniformValue::BVec4(x) => i.extend(x.iter().map(|b| *b as i32)),
                UniformValue::UInt(x) => u.push(*x),
                UniformValue::UVec2(x) => u.extend_from_slice(x),
                UniformValue::UVec3(x) => u.extend_from_slice(x),
                UniformValue::UVec4(x) => u.extend_from_slice(x),
            }
        }
        if !i.is_empty() {
            Self::I32(i)
        } else if !u.is_empty() {
            Self::U32(u)
        } else {
            Self::F32(f)
        }
    }

    pub(crate) fn as_data(&self) -> UniformData<'_> {
        match self {
            Self::F32(v) => UniformData::F32(v),
            Self::I32(v) => UniformData::I32(v),
            Self::U32(v) => UniformData::U32(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_matches_requested_type() {
        for ty in SemanticType::ALL {
            assert_eq!(UniformValue::zero(ty).semantic_type(), ty);
        }
    }

    #[test]
    fn bools_flatten_to_ints() {
        let buf = UniformBuffer::flatten(&[UniformValue::BVec2([true, false])]);
        assert_eq!(buf, UniformBuffer::I32(vec![1, 0]));
    }

    #[test]
    fn arrays_flatten_in_order() {
        let buf = UniformBuffer::flatten(&[UniformValue::Vec2([1.0, 2.0]), UniformValue::Vec2([3.0, 4.0])]);
        assert_eq!(buf, UniformBuffer::F32(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn matrix_flattens_row_major() {
        let buf = UniformBuffer::flatten(&[Mat4::translation(5.0, 6.0).into()]);
        let UniformBuffer::F32(v) = buf else { panic!("expected floats") };
        assert_eq!(v.len(), 16);
        assert_eq!((v[3], v[7]), (5.0, 6.0));
    }
}
