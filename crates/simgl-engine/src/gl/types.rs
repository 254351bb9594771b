//! Type registry: byte layout of every GPU type that introspection can report.
//!
//! The table is a `static` built at compile time and never mutated, so lookups
//! are free to call from anywhere.

use std::fmt;

use super::consts as c;
use crate::error::{RenderError, Result};

/// How a value of a type is spread over fixed-width vertex attribute slots.
///
/// A `mat4` occupies 4 consecutive slots of 4 floats (16 bytes) each.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Decomposition {
    /// Number of attribute slots one value consumes.
    pub iteration: u32,
    /// Scalar components per slot.
    pub components: u32,
    /// Bytes per slot.
    pub slot_size: u32,
}

/// Backing numeric array kind of a GPU type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    F32,
    I32,
    U32,
}

/// Static layout information for one GPU type.
#[derive(Debug, PartialEq, Eq)]
pub struct GlTypeInfo {
    pub ty: GlType,
    /// Total size of one value in bytes. Zero for opaque types.
    pub byte_size: u32,
    /// Scalar type handed to `vertexAttribPointer`. Zero for opaque types.
    pub base_type: u32,
    /// `None` for opaque (sampler) types.
    pub array_kind: Option<ArrayKind>,
    pub decomposition: Decomposition,
}

impl GlTypeInfo {
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.array_kind.is_none()
    }

    /// Number of 4-byte scalars in one value.
    #[inline]
    pub fn scalar_count(&self) -> usize {
        (self.byte_size / 4) as usize
    }
}

/// GPU type tag as reported by shader introspection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GlType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    UnsignedInt,
    UnsignedIntVec2,
    UnsignedIntVec3,
    UnsignedIntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2d,
    SamplerCube,
    Sampler3d,
    Sampler2dArray,
    Sampler2dShadow,
    SamplerCubeShadow,
    Sampler2dArrayShadow,
}

const fn entry(
    ty: GlType,
    byte_size: u32,
    base_type: u32,
    array_kind: Option<ArrayKind>,
    iteration: u32,
    components: u32,
    slot_size: u32,
) -> GlTypeInfo {
    GlTypeInfo {
        ty,
        byte_size,
        base_type,
        array_kind,
        decomposition: Decomposition { iteration, components, slot_size },
    }
}

const fn opaque(ty: GlType) -> GlTypeInfo {
    entry(ty, 0, 0, None, 0, 0, 0)
}

use ArrayKind::{F32, I32, U32};

// Indexed by `GlType as usize`; keep in declaration order.
static REGISTRY: [GlTypeInfo; 26] = [
    entry(GlType::Float, 4, c::FLOAT, Some(F32), 1, 1, 4),
    entry(GlType::FloatVec2, 8, c::FLOAT, Some(F32), 1, 2, 8),
    entry(GlType::FloatVec3, 12, c::FLOAT, Some(F32), 1, 3, 12),
    entry(GlType::FloatVec4, 16, c::FLOAT, Some(F32), 1, 4, 16),
    entry(GlType::Int, 4, c::INT, Some(I32), 1, 1, 4),
    entry(GlType::IntVec2, 8, c::INT, Some(I32), 1, 2, 8),
    entry(GlType::IntVec3, 12, c::INT, Some(I32), 1, 3, 12),
    entry(GlType::IntVec4, 16, c::INT, Some(I32), 1, 4, 16),
    entry(GlType::UnsignedInt, 4, c::UNSIGNED_INT, Some(U32), 1, 1, 4),
    entry(GlType::UnsignedIntVec2, 8, c::UNSIGNED_INT, Some(U32), 1, 2, 8),
    entry(GlType::UnsignedIntVec3, 12, c::UNSIGNED_INT, Some(U32), 1, 3, 12),
    entry(GlType::UnsignedIntVec4, 16, c::UNSIGNED_INT, Some(U32), 1, 4, 16),
    entry(GlType::Bool, 4, c::INT, Some(I32), 1, 1, 4),
    entry(GlType::BoolVec2, 8, c::INT, Some(I32), 1, 2, 8),
    entry(GlType::BoolVec3, 12, c::INT, Some(I32), 1, 3, 12),
    entry(GlType::BoolVec4, 16, c::INT, Some(I32), 1, 4, 16),
    entry(GlType::FloatMat2, 16, c::FLOAT, Some(F32), 2, 2, 8),
    entry(GlType::FloatMat3, 36, c::FLOAT, Some(F32), 3, 3, 12),
    entry(GlType::FloatMat4, 64, c::FLOAT, Some(F32), 4, 4, 16),
    opaque(GlType::Sampler2d),
    opaque(GlType::SamplerCube),
    opaque(GlType::Sampler3d),
    opaque(GlType::Sampler2dArray),
    opaque(GlType::Sampler2dShadow),
    opaque(GlType::SamplerCubeShadow),
    opaque(GlType::Sampler2dArrayShadow),
];

impl GlType {
    /// Maps a raw GL enum to its registered type.
    pub fn from_raw(raw: u32) -> Result<Self> {
        let ty = match raw {
            c::FLOAT => Self::Float,
            c::FLOAT_VEC2 => Self::FloatVec2,
            c::FLOAT_VEC3 => Self::FloatVec3,
            c::FLOAT_VEC4 => Self::FloatVec4,
            c::INT => Self::Int,
            c::INT_VEC2 => Self::IntVec2,
            c::INT_VEC3 => Self::IntVec3,
            c::INT_VEC4 => Self::IntVec4,
            c::UNSIGNED_INT => Self::UnsignedInt,
            c::UNSIGNED_INT_VEC2 => Self::UnsignedIntVec2,
            c::UNSIGNED_INT_VEC3 => Self::UnsignedIntVec3,
            c::UNSIGNED_INT_VEC4 => Self::UnsignedIntVec4,
            c::BOOL => Self::Bool,
            c::BOOL_VEC2 => Self::BoolVec2,
            c::BOOL_VEC3 => Self::BoolVec3,
            c::BOOL_VEC4 => Self::BoolVec4,
            c::FLOAT_MAT2 => Self::FloatMat2,
            c::FLOAT_MAT3 => Self::FloatMat3,
            c::FLOAT_MAT4 => Self::FloatMat4,
            c::SAMPLER_2D => Self::Sampler2d,
            c::SAMPLER_CUBE => Self::SamplerCube,
            c::SAMPLER_3D => Self::Sampler3d,
            c::SAMPLER_2D_ARRAY => Self::Sampler2dArray,
            c::SAMPLER_2D_SHADOW => Self::Sampler2dShadow,
            c::SAMPLER_CUBE_SHADOW => Self::SamplerCubeShadow,
            c::SAMPLER_2D_ARRAY_SHADOW => Self::Sampler2dArrayShadow,
            other => return Err(RenderError::UnknownType(other)),
        };
        Ok(ty)
    }

    pub const fn raw(self) -> u32 {
        match self {
            Self::Float => c::FLOAT,
            Self::FloatVec2 => c::FLOAT_VEC2,
            Self::FloatVec3 => c::FLOAT_VEC3,
            Self::FloatVec4 => c::FLOAT_VEC4,
            Self::Int => c::INT,
            Self::IntVec2 => c::INT_VEC2,
            Self::IntVec3 => c::INT_VEC3,
            Self::IntVec4 => c::INT_VEC4,
            Self::UnsignedInt => c::UNSIGNED_INT,
            Self::UnsignedIntVec2 => c::UNSIGNED_INT_VEC2,
            Self::UnsignedIntVec3 => c::UNSIGNED_INT_VEC3,
            Self::UnsignedIntVec4 => c::UNSIGNED_INT_VEC4,
            Self::Bool => c::BOOL,
            Self::BoolVec2 => c::BOOL_VEC2,
            Self::BoolVec3 => c::BOOL_VEC3,
            Self::BoolVec4 => c::BOOL_VEC4,
            Self::FloatMat2 => c::FLOAT_MAT2,
            Self::FloatMat3 => c::FLOAT_MAT3,
            Self::FloatMat4 => c::FLOAT_MAT4,
            Self::Sampler2d => c::SAMPLER_2D,
            Self::SamplerCube => c::SAMPLER_CUBE,
            Self::Sampler3d => c::SAMPLER_3D,
            Self::Sampler2dArray => c::SAMPLER_2D_ARRAY,
            Self::Sampler2dShadow => c::SAMPLER_2D_SHADOW,
            Self::SamplerCubeShadow => c::SAMPLER_CUBE_SHADOW,
            Self::Sampler2dArrayShadow => c::SAMPLER_2D_ARRAY_SHADOW,
        }
    }

    #[inline]
    pub fn info(self) -> &'static GlTypeInfo {
        &REGISTRY[self as usize]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "FLOAT",
            Self::FloatVec2 => "FLOAT_VEC2",
            Self::FloatVec3 => "FLOAT_VEC3",
            Self::FloatVec4 => "FLOAT_VEC4",
            Self::Int => "INT",
            Self::IntVec2 => "INT_VEC2",
            Self::IntVec3 => "INT_VEC3",
            Self::IntVec4 => "INT_VEC4",
            Self::UnsignedInt => "UNSIGNED_INT",
            Self::UnsignedIntVec2 => "UNSIGNED_INT_VEC2",
            Self::UnsignedIntVec3 => "UNSIGNED_INT_VEC3",
            Self::UnsignedIntVec4 => "UNSIGNED_INT_VEC4",
            Self::Bool => "BOOL",
            Self::BoolVec2 => "BOOL_VEC2",
            Self::BoolVec3 => "BOOL_VEC3",
            Self::BoolVec4 => "BOOL_VEC4",
            Self::FloatMat2 => "FLOAT_MAT2",
            Self::FloatMat3 => "FLOAT_MAT3",
            Self::FloatMat4 => "FLOAT_MAT4",
            Self::Sampler2d => "SAMPLER_2D",
            Self::SamplerCube => "SAMPLER_CUBE",
            Self::Sampler3d => "SAMPLER_3D",
            Self::Sampler2dArray => "SAMPLER_2D_ARRAY",
            Self::Sampler2dShadow => "SAMPLER_2D_SHADOW",
            Self::SamplerCubeShadow => "SAMPLER_CUBE_SHADOW",
            Self::Sampler2dArrayShadow => "SAMPLER_2D_ARRAY_SHADOW",
        }
    }

    /// Application-level value type for this GPU type.
    pub fn semantic(self) -> Result<SemanticType> {
        SemanticType::ALL
            .iter()
            .copied()
            .find(|s| s.gl_type() == self)
            .ok_or(RenderError::UnsupportedSemanticType(self))
    }
}

impl fmt::Display for GlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registered info for a raw GL type enum.
pub fn lookup(raw: u32) -> Result<&'static GlTypeInfo> {
    GlType::from_raw(raw).map(GlType::info)
}

/// Application-level value types a binding can be declared with.
///
/// Closed set: each variant carries its GPU mapping statically, so there is
/// no runtime inspection of values to pick a GPU type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    UInt,
    UVec2,
    UVec3,
    UVec4,
    Bool,
    BVec2,
    BVec3,
    BVec4,
    Mat2,
    Mat3,
    Mat4,
}

impl SemanticType {
    pub const ALL: [SemanticType; 19] = [
        Self::Scalar,
        Self::Vec2,
        Self::Vec3,
        Self::Vec4,
        Self::Int,
        Self::IVec2,
        Self::IVec3,
        Self::IVec4,
        Self::UInt,
        Self::UVec2,
        Self::UVec3,
        Self::UVec4,
        Self::Bool,
        Self::BVec2,
        Self::BVec3,
        Self::BVec4,
        Self::Mat2,
        Self::Mat3,
        Self::Mat4,
    ];

    pub const fn gl_type(self) -> GlType {
        match self {
            Self::Scalar => GlType::Float,
            Self::Vec2 => GlType::FloatVec2,
            Self::Vec3 => GlType::FloatVec3,
            Self::Vec4 => GlType::FloatVec4,
            Self::Int => GlType::Int,
            Self::IVec2 => GlType::IntVec2,
            Self::IVec3 => GlType::IntVec3,
            Self::IVec4 => GlType::IntVec4,
            Self::UInt => GlType::UnsignedInt,
            Self::UVec2 => GlType::UnsignedIntVec2,
            Self::UVec3 => GlType::UnsignedIntVec3,
            Self::UVec4 => GlType::UnsignedIntVec4,
            Self::Bool => GlType::Bool,
            Self::BVec2 => GlType::BoolVec2,
            Self::BVec3 => GlType::BoolVec3,
            Self::BVec4 => GlType::BoolVec4,
            Self::Mat2 => GlType::FloatMat2,
            Self::Mat3 => GlType::FloatMat3,
            Self::Mat4 => GlType::FloatMat4,
        }
    }

    #[inline]
    pub fn info(self) -> &'static GlTypeInfo {
        self.gl_type().info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── registry ──────────────────────────────────────────────────────────

    #[test]
    fn registry_is_indexed_by_declaration_order() {
        for (i, info) in REGISTRY.iter().enumerate() {
            assert_eq!(info.ty as usize, i, "{} is out of place", info.ty);
        }
    }

    #[test]
    fn decomposition_covers_byte_size() {
        for info in REGISTRY.iter().filter(|i| !i.is_opaque()) {
            let d = info.decomposition;
            assert_eq!(d.iteration * d.slot_size, info.byte_size, "{}", info.ty);
            assert_eq!(d.components * 4, d.slot_size, "{}", info.ty);
        }
    }

    #[test]
    fn raw_values_round_trip() {
        for info in REGISTRY.iter() {
            assert_eq!(GlType::from_raw(info.ty.raw()).unwrap(), info.ty);
        }
    }

    #[test]
    fn lookup_mat4() {
        let info = lookup(c::FLOAT_MAT4).unwrap();
        assert_eq!(info.byte_size, 64);
        assert_eq!(info.base_type, c::FLOAT);
        assert_eq!(info.array_kind, Some(ArrayKind::F32));
        assert_eq!(
            info.decomposition,
            Decomposition { iteration: 4, components: 4, slot_size: 16 }
        );
    }

    #[test]
    fn lookup_unknown_type_fails() {
        assert_eq!(lookup(0xDEAD), Err(RenderError::UnknownType(0xDEAD)));
    }

    #[test]
    fn samplers_are_opaque() {
        let info = lookup(c::SAMPLER_2D).unwrap();
        assert!(info.is_opaque());
        assert_eq!(info.byte_size, 0);
    }

    // ── semantic mapping ──────────────────────────────────────────────────

    #[test]
    fn semantic_types_map_to_their_gpu_type() {
        assert_eq!(SemanticType::Vec2.info().ty, GlType::FloatVec2);
        assert_eq!(SemanticType::Mat4.info().ty, GlType::FloatMat4);
        for s in SemanticType::ALL {
            assert_eq!(s.gl_type().semantic().unwrap(), s);
        }
    }

    #[test]
    fn sampler_has_no_semantic_type() {
        assert_eq!(
            GlType::SamplerCube.semantic(),
            Err(RenderError::UnsupportedSemanticType(GlType::SamplerCube))
        );
    }
}
