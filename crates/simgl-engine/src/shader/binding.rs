//! Matching caller-declared bindings against introspected shader inputs.

use std::num::NonZeroU32;

use log::warn;
use rustc_hash::FxHashMap;

use crate::error::{RenderError, Result};
use crate::gl::{GlTypeInfo, SemanticType};

/// One active shader input discovered by introspection.
#[derive(Debug, Clone)]
pub struct BindingDescription<L> {
    pub name: String,
    pub location: L,
    pub info: &'static GlTypeInfo,
    /// Declared array length, 1 for non-arrays.
    pub array_length: u32,
}

/// Every active input of a linked program, by namespace.
///
/// Vertex and instance attributes share `attributes`; uniforms live in their
/// own namespace. `U` is the backend's uniform location type.
#[derive(Debug, Clone)]
pub struct BindingDescriptions<U> {
    pub attributes: FxHashMap<String, BindingDescription<u32>>,
    pub uniforms: FxHashMap<String, BindingDescription<U>>,
}

impl<U> Default for BindingDescriptions<U> {
    fn default() -> Self {
        Self { attributes: FxHashMap::default(), uniforms: FxHashMap::default() }
    }
}

/// Category-specific parameters of a [`BindingRequirement`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BindingKind {
    /// Per-vertex attribute read from the mesh vertex buffer. A zero stride
    /// means tightly packed.
    Vertex { stride: u32, offset: u32 },
    /// Per-instance attribute, advanced every `divisor` instances.
    Instance { divisor: NonZeroU32 },
    Uniform,
}

/// A binding a render object wants to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRequirement {
    pub name: String,
    pub semantic: SemanticType,
    pub array_length: u32,
    pub kind: BindingKind,
}

impl BindingRequirement {
    pub fn vertex(name: impl Into<String>, semantic: SemanticType, stride: u32, offset: u32) -> Self {
        Self::with_kind(name, semantic, BindingKind::Vertex { stride, offset })
    }

    pub fn instance(name: impl Into<String>, semantic: SemanticType, divisor: NonZeroU32) -> Self {
        Self::with_kind(name, semantic, BindingKind::Instance { divisor })
    }

    pub fn uniform(name: impl Into<String>, semantic: SemanticType) -> Self {
        Self::with_kind(name, semantic, BindingKind::Uniform)
    }

    pub fn with_array_length(mut self, array_length: u32) -> Self {
        self.array_length = array_length.max(1);
        self
    }

    fn with_kind(name: impl Into<String>, semantic: SemanticType, kind: BindingKind) -> Self {
        Self { name: name.into(), semantic, array_length: 1, kind }
    }

    #[inline]
    pub fn is_attribute(&self) -> bool {
        !matches!(self.kind, BindingKind::Uniform)
    }
}

/// Where a resolved binding lives on the GPU.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLocation<U> {
    Attribute(u32),
    Uniform(U),
}

/// Link state: no GPU object attached yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Unlinked;

/// Link state: attached to `H` (a buffer for attributes, a value slot for
/// uniforms).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Linked<H>(H);

/// A requirement paired with the shader input it matched.
///
/// `link` consumes an unlinked binding, so a binding can only ever be linked
/// once.
#[derive(Debug, Clone)]
pub struct ResolvedBinding<U, S = Unlinked> {
    pub requirement: BindingRequirement,
    pub location: ResolvedLocation<U>,
    pub info: &'static GlTypeInfo,
    /// Array length declared by the shader; used for layout.
    pub array_length: u32,
    state: S,
}

impl<U> ResolvedBinding<U, Unlinked> {
    pub fn link<H>(self, handle: H) -> ResolvedBinding<U, Linked<H>> {
        ResolvedBinding {
            requirement: self.requirement,
            location: self.location,
            info: self.info,
            array_length: self.array_length,
            state: Linked(handle),
        }
    }
}

impl<U, H> ResolvedBinding<U, Linked<H>> {
    #[inline]
    pub fn handle(&self) -> &H {
        &self.state.0
    }
}

/// One `vertexAttribPointer` worth of layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    pub location: u32,
    pub components: i32,
    pub data_type: u32,
    pub stride: i32,
    pub offset: i32,
    /// 0 for per-vertex data.
    pub divisor: u32,
}

impl<U, S> ResolvedBinding<U, S> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.requirement.name
    }

    /// Attribute slots this binding occupies; empty for uniforms.
    ///
    /// A value spans `decomposition.iteration` consecutive locations, and an
    /// array repeats that block `array_length` times. Byte offsets advance by
    /// the slot size within one value and by the full value size between
    /// array elements.
    pub fn attribute_slots(&self) -> Vec<AttributeSlot> {
        let ResolvedLocation::Attribute(base) = self.location else {
            return Vec::new();
        };
        let d = self.info.decomposition;
        let packed = self.info.byte_size * self.array_length;
        let (stride, base_offset, divisor) = match self.requirement.kind {
            BindingKind::Vertex { stride, offset } => {
                (if stride == 0 { packed } else { stride }, offset, 0)
            }
            BindingKind::Instance { divisor } => (packed, 0, divisor.get()),
            BindingKind::Uniform => return Vec::new(),
        };

        let mut slots = Vec::with_capacity((self.array_length * d.iteration) as usize);
        for element in 0..self.array_length {
            for i in 0..d.iteration {
                slots.push(AttributeSlot {
                    location: base + element * d.iteration + i,
                    components: d.components as i32,
                    data_type: self.info.base_type,
                    stride: stride as i32,
                    offset: (base_offset + element * self.info.byte_size + i * d.slot_size) as i32,
                    divisor,
                });
            }
        }
        slots
    }
}

/// Resolves every requirement against `descriptions`, in input order.
pub fn reconcile<U: Clone>(
    descriptions: &BindingDescriptions<U>,
    requirements: &[BindingRequirement],
) -> Result<Vec<ResolvedBinding<U>>> {
    requirements
        .iter()
        .map(|req| {
            let (location, info, array_length) = if req.is_attribute() {
                let d = descriptions
                    .attributes
                    .get(&req.name)
                    .ok_or_else(|| RenderError::BindingNotFound { name: req.name.clone() })?;
                (ResolvedLocation::Attribute(d.location), d.info, d.array_length)
            } else {
                let d = descriptions
                    .uniforms
                    .get(&req.name)
                    .ok_or_else(|| RenderError::BindingNotFound { name: req.name.clone() })?;
                (ResolvedLocation::Uniform(d.location.clone()), d.info, d.array_length)
            };

            let expected = req.semantic.gl_type();
            if expected != info.ty {
                return Err(RenderError::BindingTypeMismatch {
                    name: req.name.clone(),
                    expected,
                    actual: info.ty,
                });
            }
            if req.array_length != array_length {
                warn!(
                    "binding `{}` requested with array length {} but the shader declares {}",
                    req.name, req.array_length, array_length
                );
            }

            Ok(ResolvedBinding {
                requirement: req.clone(),
                location,
                info,
                array_length,
                state: Unlinked,
            })
        })
        .collect()
}
