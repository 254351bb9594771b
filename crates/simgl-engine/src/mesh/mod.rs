//! Indexed 2-D meshes.

mod topology;

pub use topology::Topology;

use crate::data::SharedData;
use crate::error::{RenderError, Result};

/// Highest vertex count addressable by 16-bit indices.
pub const MAX_INDEXED_VERTICES: usize = u16::MAX as usize + 1;

/// Flat vertex data plus a 16-bit index buffer.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: SharedData<f32>,
    indices: SharedData<u16>,
    topology: Topology,
    primitive_count: usize,
}

impl Mesh {
    /// Fails if `indices` do not assemble into whole primitives of `topology`.
    pub fn new(
        vertices: impl Into<SharedData<f32>>,
        indices: impl Into<SharedData<u16>>,
        topology: Topology,
    ) -> Result<Self> {
        let indices = indices.into();
        let primitive_count = topology.primitive_count(indices.len())?;
        Ok(Self { vertices: vertices.into(), indices, topology, primitive_count })
    }

    /// Triangle mesh over 2-component vertices, indexed by
    /// [`generate_trivial_index`].
    pub fn with_trivial_index(vertices: impl Into<SharedData<f32>>) -> Result<Self> {
        let vertices = vertices.into();
        let indices = generate_trivial_index(&vertices)?;
        Self::new(vertices, indices, Topology::Triangles)
    }

    #[inline]
    pub fn vertices(&self) -> &SharedData<f32> {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &SharedData<u16> {
        &self.indices
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.primitive_count
    }
}

/// Fan triangulation `[0, k, k + 1]` of a flat `x, y` vertex list.
///
/// Stand-in generator: correct for convex outlines only, not a general
/// triangulator.
pub fn generate_trivial_index(vertices: &[f32]) -> Result<Vec<u16>> {
    if vertices.len() % 2 != 0 {
        return Err(RenderError::MalformedVertices(format!(
            "{} floats is not a whole number of 2-component vertices",
            vertices.len()
        )));
    }
    let count = vertices.len() / 2;
    if count < 3 {
        return Err(RenderError::MalformedVertices(format!(
            "a fan needs at least 3 vertices, got {count}"
        )));
    }
    if count > MAX_INDEXED_VERTICES {
        return Err(RenderError::MalformedVertices(format!(
            "{count} vertices exceed the 16-bit index range"
        )));
    }

    // count <= 65536, so every k + 1 below fits in u16
    let mut indices = Vec::with_capacity(3 * (count - 2));
    for k in 1..count - 1 {
        indices.extend_from_slice(&[0, k as u16, (k + 1) as u16]);
    }
    Ok(indices)
}
