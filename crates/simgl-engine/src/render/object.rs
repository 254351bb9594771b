use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;

use super::cache::ResourceCache;
use super::uniform::{UniformBuffer, UniformValue};
use crate::data::{DataId, SharedData};
use crate::error::{RenderError, Result};
use crate::gl::{consts, BufferTarget, Gl};
use crate::mesh::Mesh;
use crate::shader::{
    reconcile, BindingKind, BindingRequirement, Linked, ResolvedBinding, ResolvedLocation, Shader,
};

/// Something a render context can load and draw.
///
/// Lifecycle is `Unloaded → Loaded`: `load` runs at most once, `render`
/// requires a completed `load`.
pub trait RenderObject<G: Gl> {
    fn label(&self) -> &str;

    fn requirements(&self) -> &[BindingRequirement];

    fn is_loaded(&self) -> bool;

    /// Resolves bindings against `shader` and creates GPU state through
    /// `cache`.
    fn load(&mut self, cache: &mut ResourceCache<G>, shader: &Shader<G>) -> Result<()>;

    /// Writes uniforms and issues the draw. The program must be bound.
    fn render(&self, gl: &G) -> Result<()>;

    /// Sets element `index` of a uniform array.
    fn set_uniform_at(&mut self, name: &str, index: usize, value: UniformValue) -> Result<()>;

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<()> {
        self.set_uniform_at(name, 0, value)
    }

    /// Deletes the object's own GPU state and gives back the cached
    /// buffers it took in `load`.
    fn release(&mut self, cache: &mut ResourceCache<G>);
}

struct UniformState {
    requirement: BindingRequirement,
    values: Vec<UniformValue>,
}

struct GpuState<G: Gl> {
    vao: G::VertexArray,
    attributes: Vec<ResolvedBinding<G::UniformLocation, Linked<G::Buffer>>>,
    uniforms: Vec<ResolvedBinding<G::UniformLocation, Linked<usize>>>,
    buffers: Vec<(BufferTarget, DataId)>,
}

enum LoadState<G: Gl> {
    Unloaded,
    Loaded(GpuState<G>),
}

/// A mesh drawn with one indexed (optionally instanced) draw call.
pub struct MeshObject<G: Gl> {
    label: String,
    mesh: Mesh,
    requirements: Vec<BindingRequirement>,
    uniforms: Vec<UniformState>,
    instance_data: FxHashMap<String, SharedData<f32>>,
    instance_count: u32,
    state: LoadState<G>,
}

impl<G: Gl> MeshObject<G> {
    pub fn new(label: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            label: label.into(),
            mesh,
            requirements: Vec::new(),
            uniforms: Vec::new(),
            instance_data: FxHashMap::default(),
            instance_count: 1,
            state: LoadState::Unloaded,
        }
    }

    /// Adds a binding. Uniform values start zeroed.
    pub fn with_binding(mut self, requirement: BindingRequirement) -> Self {
        if let BindingKind::Uniform = requirement.kind {
            let zero = UniformValue::zero(requirement.semantic);
            self.uniforms.push(UniformState {
                values: vec![zero; requirement.array_length as usize],
                requirement: requirement.clone(),
            });
        }
        self.requirements.push(requirement);
        self
    }

    /// Per-instance data for the instance attribute `name`.
    pub fn with_instance_data(mut self, name: impl Into<String>, data: impl Into<SharedData<f32>>) -> Self {
        self.instance_data.insert(name.into(), data.into());
        self
    }

    /// Instance count of the instanced draw. Ignored without instance
    /// bindings.
    pub fn with_instance_count(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[inline]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn uniform(&self, name: &str) -> Option<&[UniformValue]> {
        self.uniforms
            .iter()
            .find(|u| u.requirement.name == name)
            .map(|u| u.values.as_slice())
    }

    fn is_instanced(&self) -> bool {
        self.requirements
            .iter()
            .any(|r| matches!(r.kind, BindingKind::Instance { .. }))
    }

    fn build_gpu_state(
        &mut self,
        cache: &mut ResourceCache<G>,
        shader: &Shader<G>,
        vao: G::VertexArray,
        buffers: &mut Vec<(BufferTarget, DataId)>,
    ) -> Result<GpuState<G>> {
        let resolved = reconcile(shader.descriptions(), &self.requirements)?;
        let gl = cache.gl_rc();

        let mut attributes = Vec::new();
        let mut uniforms = Vec::new();
        for binding in resolved {
            let data = match binding.requirement.kind {
                BindingKind::Uniform => {
                    let index = self
                        .uniforms
                        .iter()
                        .position(|u| u.requirement.name == binding.requirement.name)
                        .ok_or_else(|| RenderError::UnknownUniform { name: binding.name().to_string() })?;
                    let state = &mut self.uniforms[index];
                    let zero = UniformValue::zero(state.requirement.semantic);
                    state.values.resize(binding.array_length.max(1) as usize, zero);
                    uniforms.push(binding.link(index));
                    continue;
                }
                BindingKind::Vertex { .. } => self.mesh.vertices(),
                BindingKind::Instance { .. } => self
                    .instance_data
                    .get(binding.name())
                    .ok_or_else(|| RenderError::MissingInstanceData { name: binding.name().to_string() })?,
            };

            let buffer = cache.get_or_create_buffer(BufferTarget::Array, data)?;
            buffers.push((BufferTarget::Array, data.id()));
            for slot in binding.attribute_slots() {
                gl.vertex_attrib_pointer(slot.location, slot.components, slot.data_type, slot.stride, slot.offset);
                gl.enable_vertex_attrib_array(slot.location);
                gl.vertex_attrib_divisor(slot.location, slot.divisor);
            }
            attributes.push(binding.link(buffer));
        }

        // recorded into the bound vertex array
        let indices = self.mesh.indices();
        cache.get_or_create_buffer(BufferTarget::ElementArray, indices)?;
        buffers.push((BufferTarget::ElementArray, indices.id()));

        Ok(GpuState { vao, attributes, uniforms, buffers: std::mem::take(buffers) })
    }
}

impl<G: Gl> RenderObject<G> for MeshObject<G> {
    fn label(&self) -> &str {
        &self.label
    }

    fn requirements(&self) -> &[BindingRequirement] {
        &self.requirements
    }

    fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    fn load(&mut self, cache: &mut ResourceCache<G>, shader: &Shader<G>) -> Result<()> {
        if self.is_loaded() {
            return Err(RenderError::AlreadyLoaded(self.label.clone()));
        }

        let gl = cache.gl_rc();
        let vao = gl
            .create_vertex_array()
            .map_err(|reason| RenderError::GpuAllocation { what: "vertex array", reason })?;
        gl.bind_vertex_array(Some(vao));
        let mut acquired = Vec::new();
        let built = self.build_gpu_state(cache, shader, vao, &mut acquired);
        gl.bind_vertex_array(None);

        match built {
            Ok(state) => {
                debug!(
                    "loaded `{}`: {} attribute binding(s), {} uniform binding(s)",
                    self.label,
                    state.attributes.len(),
                    state.uniforms.len()
                );
                self.state = LoadState::Loaded(state);
                Ok(())
            }
            Err(e) => {
                for (target, id) in acquired {
                    cache.release_buffer(target, id);
                }
                gl.delete_vertex_array(vao);
                Err(e)
            }
        }
    }

    fn render(&self, gl: &G) -> Result<()> {
        let LoadState::Loaded(state) = &self.state else {
            return Err(RenderError::NotLoaded(self.label.clone()));
        };

        for binding in &state.uniforms {
            if let ResolvedLocation::Uniform(location) = &binding.location {
                let buf = UniformBuffer::flatten(&self.uniforms[*binding.handle()].values);
                gl.uniform(location, binding.info.ty, buf.as_data());
            }
        }

        let mode = self.mesh.topology().raw();
        let count = self.mesh.index_count() as i32;
        gl.bind_vertex_array(Some(state.vao));
        if self.is_instanced() {
            gl.draw_elements_instanced(mode, count, consts::UNSIGNED_SHORT, 0, self.instance_count as i32);
        } else {
            gl.draw_elements(mode, count, consts::UNSIGNED_SHORT, 0);
        }
        gl.bind_vertex_array(None);
        Ok(())
    }

    fn set_uniform_at(&mut self, name: &str, index: usize, value: UniformValue) -> Result<()> {
        let state = self
            .uniforms
            .iter_mut()
            .find(|u| u.requirement.name == name)
            .ok_or_else(|| RenderError::UnknownUniform { name: name.to_string() })?;

        let expected = state.requirement.semantic;
        if value.semantic_type() != expected {
            return Err(RenderError::BindingTypeMismatch {
                name: name.to_string(),
                expected: expected.gl_type(),
                actual: value.semantic_type().gl_type(),
            });
        }
        let len = state.values.len();
        let slot = state
            .values
            .get_mut(index)
            .ok_or_else(|| RenderError::UniformIndexOutOfRange { name: name.to_string(), index, len })?;
        *slot = value;
        Ok(())
    }

    fn release(&mut self, cache: &mut ResourceCache<G>) {
        if let LoadState::Loaded(state) = std::mem::replace(&mut self.state, LoadState::Unloaded) {
            cache.gl().delete_vertex_array(state.vao);
            for (target, id) in state.buffers {
                cache.release_buffer(target, id);
            }
        }
    }
}

impl<G: Gl> fmt::Debug for MeshObject<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshObject")
            .field("label", &self.label)
            .field("loaded", &self.is_loaded())
            .field("bindings", &self.requirements.len())
            .finish()
    }
}
