use std::fmt;

use log::debug;

use super::binding::{BindingDescription, BindingDescriptions};
use super::sources::ShaderSources;
use crate::error::{RenderError, Result};
use crate::gl::{lookup, Gl, ShaderStage};

/// A linked program plus its introspected inputs.
pub struct Shader<G: Gl> {
    sources: ShaderSources,
    program: G::Program,
    descriptions: BindingDescriptions<G::UniformLocation>,
}

impl<G: Gl> Shader<G> {
    #[inline]
    pub fn sources(&self) -> &ShaderSources {
        &self.sources
    }

    #[inline]
    pub fn program(&self) -> G::Program {
        self.program
    }

    #[inline]
    pub fn descriptions(&self) -> &BindingDescriptions<G::UniformLocation> {
        &self.descriptions
    }

    /// Deletes the GPU program. The shader must not be used afterwards.
    pub fn release(&self, gl: &G) {
        gl.delete_program(self.program);
    }
}

impl<G: Gl> fmt::Debug for Shader<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("program", &self.program)
            .field("attributes", &self.descriptions.attributes.len())
            .field("uniforms", &self.descriptions.uniforms.len())
            .finish()
    }
}

/// Compiles, links and introspects `sources`.
///
/// Every intermediate GPU object is deleted on failure; on success only the
/// program survives.
pub fn build<G: Gl>(gl: &G, sources: &ShaderSources) -> Result<Shader<G>> {
    let vertex = compile(gl, ShaderStage::Vertex, &sources.vertex)?;
    let fragment = match compile(gl, ShaderStage::Fragment, &sources.fragment) {
        Ok(f) => f,
        Err(e) => {
            gl.delete_shader(vertex);
            return Err(e);
        }
    };

    let program = match link(gl, vertex, fragment) {
        Ok(p) => p,
        Err(e) => {
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
            return Err(e);
        }
    };

    let descriptions = introspect(gl, program);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);
    let descriptions = match descriptions {
        Ok(d) => d,
        Err(e) => {
            gl.delete_program(program);
            return Err(e);
        }
    };

    debug!(
        "built shader program {:?}: {} attribute(s), {} uniform(s)",
        program,
        descriptions.attributes.len(),
        descriptions.uniforms.len()
    );
    Ok(Shader { sources: sources.clone(), program, descriptions })
}

fn compile<G: Gl>(gl: &G, stage: ShaderStage, source: &str) -> Result<G::Shader> {
    let shader = gl
        .create_shader(stage)
        .map_err(|reason| RenderError::GpuAllocation { what: "shader", reason })?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if gl.shader_compile_status(shader) {
        return Ok(shader);
    }
    let log = gl.shader_info_log(shader);
    gl.delete_shader(shader);
    Err(RenderError::ShaderCompile { stage, log })
}

fn link<G: Gl>(gl: &G, vertex: G::Shader, fragment: G::Shader) -> Result<G::Program> {
    let program = gl
        .create_program()
        .map_err(|reason| RenderError::GpuAllocation { what: "program", reason })?;
    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    if gl.program_link_status(program) {
        return Ok(program);
    }
    let log = gl.program_info_log(program);
    gl.delete_program(program);
    Err(RenderError::ShaderLink { log })
}

/// Drivers report arrays as `name[0]`; bindings are keyed by `name`.
fn binding_name(reported: &str) -> String {
    reported.strip_suffix("[0]").unwrap_or(reported).to_string()
}

fn introspect<G: Gl>(gl: &G, program: G::Program) -> Result<BindingDescriptions<G::UniformLocation>> {
    let mut out = BindingDescriptions::default();

    for index in 0..gl.active_attribute_count(program) {
        let Some(active) = gl.active_attribute(program, index) else { continue };
        let name = binding_name(&active.name);
        // built-ins such as gl_VertexID have no location
        let Some(location) = gl.attrib_location(program, &name) else { continue };
        let info = lookup(active.ty)?;
        out.attributes.insert(
            name.clone(),
            BindingDescription { name, location, info, array_length: active.size.max(1) as u32 },
        );
    }

    for index in 0..gl.active_uniform_count(program) {
        let Some(active) = gl.active_uniform(program, index) else { continue };
        let name = binding_name(&active.name);
        // uniform block members have no location
        let Some(location) = gl.uniform_location(program, &name) else { continue };
        let info = lookup(active.ty)?;
        out.uniforms.insert(
            name.clone(),
            BindingDescription { name, location, info, array_length: active.size.max(1) as u32 },
        );
    }

    Ok(out)
}
