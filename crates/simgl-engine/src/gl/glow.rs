use glow::HasContext;

use super::{consts, ActiveInfo, BufferTarget, Gl, GlType, ShaderStage, UniformData};

/// [`Gl`] over a real OpenGL / WebGL2 context.
pub struct GlowGl<C: HasContext> {
    context: C,
}

impl<C: HasContext> GlowGl<C> {
    /// Wraps `context`.
    ///
    /// # Safety
    /// `context` must be current on the calling thread for the whole lifetime
    /// of the returned value, and must not be used from any other thread.
    pub unsafe fn new(context: C) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<C: HasContext> std::fmt::Debug for GlowGl<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowGl").finish_non_exhaustive()
    }
}

// SAFETY (all blocks below): `new` requires the context to be current on
// this thread, and every handle passed in was produced by the same context.
impl<C: HasContext> Gl for GlowGl<C> {
    type Shader = C::Shader;
    type Program = C::Program;
    type Buffer = C::Buffer;
    type VertexArray = C::VertexArray;
    type UniformLocation = C::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        unsafe { self.context.create_shader(stage.raw()) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.context.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.context.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.context.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.context.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.context.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.context.create_program() }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.context.attach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.context.link_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.context.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.context.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.context.delete_program(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.context.use_program(program) }
    }

    fn active_attribute_count(&self, program: Self::Program) -> u32 {
        unsafe { self.context.get_active_attributes(program) }
    }

    fn active_attribute(&self, program: Self::Program, index: u32) -> Option<ActiveInfo> {
        unsafe { self.context.get_active_attribute(program, index) }.map(|a| ActiveInfo {
            name: a.name,
            ty: a.atype,
            size: a.size,
        })
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.context.get_attrib_location(program, name) }
    }

    fn active_uniform_count(&self, program: Self::Program) -> u32 {
        unsafe { self.context.get_active_uniforms(program) }
    }

    fn active_uniform(&self, program: Self::Program, index: u32) -> Option<ActiveInfo> {
        unsafe { self.context.get_active_uniform(program, index) }.map(|u| ActiveInfo {
            name: u.name,
            ty: u.utype,
            size: u.size,
        })
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.context.get_uniform_location(program, name) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { self.context.create_buffer() }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<Self::Buffer>) {
        unsafe { self.context.bind_buffer(target.raw(), buffer) }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: u32) {
        unsafe { self.context.buffer_data_u8_slice(target.raw(), data, usage) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { self.context.delete_buffer(buffer) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { self.context.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vao: Option<Self::VertexArray>) {
        unsafe { self.context.bind_vertex_array(vao) }
    }

    fn delete_vertex_array(&self, vao: Self::VertexArray) {
        unsafe { self.context.delete_vertex_array(vao) }
    }

    fn vertex_attrib_pointer(&self, index: u32, size: i32, data_type: u32, stride: i32, offset: i32) {
        unsafe {
            if data_type == consts::FLOAT {
                self.context
                    .vertex_attrib_pointer_f32(index, size, data_type, false, stride, offset);
            } else {
                self.context
                    .vertex_attrib_pointer_i32(index, size, data_type, stride, offset);
            }
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.context.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { self.context.vertex_attrib_divisor(index, divisor) }
    }

    fn uniform(&self, location: &Self::UniformLocation, ty: GlType, data: UniformData<'_>) {
        let loc = Some(location);
        let components = ty.info().decomposition.components;
        unsafe {
            match (ty, data) {
                (GlType::FloatMat2, UniformData::F32(v)) => {
                    self.context.uniform_matrix_2_f32_slice(loc, true, v)
                }
                (GlType::FloatMat3, UniformData::F32(v)) => {
                    self.context.uniform_matrix_3_f32_slice(loc, true, v)
                }
                (GlType::FloatMat4, UniformData::F32(v)) => {
                    self.context.uniform_matrix_4_f32_slice(loc, true, v)
                }
                (_, UniformData::F32(v)) => match components {
                    1 => self.context.uniform_1_f32_slice(loc, v),
                    2 => self.context.uniform_2_f32_slice(loc, v),
                    3 => self.context.uniform_3_f32_slice(loc, v),
                    _ => self.context.uniform_4_f32_slice(loc, v),
                },
                (_, UniformData::I32(v)) => match components {
                    1 => self.context.uniform_1_i32_slice(loc, v),
                    2 => self.context.uniform_2_i32_slice(loc, v),
                    3 => self.context.uniform_3_i32_slice(loc, v),
                    _ => self.context.uniform_4_i32_slice(loc, v),
                },
                (_, UniformData::U32(v)) => match components {
                    1 => self.context.uniform_1_u32_slice(loc, v),
                    2 => self.context.uniform_2_u32_slice(loc, v),
                    3 => self.context.uniform_3_u32_slice(loc, v),
                    _ => self.context.uniform_4_u32_slice(loc, v),
                },
            }
        }
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        unsafe { self.context.draw_elements(mode, count, element_type, offset) }
    }

    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instances: i32,
    ) {
        unsafe {
            self.context
                .draw_elements_instanced(mode, count, element_type, offset, instances)
        }
    }
}
