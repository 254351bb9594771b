use std::cell::RefCell;

use rustc_hash::FxHashMap;

use super::{ActiveInfo, BufferTarget, Gl, GlType, ShaderStage, UniformData};

/// Active inputs a headless "link" reports for a (vertex, fragment) pair.
///
/// Attribute locations are assigned in declaration order; each attribute
/// consumes `iteration × size` slots, as a GL linker would.
#[derive(Debug, Clone, Default)]
pub struct FakeProgram {
    attributes: Vec<ActiveInfo>,
    uniforms: Vec<ActiveInfo>,
    link_error: Option<String>,
}

impl FakeProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: &str, ty: GlType, size: i32) -> Self {
        self.attributes.push(ActiveInfo { name: name.to_string(), ty: ty.raw(), size });
        self
    }

    /// Attribute with a raw type enum, e.g. one the registry does not know.
    pub fn raw_attribute(mut self, name: &str, ty: u32, size: i32) -> Self {
        self.attributes.push(ActiveInfo { name: name.to_string(), ty, size });
        self
    }

    pub fn uniform(mut self, name: &str, ty: GlType, size: i32) -> Self {
        self.uniforms.push(ActiveInfo { name: name.to_string(), ty: ty.raw(), size });
        self
    }

    pub fn fail_link(mut self, log: &str) -> Self {
        self.link_error = Some(log.to_string());
        self
    }
}

/// Owned copy of a uniform upload.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    F32(Vec<f32>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

/// One call received by [`HeadlessGl`].
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    CreateBuffer(u32),
    BindBuffer { target: BufferTarget, buffer: Option<u32> },
    BufferData { target: BufferTarget, buffer: Option<u32>, len: usize },
    DeleteBuffer(u32),
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    VertexAttribPointer { index: u32, size: i32, data_type: u32, stride: i32, offset: i32 },
    EnableVertexAttribArray(u32),
    VertexAttribDivisor { index: u32, divisor: u32 },
    Uniform { location: u32, ty: GlType, data: RecordedUniform },
    DrawElements { mode: u32, count: i32, element_type: u32, offset: i32 },
    DrawElementsInstanced { mode: u32, count: i32, element_type: u32, offset: i32, instances: i32 },
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: Option<Linked>,
    log: String,
}

#[derive(Debug)]
struct Linked {
    attributes: Vec<(ActiveInfo, u32)>,
    uniforms: Vec<ActiveInfo>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    compile_failures: FxHashMap<String, String>,
    definitions: Vec<(String, String, FakeProgram)>,
    shaders: FxHashMap<u32, ShaderObject>,
    programs: FxHashMap<u32, ProgramObject>,
    buffers: FxHashMap<u32, Vec<u8>>,
    vertex_arrays: Vec<u32>,
    bound: FxHashMap<BufferTarget, u32>,
    calls: Vec<GlCall>,
}

impl State {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Recording GL backend with a scriptable compiler and linker.
///
/// Nothing is drawn. Every call is appended to a log that can be inspected
/// with [`HeadlessGl::calls`].
#[derive(Debug, Default)]
pub struct HeadlessGl {
    state: RefCell<State>,
}

impl HeadlessGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares what linking `vertex` with `fragment` produces.
    pub fn define_program(&self, vertex: &str, fragment: &str, program: FakeProgram) {
        self.state
            .borrow_mut()
            .definitions
            .push((vertex.to_string(), fragment.to_string(), program));
    }

    /// Makes compiling `source` fail with `log`.
    pub fn fail_compile(&self, source: &str, log: &str) {
        self.state
            .borrow_mut()
            .compile_failures
            .insert(source.to_string(), log.to_string());
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    /// Drains the call log.
    pub fn take_calls(&self) -> Vec<GlCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn count_calls(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    /// Bytes last uploaded to `buffer`.
    pub fn buffer_contents(&self, buffer: u32) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn strip_array_suffix(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

impl Gl for HeadlessGl {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type UniformLocation = u32;

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let mut st = self.state.borrow_mut();
        let id = st.next();
        st.shaders.insert(
            id,
            ShaderObject { stage, source: String::new(), compiled: false, log: String::new() },
        );
        st.calls.push(GlCall::CreateShader(id));
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(sh) = self.state.borrow_mut().shaders.get_mut(&shader) {
            sh.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: u32) {
        let mut st = self.state.borrow_mut();
        let failure = st
            .shaders
            .get(&shader)
            .and_then(|sh| st.compile_failures.get(&sh.source).cloned());
        if let Some(sh) = st.shaders.get_mut(&shader) {
            match failure {
                Some(log) => {
                    sh.compiled = false;
                    sh.log = log;
                }
                None => sh.compiled = true,
            }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state.borrow().shaders.get(&shader).is_some_and(|sh| sh.compiled)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|sh| sh.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        let mut st = self.state.borrow_mut();
        st.shaders.remove(&shader);
        st.calls.push(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        let mut st = self.state.borrow_mut();
        let id = st.next();
        st.programs.insert(id, ProgramObject::default());
        st.calls.push(GlCall::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            p.attached.push(shader);
        }
    }

    fn link_program(&self, program: u32) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::LinkProgram(program));

        let Some(attached) = st.programs.get(&program).map(|p| p.attached.clone()) else {
            return;
        };
        let source_of = |stage: ShaderStage| {
            attached
                .iter()
                .filter_map(|id| st.shaders.get(id))
                .find(|sh| sh.stage == stage && sh.compiled)
                .map(|sh| sh.source.clone())
        };

        let outcome = match (source_of(ShaderStage::Vertex), source_of(ShaderStage::Fragment)) {
            (Some(vs), Some(fs)) => st
                .definitions
                .iter()
                .find(|(v, f, _)| *v == vs && *f == fs)
                .map(|(_, _, fake)| fake.clone())
                .ok_or_else(|| "no program defined for these sources".to_string()),
            _ => Err("missing compiled vertex or fragment shader".to_string()),
        };

        let linked = outcome.and_then(|fake| match fake.link_error {
            Some(log) => Err(log),
            None => {
                let mut next_location = 0;
                let attributes = fake
                    .attributes
                    .into_iter()
                    .map(|a| {
                        let slots = GlType::from_raw(a.ty)
                            .map(|t| t.info().decomposition.iteration.max(1))
                            .unwrap_or(1);
                        let location = next_location;
                        next_location += slots * a.size.max(1) as u32;
                        (a, location)
                    })
                    .collect();
                Ok(Linked { attributes, uniforms: fake.uniforms })
            }
        });

        if let Some(p) = st.programs.get_mut(&program) {
            match linked {
                Ok(l) => p.linked = Some(l),
                Err(log) => {
                    p.linked = None;
                    p.log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state.borrow().programs.get(&program).is_some_and(|p| p.linked.is_some())
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: u32) {
        let mut st = self.state.borrow_mut();
        st.programs.remove(&program);
        st.calls.push(GlCall::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(GlCall::UseProgram(program));
    }

    fn active_attribute_count(&self, program: u32) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .map_or(0, |l| l.attributes.len() as u32)
    }

    fn active_attribute(&self, program: u32, index: u32) -> Option<ActiveInfo> {
        let st = self.state.borrow();
        let linked = st.programs.get(&program)?.linked.as_ref()?;
        linked.attributes.get(index as usize).map(|(a, _)| a.clone())
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        let st = self.state.borrow();
        let linked = st.programs.get(&program)?.linked.as_ref()?;
        linked
            .attributes
            .iter()
            .find(|(a, _)| strip_array_suffix(&a.name) == strip_array_suffix(name))
            .map(|(_, loc)| *loc)
    }

    fn active_uniform_count(&self, program: u32) -> u32 {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.linked.as_ref())
            .map_or(0, |l| l.uniforms.len() as u32)
    }

    fn active_uniform(&self, program: u32, index: u32) -> Option<ActiveInfo> {
        let st = self.state.borrow();
        let linked = st.programs.get(&program)?.linked.as_ref()?;
        linked.uniforms.get(index as usize).cloned()
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        let st = self.state.borrow();
        let linked = st.programs.get(&program)?.linked.as_ref()?;
        linked
            .uniforms
            .iter()
            .position(|u| strip_array_suffix(&u.name) == strip_array_suffix(name))
            .map(|i| i as u32)
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let mut st = self.state.borrow_mut();
        let id = st.next();
        st.buffers.insert(id, Vec::new());
        st.calls.push(GlCall::CreateBuffer(id));
        Ok(id)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<u32>) {
        let mut st = self.state.borrow_mut();
        match buffer {
            Some(id) => st.bound.insert(target, id),
            None => st.bound.remove(&target),
        };
        st.calls.push(GlCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], _usage: u32) {
        let mut st = self.state.borrow_mut();
        let buffer = st.bound.get(&target).copied();
        if let Some(id) = buffer {
            if let Some(contents) = st.buffers.get_mut(&id) {
                *contents = data.to_vec();
            }
        }
        st.calls.push(GlCall::BufferData { target, buffer, len: data.len() });
    }

    fn delete_buffer(&self, buffer: u32) {
        let mut st = self.state.borrow_mut();
        st.buffers.remove(&buffer);
        st.bound.retain(|_, id| *id != buffer);
        st.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let mut st = self.state.borrow_mut();
        let id = st.next();
        st.vertex_arrays.push(id);
        st.calls.push(GlCall::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&self, vao: Option<u32>) {
        self.record(GlCall::BindVertexArray(vao));
    }

    fn delete_vertex_array(&self, vao: u32) {
        let mut st = self.state.borrow_mut();
        st.vertex_arrays.retain(|id| *id != vao);
        st.calls.push(GlCall::DeleteVertexArray(vao));
    }

    fn vertex_attrib_pointer(&self, index: u32, size: i32, data_type: u32, stride: i32, offset: i32) {
        self.record(GlCall::VertexAttribPointer { index, size, data_type, stride, offset });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.record(GlCall::VertexAttribDivisor { index, divisor });
    }

    fn uniform(&self, location: &u32, ty: GlType, data: UniformData<'_>) {
        let data = match data {
            UniformData::F32(v) => RecordedUniform::F32(v.to_vec()),
            UniformData::I32(v) => RecordedUniform::I32(v.to_vec()),
            UniformData::U32(v) => RecordedUniform::U32(v.to_vec()),
        };
        self.record(GlCall::Uniform { location: *location, ty, data });
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        self.record(GlCall::DrawElements { mode, count, element_type, offset });
    }

    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        element_type: u32,
        offset: i32,
        instances: i32,
    ) {
        self.record(GlCall::DrawElementsInstanced { mode, count, element_type, offset, instances });
    }
}
