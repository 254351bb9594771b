use std::num::NonZeroU32;
use std::rc::Rc;

use simgl_engine::coords::{model_matrix, projection_matrix, view_matrix, Transform2D, Vec2, Viewport};
use simgl_engine::gl::{FakeProgram, GlCall, GlType, HeadlessGl, RecordedUniform, SemanticType, ShaderStage};
use simgl_engine::mesh::Mesh;
use simgl_engine::render::{MeshObject, RenderEngine, RenderInstance, RenderWorld, Surface, UniformValue};
use simgl_engine::shader::{shader_v0, BindingRequirement, ShaderSources};
use simgl_engine::RenderError;

const INSTANCED_VS: &str = "instanced.vert";
const INSTANCED_FS: &str = "instanced.frag";

fn gl() -> HeadlessGl {
    let gl = HeadlessGl::new();
    let v0 = shader_v0();
    gl.define_program(
        &v0.vertex,
        &v0.fragment,
        FakeProgram::new()
            .attribute("position", GlType::FloatVec2, 1)
            .uniform("mvp", GlType::FloatMat4, 1),
    );
    gl.define_program(
        INSTANCED_VS,
        INSTANCED_FS,
        FakeProgram::new()
            .attribute("position", GlType::FloatVec2, 1)
            .attribute("offset", GlType::FloatVec2, 1)
            .uniform("mvp", GlType::FloatMat4, 1),
    );
    gl
}

fn attach(
    engine: &mut RenderEngine<HeadlessGl>,
    label: &str,
) -> (Rc<Surface<HeadlessGl>>, RenderInstance<HeadlessGl>) {
    let surface = Surface::acquire(label, 200, 100, || Some(gl())).unwrap();
    let mut instance = RenderInstance::new(
        Rc::clone(&surface),
        Viewport::full(200, 100),
        RenderWorld::new(Transform2D::IDENTITY),
    );
    engine.add_instance(&mut instance).unwrap();
    (surface, instance)
}

fn quad(label: &str) -> MeshObject<HeadlessGl> {
    let mesh = Mesh::with_trivial_index(vec![-1.0f32, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0]).unwrap();
    MeshObject::new(label, mesh)
        .with_binding(BindingRequirement::vertex("position", SemanticType::Vec2, 0, 0))
        .with_binding(BindingRequirement::uniform("mvp", SemanticType::Mat4))
}

fn draws(gl: &HeadlessGl) -> usize {
    gl.count_calls(|c| matches!(c, GlCall::DrawElements { .. } | GlCall::DrawElementsInstanced { .. }))
}

// ── frames ────────────────────────────────────────────────────────────────

#[test]
fn each_surface_draws_only_its_own_objects() {
    let mut engine = RenderEngine::new();
    let (sa, mut a) = attach(&mut engine, "left");
    let (sb, mut b) = attach(&mut engine, "right");
    engine.add_render_object(&mut a, &shader_v0(), quad("a1")).unwrap();
    engine.add_render_object(&mut a, &shader_v0(), quad("a2")).unwrap();
    engine.add_render_object(&mut b, &shader_v0(), quad("b1")).unwrap();
    sa.gl().take_calls();
    sb.gl().take_calls();

    for _ in 0..3 {
        engine.render().unwrap();
    }
    assert_eq!((draws(sa.gl()), draws(sb.gl())), (6, 3));
    assert_eq!(sa.gl().count_calls(|c| matches!(c, GlCall::UseProgram(Some(_)))), 3);
}

#[test]
fn mvp_reaches_the_gpu_row_major() {
    let mut engine = RenderEngine::new();
    let (surface, mut instance) = attach(&mut engine, "main");
    let handle = engine.add_render_object(&mut instance, &shader_v0(), quad("q")).unwrap();

    let object = Transform2D::new(Vec2::new(10.0, 5.0), 0.0, Vec2::one());
    let (w, h) = surface.size();
    let mvp = projection_matrix(w as f32, h as f32)
        * view_matrix(&instance.world.camera)
        * model_matrix(&object);
    engine.object_mut(handle).unwrap().set_uniform("mvp", mvp.into()).unwrap();
    surface.gl().take_calls();
    engine.render().unwrap();

    let uploaded = surface.gl().calls().into_iter().find_map(|c| match c {
        GlCall::Uniform { ty: GlType::FloatMat4, data: RecordedUniform::F32(v), .. } => Some(v),
        _ => None,
    });
    assert_eq!(uploaded.as_deref(), Some(&mvp.as_array()[..]));
    let (x, y) = mvp.transform_point(0.0, 0.0);
    assert!((x - 0.1).abs() < 1e-6 && (y - 0.1).abs() < 1e-6);
}

#[test]
fn instanced_object_uploads_offsets_and_draws_instanced() {
    let mut engine = RenderEngine::new();
    let (surface, mut instance) = attach(&mut engine, "main");
    let offsets = [Vec2::new(0.0, 0.0), Vec2::new(3.0, 0.0), Vec2::new(6.0, 0.0)];
    let object = quad("stars")
        .with_binding(BindingRequirement::instance("offset", SemanticType::Vec2, NonZeroU32::MIN))
        .with_instance_data("offset", bytemuck::cast_slice::<Vec2, f32>(&offsets).to_vec())
        .with_instance_count(3);
    let sources = ShaderSources::new(INSTANCED_VS, INSTANCED_FS);
    engine.add_render_object(&mut instance, &sources, object).unwrap();

    let gl = surface.gl();
    let upload = gl.calls().into_iter().find_map(|c| match c {
        // 24 bytes: the quad's vertices are 32 and its indices 12
        GlCall::BufferData { len: 24, buffer, .. } => buffer,
        _ => None,
    });
    let bytes = upload.and_then(|b| gl.buffer_contents(b)).unwrap();
    assert_eq!(bytes, bytemuck::cast_slice::<f32, u8>(&[0.0, 0.0, 3.0, 0.0, 6.0, 0.0]));

    gl.take_calls();
    engine.render().unwrap();
    assert_eq!(gl.count_calls(|c| matches!(c, GlCall::DrawElementsInstanced { instances: 3, count: 6, .. })), 1);
}

// ── failures ──────────────────────────────────────────────────────────────

#[test]
fn failed_registration_leaves_engine_usable() {
    let mut engine = RenderEngine::new();
    let (surface, mut instance) = attach(&mut engine, "main");
    surface.gl().fail_compile("broken", "0:3: 'vec5' : undeclared identifier");

    let err = engine
        .add_render_object(&mut instance, &ShaderSources::new("broken", "f"), quad("bad"))
        .unwrap_err();
    assert!(matches!(err, RenderError::ShaderCompile { stage: ShaderStage::Vertex, .. }));
    assert!(instance.world.objects().is_empty());

    engine.add_render_object(&mut instance, &shader_v0(), quad("good")).unwrap();
    engine.render().unwrap();
}

#[test]
fn wrong_uniform_type_is_rejected_through_the_handle() {
    let mut engine = RenderEngine::new();
    let (_surface, mut instance) = attach(&mut engine, "main");
    let handle = engine.add_render_object(&mut instance, &shader_v0(), quad("q")).unwrap();

    let err = engine
        .object_mut(handle)
        .unwrap()
        .set_uniform("mvp", UniformValue::Scalar(1.0))
        .unwrap_err();
    assert_eq!(
        err,
        RenderError::BindingTypeMismatch {
            name: "mvp".into(),
            expected: GlType::FloatMat4,
            actual: GlType::Float,
        }
    );
}

#[test]
fn shader_requirement_mismatch_names_the_binding() {
    let mut engine = RenderEngine::new();
    let (_surface, mut instance) = attach(&mut engine, "main");
    let object = quad("q").with_binding(BindingRequirement::uniform("tint", SemanticType::Vec4));

    let err = engine.add_render_object(&mut instance, &shader_v0(), object).unwrap_err();
    assert_eq!(err, RenderError::BindingNotFound { name: "tint".into() });
}

#[test]
fn missing_gpu_context_is_reported() {
    let err = Surface::<HeadlessGl>::acquire("offscreen", 1, 1, || None).unwrap_err();
    assert_eq!(err, RenderError::GpuContextUnavailable("offscreen".into()));
}
