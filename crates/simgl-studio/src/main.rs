//! simgl studio: drives the engine headlessly for a fixed number of frames.
//!
//! Startup waits on a one-shot "surface ready" signal fired from a host
//! thread, builds a small scene (one flat quad, one instanced strip of
//! triangles), then renders on a fixed-interval ticker.

mod config;

use std::num::NonZeroU32;
use std::path::Path;
use std::rc::Rc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use simgl_engine::coords::{model_matrix, projection_matrix, view_matrix, Transform2D, Vec2, Viewport};
use simgl_engine::diagnostics::ErrorReport;
use simgl_engine::gl::{FakeProgram, GlCall, GlType, HeadlessGl, SemanticType};
use simgl_engine::logging::init_logging;
use simgl_engine::mesh::Mesh;
use simgl_engine::render::{MeshObject, RenderEngine, RenderInstance, RenderWorld, Surface};
use simgl_engine::shader::{shader_v0, BindingRequirement, ShaderSources};
use simgl_engine::sync::Signal;
use simgl_engine::time::FrameTicker;
use simgl_engine::RenderError;

use crate::config::StudioConfig;

const INSTANCED_VERTEX: &str = "#version 300 es
in vec2 position;
in vec2 offset;
uniform mat4 mvp;

void main() {
    gl_Position = mvp * vec4(position + offset, 0, 1);
}
";

const INSTANCED_FRAGMENT: &str = "#version 300 es
precision highp float;
uniform vec4 tint;
out vec4 ocolor;

void main() {
    ocolor = tint;
}
";

fn main() {
    let config = match StudioConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e:#}");
            std::process::exit(2);
        }
    };
    init_logging(config.logging.clone());

    if let Err(err) = run(&config) {
        report(&err);
        std::process::exit(1);
    }
}

/// Catch-all: engine failures get a frame report, anything else one line.
fn report(err: &anyhow::Error) {
    if err.downcast_ref::<RenderError>().is_none() {
        error!("{err:#}");
        return;
    }
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    ErrorReport::new(format!("{err:#}"), err.backtrace(), &["crates/simgl-", root.as_str()]).log();
}

fn run(config: &StudioConfig) -> Result<()> {
    let (width, height) = wait_for_surface(config)?;

    let surface = Surface::acquire("studio", width, height, || Some(headless_gl()))
        .context("acquiring GPU context")?;
    let mut engine = RenderEngine::new();
    let mut instance = RenderInstance::new(
        Rc::clone(&surface),
        Viewport::full(width, height),
        RenderWorld::new(Transform2D::IDENTITY),
    );
    engine.add_instance(&mut instance)?;

    let quad = engine
        .add_render_object(&mut instance, &shader_v0(), quad()?)
        .context("loading quad")?;
    let strip = engine
        .add_render_object(&mut instance, &instanced_sources(), strip()?)
        .context("loading instanced strip")?;
    engine
        .object_mut(strip)
        .context("strip not registered")?
        .set_uniform("tint", [0.2f32, 0.6, 1.0, 1.0].into())?;
    info!("{}", engine.debug_dump_shader_state());

    let mut ticker = FrameTicker::new(config.frame_interval);
    let mut object = Transform2D::new(Vec2::zero(), 0.0, Vec2::new(50.0, 50.0));
    loop {
        let frame = ticker.tick();

        object.position.x += 1.0;
        object.rotation += frame.dt;
        let size = Vec2::new(surface.size().0 as f32, surface.size().1 as f32);
        let camera = view_matrix(&instance.world.camera);
        let projection = projection_matrix(size.x, size.y);

        engine
            .object_mut(quad)
            .context("quad not registered")?
            .set_uniform("mvp", (projection * camera * model_matrix(&object)).into())?;
        engine
            .object_mut(strip)
            .context("strip not registered")?
            .set_uniform("mvp", (projection * camera).into())?;
        engine.render()?;

        if config.frame_limit.is_some_and(|limit| frame.frame_index + 1 >= limit) {
            break;
        }
    }

    let gl = surface.gl();
    info!(
        "rendered: {} program bind(s), {} draw(s), {} instanced draw(s)",
        gl.count_calls(|c| matches!(c, GlCall::UseProgram(Some(_)))),
        gl.count_calls(|c| matches!(c, GlCall::DrawElements { .. })),
        gl.count_calls(|c| matches!(c, GlCall::DrawElementsInstanced { .. })),
    );

    engine.remove_instance(&mut instance)?;
    Ok(())
}

/// Blocks until the host thread reports the surface size.
fn wait_for_surface(config: &StudioConfig) -> Result<(u32, u32)> {
    let ready = Signal::new();
    ready.subscribe(|(w, h): &(u32, u32)| info!("surface ready: {w}x{h}"));

    let host = {
        let ready = ready.clone();
        let size = (config.surface_width, config.surface_height);
        thread::spawn(move || ready.activate(size))
    };

    let size = pollster::block_on(ready.wait());
    host.join()
        .map_err(|_| anyhow!("surface host thread panicked"))?
        .context("surface ready signal")?;
    Ok(size)
}

/// Headless context whose fake linker knows the studio's two programs.
fn headless_gl() -> HeadlessGl {
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
        INSTANCED_VERTEX,
        INSTANCED_FRAGMENT,
        FakeProgram::new()
            .attribute("position", GlType::FloatVec2, 1)
            .attribute("offset", GlType::FloatVec2, 1)
            .uniform("mvp", GlType::FloatMat4, 1)
            .uniform("tint", GlType::FloatVec4, 1),
    );
    gl
}

fn instanced_sources() -> ShaderSources {
    ShaderSources::new(INSTANCED_VERTEX, INSTANCED_FRAGMENT)
}

fn quad() -> Result<MeshObject<HeadlessGl>> {
    let mesh = Mesh::with_trivial_index(vec![-1.0f32, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0])?;
    Ok(MeshObject::new("quad", mesh)
        .with_binding(BindingRequirement::vertex("position", SemanticType::Vec2, 0, 0))
        .with_binding(BindingRequirement::uniform("mvp", SemanticType::Mat4)))
}

fn strip() -> Result<MeshObject<HeadlessGl>> {
    const COUNT: u32 = 8;
    let mesh = Mesh::with_trivial_index(vec![0.0f32, 10.0, -8.0, -6.0, 8.0, -6.0])?;
    let offsets: Vec<Vec2> = (0..COUNT)
        .map(|i| Vec2::new(-200.0 + 50.0 * i as f32, -150.0))
        .collect();

    Ok(MeshObject::new("strip", mesh)
        .with_binding(BindingRequirement::vertex("position", SemanticType::Vec2, 0, 0))
        .with_binding(BindingRequirement::instance("offset", SemanticType::Vec2, NonZeroU32::MIN))
        .with_binding(BindingRequirement::uniform("mvp", SemanticType::Mat4))
        .with_binding(BindingRequirement::uniform("tint", SemanticType::Vec4))
        .with_instance_data("offset", bytemuck::cast_slice::<Vec2, f32>(&offsets).to_vec())
        .with_instance_count(COUNT))
}
