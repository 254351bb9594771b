use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};

use super::context::{ObjectId, RenderContext};
use super::object::RenderObject;
use super::surface::Surface;
use crate::arena::{FixedList, SlotIndex};
use crate::coords::{Transform2D, Viewport};
use crate::error::{RenderError, Result};
use crate::gl::Gl;
use crate::shader::ShaderSources;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

/// Stable reference to a render object registered through an engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    pub context: SlotIndex,
    pub object: ObjectId,
}

/// What an instance draws: a camera plus the objects it registered.
#[derive(Debug, Clone, Default)]
pub struct RenderWorld {
    pub camera: Transform2D,
    objects: Vec<ObjectHandle>,
}

impl RenderWorld {
    pub fn new(camera: Transform2D) -> Self {
        Self { camera, objects: Vec::new() }
    }

    #[inline]
    pub fn objects(&self) -> &[ObjectHandle] {
        &self.objects
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Attachment {
    engine: EngineId,
    context: SlotIndex,
}

/// A surface + viewport + world triple drawn by a [`RenderEngine`].
///
/// Owned by the caller; the engine only records which context serves it.
pub struct RenderInstance<G: Gl> {
    surface: Rc<Surface<G>>,
    pub viewport: Viewport,
    pub world: RenderWorld,
    attached: Option<Attachment>,
}

impl<G: Gl> RenderInstance<G> {
    pub fn new(surface: Rc<Surface<G>>, viewport: Viewport, world: RenderWorld) -> Self {
        Self { surface, viewport, world, attached: None }
    }

    #[inline]
    pub fn surface(&self) -> &Rc<Surface<G>> {
        &self.surface
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }
}

impl<G: Gl> fmt::Debug for RenderInstance<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderInstance")
            .field("surface", &self.surface.id())
            .field("viewport", &self.viewport)
            .field("objects", &self.world.objects.len())
            .field("attached", &self.attached)
            .finish()
    }
}

/// Owns every render context and drives the per-frame draw.
///
/// Contexts live in a [`FixedList`], so the slot index an instance holds
/// stays valid while other contexts come and go.
pub struct RenderEngine<G: Gl> {
    id: EngineId,
    contexts: FixedList<RenderContext<G>>,
}

impl<G: Gl> Default for RenderEngine<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gl> RenderEngine<G> {
    pub fn new() -> Self {
        Self { id: EngineId(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed)), contexts: FixedList::new() }
    }

    #[inline]
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn context(&self, slot: SlotIndex) -> Option<&RenderContext<G>> {
        self.contexts.get(slot)
    }

    /// Attaches `instance`, reusing the context of its surface if one
    /// exists.
    pub fn add_instance(&mut self, instance: &mut RenderInstance<G>) -> Result<SlotIndex> {
        if instance.attached.is_some() {
            return Err(RenderError::InstanceAlreadyAttached);
        }

        let surface_id = instance.surface.id();
        let slot = match self.contexts.find(|c| c.surface().id() == surface_id) {
            Some(slot) => {
                debug!("instance joins existing context {slot} for {surface_id}");
                slot
            }
            None => self.contexts.push(RenderContext::new(Rc::clone(&instance.surface))),
        };
        if let Some(ctx) = self.contexts.get_mut(slot) {
            ctx.instances += 1;
        }
        instance.attached = Some(Attachment { engine: self.id, context: slot });
        Ok(slot)
    }

    /// Loads `object` into the context serving `instance` and records it in
    /// the instance's world.
    pub fn add_render_object(
        &mut self,
        instance: &mut RenderInstance<G>,
        sources: &ShaderSources,
        object: impl RenderObject<G> + 'static,
    ) -> Result<ObjectHandle> {
        let slot = self.attachment(instance)?;
        let ctx = self.contexts.get_mut(slot).ok_or(RenderError::InstanceNotAttached)?;
        let object = ctx.register(sources, Box::new(object))?;

        let handle = ObjectHandle { context: slot, object };
        instance.world.objects.push(handle);
        Ok(handle)
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&dyn RenderObject<G>> {
        self.contexts.get(handle.context)?.object(handle.object)
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut (dyn RenderObject<G> + 'static)> {
        self.contexts.get_mut(handle.context)?.object_mut(handle.object)
    }

    /// Detaches `instance` and releases its objects. The last instance to
    /// leave a context releases the context and frees its slot.
    ///
    /// Every object is released and the instance is detached even when one
    /// removal fails; the first failure is returned afterwards.
    pub fn remove_instance(&mut self, instance: &mut RenderInstance<G>) -> Result<()> {
        let slot = self.attachment(instance)?;
        let ctx = self.contexts.get_mut(slot).ok_or(RenderError::InstanceNotAttached)?;

        let mut first_error = None;
        for handle in std::mem::take(&mut instance.world.objects) {
            if let Err(e) = ctx.remove(handle.object) {
                warn!("removing {:?} from context {slot}: {e}", handle.object);
                first_error.get_or_insert(e);
            }
        }
        ctx.instances = ctx.instances.saturating_sub(1);
        instance.attached = None;

        if ctx.instances == 0 {
            ctx.release();
            self.contexts.remove(slot)?;
            info!("context {slot} removed");
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Draws every live context.
    pub fn render(&self) -> Result<()> {
        for (_, ctx) in self.contexts.iter() {
            ctx.render()?;
        }
        Ok(())
    }

    /// Human-readable summary of contexts, programs and objects.
    pub fn debug_dump_shader_state(&self) -> String {
        let mut out = format!("render engine: {} context(s)\n", self.contexts.len());
        for (slot, ctx) in self.contexts.iter() {
            out.push_str(&format!("[{slot}] "));
            ctx.dump(&mut out);
        }
        out
    }

    fn attachment(&self, instance: &RenderInstance<G>) -> Result<SlotIndex> {
        match instance.attached {
            Some(a) if a.engine == self.id => Ok(a.context),
            _ => Err(RenderError::InstanceNotAttached),
        }
    }
}

impl<G: Gl> fmt::Debug for RenderEngine<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEngine")
            .field("id", &self.id)
            .field("contexts", &self.contexts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{BufferTarget, FakeProgram, GlCall, GlType, HeadlessGl, SemanticType};
    use crate::mesh::Mesh;
    use crate::render::MeshObject;
    use crate::shader::{shader_v0, BindingRequirement};

    fn instance(surface: &Rc<Surface<HeadlessGl>>) -> RenderInstance<HeadlessGl> {
        RenderInstance::new(Rc::clone(surface), Viewport::default(), RenderWorld::default())
    }

    fn surface(label: &str) -> Rc<Surface<HeadlessGl>> {
        Surface::acquire(label, 8, 8, || {
            let gl = HeadlessGl::new();
            let src = shader_v0();
            gl.define_program(
                &src.vertex,
                &src.fragment,
                FakeProgram::new()
                    .attribute("position", GlType::FloatVec2, 1)
                    .uniform("mvp", GlType::FloatMat4, 1),
            );
            Some(gl)
        })
        .unwrap()
    }

    fn mesh_object(label: &str, mesh: Mesh) -> MeshObject<HeadlessGl> {
        MeshObject::new(label, mesh)
            .with_binding(BindingRequirement::vertex("position", SemanticType::Vec2, 0, 0))
            .with_binding(BindingRequirement::uniform("mvp", SemanticType::Mat4))
    }

    fn triangle() -> Mesh {
        Mesh::with_trivial_index(vec![0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0]).unwrap()
    }

    fn quad() -> Mesh {
        Mesh::with_trivial_index(vec![0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]).unwrap()
    }

    // ── instances ─────────────────────────────────────────────────────────

    #[test]
    fn second_add_of_same_instance_fails() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let mut i = instance(&s);
        engine.add_instance(&mut i).unwrap();
        assert_eq!(engine.add_instance(&mut i), Err(RenderError::InstanceAlreadyAttached));
    }

    #[test]
    fn instance_of_another_engine_is_rejected() {
        let mut e1 = RenderEngine::new();
        let mut e2 = RenderEngine::<HeadlessGl>::new();
        let s = surface("a");
        let mut i = instance(&s);
        e1.add_instance(&mut i).unwrap();
        assert_eq!(e2.remove_instance(&mut i), Err(RenderError::InstanceNotAttached));
    }

    #[test]
    fn same_surface_shares_a_context() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let (mut i1, mut i2) = (instance(&s), instance(&s));
        let c1 = engine.add_instance(&mut i1).unwrap();
        let c2 = engine.add_instance(&mut i2).unwrap();
        assert_eq!(c1, c2);
        assert_eq!(engine.context_count(), 1);
    }

    #[test]
    fn last_instance_out_frees_the_slot() {
        let mut engine = RenderEngine::new();
        let (sa, sb) = (surface("a"), surface("b"));
        let (mut a1, mut a2, mut b) = (instance(&sa), instance(&sa), instance(&sb));
        let ca = engine.add_instance(&mut a1).unwrap();
        engine.add_instance(&mut a2).unwrap();
        let cb = engine.add_instance(&mut b).unwrap();

        engine.remove_instance(&mut a1).unwrap();
        assert!(engine.context(ca).is_some());
        engine.remove_instance(&mut a2).unwrap();
        assert!(engine.context(ca).is_none());
        assert!(!a2.is_attached());

        // b's slot is untouched, and the freed slot is reused
        assert!(engine.context(cb).is_some());
        let mut c = instance(&surface("c"));
        assert_eq!(engine.add_instance(&mut c).unwrap(), ca);
    }

    #[test]
    fn detached_instance_can_rejoin() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let mut i = instance(&s);
        engine.add_instance(&mut i).unwrap();
        engine.remove_instance(&mut i).unwrap();
        assert!(engine.add_instance(&mut i).is_ok());
    }

    // ── objects ───────────────────────────────────────────────────────────

    #[test]
    fn object_on_detached_instance_is_rejected() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let mut i = instance(&s);
        let err = engine.add_render_object(&mut i, &shader_v0(), mesh_object("t", triangle()));
        assert_eq!(err.unwrap_err(), RenderError::InstanceNotAttached);
    }

    #[test]
    fn frame_binds_program_once_and_draws_in_order() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let mut i = instance(&s);
        engine.add_instance(&mut i).unwrap();
        engine.add_render_object(&mut i, &shader_v0(), mesh_object("tri", triangle())).unwrap();
        engine.add_render_object(&mut i, &shader_v0(), mesh_object("quad", quad())).unwrap();
        assert_eq!(i.world.objects().len(), 2);

        s.gl().take_calls();
        engine.render().unwrap();
        let calls = s.gl().take_calls();
        let programs = calls.iter().filter(|c| matches!(c, GlCall::UseProgram(Some(_)))).count();
        let counts: Vec<i32> = calls
            .iter()
            .filter_map(|c| match c {
                GlCall::DrawElements { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(programs, 1);
        assert_eq!(counts, vec![3, 6]);
    }

    #[test]
    fn surfaces_keep_separate_caches() {
        let mut engine = RenderEngine::new();
        let (sa, sb) = (surface("a"), surface("b"));
        let (mut a, mut b) = (instance(&sa), instance(&sb));
        let ca = engine.add_instance(&mut a).unwrap();
        let cb = engine.add_instance(&mut b).unwrap();

        let mesh = triangle();
        let vertices = mesh.vertices().id();
        engine.add_render_object(&mut a, &shader_v0(), mesh_object("t", mesh)).unwrap();

        let cache_a = engine.context(ca).unwrap().cache();
        let cache_b = engine.context(cb).unwrap().cache();
        assert!(cache_a.contains_buffer(BufferTarget::Array, vertices));
        assert!(!cache_b.contains_buffer(BufferTarget::Array, vertices));
        assert!(cache_a.contains_shader(&shader_v0()));
        assert_eq!(cache_b.shader_count(), 0);
        assert_eq!(sb.gl().live_programs(), 0);
    }

    #[test]
    fn uniforms_set_through_handle_reach_the_draw() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let mut i = instance(&s);
        engine.add_instance(&mut i).unwrap();
        let h = engine.add_render_object(&mut i, &shader_v0(), mesh_object("t", triangle())).unwrap();

        let mvp = crate::coords::Mat4::translation(1.0, 2.0);
        engine.object_mut(h).unwrap().set_uniform("mvp", mvp.into()).unwrap();
        s.gl().take_calls();
        engine.render().unwrap();
        assert_eq!(s.gl().count_calls(|c| matches!(c, GlCall::Uniform { ty: GlType::FloatMat4, .. })), 1);
        assert_eq!(engine.object(h).map(|o| o.label().to_owned()), Some("t".to_owned()));
    }

    #[test]
    fn removing_instance_releases_its_gpu_objects() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let mut i = instance(&s);
        engine.add_instance(&mut i).unwrap();
        let h = engine.add_render_object(&mut i, &shader_v0(), mesh_object("t", triangle())).unwrap();

        engine.remove_instance(&mut i).unwrap();
        assert!(engine.object(h).is_none());
        assert!(i.world.objects().is_empty());
        let gl = s.gl();
        assert_eq!((gl.live_programs(), gl.live_buffers(), gl.live_vertex_arrays()), (0, 0, 0));
    }

    #[test]
    fn stale_handle_does_not_resolve_in_a_reused_slot() {
        let mut engine = RenderEngine::new();
        let (sa, sb) = (surface("a"), surface("b"));
        let mut a = instance(&sa);
        engine.add_instance(&mut a).unwrap();
        let old = engine.add_render_object(&mut a, &shader_v0(), mesh_object("old", triangle())).unwrap();
        engine.remove_instance(&mut a).unwrap();

        let mut b = instance(&sb);
        assert_eq!(engine.add_instance(&mut b).unwrap(), old.context);
        let new = engine.add_render_object(&mut b, &shader_v0(), mesh_object("new", triangle())).unwrap();
        assert!(engine.object(old).is_none());
        assert!(engine.object_mut(old).is_none());
        assert_eq!(engine.object(new).map(|o| o.label().to_owned()), Some("new".to_owned()));
    }

    #[test]
    fn leaving_a_shared_context_frees_the_instance_buffers() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let (mut keep, mut leave) = (instance(&s), instance(&s));
        engine.add_instance(&mut keep).unwrap();
        engine.add_instance(&mut leave).unwrap();
        engine.add_render_object(&mut keep, &shader_v0(), mesh_object("kept", triangle())).unwrap();
        engine.add_render_object(&mut leave, &shader_v0(), mesh_object("gone", quad())).unwrap();
        assert_eq!(s.gl().live_buffers(), 4);

        engine.remove_instance(&mut leave).unwrap();
        assert_eq!(s.gl().live_buffers(), 2);
        assert_eq!(s.gl().live_programs(), 1);
        engine.render().unwrap();
    }

    #[test]
    fn failed_object_removal_still_detaches_the_instance() {
        let mut engine = RenderEngine::new();
        let s = surface("a");
        let (mut first, mut second) = (instance(&s), instance(&s));
        let slot = engine.add_instance(&mut first).unwrap();
        engine.add_instance(&mut second).unwrap();
        let gone = engine.add_render_object(&mut first, &shader_v0(), mesh_object("gone", triangle())).unwrap();
        engine.add_render_object(&mut second, &shader_v0(), mesh_object("kept", quad())).unwrap();
        engine.remove_instance(&mut first).unwrap();

        // an already-removed handle ahead of a live one
        second.world.objects.insert(0, gone);
        let err = engine.remove_instance(&mut second).unwrap_err();
        assert!(matches!(err, RenderError::CacheInconsistency(_)));
        assert!(!second.is_attached());
        assert!(second.world.objects().is_empty());
        assert!(engine.context(slot).is_none());
        assert_eq!((s.gl().live_vertex_arrays(), s.gl().live_programs()), (0, 0));
    }

    #[test]
    fn dump_lists_contexts_programs_and_objects() {
        let mut engine = RenderEngine::new();
        let s = surface("main");
        let mut i = instance(&s);
        engine.add_instance(&mut i).unwrap();
        engine.add_render_object(&mut i, &shader_v0(), mesh_object("tri", triangle())).unwrap();

        let dump = engine.debug_dump_shader_state();
        assert!(dump.starts_with("render engine: 1 context(s)"));
        assert!(dump.contains("context `main`"));
        assert!(dump.contains("1 attribute(s), 1 uniform(s), 1 object(s)"));
        assert!(dump.contains("`tri` loaded"));
    }
}
