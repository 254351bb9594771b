use std::fmt::{self, Write as _};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use rustc_hash::FxHashMap;

use super::cache::ResourceCache;
use super::object::RenderObject;
use super::surface::Surface;
use crate::error::{RenderError, Result};
use crate::gl::Gl;
use crate::shader::{Shader, ShaderKey, ShaderSources};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(0);

/// Identifier of a registered render object. Unique across every context
/// in the process, so an id never names a different object after its own
/// is removed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct ShaderBucket<G: Gl> {
    shader: Rc<Shader<G>>,
    objects: Vec<(ObjectId, Box<dyn RenderObject<G>>)>,
}

/// All GPU state drawn into one surface: a resource cache plus render
/// objects grouped by the shader they draw with.
pub struct RenderContext<G: Gl> {
    surface: Rc<Surface<G>>,
    cache: ResourceCache<G>,
    buckets: Vec<ShaderBucket<G>>,
    bucket_index: FxHashMap<ShaderKey, usize>,
    /// Instances currently drawing through this context.
    pub(crate) instances: usize,
}

impl<G: Gl> RenderContext<G> {
    pub fn new(surface: Rc<Surface<G>>) -> Self {
        info!("render context created for surface `{}` ({})", surface.label(), surface.id());
        let cache = ResourceCache::new(Rc::clone(surface.gl()));
        Self {
            surface,
            cache,
            buckets: Vec::new(),
            bucket_index: FxHashMap::default(),
            instances: 0,
        }
    }

    #[inline]
    pub fn surface(&self) -> &Rc<Surface<G>> {
        &self.surface
    }

    #[inline]
    pub fn cache(&self) -> &ResourceCache<G> {
        &self.cache
    }

    #[inline]
    pub fn cache_mut(&mut self) -> &mut ResourceCache<G> {
        &mut self.cache
    }

    pub fn object_count(&self) -> usize {
        self.buckets.iter().map(|b| b.objects.len()).sum()
    }

    /// Loads `object` against the program for `sources` and appends it to
    /// that program's bucket.
    pub fn register(
        &mut self,
        sources: &ShaderSources,
        mut object: Box<dyn RenderObject<G>>,
    ) -> Result<ObjectId> {
        let shader = self.cache.get_or_create_shader(sources)?;
        object.load(&mut self.cache, &shader)?;

        let key = sources.key();
        let bucket = match self.bucket_index.get(&key) {
            Some(&i) => i,
            None => {
                self.buckets.push(ShaderBucket { shader, objects: Vec::new() });
                self.bucket_index.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };

        let id = ObjectId::next();
        debug!("registered `{}` as {:?} in bucket {bucket}", object.label(), id);
        self.buckets[bucket].objects.push((id, object));
        Ok(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&dyn RenderObject<G>> {
        self.buckets
            .iter()
            .flat_map(|b| b.objects.iter())
            .find(|(oid, _)| *oid == id)
            .map(|(_, o)| o.as_ref())
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut (dyn RenderObject<G> + 'static)> {
        self.buckets
            .iter_mut()
            .flat_map(|b| b.objects.iter_mut())
            .find(|(oid, _)| *oid == id)
            .map(|(_, o)| o.as_mut())
    }

    /// Removes and releases one object.
    pub fn remove(&mut self, id: ObjectId) -> Result<()> {
        for bucket in &mut self.buckets {
            if let Some(pos) = bucket.objects.iter().position(|(oid, _)| *oid == id) {
                let (_, mut object) = bucket.objects.remove(pos);
                object.release(&mut self.cache);
                return Ok(());
            }
        }
        Err(RenderError::CacheInconsistency(format!("no render object {id:?} in this context")))
    }

    /// Binds each bucket's program once and draws its objects in insertion
    /// order.
    pub fn render(&self) -> Result<()> {
        let gl = self.cache.gl();
        for bucket in &self.buckets {
            if bucket.objects.is_empty() {
                continue;
            }
            gl.use_program(Some(bucket.shader.program()));
            for (_, object) in &bucket.objects {
                object.render(gl)?;
            }
        }
        Ok(())
    }

    /// Releases every object, program and buffer of this context.
    pub fn release(&mut self) {
        for bucket in &mut self.buckets {
            for (_, object) in &mut bucket.objects {
                object.release(&mut self.cache);
            }
        }
        self.buckets.clear();
        self.bucket_index.clear();
        self.cache.release();
        info!("render context for surface `{}` released", self.surface.label());
    }

    pub(crate) fn dump(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "context `{}` ({}): {} instance(s), {} shader(s), {} buffer(s)",
            self.surface.label(),
            self.surface.id(),
            self.instances,
            self.cache.shader_count(),
            self.cache.buffer_count(),
        );
        for bucket in &self.buckets {
            let d = bucket.shader.descriptions();
            let _ = writeln!(
                out,
                "  program {:?} [{}]: {} attribute(s), {} uniform(s), {} object(s)",
                bucket.shader.program(),
                bucket.shader.sources().key(),
                d.attributes.len(),
                d.uniforms.len(),
                bucket.objects.len(),
            );
            for (id, object) in &bucket.objects {
                let state = if object.is_loaded() { "loaded" } else { "unloaded" };
                let _ = writeln!(out, "    {:?} `{}` {state}", id, object.label());
            }
        }
    }
}

impl<G: Gl> fmt::Debug for RenderContext<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("surface", &self.surface.id())
            .field("cache", &self.cache)
            .field("buckets", &self.buckets.len())
            .field("instances", &self.instances)
            .finish()
    }
}
