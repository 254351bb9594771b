use std::fmt;
use std::rc::Rc;

use bytemuck::Pod;
use log::debug;
use rustc_hash::FxHashMap;

use crate::data::{DataId, SharedData};
use crate::error::{RenderError, Result};
use crate::gl::{consts, BufferTarget, Gl};
use crate::shader::{self, Shader, ShaderKey, ShaderSources};

#[derive(Debug, Copy, Clone)]
struct CachedBuffer<B> {
    buffer: B,
    byte_len: usize,
    users: usize,
}

/// Per-context GPU object cache.
///
/// At most one program per shader source pair and at most one buffer per
/// (target, data identity) pair are ever created through one cache.
/// Buffers are counted per user and deleted when the last one lets go;
/// programs live until [`release`](ResourceCache::release).
pub struct ResourceCache<G: Gl> {
    gl: Rc<G>,
    shaders: FxHashMap<ShaderKey, Rc<Shader<G>>>,
    buffers: FxHashMap<(BufferTarget, DataId), CachedBuffer<G::Buffer>>,
}

impl<G: Gl> ResourceCache<G> {
    pub fn new(gl: Rc<G>) -> Self {
        Self { gl, shaders: FxHashMap::default(), buffers: FxHashMap::default() }
    }

    #[inline]
    pub fn gl(&self) -> &G {
        &self.gl
    }

    #[inline]
    pub fn gl_rc(&self) -> Rc<G> {
        Rc::clone(&self.gl)
    }

    /// Returns the program built from `sources`, building it on first use.
    pub fn get_or_create_shader(&mut self, sources: &ShaderSources) -> Result<Rc<Shader<G>>> {
        let key = sources.key();
        if let Some(shader) = self.shaders.get(&key) {
            if shader.sources() != sources {
                return Err(RenderError::CacheInconsistency(format!(
                    "shader key {key} maps to different sources"
                )));
            }
            debug!("shader cache hit {key}");
            return Ok(Rc::clone(shader));
        }

        let shader = Rc::new(shader::build(&*self.gl, sources)?);
        debug!("shader cache miss {key}: built program {:?}", shader.program());
        self.shaders.insert(key, Rc::clone(&shader));
        Ok(shader)
    }

    /// Returns the buffer holding `data` on `target`, allocating and
    /// uploading it on first use. The buffer is left bound to `target`.
    ///
    /// Every successful call takes one use; pair it with
    /// [`release_buffer`](ResourceCache::release_buffer).
    pub fn get_or_create_buffer<T: Pod>(
        &mut self,
        target: BufferTarget,
        data: &SharedData<T>,
    ) -> Result<G::Buffer> {
        let key = (target, data.id());
        let bytes = data.as_bytes();

        if let Some(cached) = self.buffers.get_mut(&key) {
            if cached.byte_len != bytes.len() {
                return Err(RenderError::CacheInconsistency(format!(
                    "{} on {target:?} cached with {} bytes, now {} bytes",
                    data.id(),
                    cached.byte_len,
                    bytes.len()
                )));
            }
            cached.users += 1;
            self.gl.bind_buffer(target, Some(cached.buffer));
            return Ok(cached.buffer);
        }

        let buffer = self
            .gl
            .create_buffer()
            .map_err(|reason| RenderError::GpuAllocation { what: "buffer", reason })?;
        self.gl.bind_buffer(target, Some(buffer));
        self.gl.buffer_data(target, bytes, consts::STATIC_DRAW);
        debug!("allocated {target:?} buffer {buffer:?} for {} ({} bytes)", data.id(), bytes.len());

        self.buffers.insert(key, CachedBuffer { buffer, byte_len: bytes.len(), users: 1 });
        Ok(buffer)
    }

    /// Drops one use of the buffer for `(target, id)`. Returns `true` when
    /// that was the last use and the buffer was deleted.
    pub fn release_buffer(&mut self, target: BufferTarget, id: DataId) -> bool {
        let key = (target, id);
        let Some(cached) = self.buffers.get_mut(&key) else {
            debug!("release of uncached {id} on {target:?} ignored");
            return false;
        };
        cached.users = cached.users.saturating_sub(1);
        if cached.users > 0 {
            return false;
        }
        let buffer = cached.buffer;
        self.buffers.remove(&key);
        self.gl.delete_buffer(buffer);
        debug!("deleted {target:?} buffer {buffer:?} for {id}");
        true
    }

    pub fn contains_buffer(&self, target: BufferTarget, id: DataId) -> bool {
        self.buffers.contains_key(&(target, id))
    }

    pub fn contains_shader(&self, sources: &ShaderSources) -> bool {
        self.shaders.contains_key(&sources.key())
    }

    #[inline]
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Deletes every cached program and buffer.
    pub fn release(&mut self) {
        for (_, shader) in self.shaders.drain() {
            shader.release(&self.gl);
        }
        for (_, cached) in self.buffers.drain() {
            self.gl.delete_buffer(cached.buffer);
        }
    }
}

impl<G: Gl> fmt::Debug for ResourceCache<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("shaders", &self.shaders.len())
            .field("buffers", &self.buffers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{FakeProgram, GlCall, GlType, HeadlessGl};

    fn cache() -> (Rc<HeadlessGl>, ResourceCache<HeadlessGl>) {
        let gl = Rc::new(HeadlessGl::new());
        (Rc::clone(&gl), ResourceCache::new(gl))
    }

    // ── buffers ───────────────────────────────────────────────────────────

    #[test]
    fn same_key_returns_same_buffer() {
        let (gl, mut cache) = cache();
        let data = SharedData::from(vec![1.0f32, 2.0]);

        let a = cache.get_or_create_buffer(BufferTarget::Array, &data).unwrap();
        let b = cache.get_or_create_buffer(BufferTarget::Array, &data.clone()).unwrap();
        assert_eq!(a, b);
        assert_eq!(gl.count_calls(|c| matches!(c, GlCall::CreateBuffer(_))), 1);
        assert_eq!(gl.count_calls(|c| matches!(c, GlCall::BufferData { .. })), 1);
    }

    #[test]
    fn different_data_gets_distinct_buffer() {
        let (_gl, mut cache) = cache();
        let a = cache
            .get_or_create_buffer(BufferTarget::Array, &SharedData::from(vec![1.0f32]))
            .unwrap();
        let b = cache
            .get_or_create_buffer(BufferTarget::Array, &SharedData::from(vec![1.0f32]))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn target_is_part_of_the_key() {
        let (_gl, mut cache) = cache();
        let data = SharedData::from(vec![0u16, 1, 2]);
        let a = cache.get_or_create_buffer(BufferTarget::Array, &data).unwrap();
        let b = cache.get_or_create_buffer(BufferTarget::ElementArray, &data).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.buffer_count(), 2);
    }

    #[test]
    fn hit_rebinds_the_buffer() {
        let (gl, mut cache) = cache();
        let data = SharedData::from(vec![0u16, 1, 2]);
        let buf = cache.get_or_create_buffer(BufferTarget::ElementArray, &data).unwrap();
        gl.take_calls();

        cache.get_or_create_buffer(BufferTarget::ElementArray, &data).unwrap();
        assert_eq!(
            gl.calls(),
            vec![GlCall::BindBuffer { target: BufferTarget::ElementArray, buffer: Some(buf) }]
        );
    }

    #[test]
    fn upload_carries_the_bytes() {
        let (gl, mut cache) = cache();
        let data = SharedData::from(vec![7u16, 8]);
        let buf = cache.get_or_create_buffer(BufferTarget::ElementArray, &data).unwrap();
        assert_eq!(gl.buffer_contents(buf), Some(data.as_bytes().to_vec()));
    }

    #[test]
    fn buffer_lives_until_its_last_user_releases_it() {
        let (gl, mut cache) = cache();
        let data = SharedData::from(vec![1.0f32, 2.0]);
        cache.get_or_create_buffer(BufferTarget::Array, &data).unwrap();
        cache.get_or_create_buffer(BufferTarget::Array, &data).unwrap();

        assert!(!cache.release_buffer(BufferTarget::Array, data.id()));
        assert_eq!(gl.live_buffers(), 1);
        assert!(cache.release_buffer(BufferTarget::Array, data.id()));
        assert_eq!(gl.live_buffers(), 0);
        assert!(!cache.contains_buffer(BufferTarget::Array, data.id()));
        assert!(!cache.release_buffer(BufferTarget::Array, data.id()));
    }

    // ── shaders ───────────────────────────────────────────────────────────

    #[test]
    fn shader_built_once_per_source() {
        let (gl, mut cache) = cache();
        let src = ShaderSources::new("v", "f");
        gl.define_program("v", "f", FakeProgram::new().attribute("p", GlType::FloatVec2, 1));

        let a = cache.get_or_create_shader(&src).unwrap();
        let b = cache.get_or_create_shader(&src.clone()).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(gl.count_calls(|c| matches!(c, GlCall::LinkProgram(_))), 1);
    }

    #[test]
    fn failed_build_is_not_cached() {
        let (gl, mut cache) = cache();
        let src = ShaderSources::new("v", "f");
        assert!(cache.get_or_create_shader(&src).is_err());
        assert!(!cache.contains_shader(&src));

        gl.define_program("v", "f", FakeProgram::new());
        assert!(cache.get_or_create_shader(&src).is_ok());
    }

    #[test]
    fn release_deletes_everything() {
        let (gl, mut cache) = cache();
        gl.define_program("v", "f", FakeProgram::new());
        cache.get_or_create_shader(&ShaderSources::new("v", "f")).unwrap();
        cache
            .get_or_create_buffer(BufferTarget::Array, &SharedData::from(vec![1.0f32]))
            .unwrap();

        cache.release();
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_buffers(), 0);
        assert_eq!(cache.buffer_count(), 0);
    }
}
