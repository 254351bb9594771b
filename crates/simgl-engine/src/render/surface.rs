use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::error::{RenderError, Result};
use crate::gl::Gl;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a drawable surface. Render contexts are deduplicated by it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// A drawable target and the GPU context obtained from it.
///
/// Shared between every instance that draws into it.
pub struct Surface<G: Gl> {
    id: SurfaceId,
    label: String,
    gl: Rc<G>,
    size: Cell<(u32, u32)>,
}

impl<G: Gl> Surface<G> {
    /// Obtains a GPU context from `provider`.
    ///
    /// Fails with `GpuContextUnavailable` when the provider yields none.
    pub fn acquire(
        label: impl Into<String>,
        width: u32,
        height: u32,
        provider: impl FnOnce() -> Option<G>,
    ) -> Result<Rc<Self>> {
        let label = label.into();
        let gl = provider().ok_or_else(|| RenderError::GpuContextUnavailable(label.clone()))?;
        Ok(Rc::new(Self::new(label, width, height, Rc::new(gl))))
    }

    /// Wraps an existing context. Surfaces sharing one `gl` still get
    /// distinct identities.
    pub fn new(label: impl Into<String>, width: u32, height: u32, gl: Rc<G>) -> Self {
        let id = SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed));
        let label = label.into();
        debug!("surface `{label}` ({id}) {width}x{height}");
        Self { id, label, gl, size: Cell::new((width, height)) }
    }

    #[inline]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn gl(&self) -> &Rc<G> {
        &self.gl
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    pub fn resize(&self, width: u32, height: u32) {
        if self.size.replace((width, height)) != (width, height) {
            debug!("surface `{}` resized to {width}x{height}", self.label);
        }
    }
}

impl<G: Gl> fmt::Debug for Surface<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("size", &self.size.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessGl;

    #[test]
    fn missing_context_is_fatal() {
        let err = Surface::<HeadlessGl>::acquire("canvas", 10, 10, || None).unwrap_err();
        assert_eq!(err, RenderError::GpuContextUnavailable("canvas".into()));
    }

    #[test]
    fn surfaces_have_distinct_ids() {
        let a = Surface::acquire("a", 1, 1, || Some(HeadlessGl::new())).unwrap();
        let b = Surface::acquire("b", 1, 1, || Some(HeadlessGl::new())).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn resize_updates_size() {
        let s = Surface::acquire("a", 1, 1, || Some(HeadlessGl::new())).unwrap();
        s.resize(640, 480);
        assert_eq!(s.size(), (640, 480));
    }
}
