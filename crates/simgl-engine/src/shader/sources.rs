use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Vertex + fragment GLSL pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self { vertex: vertex.into(), fragment: fragment.into() }
    }

    /// Cache key of this source pair.
    pub fn key(&self) -> ShaderKey {
        let mut h = FxHasher::default();
        self.hash(&mut h);
        ShaderKey(h.finish())
    }
}

/// Hash of a [`ShaderSources`] pair.
///
/// Two different pairs may in principle hash equal; the resource cache
/// detects that and reports it instead of handing out the wrong program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderKey(pub u64);

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Flat-color shader: `position` (vec2) transformed by `mvp` (mat4), filled red.
pub const SHADER_V0_VERTEX: &str = "#version 300 es
in vec2 position;
uniform mat4 mvp;

void main() {
    gl_Position = mvp * vec4(position, 0, 1);
}
";

pub const SHADER_V0_FRAGMENT: &str = "#version 300 es
precision highp float;
out vec4 ocolor;

void main() {
    ocolor = vec4(1, 0, 0, 1);
}
";

pub fn shader_v0() -> ShaderSources {
    ShaderSources::new(SHADER_V0_VERTEX, SHADER_V0_FRAGMENT)
}
