use std::fmt;

use crate::error::{RenderError, Result};
use crate::gl::consts;

/// Primitive assembly mode of an indexed draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    pub fn from_raw(raw: u32) -> Result<Self> {
        Ok(match raw {
            consts::POINTS => Self::Points,
            consts::LINES => Self::Lines,
            consts::LINE_LOOP => Self::LineLoop,
            consts::LINE_STRIP => Self::LineStrip,
            consts::TRIANGLES => Self::Triangles,
            consts::TRIANGLE_STRIP => Self::TriangleStrip,
            consts::TRIANGLE_FAN => Self::TriangleFan,
            other => return Err(RenderError::UnsupportedTopology(other)),
        })
    }

    pub const fn raw(self) -> u32 {
        match self {
            Self::Points => consts::POINTS,
            Self::Lines => consts::LINES,
            Self::LineLoop => consts::LINE_LOOP,
            Self::LineStrip => consts::LINE_STRIP,
            Self::Triangles => consts::TRIANGLES,
            Self::TriangleStrip => consts::TRIANGLE_STRIP,
            Self::TriangleFan => consts::TRIANGLE_FAN,
        }
    }

    /// Number of primitives `index_count` indices assemble into.
    pub fn primitive_count(self, index_count: usize) -> Result<usize> {
        match self {
            Self::Triangles if index_count % 3 != 0 => Err(RenderError::MalformedIndices(format!(
                "{index_count} indices is not a multiple of 3 for triangles"
            ))),
            Self::Triangles => Ok(index_count / 3),
            Self::Lines if index_count % 2 != 0 => Err(RenderError::MalformedIndices(format!(
                "{index_count} indices is not a multiple of 2 for lines"
            ))),
            Self::Lines => Ok(index_count / 2),
            Self::LineStrip => Ok(index_count.saturating_sub(1)),
            Self::TriangleStrip | Self::TriangleFan => Ok(index_count.saturating_sub(2)),
            Self::Points | Self::LineLoop => Err(RenderError::UnsupportedTopology(self.raw())),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::LineLoop => "line-loop",
            Self::LineStrip => "line-strip",
            Self::Triangles => "triangles",
            Self::TriangleStrip => "triangle-strip",
            Self::TriangleFan => "triangle-fan",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_counts() {
        assert_eq!(Topology::Triangles.primitive_count(9), Ok(3));
        assert_eq!(Topology::Lines.primitive_count(6), Ok(3));
        assert_eq!(Topology::LineStrip.primitive_count(4), Ok(3));
        assert_eq!(Topology::TriangleStrip.primitive_count(5), Ok(3));
        assert_eq!(Topology::TriangleFan.primitive_count(1), Ok(0));
        assert_eq!(Topology::LineStrip.primitive_count(0), Ok(0));
    }

    #[test]
    fn ragged_index_lengths_are_rejected() {
        assert!(matches!(
            Topology::Triangles.primitive_count(4),
            Err(RenderError::MalformedIndices(_))
        ));
        assert!(matches!(Topology::Lines.primitive_count(3), Err(RenderError::MalformedIndices(_))));
    }

    #[test]
    fn points_and_loops_are_unsupported() {
        assert_eq!(
            Topology::Points.primitive_count(3),
            Err(RenderError::UnsupportedTopology(consts::POINTS))
        );
        assert_eq!(
            Topology::LineLoop.primitive_count(3),
            Err(RenderError::UnsupportedTopology(consts::LINE_LOOP))
        );
    }

    #[test]
    fn raw_round_trip_and_unknown() {
        assert_eq!(Topology::from_raw(consts::TRIANGLE_FAN), Ok(Topology::TriangleFan));
        assert_eq!(Topology::from_raw(0x99), Err(RenderError::UnsupportedTopology(0x99)));
    }
}
