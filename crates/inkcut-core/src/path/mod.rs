//! Path model
//!
//! A [`PathModel`] is an ordered list of [`Subpath`]s. Every subpath starts
//! with a [`Segment::MoveTo`] followed by any number of drawing segments.
//! Coordinates are absolute px user units. Operations on a model always
//! return a new model; nothing here mutates shared geometry in place.

pub mod geometry;

pub use geometry::{Point, Rect, Transform};

use serde::{Deserialize, Serialize};

/// A single path element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Start a new subpath at the point (tool up)
    MoveTo { to: Point },
    /// Straight line to the point
    LineTo { to: Point },
    /// Quadratic bezier with one control point
    QuadTo { ctrl: Point, to: Point },
    /// Cubic bezier with two control points
    CubicTo { ctrl1: Point, ctrl2: Point, to: Point },
}

impl Segment {
    pub fn move_to(to: Point) -> Self {
        Segment::MoveTo { to }
    }

    pub fn line_to(to: Point) -> Self {
        Segment::LineTo { to }
    }

    /// End point of the segment
    pub fn end(&self) -> Point {
        match *self {
            Segment::MoveTo { to }
            | Segment::LineTo { to }
            | Segment::QuadTo { to, .. }
            | Segment::CubicTo { to, .. } => to,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Segment::MoveTo { .. })
    }

    pub fn is_curve(&self) -> bool {
        matches!(self, Segment::QuadTo { .. } | Segment::CubicTo { .. })
    }

    /// Apply a transform to every point of the segment
    pub fn transformed(&self, t: &Transform) -> Segment {
        match *self {
            Segment::MoveTo { to } => Segment::MoveTo { to: t.map(to) },
            Segment::LineTo { to } => Segment::LineTo { to: t.map(to) },
            Segment::QuadTo { ctrl, to } => Segment::QuadTo {
                ctrl: t.map(ctrl),
                to: t.map(to),
            },
            Segment::CubicTo { ctrl1, ctrl2, to } => Segment::CubicTo {
                ctrl1: t.map(ctrl1),
                ctrl2: t.map(ctrl2),
                to: t.map(to),
            },
        }
    }

    /// All points of the segment, control points included
    fn points(&self) -> impl Iterator<Item = Point> {
        let pts: [Option<Point>; 3] = match *self {
            Segment::MoveTo { to } | Segment::LineTo { to } => [Some(to), None, None],
            Segment::QuadTo { ctrl, to } => [Some(ctrl), Some(to), None],
            Segment::CubicTo { ctrl1, ctrl2, to } => [Some(ctrl1), Some(ctrl2), Some(to)],
        };
        pts.into_iter().flatten()
    }
}

/// Error returned when building a subpath from an invalid segment list
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubpathError {
    #[error("subpath has no segments")]
    Empty,
    #[error("subpath must start with a MoveTo")]
    MissingMoveTo,
    #[error("MoveTo is only allowed as the first segment of a subpath")]
    InteriorMoveTo,
}

/// A contiguous run of segments starting with a MoveTo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Segment>", into = "Vec<Segment>")]
pub struct Subpath {
    segments: Vec<Segment>,
}

impl Subpath {
    /// Start a new subpath at `start`
    pub fn new(start: Point) -> Self {
        Self {
            segments: vec![Segment::move_to(start)],
        }
    }

    /// Subpath through the given points, or `None` when `points` is empty
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut subpath = Subpath::new(iter.next()?);
        for p in iter {
            subpath.line_to(p);
        }
        Some(subpath)
    }

    pub fn line_to(&mut self, to: Point) -> &mut Self {
        self.segments.push(Segment::LineTo { to });
        self
    }

    pub fn quad_to(&mut self, ctrl: Point, to: Point) -> &mut Self {
        self.segments.push(Segment::QuadTo { ctrl, to });
        self
    }

    pub fn cubic_to(&mut self, ctrl1: Point, ctrl2: Point, to: Point) -> &mut Self {
        self.segments.push(Segment::CubicTo { ctrl1, ctrl2, to });
        self
    }

    /// Append a drawing segment. A MoveTo is converted into a LineTo.
    pub fn push(&mut self, segment: Segment) -> &mut Self {
        let segment = match segment {
            Segment::MoveTo { to } => Segment::LineTo { to },
            other => other,
        };
        self.segments.push(segment);
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Drawing segments after the initial MoveTo
    pub fn drawing_segments(&self) -> &[Segment] {
        &self.segments[1..]
    }

    pub fn start(&self) -> Point {
        self.segments[0].end()
    }

    pub fn end(&self) -> Point {
        self.segments[self.segments.len() - 1].end()
    }

    /// Number of segments including the MoveTo
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// A subpath always holds its MoveTo, so it is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the subpath consists of a single point
    pub fn is_point(&self) -> bool {
        self.segments.len() == 1
    }

    /// Whether the end returns to the start within `tolerance`
    pub fn is_closed(&self, tolerance: f64) -> bool {
        !self.is_point() && self.start().distance_to(self.end()) <= tolerance
    }

    /// Bounding box of all points, control points included
    pub fn bounding_rect(&self) -> Rect {
        let start = Rect::from_point(self.start());
        self.segments
            .iter()
            .flat_map(Segment::points)
            .fold(start, Rect::include)
    }

    /// Same geometry traversed end to start
    pub fn reversed(&self) -> Subpath {
        let mut out = Subpath::new(self.end());
        for (i, seg) in self.segments.iter().enumerate().skip(1).rev() {
            let prev = self.segments[i - 1].end();
            let reversed = match *seg {
                Segment::QuadTo { ctrl, .. } => Segment::QuadTo { ctrl, to: prev },
                Segment::CubicTo { ctrl1, ctrl2, .. } => Segment::CubicTo {
                    ctrl1: ctrl2,
                    ctrl2: ctrl1,
                    to: prev,
                },
                _ => Segment::LineTo { to: prev },
            };
            out.segments.push(reversed);
        }
        out
    }

    pub fn transformed(&self, t: &Transform) -> Subpath {
        Subpath {
            segments: self.segments.iter().map(|s| s.transformed(t)).collect(),
        }
    }
}

impl TryFrom<Vec<Segment>> for Subpath {
    type Error = SubpathError;

    fn try_from(segments: Vec<Segment>) -> Result<Self, Self::Error> {
        match segments.first() {
            None => return Err(SubpathError::Empty),
            Some(first) if !first.is_move() => return Err(SubpathError::MissingMoveTo),
            _ => {}
        }
        if segments[1..].iter().any(Segment::is_move) {
            return Err(SubpathError::InteriorMoveTo);
        }
        Ok(Self { segments })
    }
}

impl From<Subpath> for Vec<Segment> {
    fn from(subpath: Subpath) -> Self {
        subpath.segments
    }
}

/// Ordered collection of subpaths
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathModel {
    subpaths: Vec<Subpath>,
}

impl PathModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subpaths(subpaths: Vec<Subpath>) -> Self {
        Self { subpaths }
    }

    /// Build a model from a flat segment stream
    ///
    /// Each MoveTo starts a new subpath. A stream that begins with a drawing
    /// segment implicitly starts at the origin.
    pub fn from_segments<I: IntoIterator<Item = Segment>>(segments: I) -> Self {
        let mut subpaths: Vec<Subpath> = Vec::new();
        for seg in segments {
            match (seg, subpaths.last_mut()) {
                (Segment::MoveTo { to }, _) => subpaths.push(Subpath::new(to)),
                (other, Some(current)) => {
                    current.segments.push(other);
                }
                (other, None) => {
                    let mut first = Subpath::new(Point::zero());
                    first.segments.push(other);
                    subpaths.push(first);
                }
            }
        }
        Self { subpaths }
    }

    /// Model made of one open polyline per entry
    pub fn from_polylines<P: AsRef<[Point]>>(polylines: &[P]) -> Self {
        Self {
            subpaths: polylines
                .iter()
                .filter_map(|pts| Subpath::from_points(pts.as_ref().iter().copied()))
                .collect(),
        }
    }

    pub fn push(&mut self, subpath: Subpath) {
        self.subpaths.push(subpath);
    }

    pub fn subpaths(&self) -> &[Subpath] {
        &self.subpaths
    }

    pub fn into_subpaths(self) -> Vec<Subpath> {
        self.subpaths
    }

    /// Flat iterator over every segment of every subpath
    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.subpaths.iter().flat_map(|s| s.segments.iter())
    }

    pub fn len(&self) -> usize {
        self.subpaths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }

    /// Bounding box of the whole model, `None` when empty
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.subpaths
            .iter()
            .map(Subpath::bounding_rect)
            .reduce(Rect::union)
    }

    pub fn transformed(&self, t: &Transform) -> PathModel {
        Self {
            subpaths: self.subpaths.iter().map(|s| s.transformed(t)).collect(),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> PathModel {
        self.transformed(&Transform::translation(dx, dy))
    }

    /// Append a lone tool-up move
    pub fn move_to(&mut self, to: Point) {
        self.subpaths.push(Subpath::new(to));
    }
}

impl FromIterator<Subpath> for PathModel {
    fn from_iter<T: IntoIterator<Item = Subpath>>(iter: T) -> Self {
        Self {
            subpaths: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PathModel {
    type Item = Subpath;
    type IntoIter = std::vec::IntoIter<Subpath>;

    fn into_iter(self) -> Self::IntoIter {
        self.subpaths.into_iter()
    }
}
