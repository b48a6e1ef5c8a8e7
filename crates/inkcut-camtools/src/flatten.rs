//! Curve flattening
//!
//! Converts subpaths into polylines. Bezier segments are sampled with
//! `lyon` at a uniform parameter step chosen from the flattening tolerance
//! (Wang's bound on the second difference of the control polygon).

use inkcut_core::{PathModel, Point, Segment, Subpath};
use lyon::geom::{self, CubicBezierSegment, QuadraticBezierSegment};

/// Flattening tolerance in px at quality factor 1
pub const DEFAULT_TOLERANCE: f64 = 0.5;

const MAX_CURVE_STEPS: usize = 4096;

/// Tolerance to use for a given quality factor. Higher quality means more points.
pub fn tolerance_for(quality_factor: f64) -> f64 {
    if quality_factor > 0.0 {
        DEFAULT_TOLERANCE / quality_factor
    } else {
        DEFAULT_TOLERANCE
    }
}

/// A flattened point together with the unit tangent of the path arriving at it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatPoint {
    pub point: Point,
    pub tangent: Point,
}

fn lp(p: Point) -> geom::Point<f64> {
    geom::point(p.x, p.y)
}

fn from_lp(p: geom::Point<f64>) -> Point {
    Point::new(p.x, p.y)
}

fn steps_for(second_difference: f64, factor: f64, tolerance: f64) -> usize {
    let n = (factor * second_difference / (8.0 * tolerance)).sqrt().ceil();
    if n.is_finite() {
        (n as usize).clamp(1, MAX_CURVE_STEPS)
    } else {
        1
    }
}

/// Sample a drawing segment starting at `from`
///
/// Returns `(point, tangent)` for each step, excluding `from` itself.
fn sample_segment(from: Point, segment: &Segment, tolerance: f64) -> Vec<(Point, Point)> {
    match *segment {
        Segment::MoveTo { to } | Segment::LineTo { to } => {
            vec![(to, (to - from).normalized())]
        }
        Segment::QuadTo { ctrl, to } => {
            let curve = QuadraticBezierSegment {
                from: lp(from),
                ctrl: lp(ctrl),
                to: lp(to),
            };
            let dd = (from - ctrl * 2.0 + to).length();
            let n = steps_for(dd, 2.0, tolerance);
            sample_curve(n, from, |t| {
                let d = curve.derivative(t);
                (from_lp(curve.sample(t)), Point::new(d.x, d.y))
            })
        }
        Segment::CubicTo { ctrl1, ctrl2, to } => {
            let curve = CubicBezierSegment {
                from: lp(from),
                ctrl1: lp(ctrl1),
                ctrl2: lp(ctrl2),
                to: lp(to),
            };
            let dd = (from - ctrl1 * 2.0 + ctrl2)
                .length()
                .max((ctrl1 - ctrl2 * 2.0 + to).length());
            let n = steps_for(dd, 6.0, tolerance);
            sample_curve(n, from, |t| {
                let d = curve.derivative(t);
                (from_lp(curve.sample(t)), Point::new(d.x, d.y))
            })
        }
    }
}

fn sample_curve<F>(n: usize, from: Point, eval: F) -> Vec<(Point, Point)>
where
    F: Fn(f64) -> (Point, Point),
{
    let mut out = Vec::with_capacity(n);
    let mut prev = from;
    for k in 1..=n {
        let (p, d) = eval(k as f64 / n as f64);
        let tangent = if d.length() > f64::EPSILON {
            d.normalized()
        } else {
            (p - prev).normalized()
        };
        out.push((p, tangent));
        prev = p;
    }
    out
}

/// Unit tangent of `segment` leaving `from` at parameter 0
pub fn start_tangent(from: Point, segment: &Segment) -> Point {
    let candidates: [Point; 3] = match *segment {
        Segment::MoveTo { to } | Segment::LineTo { to } => [to, to, to],
        Segment::QuadTo { ctrl, to } => [ctrl, to, to],
        Segment::CubicTo { ctrl1, ctrl2, to } => [ctrl1, ctrl2, to],
    };
    candidates
        .into_iter()
        .map(|c| c - from)
        .find(|v| v.length() > f64::EPSILON)
        .map(Point::normalized)
        .unwrap_or_default()
}

/// Unit tangent of `segment` arriving at its end point
pub fn end_tangent(from: Point, segment: &Segment) -> Point {
    let (end, candidates): (Point, [Point; 3]) = match *segment {
        Segment::MoveTo { to } | Segment::LineTo { to } => (to, [from, from, from]),
        Segment::QuadTo { ctrl, to } => (to, [ctrl, from, from]),
        Segment::CubicTo { ctrl1, ctrl2, to } => (to, [ctrl2, ctrl1, from]),
    };
    candidates
        .into_iter()
        .map(|c| end - c)
        .find(|v| v.length() > f64::EPSILON)
        .map(Point::normalized)
        .unwrap_or_default()
}

/// Flatten a subpath, keeping the arrival tangent of every point
///
/// The first point carries the departure tangent of the subpath. A zero
/// length step inherits the previous tangent.
pub fn flatten_with_tangents(subpath: &Subpath, tolerance: f64) -> Vec<FlatPoint> {
    let start = subpath.start();
    let mut out = Vec::with_capacity(subpath.len());
    out.push(FlatPoint {
        point: start,
        tangent: Point::zero(),
    });
    let mut current = start;
    let mut last_tangent = Point::zero();
    for segment in subpath.drawing_segments() {
        for (point, tangent) in sample_segment(current, segment, tolerance) {
            let tangent = if tangent.length() > 0.0 {
                tangent
            } else {
                last_tangent
            };
            out.push(FlatPoint { point, tangent });
            last_tangent = tangent;
        }
        current = segment.end();
    }
    if let Some(first_tangent) = out.iter().skip(1).map(|f| f.tangent).find(|t| t.length() > 0.0) {
        out[0].tangent = first_tangent;
    }
    out
}

/// Flatten a subpath into a polyline
pub fn flatten_subpath(subpath: &Subpath, tolerance: f64) -> Vec<Point> {
    flatten_with_tangents(subpath, tolerance)
        .into_iter()
        .map(|f| f.point)
        .collect()
}

/// Flatten every subpath of a model into polylines
pub fn to_polylines(model: &PathModel, tolerance: f64) -> Vec<Vec<Point>> {
    model
        .subpaths()
        .iter()
        .map(|s| flatten_subpath(s, tolerance))
        .collect()
}

/// Total length of a polyline
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(w[1])).sum()
}
