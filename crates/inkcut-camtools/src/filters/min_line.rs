//! Short segment simplification
//!
//! Three independent passes, applied in order when their threshold is set:
//!
//! * `min_jump`: a tool lift shorter than this is dropped and the cut
//!   continues straight to the next point.
//! * `min_edge`: interior line vertices closer than this to the previous
//!   point are dropped.
//! * `min_shift`: a very short line joining two longer strokes is dropped
//!   when going through it costs more turning than going straight past it.
//!   Without this a blade offset filter swings a half circle around every
//!   such stub.
//!
//! All distances are px.

use super::PathFilter;
use crate::flatten::{end_tangent, start_tangent};
use inkcut_core::{PathModel, Point, Segment};
use serde::{Deserialize, Serialize};

/// Extra turning, in degrees, a short line must cost before it is removed
pub const ANGLE_CONFIG: f64 = 90.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinLineConfig {
    pub min_jump: f64,
    pub min_edge: f64,
    pub min_shift: f64,
}

#[derive(Debug, Clone)]
pub struct MinLineFilter {
    config: MinLineConfig,
}

/// Wrap an angle in degrees into `[-180, 180]`
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }
    angle
}

fn abs_angle(a1: f64, a2: f64) -> f64 {
    normalize_angle(a1 - a2).abs()
}

impl MinLineFilter {
    pub fn new(config: MinLineConfig) -> Self {
        Self { config }
    }

    fn apply_min_jump(&self, segments: &[Segment]) -> Vec<Segment> {
        let min_sq = self.config.min_jump * self.config.min_jump;
        let mut result = Vec::with_capacity(segments.len());
        let mut last_pos: Option<Point> = None;
        for seg in segments {
            if let (Segment::MoveTo { to }, Some(last)) = (seg, last_pos) {
                let d = *to - last;
                if d.dot(d) < min_sq {
                    continue;
                }
            }
            result.push(*seg);
            last_pos = Some(seg.end());
        }
        result
    }

    fn apply_min_edge(&self, segments: &[Segment]) -> Vec<Segment> {
        let min_sq = self.config.min_edge * self.config.min_edge;
        let mut result = Vec::with_capacity(segments.len());
        let mut last_pos: Option<Point> = None;
        for (i, seg) in segments.iter().enumerate() {
            if let (Segment::LineTo { to }, Some(last)) = (seg, last_pos) {
                let interior = segments.get(i + 1).is_some_and(|next| !next.is_move());
                let d = *to - last;
                if interior && d.dot(d) < min_sq {
                    continue;
                }
            }
            result.push(*seg);
            last_pos = Some(seg.end());
        }
        result
    }

    fn apply_min_shift(&self, segments: &[Segment]) -> Vec<Segment> {
        let min_sq = self.config.min_shift * self.config.min_shift;
        let mut result = Vec::with_capacity(segments.len());
        let mut current = Point::zero();
        let mut last_angle: Option<f64> = None;

        for (i, seg) in segments.iter().enumerate() {
            match *seg {
                Segment::MoveTo { to } => {
                    result.push(*seg);
                    current = to;
                    last_angle = None;
                }
                Segment::LineTo { to } => {
                    let step = to - current;
                    let step_sq = step.dot(step);
                    let mut add = true;

                    if let (Some(last), Some(next)) = (last_angle, segments.get(i + 1)) {
                        if step_sq < min_sq && !next.is_move() {
                            if step_sq > 0.0 {
                                let angle_next = start_tangent(to, next).angle_degrees();
                                let angle_current = step.angle_degrees();
                                let via = abs_angle(angle_current, last)
                                    + abs_angle(angle_next, angle_current);
                                let direct = abs_angle(angle_next, last);
                                if via > direct + ANGLE_CONFIG {
                                    add = false;
                                }
                            } else {
                                add = false;
                            }
                        }
                    }

                    if add {
                        result.push(*seg);
                        current = to;
                        last_angle = Some(step.angle_degrees());
                    } else {
                        last_angle = None;
                    }
                }
                Segment::QuadTo { to, .. } | Segment::CubicTo { to, .. } => {
                    result.push(*seg);
                    last_angle = Some(end_tangent(current, seg).angle_degrees());
                    current = to;
                }
            }
        }
        result
    }
}

impl PathFilter for MinLineFilter {
    fn name(&self) -> &'static str {
        "MinLine"
    }

    fn apply(&self, model: &PathModel) -> PathModel {
        tracing::debug!("apply minline filter");
        let mut segments: Vec<Segment> = model.segments().copied().collect();
        if self.config.min_jump > 0.0 {
            segments = self.apply_min_jump(&segments);
        }
        if self.config.min_edge > 0.0 {
            segments = self.apply_min_edge(&segments);
        }
        if self.config.min_shift > 0.0 {
            segments = self.apply_min_shift(&segments);
        }
        PathModel::from_segments(segments)
    }
}
