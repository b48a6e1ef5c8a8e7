//! Blade offset compensation
//!
//! A drag knife trails its pivot by `offset`. To cut the ideal path the
//! pivot is driven `offset` ahead of it along the local tangent. At sharp
//! vertices the pivot swings around the vertex on an arc of radius `offset`
//! so the blade rotates in place instead of overshooting into a spike.

use super::PathFilter;
use crate::flatten::{flatten_with_tangents, tolerance_for};
use inkcut_core::{PathModel, Point, Subpath};
use lyon::geom::{self, Angle, Arc};
use serde::{Deserialize, Serialize};

/// Blade offset settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BladeOffsetConfig {
    /// Distance from pivot to blade tip in px
    pub offset: f64,
    /// Turns sharper than this many degrees get a corrective arc
    pub cutoff: f64,
    /// Flattening quality factor for curves and arcs
    pub quality: f64,
}

impl Default for BladeOffsetConfig {
    fn default() -> Self {
        Self {
            offset: 0.0,
            cutoff: 20.0,
            quality: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BladeOffsetFilter {
    config: BladeOffsetConfig,
}

impl BladeOffsetFilter {
    pub fn new(config: BladeOffsetConfig) -> Self {
        Self { config }
    }

    fn offset_subpath(&self, subpath: &Subpath) -> Subpath {
        let offset = self.config.offset;
        let tolerance = tolerance_for(self.config.quality);
        let flat = flatten_with_tangents(subpath, tolerance);
        if flat.len() < 2 {
            return subpath.clone();
        }

        let shifted = |i: usize| flat[i].point + flat[i].tangent * offset;
        let mut out = Subpath::new(shifted(0));
        for i in 1..flat.len() {
            if i > 1 {
                let incoming = flat[i - 1].tangent;
                let outgoing = flat[i].tangent;
                let turn = incoming.cross(outgoing).atan2(incoming.dot(outgoing));
                if turn.abs().to_degrees() > self.config.cutoff {
                    self.swing(&mut out, flat[i - 1].point, incoming, turn, tolerance);
                }
            }
            out.line_to(shifted(i));
        }
        out
    }

    /// Arc of radius `offset` around `vertex`, starting on the incoming tangent
    fn swing(&self, out: &mut Subpath, vertex: Point, incoming: Point, turn: f64, tolerance: f64) {
        let offset = self.config.offset;
        let arc = Arc {
            center: geom::point(vertex.x, vertex.y),
            radii: geom::vector(offset, offset),
            start_angle: Angle::radians(incoming.y.atan2(incoming.x)),
            sweep_angle: Angle::radians(turn),
            x_rotation: Angle::radians(0.0),
        };
        let arc_length = offset * turn.abs();
        let steps = ((arc_length / tolerance).ceil() as usize).clamp(2, 360);
        for k in 1..steps {
            let p = arc.sample(k as f64 / steps as f64);
            out.line_to(Point::new(p.x, p.y));
        }
    }
}

impl PathFilter for BladeOffsetFilter {
    fn name(&self) -> &'static str {
        "BladeOffset"
    }

    fn apply(&self, model: &PathModel) -> PathModel {
        if self.config.offset <= 0.0 {
            return model.clone();
        }
        model
            .subpaths()
            .iter()
            .map(|s| self.offset_subpath(s))
            .collect()
    }
}
