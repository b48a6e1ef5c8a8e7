//! Overcut
//!
//! Closed shapes are cut slightly past their seam so the blade fully
//! separates the starting point. Open subpaths are never touched.

use super::{PathFilter, CLOSED_EPSILON};
use crate::flatten::{flatten_subpath, DEFAULT_TOLERANCE};
use inkcut_core::{PathModel, Subpath};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OvercutConfig {
    /// Distance past the seam in px
    pub overcut: f64,
}

#[derive(Debug, Clone)]
pub struct OvercutFilter {
    config: OvercutConfig,
}

impl OvercutFilter {
    pub fn new(config: OvercutConfig) -> Self {
        Self { config }
    }

    /// Walk the subpath from its start and append what is covered within `overcut`
    fn overcut_subpath(&self, subpath: &Subpath) -> Subpath {
        let overcut = self.config.overcut;
        let points = flatten_subpath(subpath, DEFAULT_TOLERANCE);
        let mut out = subpath.clone();
        let mut walked = 0.0;
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let step = a.distance_to(b);
            if walked + step > overcut {
                out.line_to(a.towards(b, overcut - walked));
                return out;
            }
            walked += step;
            out.line_to(b);
        }
        out
    }
}

impl PathFilter for OvercutFilter {
    fn name(&self) -> &'static str {
        "Overcut"
    }

    fn apply(&self, model: &PathModel) -> PathModel {
        if self.config.overcut <= 0.0 {
            return model.clone();
        }
        model
            .subpaths()
            .iter()
            .map(|s| {
                if s.is_closed(CLOSED_EPSILON) {
                    self.overcut_subpath(s)
                } else {
                    s.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkcut_core::Point;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ]
    }

    #[test]
    fn test_overcut_within_first_edge() {
        let model = PathModel::from_polylines(&[square()]);
        let out = OvercutFilter::new(OvercutConfig { overcut: 3.0 }).apply(&model);
        let sp = &out.subpaths()[0];
        assert_eq!(sp.len(), 6);
        assert_eq!(sp.end(), Point::new(3.0, 0.0));
    }

    #[test]
    fn test_overcut_across_corner() {
        let model = PathModel::from_polylines(&[square()]);
        let out = OvercutFilter::new(OvercutConfig { overcut: 12.0 }).apply(&model);
        let sp = &out.subpaths()[0];
        assert_eq!(sp.len(), 7);
        assert_eq!(sp.segments()[5].end(), Point::new(10.0, 0.0));
        assert_eq!(sp.end(), Point::new(10.0, 2.0));
    }

    #[test]
    fn test_open_subpath_untouched() {
        let model = PathModel::from_polylines(&[vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]]);
        let out = OvercutFilter::new(OvercutConfig { overcut: 3.0 }).apply(&model);
        assert_eq!(out, model);
    }
}
