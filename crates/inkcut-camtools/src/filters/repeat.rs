//! Multi-pass repeat
//!
//! Closed loops are traversed `steps` times without lifting the tool.
//! Open subpaths are duplicated, so each pass starts with a tool lift.

use super::PathFilter;
use inkcut_core::PathModel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatConfig {
    /// Number of passes
    pub steps: u32,
    /// Start/end gap in px under which a subpath counts as a closed loop
    pub closed_loop_distance: f64,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            steps: 1,
            closed_loop_distance: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepeatFilter {
    config: RepeatConfig,
}

impl RepeatFilter {
    pub fn new(config: RepeatConfig) -> Self {
        Self { config }
    }
}

impl PathFilter for RepeatFilter {
    fn name(&self) -> &'static str {
        "Repeat"
    }

    fn apply(&self, model: &PathModel) -> PathModel {
        let steps = self.config.steps;
        if steps <= 1 {
            return model.clone();
        }

        let max_gap = self.config.closed_loop_distance;
        let mut result = PathModel::new();
        for part in model.subpaths() {
            if part.is_point() {
                result.push(part.clone());
                continue;
            }
            let gap = part.start() - part.end();
            if gap.dot(gap) < max_gap * max_gap {
                let mut looped = part.clone();
                for _ in 1..steps {
                    if looped.end() != part.start() {
                        looped.line_to(part.start());
                    }
                    for seg in part.drawing_segments() {
                        looped.push(*seg);
                    }
                }
                result.push(looped);
            } else {
                for _ in 0..steps {
                    result.push(part.clone());
                }
            }
        }
        result
    }
}
