//! Greedy nearest-neighbour travel ordering
//!
//! Starting from the origin, repeatedly pick the subpath whose start or end
//! is closest to the tool, cutting it backwards when its end is closer.
//! Endpoints are indexed in a [`KdTree`] so each pick is a logarithmic
//! query. The search runs under a wall-clock budget; once it is spent the
//! remaining subpaths are appended in their original order.

use super::kdtree::KdTree;
use inkcut_core::{PathModel, Point};
use std::time::{Duration, Instant};

/// Default time budget for one ordering pass
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
pub struct ShortestPath {
    pub start: Point,
    pub time_budget: Duration,
}

impl Default for ShortestPath {
    fn default() -> Self {
        Self {
            start: Point::zero(),
            time_budget: DEFAULT_TIME_BUDGET,
        }
    }
}

impl ShortestPath {
    pub fn with_time_budget(time_budget: Duration) -> Self {
        Self {
            time_budget,
            ..Self::default()
        }
    }

    pub fn order(&self, model: &PathModel) -> PathModel {
        let subpaths = model.subpaths();
        let n = subpaths.len();
        let endpoints = subpaths
            .iter()
            .flat_map(|s| [s.start(), s.end()])
            .collect();
        let mut tree = KdTree::build(endpoints);
        let mut used = vec![false; n];
        let mut result = PathModel::new();
        let mut cursor = self.start;
        let deadline = Instant::now() + self.time_budget;

        while result.len() < n {
            if Instant::now() >= deadline {
                tracing::debug!(
                    "Shortest path search: budget spent after {} of {} subpaths",
                    result.len(),
                    n
                );
                for (i, sp) in subpaths.iter().enumerate() {
                    if !used[i] {
                        result.push(sp.clone());
                    }
                }
                break;
            }

            let Some(endpoint) = tree.nearest(cursor) else {
                break;
            };
            let index = endpoint / 2;
            tree.remove(2 * index);
            tree.remove(2 * index + 1);
            used[index] = true;

            let next = if endpoint % 2 == 1 {
                subpaths[index].reversed()
            } else {
                subpaths[index].clone()
            };
            cursor = next.end();
            result.push(next);
        }
        result
    }
}
