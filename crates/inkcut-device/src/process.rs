//! Motion planning
//!
//! Turns flattened polylines into the stream of moves sent to a device.
//! The first point of every polyline is reached with the tool up and the
//! rest with the tool down. When a step size is given, each move is split
//! into chunks no longer than the step so a job can be paused or cancelled
//! mid line. A final tool-up move to the last point always closes the plan.

use inkcut_core::Point;

/// A single move and the distance it covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub distance: f64,
    pub point: Point,
    /// 0 for tool up, 1 for tool down
    pub z: u8,
}

/// Finite iterator over the moves of a job, consumed once
#[derive(Debug)]
pub struct MotionPlan {
    polylines: Vec<Vec<Point>>,
    step: Option<f64>,
    last: Point,
    path: usize,
    index: usize,
    /// Chunks already emitted for the current move
    chunk: usize,
    /// Start of the move being chunked
    from: Point,
    finished: bool,
}

impl MotionPlan {
    /// Plan moves starting from `start`. `step` enables interpolation.
    pub fn new(polylines: Vec<Vec<Point>>, start: Point, step: Option<f64>) -> Self {
        Self {
            polylines,
            step: step.filter(|s| *s > 0.0),
            last: start,
            path: 0,
            index: 0,
            chunk: 0,
            from: start,
            finished: false,
        }
    }

    /// Length of every move in the plan, travel included
    pub fn total_length(polylines: &[Vec<Point>], start: Point) -> f64 {
        let mut last = start;
        let mut total = 0.0;
        for p in polylines.iter().flatten() {
            total += last.distance_to(*p);
            last = *p;
        }
        total
    }

    fn advance(&mut self, point: Point) {
        self.index += 1;
        self.chunk = 0;
        self.last = point;
    }
}

impl Iterator for MotionPlan {
    type Item = Motion;

    fn next(&mut self) -> Option<Motion> {
        loop {
            let Some(poly) = self.polylines.get(self.path) else {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(Motion {
                    distance: 0.0,
                    point: self.last,
                    z: 0,
                });
            };
            let Some(&point) = poly.get(self.index) else {
                self.path += 1;
                self.index = 0;
                continue;
            };
            let z = if self.index == 0 { 0 } else { 1 };

            if self.chunk == 0 {
                self.from = self.last;
            }
            let length = self.from.distance_to(point);

            let step = match self.step {
                Some(step) if length > 0.0 => step,
                _ => {
                    self.advance(point);
                    return Some(Motion {
                        distance: length,
                        point,
                        z,
                    });
                }
            };

            let done = (self.chunk as f64 * step).min(length);
            self.chunk += 1;
            let reached = (self.chunk as f64 * step).min(length);
            let target = if reached >= length {
                self.advance(point);
                point
            } else {
                self.from.towards(point, reached)
            };
            return Some(Motion {
                distance: reached - done,
                point: target,
                z,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec<Point>> {
        vec![vec![
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
        ]]
    }

    #[test]
    fn test_plain_moves() {
        let motions: Vec<_> = MotionPlan::new(square(), Point::zero(), None).collect();
        assert_eq!(motions.len(), 4);
        assert_eq!(motions[0].z, 0);
        assert_eq!(motions[0].distance, 10.0);
        assert_eq!(motions[1].z, 1);
        assert_eq!(motions[2].point, Point::new(20.0, 10.0));
        assert_eq!(
            motions[3],
            Motion {
                distance: 0.0,
                point: Point::new(20.0, 10.0),
                z: 0
            }
        );
    }

    #[test]
    fn test_interpolated_chunks() {
        let polylines = vec![vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]];
        let motions: Vec<_> = MotionPlan::new(polylines, Point::zero(), Some(4.0)).collect();
        // Zero-length travel, then 4 + 4 + 2, then the final tool up
        let points: Vec<_> = motions.iter().map(|m| m.point.x).collect();
        assert_eq!(points, vec![0.0, 4.0, 8.0, 10.0, 10.0]);
        let distances: Vec<_> = motions.iter().map(|m| m.distance).collect();
        assert_eq!(distances, vec![0.0, 4.0, 4.0, 2.0, 0.0]);
        assert!(motions[1..4].iter().all(|m| m.z == 1));
    }

    #[test]
    fn test_distances_sum_to_total_length() {
        let polylines = square();
        let total = MotionPlan::total_length(&polylines, Point::zero());
        assert_eq!(total, 30.0);
        let moved: f64 = MotionPlan::new(polylines, Point::zero(), Some(3.0))
            .map(|m| m.distance)
            .sum();
        assert!((moved - total).abs() < 1e-9);
    }

    #[test]
    fn test_empty_plan_ends_at_start() {
        let motions: Vec<_> = MotionPlan::new(Vec::new(), Point::new(5.0, 5.0), Some(1.0)).collect();
        assert_eq!(motions.len(), 1);
        assert_eq!(motions[0].point, Point::new(5.0, 5.0));
        assert_eq!(motions[0].z, 0);
    }
}
