//! Balanced 2D KD-tree with lazy deletion
//!
//! Nodes live in a flat arena and refer to each other by index. Every node
//! tracks how many live points remain in its subtree so empty branches are
//! skipped and removal costs one walk up the parent chain.

use inkcut_core::{Point, Rect};

#[derive(Debug, Clone)]
struct Node {
    /// Index into `points`
    point: usize,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
    /// Live points in this subtree, this node included
    live: usize,
    /// Bounds of every point in this subtree
    bounds: Rect,
}

#[derive(Debug, Clone)]
pub struct KdTree {
    points: Vec<Point>,
    nodes: Vec<Node>,
    /// Node holding each point
    node_of: Vec<usize>,
    alive: Vec<bool>,
    root: Option<usize>,
}

fn rect_distance_sq(rect: &Rect, p: Point) -> f64 {
    let dx = (rect.min_x - p.x).max(0.0).max(p.x - rect.max_x);
    let dy = (rect.min_y - p.y).max(0.0).max(p.y - rect.max_y);
    dx * dx + dy * dy
}

fn distance_sq(a: Point, b: Point) -> f64 {
    let d = a - b;
    d.dot(d)
}

impl KdTree {
    /// Build a tree over `points` by median split, alternating X and Y by depth
    pub fn build(points: Vec<Point>) -> Self {
        let n = points.len();
        let mut tree = Self {
            points,
            nodes: Vec::with_capacity(n),
            node_of: vec![0; n],
            alive: vec![true; n],
            root: None,
        };
        let mut indices: Vec<usize> = (0..n).collect();
        tree.root = tree.build_node(&mut indices, 0, None);
        tree
    }

    fn build_node(&mut self, indices: &mut [usize], depth: usize, parent: Option<usize>) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }
        let points = &self.points;
        let by_x = depth % 2 == 0;
        indices.sort_by(|&a, &b| {
            let (pa, pb) = (points[a], points[b]);
            if by_x {
                pa.x.total_cmp(&pb.x)
            } else {
                pa.y.total_cmp(&pb.y)
            }
        });
        let mid = indices.len() / 2;
        let point = indices[mid];
        let bounds = Rect::from_points(indices.iter().map(|&i| points[i]))
            .unwrap_or_else(|| Rect::from_point(points[point]));

        let id = self.nodes.len();
        self.nodes.push(Node {
            point,
            left: None,
            right: None,
            parent,
            live: indices.len(),
            bounds,
        });
        self.node_of[point] = id;

        let (left, rest) = indices.split_at_mut(mid);
        let right = &mut rest[1..];
        let left = self.build_node(left, depth + 1, Some(id));
        let right = self.build_node(right, depth + 1, Some(id));
        self.nodes[id].left = left;
        self.nodes[id].right = right;
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.root.map_or(0, |r| self.nodes[r].live)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }

    pub fn is_alive(&self, index: usize) -> bool {
        self.alive.get(index).copied().unwrap_or(false)
    }

    /// Mark a point dead. Returns false if it was already removed.
    pub fn remove(&mut self, index: usize) -> bool {
        if !self.is_alive(index) {
            return false;
        }
        self.alive[index] = false;
        let mut node = Some(self.node_of[index]);
        while let Some(id) = node {
            self.nodes[id].live -= 1;
            node = self.nodes[id].parent;
        }
        true
    }

    /// Index of the live point nearest to `query`
    pub fn nearest(&self, query: Point) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        if let Some(root) = self.root {
            self.search(root, query, 0, &mut best);
        }
        best.map(|(i, _)| i)
    }

    fn search(&self, id: usize, query: Point, depth: usize, best: &mut Option<(usize, f64)>) {
        let node = &self.nodes[id];
        if node.live == 0 {
            return;
        }
        if let Some((_, best_d)) = *best {
            if rect_distance_sq(&node.bounds, query) > best_d {
                return;
            }
        }

        if self.alive[node.point] {
            let d = distance_sq(self.points[node.point], query);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                *best = Some((node.point, d));
            }
        }

        let split = self.points[node.point];
        let go_left = if depth % 2 == 0 {
            query.x < split.x
        } else {
            query.y < split.y
        };
        let (near, far) = if go_left {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if let Some(near) = near {
            self.search(near, query, depth + 1, best);
        }
        if let Some(far) = far {
            self.search(far, query, depth + 1, best);
        }
    }
}
