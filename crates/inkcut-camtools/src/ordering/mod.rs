//! Subpath ordering
//!
//! Order handlers rearrange the subpaths of a model to reduce tool travel
//! or to cut in a predictable sequence. They never alter geometry, except
//! that a subpath may be traversed backwards.

pub mod kdtree;
pub mod shortest_path;
pub mod space_filling;

pub use kdtree::KdTree;
pub use shortest_path::{ShortestPath, DEFAULT_TIME_BUDGET};
pub use space_filling::{order_by_curve, Curve};

use inkcut_core::{PathModel, Rect, Subpath};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available order handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Keep the model as is
    #[default]
    Normal,
    /// Reverse subpath order and direction
    Reversed,
    MinX,
    MaxX,
    MinY,
    MaxY,
    MinWidth,
    MaxWidth,
    MinHeight,
    MaxHeight,
    /// Greedy nearest neighbour from the origin
    ShortestPath,
    Hilbert,
    ZCurve,
}

impl OrderKind {
    pub const ALL: [OrderKind; 13] = [
        OrderKind::Normal,
        OrderKind::Reversed,
        OrderKind::MinX,
        OrderKind::MaxX,
        OrderKind::MinY,
        OrderKind::MaxY,
        OrderKind::MinWidth,
        OrderKind::MaxWidth,
        OrderKind::MinHeight,
        OrderKind::MaxHeight,
        OrderKind::ShortestPath,
        OrderKind::Hilbert,
        OrderKind::ZCurve,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OrderKind::Normal => "Normal",
            OrderKind::Reversed => "Reversed",
            OrderKind::MinX => "Min X",
            OrderKind::MaxX => "Max X",
            OrderKind::MinY => "Min Y",
            OrderKind::MaxY => "Max Y",
            OrderKind::MinWidth => "Min width",
            OrderKind::MaxWidth => "Max width",
            OrderKind::MinHeight => "Min height",
            OrderKind::MaxHeight => "Max height",
            OrderKind::ShortestPath => "Shortest Path",
            OrderKind::Hilbert => "Hilbert",
            OrderKind::ZCurve => "Z Curve",
        }
    }

    /// Reorder the subpaths of `model`
    pub fn order(&self, model: &PathModel) -> PathModel {
        match self {
            OrderKind::Normal => model.clone(),
            OrderKind::Reversed => reversed(model),
            OrderKind::MinX => order_by(model, |r| r.min_x),
            OrderKind::MaxX => order_by(model, |r| r.max_x),
            OrderKind::MinY => order_by(model, |r| r.min_y),
            OrderKind::MaxY => order_by(model, |r| r.max_y),
            OrderKind::MinWidth => order_by(model, |r| r.width()),
            OrderKind::MaxWidth => order_by(model, |r| -r.width()),
            OrderKind::MinHeight => order_by(model, |r| r.height()),
            OrderKind::MaxHeight => order_by(model, |r| -r.height()),
            OrderKind::ShortestPath => ShortestPath::default().order(model),
            OrderKind::Hilbert => order_by_curve(model, Curve::Hilbert),
            OrderKind::ZCurve => order_by_curve(model, Curve::ZOrder),
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whole-path reversal: last subpath first, each traversed backwards
pub fn reversed(model: &PathModel) -> PathModel {
    model.subpaths().iter().rev().map(Subpath::reversed).collect()
}

/// Stable sort of subpaths by a key computed from their bounding box
pub fn order_by<F>(model: &PathModel, key: F) -> PathModel
where
    F: Fn(&Rect) -> f64,
{
    let mut keyed: Vec<(f64, &Subpath)> = model
        .subpaths()
        .iter()
        .map(|s| (key(&s.bounding_rect()), s))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, s)| s.clone()).collect()
}
