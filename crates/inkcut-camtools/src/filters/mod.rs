//! Path filters
//!
//! Filters compensate for the physical behaviour of a cutting tool. Each
//! filter is a pure `PathModel -> PathModel` transform and is total: empty
//! models, single point subpaths and degenerate segments pass through.
//!
//! Filters are configured through [`FilterConfig`], which is what device
//! profiles store, and turned into trait objects with [`FilterConfig::build`].

pub mod blade_offset;
pub mod min_line;
pub mod overcut;
pub mod repeat;

pub use blade_offset::{BladeOffsetConfig, BladeOffsetFilter};
pub use min_line::{MinLineConfig, MinLineFilter, ANGLE_CONFIG};
pub use overcut::{OvercutConfig, OvercutFilter};
pub use repeat::{RepeatConfig, RepeatFilter};

use inkcut_core::PathModel;
use serde::{Deserialize, Serialize};

/// Distance under which a subpath counts as closed
pub const CLOSED_EPSILON: f64 = 1e-6;

/// A `PathModel -> PathModel` transform applied before streaming
pub trait PathFilter: Send + Sync + std::fmt::Debug {
    /// Display name
    fn name(&self) -> &'static str;

    /// Apply the filter, returning a new model
    fn apply(&self, model: &PathModel) -> PathModel;
}

/// Serializable filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    BladeOffset(BladeOffsetConfig),
    Overcut(OvercutConfig),
    MinLine(MinLineConfig),
    Repeat(RepeatConfig),
}

impl FilterConfig {
    /// Instantiate the configured filter
    pub fn build(&self) -> Box<dyn PathFilter> {
        match self {
            FilterConfig::BladeOffset(c) => Box::new(BladeOffsetFilter::new(c.clone())),
            FilterConfig::Overcut(c) => Box::new(OvercutFilter::new(c.clone())),
            FilterConfig::MinLine(c) => Box::new(MinLineFilter::new(c.clone())),
            FilterConfig::Repeat(c) => Box::new(RepeatFilter::new(c.clone())),
        }
    }
}

/// Apply filters in order
pub fn apply_all(filters: &[Box<dyn PathFilter>], model: &PathModel) -> PathModel {
    filters.iter().fold(model.clone(), |model, filter| {
        tracing::debug!("filter | Running {} on model", filter.name());
        filter.apply(&model)
    })
}
