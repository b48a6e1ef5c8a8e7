//! # Inkcut Core
//!
//! Core types shared by every Inkcut crate: the error hierarchy, unit
//! conversion, the path model with its geometry primitives, job status and
//! the device event dispatcher.

pub mod error;
pub mod event;
pub mod path;
pub mod status;
pub mod units;

pub use error::{ConfigError, ConnectionError, Error, JobError, ProtocolError, Result};
pub use event::{DeviceEvent, EventDispatcher};
pub use path::{PathModel, Point, Rect, Segment, Subpath, SubpathError, Transform};
pub use status::JobStatus;
pub use units::{LengthUnit, SpeedUnits, PX_PER_CM, PX_PER_INCH};
