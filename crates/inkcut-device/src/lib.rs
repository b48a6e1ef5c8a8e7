//! # Inkcut Device
//!
//! Runs cut jobs on a device: path preparation, approval, rate limited
//! streaming over a [`Link`](inkcut_communication::Link), pause and cancel,
//! and a FIFO queue for jobs submitted while the device is busy.
//!
//! Device profiles tie a [`DeviceConfig`] to a transport and a protocol and
//! are stored as TOML or JSON.

pub mod config;
pub mod device;
pub mod job;
pub mod process;
pub mod profile;

pub use config::DeviceConfig;
pub use device::{Device, PAUSE_POLL_INTERVAL, QUEUE_SETTLE_DELAY};
pub use job::{ApprovalHandler, Job, JobFile, JobInfo, JobState};
pub use process::{Motion, MotionPlan};
pub use profile::DeviceProfile;
