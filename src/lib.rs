//! # Inkcut
//!
//! Drives vinyl cutters and pen plotters: path filters, travel
//! optimisation and rate limited streaming to the device.
//!
//! ## Architecture
//!
//! Inkcut is organized as a workspace with multiple crates:
//!
//! 1. **inkcut-core** - Path model, units, errors, job status, events
//! 2. **inkcut-camtools** - Flattening, path filters, path ordering
//! 3. **inkcut-communication** - Transports and device languages
//! 4. **inkcut-device** - Job pipeline, queue and device profiles
//! 5. **inkcut** - Headless runner that ties the crates together

pub use inkcut_camtools as camtools;
pub use inkcut_communication as communication;
pub use inkcut_device as device;

pub use inkcut_core::{DeviceEvent, Error, JobStatus, PathModel, Point, Result};
pub use inkcut_device::{Device, DeviceConfig, DeviceProfile, Job, JobFile, JobInfo};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Pretty console output on stderr. `RUST_LOG` overrides the default
/// `info` level, e.g. `RUST_LOG=inkcut_communication=debug` shows every
/// command sent to the device.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
