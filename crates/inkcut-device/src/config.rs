//! Device configuration
//!
//! Everything that shapes how a job leaves the machine: output transform,
//! interpolation and rate limiting, tool settings and raw command blocks.
//! Lengths are in px (1/90 inch).

use inkcut_camtools::FilterConfig;
use inkcut_core::units::{from_unit, LengthUnit};
use inkcut_core::{Error, Result, SpeedUnits, Transform};
use serde::{Deserialize, Serialize};

/// Output rotations a device can be configured with
pub const VALID_ROTATIONS: [i32; 3] = [0, 90, -90];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Longest move sent in one command when interpolating
    pub step_size: f64,
    /// Split moves into `step_size` chunks
    pub interpolate: bool,
    /// Position updates per second for live preview
    pub sample_rate: u32,
    /// Output rotation in degrees: 0, 90 or -90
    pub rotation: i32,
    pub swap_xy: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
    /// Axis calibration factors
    pub scale: [f64; 2],
    /// Curve flattening quality, higher means more points
    pub quality_factor: f64,
    pub speed: f64,
    pub speed_units: SpeedUnits,
    /// Send the speed to the device before cutting
    pub speed_enabled: bool,
    /// Blade force in grams
    pub force: f64,
    /// Send the force to the device before cutting
    pub force_enabled: bool,
    /// Saved with the profile. Job motion is always sent in absolute coordinates.
    pub absolute: bool,
    /// The device buffers the whole job, skip rate limiting
    pub spooled: bool,
    /// Always run against an in-memory transport
    pub test_mode: bool,
    /// Output rate in px/ms. Negative means derive it from the speed.
    pub custom_rate: f64,
    pub commands_before: String,
    pub commands_after: String,
    pub commands_connect: String,
    pub commands_disconnect: String,
    /// Applied in order after the output transform
    pub filters: Vec<FilterConfig>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            step_size: from_unit(1.0, LengthUnit::Mm),
            interpolate: false,
            sample_rate: 100,
            rotation: 0,
            swap_xy: false,
            mirror_x: false,
            mirror_y: false,
            scale: [1.0, 1.0],
            quality_factor: 1.0,
            speed: 4.0,
            speed_units: SpeedUnits::InPerSec,
            speed_enabled: false,
            force: 40.0,
            force_enabled: false,
            absolute: true,
            spooled: false,
            test_mode: false,
            custom_rate: -1.0,
            commands_before: String::new(),
            commands_after: String::new(),
            commands_connect: String::new(),
            commands_disconnect: String::new(),
            filters: Vec::new(),
        }
    }
}

impl DeviceConfig {
    /// Check the values the pipeline depends on
    pub fn validate(&self) -> Result<()> {
        if self.interpolate && !(self.step_size > 0.0 && self.step_size.is_finite()) {
            return Err(Error::invalid_setting(
                "step_size",
                "must be > 0 when interpolating",
            ));
        }
        if self.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(Error::invalid_setting("scale", "factors must be non-zero"));
        }
        if !(self.quality_factor.is_finite() && self.quality_factor > 0.0) {
            return Err(Error::invalid_setting("quality_factor", "must be > 0"));
        }
        if !VALID_ROTATIONS.contains(&self.rotation) {
            return Err(Error::invalid_setting(
                "rotation",
                format!("{} is not one of 0, 90, -90", self.rotation),
            ));
        }
        if self.speed < 0.0 {
            return Err(Error::invalid_setting("speed", "must not be negative"));
        }
        Ok(())
    }

    pub fn speed_px_per_sec(&self) -> f64 {
        self.speed_units.to_px_per_sec(self.speed)
    }

    /// Milliseconds the device needs to travel one `step_size`
    pub fn step_time(&self) -> u64 {
        let speed = self.speed_px_per_sec();
        if speed <= 0.0 || self.step_size <= 0.0 {
            return 0;
        }
        (1000.0 * self.step_size / speed).round().max(0.0) as u64
    }

    /// Output rate in px/ms. Zero means send commands back to back.
    pub fn rate(&self, always_spools: bool) -> f64 {
        if self.custom_rate >= 0.0 {
            self.custom_rate
        } else if self.spooled || always_spools {
            0.0
        } else if self.interpolate {
            match self.step_time() {
                0 => 0.0,
                step_time => self.step_size / step_time as f64,
            }
        } else {
            self.speed_px_per_sec() / 1000.0
        }
    }

    /// Step size for the motion plan, `None` when moves are sent whole
    pub fn interpolation_step(&self, always_spools: bool) -> Option<f64> {
        let skip = always_spools || self.spooled || !self.interpolate;
        (!skip).then_some(self.step_size)
    }

    /// Device output transform: swap, then rotate, then scale and mirror
    pub fn output_transform(&self) -> Transform {
        let mut t = Transform::identity();
        if self.swap_xy {
            t = t.then(&Transform::swap_xy());
        }
        if self.rotation != 0 {
            t = t.then(&Transform::rotation(f64::from(self.rotation)));
        }
        let sx = if self.mirror_x { -self.scale[0] } else { self.scale[0] };
        let sy = if self.mirror_y { -self.scale[1] } else { self.scale[1] };
        t.then(&Transform::scale(sx, sy))
    }
}
