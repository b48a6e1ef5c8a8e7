//! Unit conversion utilities
//!
//! All geometry is expressed in "px" user units (1/90 inch). These helpers
//! convert to and from physical units and parse length strings such as
//! `"10mm"` or `"1.5in"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User units per inch.
pub const PX_PER_INCH: f64 = 90.0;

/// User units per centimeter.
pub const PX_PER_CM: f64 = PX_PER_INCH / 2.54;

/// Length unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// User units (1/90 inch)
    #[default]
    Px,
    /// Inches
    In,
    /// Millimeters
    Mm,
    /// Centimeters
    Cm,
    /// Points (1/72 inch)
    Pt,
    /// Picas (1/6 inch)
    Pc,
}

impl LengthUnit {
    /// Number of px in one of this unit
    pub fn px_per_unit(self) -> f64 {
        match self {
            Self::Px => 1.0,
            Self::In => PX_PER_INCH,
            Self::Mm => PX_PER_CM / 10.0,
            Self::Cm => PX_PER_CM,
            Self::Pt => PX_PER_INCH / 72.0,
            Self::Pc => PX_PER_INCH / 6.0,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::In => "in",
            Self::Mm => "mm",
            Self::Cm => "cm",
            Self::Pt => "pt",
            Self::Pc => "pc",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "px" | "" => Ok(Self::Px),
            "in" | "inch" => Ok(Self::In),
            "mm" => Ok(Self::Mm),
            "cm" => Ok(Self::Cm),
            "pt" => Ok(Self::Pt),
            "pc" => Ok(Self::Pc),
            _ => Err(format!("Unknown length unit: {}", s)),
        }
    }
}

/// Convert a value in `unit` to px
pub fn from_unit(value: f64, unit: LengthUnit) -> f64 {
    value * unit.px_per_unit()
}

/// Convert a px value to `unit`
pub fn to_unit(value: f64, unit: LengthUnit) -> f64 {
    value / unit.px_per_unit()
}

/// Parse a length string like `"12.5mm"` into px
///
/// A bare number is taken as px. An empty string parses as zero.
pub fn parse_length(input: &str) -> Result<f64, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0.0);
    }
    let split = input
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("Invalid length: {}", input))?;
    Ok(from_unit(value, unit.parse()?))
}

/// Speed units used by the device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedUnits {
    /// Inches per second
    #[default]
    #[serde(rename = "in/s")]
    InPerSec,
    /// Centimeters per second
    #[serde(rename = "cm/s")]
    CmPerSec,
}

impl SpeedUnits {
    /// Convert a speed in these units to px per second
    pub fn to_px_per_sec(self, speed: f64) -> f64 {
        match self {
            Self::InPerSec => speed * PX_PER_INCH,
            Self::CmPerSec => speed * PX_PER_CM,
        }
    }
}

impl fmt::Display for SpeedUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InPerSec => write!(f, "in/s"),
            Self::CmPerSec => write!(f, "cm/s"),
        }
    }
}

impl FromStr for SpeedUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in/s" => Ok(Self::InPerSec),
            "cm/s" => Ok(Self::CmPerSec),
            _ => Err(format!("Unknown speed units: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversion() {
        assert_eq!(from_unit(1.0, LengthUnit::In), 90.0);
        assert!((from_unit(25.4, LengthUnit::Mm) - 90.0).abs() < 1e-9);
        assert!((to_unit(90.0, LengthUnit::Cm) - 2.54).abs() < 1e-9);
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("").unwrap(), 0.0);
        assert_eq!(parse_length("12").unwrap(), 12.0);
        assert_eq!(parse_length("2in").unwrap(), 180.0);
        assert!((parse_length(" 10 mm").unwrap() - 35.433070866).abs() < 1e-6);
        assert!(parse_length("abc").is_err());
        assert!(parse_length("3yd").is_err());
    }

    #[test]
    fn test_speed_units() {
        assert_eq!(SpeedUnits::InPerSec.to_px_per_sec(2.0), 180.0);
        assert!((SpeedUnits::CmPerSec.to_px_per_sec(2.54) - 90.0).abs() < 1e-9);
        assert_eq!("cm/s".parse::<SpeedUnits>().unwrap(), SpeedUnits::CmPerSec);
        assert_eq!(SpeedUnits::default().to_string(), "in/s");
    }
}
