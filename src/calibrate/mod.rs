//! Calibration and unit conversion
//!
//! A single ratio (real-world units per pixel) established from one
//! user-designated line, plus parsing and formatting for metric and
//! feet-and-inches distances. Malformed input is a typed error so the UI
//! layer re-prompts instead of silently defaulting.

use thiserror::Error;

use crate::domain::{UnitSystem, VelocityUnit};

/// Fixed metric/imperial conversion factor
pub const METERS_PER_INCH: f64 = 0.0254;

/// Raised for calibration text that does not parse; the caller re-prompts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not read `{input}` as a distance")]
pub struct ParseDistanceError {
    pub input: String,
}

/// Real-world-units-per-pixel ratio, unset until the first calibration
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    ratio: Option<f64>,
    units: UnitSystem,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_calibrated(&self) -> bool {
        self.ratio.is_some()
    }

    /// Units per pixel in the current unit system
    pub fn ratio(&self) -> Option<f64> {
        self.ratio
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Establish the ratio from a drawn line of known real distance
    ///
    /// `real_distance <= 0` means the user cancelled: the previous ratio
    /// (or the unset state) is kept and `false` is returned so the caller
    /// can delete the just-drawn line.
    pub fn calibrate(&mut self, pixel_len: f64, real_distance: f64, units: UnitSystem) -> bool {
        assert!(pixel_len > 0.0, "calibration line with no pixel length");
        if real_distance <= 0.0 {
            return false;
        }

        self.ratio = Some(real_distance / pixel_len);
        self.units = units;
        log::info!(
            "calibrated: {real_distance} {units:?} over {pixel_len:.1} px",
        );
        true
    }

    /// Switch between metric and imperial, rescaling the ratio in place
    ///
    /// No recalibration happens; switching back restores the ratio up to
    /// floating-point rounding.
    pub fn set_units(&mut self, units: UnitSystem) {
        if units == self.units {
            return;
        }

        if let Some(ratio) = self.ratio.as_mut() {
            match (self.units, units) {
                (UnitSystem::Metric, UnitSystem::Imperial) => *ratio /= METERS_PER_INCH,
                (UnitSystem::Imperial, UnitSystem::Metric) => *ratio *= METERS_PER_INCH,
                // To or from the uncalibrated pixel state there is nothing
                // to rescale
                _ => {}
            }
        }
        self.units = units;
    }

    /// Real distance covered by `pixel_len`, in the current units
    ///
    /// Uncalibrated, the pixel length itself is returned.
    pub fn measure(&self, pixel_len: f64) -> f64 {
        match self.ratio {
            Some(ratio) => pixel_len * ratio,
            None => pixel_len,
        }
    }

    /// `measure` formatted for display
    pub fn format_measure(&self, pixel_len: f64) -> String {
        format_value(self.measure(pixel_len), self.units)
    }

    /// Factor turning px/s into the requested velocity unit
    ///
    /// Meaningless before calibration, hence `None`.
    pub fn velocity_factor(&self, unit: VelocityUnit) -> Option<f64> {
        let ratio = self.ratio?;
        let per_base = match self.units {
            UnitSystem::Metric => match unit {
                VelocityUnit::MetersPerSecond => 1.0,
                VelocityUnit::KilometersPerHour => 3.6,
                VelocityUnit::FeetPerSecond => 3.281,
                VelocityUnit::MilesPerHour => 2.237,
            },
            UnitSystem::Imperial => match unit {
                VelocityUnit::MetersPerSecond => 0.0254,
                VelocityUnit::KilometersPerHour => 0.09144,
                VelocityUnit::FeetPerSecond => 0.0833,
                VelocityUnit::MilesPerHour => 0.05682,
            },
            UnitSystem::Pixels => return None,
        };
        Some(ratio * per_base)
    }
}

/// Format a distance value in the given unit system
pub fn format_value(value: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Pixels => format!("{value:.1} px"),
        UnitSystem::Metric => format!("{value:.2} m"),
        UnitSystem::Imperial => format_imperial(value),
    }
}

/// Format a total-inches value as `feet'inches fraction"`
///
/// The inches fraction is truncated to eighths and reduced; a zero fraction
/// is omitted entirely.
pub fn format_imperial(total_inches: f64) -> String {
    let feet = (total_inches / 12.0).floor() as i64;
    let rem = total_inches - feet as f64 * 12.0;
    let inches = rem.floor() as i64;
    let eighths = (8.0 * (rem - inches as f64)) as i64;

    if eighths == 0 {
        format!("{feet}'{inches}\"")
    } else {
        let div = gcd(eighths, 8);
        format!("{feet}'{inches} {}/{}\"", eighths / div, 8 / div)
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Parse user-entered distance text in the given unit system
///
/// Metric accepts a plain decimal (meters); imperial accepts the grammar
/// `feet'[inches[ numerator/denominator]]"` with every component optional.
/// The returned value is in meters or inches respectively.
pub fn parse_distance(input: &str, units: UnitSystem) -> Result<f64, ParseDistanceError> {
    let malformed = || ParseDistanceError {
        input: input.to_string(),
    };

    match units {
        UnitSystem::Imperial => parse_imperial(input),
        _ => input.trim().parse::<f64>().map_err(|_| malformed()),
    }
}

/// Parse `feet'[inches[ numerator/denominator]]"` into total inches
///
/// All components are optional (an empty string is zero, which the caller
/// treats as a cancel). A fraction needs a non-zero numerator and
/// denominator; anything else is malformed and must be re-prompted.
pub fn parse_imperial(input: &str) -> Result<f64, ParseDistanceError> {
    let malformed = || ParseDistanceError {
        input: input.to_string(),
    };
    let s = input.trim();

    let (feet, rest) = match s.find('\'') {
        Some(at) => {
            let feet: u64 = s[..at].trim().parse().map_err(|_| malformed())?;
            (feet, s[at + 1..].trim_start())
        }
        None => (0, s),
    };

    let mut inches = 0u64;
    let mut fraction = 0.0;

    if !rest.is_empty() {
        let inner = rest.strip_suffix('"').ok_or_else(malformed)?.trim();
        let mut parts = inner.split_whitespace();

        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => {}
            (Some(whole), None, None) => {
                if whole.contains('/') {
                    fraction = parse_fraction(whole).ok_or_else(malformed)?;
                } else {
                    inches = whole.parse().map_err(|_| malformed())?;
                }
            }
            (Some(whole), Some(frac), None) => {
                inches = whole.parse().map_err(|_| malformed())?;
                fraction = parse_fraction(frac).ok_or_else(malformed)?;
            }
            _ => return Err(malformed()),
        }
    } else if s.is_empty() {
        // Entirely empty input is a zero distance, i.e. a cancel
        return Ok(0.0);
    }

    Ok(feet as f64 * 12.0 + inches as f64 + fraction)
}

/// `numerator/denominator` with both strictly positive
fn parse_fraction(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num: u64 = num.parse().ok()?;
    let den: u64 = den.parse().ok()?;
    if num == 0 || den == 0 {
        return None;
    }
    Some(num as f64 / den as f64)
}
