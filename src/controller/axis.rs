//! Analog axis processing (clamp, normalization, inversion, deadzone, focus easing)

use serde::Serialize;

use crate::config::ConfigError;

/// Normalized joystick position, every component in [-1.0, 1.0]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct AxisSample {
    pub pan: f32,
    pub tilt: f32,
    pub zoom: f32,
}

impl AxisSample {
    pub const NEUTRAL: AxisSample = AxisSample {
        pan: 0.0,
        tilt: 0.0,
        zoom: 0.0,
    };

    pub fn new(pan: f32, tilt: f32, zoom: f32) -> Self {
        Self { pan, tilt, zoom }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

/// Per-axis calibration
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AxisConfig {
    /// Lowest raw value of the axis domain
    pub min: u8,
    /// Highest raw value of the axis domain
    pub max: u8,
    /// Magnitudes strictly below this snap to 0.0
    pub deadzone: f32,
    pub invert: bool,
}

impl AxisConfig {
    pub const fn new(deadzone: f32, invert: bool) -> Self {
        Self {
            min: u8::MIN,
            max: u8::MAX,
            deadzone,
            invert,
        }
    }

    pub fn normalize(&self, raw: u8) -> f32 {
        let clamped = raw.clamp(self.min, self.max);
        let span = f32::from(self.max - self.min);
        let value = (f32::from(clamped - self.min) / span) * 2.0 - 1.0;
        let value = if self.invert { -value } else { value };

        if value.abs() < self.deadzone {
            0.0
        } else {
            value
        }
    }

    fn validate(&self, axis: &'static str) -> Result<(), ConfigError> {
        if self.min >= self.max {
            return Err(ConfigError::EmptyAxisRange {
                axis,
                min: self.min,
                max: self.max,
            });
        }
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(ConfigError::InvalidDeadzone {
                axis,
                deadzone: self.deadzone,
            });
        }
        Ok(())
    }
}

pub const DEFAULT_PAN: AxisConfig = AxisConfig::new(0.10, false);
pub const DEFAULT_TILT: AxisConfig = AxisConfig::new(0.10, true);
pub const DEFAULT_ZOOM: AxisConfig = AxisConfig::new(0.15, false);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisMapper {
    pan: AxisConfig,
    tilt: AxisConfig,
    zoom: AxisConfig,
}

impl Default for AxisMapper {
    fn default() -> Self {
        Self {
            pan: DEFAULT_PAN,
            tilt: DEFAULT_TILT,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl AxisMapper {
    pub fn new(pan: AxisConfig, tilt: AxisConfig, zoom: AxisConfig) -> Result<Self, ConfigError> {
        pan.validate("pan")?;
        tilt.validate("tilt")?;
        zoom.validate("zoom")?;
        Ok(Self { pan, tilt, zoom })
    }

    pub fn map(&self, pan: u8, tilt: u8, zoom: u8) -> AxisSample {
        AxisSample {
            pan: self.pan.normalize(pan),
            tilt: self.tilt.normalize(tilt),
            zoom: self.zoom.normalize(zoom),
        }
    }
}

/// Sign-preserving ease-in curve applied to the zoom axis when it drives focus.
pub fn focus_depth(value: f32) -> f32 {
    value * value * value
}

/// Converts a unit-range value into the camera's integer percentage scale.
pub fn to_percent(value: f32) -> i32 {
    (value * 100.0).round_ties_even() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_rests_inside_deadzone() {
        let mapper = AxisMapper::default();
        assert_eq!(mapper.map(128, 128, 128), AxisSample::NEUTRAL);
        assert!(mapper.map(128, 128, 128).is_neutral());
    }

    #[test]
    fn extremes_map_to_unit_range() {
        let mapper = AxisMapper::default();
        assert_eq!(mapper.map(255, 255, 255), AxisSample::new(1.0, -1.0, 1.0));
        assert_eq!(mapper.map(0, 0, 0), AxisSample::new(-1.0, 1.0, -1.0));
    }

    #[test]
    fn deadzone_is_per_axis() {
        let mapper = AxisMapper::default();
        // 145 normalizes to ~0.137: outside the 0.10 pan band, inside the 0.15 zoom band
        let sample = mapper.map(145, 128, 145);
        assert!(sample.pan > 0.13 && sample.pan < 0.14);
        assert_eq!(sample.zoom, 0.0);
    }

    #[test]
    fn clamps_to_configured_domain() {
        let axis = AxisConfig {
            min: 10,
            max: 110,
            deadzone: 0.0,
            invert: false,
        };
        assert_eq!(axis.normalize(0), -1.0);
        assert_eq!(axis.normalize(200), 1.0);
        assert_eq!(axis.normalize(60), 0.0);
    }

    #[test]
    fn rejects_bad_calibration() {
        let empty = AxisConfig {
            min: 50,
            max: 50,
            deadzone: 0.1,
            invert: false,
        };
        assert!(matches!(
            AxisMapper::new(empty, DEFAULT_TILT, DEFAULT_ZOOM),
            Err(ConfigError::EmptyAxisRange { axis: "pan", .. })
        ));

        let wide = AxisConfig::new(1.5, false);
        assert!(matches!(
            AxisMapper::new(DEFAULT_PAN, DEFAULT_TILT, wide),
            Err(ConfigError::InvalidDeadzone { axis: "zoom", .. })
        ));
    }

    #[test]
    fn focus_curve_eases_and_keeps_sign() {
        assert_eq!(focus_depth(0.5), 0.125);
        assert_eq!(to_percent(focus_depth(0.5)), 12);
        assert_eq!(focus_depth(-0.5), -0.125);
        assert!(to_percent(focus_depth(-0.5)) < 0);
        assert_eq!(to_percent(focus_depth(1.0)), 100);
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(to_percent(0.5), 50);
        assert_eq!(to_percent(-0.254), -25);
        assert_eq!(to_percent(0.996), 100);
    }
}
