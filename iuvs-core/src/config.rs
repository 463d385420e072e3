//! Instrument constants shared by every derivation.

use serde::{Deserialize, Serialize};

/// Orbit from which the failsafe MCP voltage changed.
const FAILSAFE_CHANGE_ORBIT: u32 = 7857;

/// Fixed instrument and pipeline constants.
///
/// Built once at startup and passed by reference into every component
/// that needs one of the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConstants {
    /// Smallest commanded scan-mirror angle [degrees].
    pub minimum_mirror_angle: f64,
    /// Largest commanded scan-mirror angle [degrees].
    pub maximum_mirror_angle: f64,
    /// MCP voltage separating dayside from nightside settings [V].
    pub day_night_voltage_boundary: f64,
    /// Failsafe MCP voltage used before the change orbit [V].
    pub early_failsafe_voltage: f64,
    /// Failsafe MCP voltage used from the change orbit on [V].
    pub late_failsafe_voltage: f64,
    /// Solid angle of one detector pixel [sr].
    pub pixel_angular_size: f64,
    /// MCP gain the voltage correction is normalized to.
    pub reference_mcp_gain: f64,
    /// Fraction of integrations that must vote for a flip.
    pub app_flip_threshold: f64,
    /// Gzip level used for every stored dataset.
    pub deflate_level: u8,
}

impl Default for InstrumentConstants {
    fn default() -> Self {
        Self {
            minimum_mirror_angle: 30.250_854_492_187_5,
            maximum_mirror_angle: 59.650_268_554_687_5,
            day_night_voltage_boundary: 790.0,
            early_failsafe_voltage: 497.638_03,
            late_failsafe_voltage: 515.206,
            pixel_angular_size: (22.0 / 1024.0) / 99.5 * 0.1 / 99.5,
            reference_mcp_gain: 50.909_455,
            app_flip_threshold: 0.5,
            deflate_level: 4,
        }
    }
}

impl InstrumentConstants {
    /// Creates the flight constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scan-mirror angle bounds.
    #[must_use]
    pub fn with_mirror_angles(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum_mirror_angle = minimum;
        self.maximum_mirror_angle = maximum;
        self
    }

    /// Sets the day/night voltage boundary.
    #[must_use]
    pub fn with_day_night_voltage_boundary(mut self, voltage: f64) -> Self {
        self.day_night_voltage_boundary = voltage;
        self
    }

    /// Sets the app flip vote threshold.
    #[must_use]
    pub fn with_app_flip_threshold(mut self, threshold: f64) -> Self {
        self.app_flip_threshold = threshold;
        self
    }

    /// Sets the dataset compression level.
    #[must_use]
    pub fn with_deflate_level(mut self, level: u8) -> Self {
        self.deflate_level = level.min(9);
        self
    }

    /// Returns the failsafe MCP voltage in effect for `orbit`.
    pub fn failsafe_voltage(&self, orbit: u32) -> f64 {
        if orbit < FAILSAFE_CHANGE_ORBIT {
            self.early_failsafe_voltage
        } else {
            self.late_failsafe_voltage
        }
    }

    /// Field of view swept when the mirror sits at its lower bound.
    pub fn minimum_field_of_view(&self) -> f64 {
        self.minimum_mirror_angle * 2.0
    }

    /// Field of view swept when the mirror sits at its upper bound.
    pub fn maximum_field_of_view(&self) -> f64 {
        self.maximum_mirror_angle * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_failsafe_voltage_changes_at_orbit_7857() {
        let constants = InstrumentConstants::default();
        assert_relative_eq!(constants.failsafe_voltage(7856), 497.638_03);
        assert_relative_eq!(constants.failsafe_voltage(7857), 515.206);
    }

    #[test]
    fn test_pixel_angular_size() {
        let constants = InstrumentConstants::default();
        assert_relative_eq!(
            constants.pixel_angular_size,
            2.170_084_088_785_636_7e-7,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_builder() {
        let constants = InstrumentConstants::new()
            .with_app_flip_threshold(0.2)
            .with_deflate_level(12);
        assert_relative_eq!(constants.app_flip_threshold, 0.2);
        assert_eq!(constants.deflate_level, 9);
    }
}
