use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One point-in-time electrical reading.
///
/// Constructed by the adapter from a single raw backend row and immutable
/// afterwards. All fields except `energy` are instantaneous quantities;
/// `energy` is the consumption accumulated over the reading interval.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub timestamp: DateTime<Local>,

    /// Volts.
    pub voltage: f64,

    /// Amperes.
    pub current: f64,

    /// Kilowatts.
    pub active_power: f64,

    /// Kilovolt-amperes reactive.
    pub reactive_power: f64,

    /// Kilovolt-amperes.
    pub apparent_power: f64,

    pub power_factor: f64,

    /// Hertz.
    pub frequency: f64,

    /// Kilowatt-hours.
    pub energy: f64,

    /// Degrees Celsius.
    pub temperature: f64,

    /// Kilograms of CO₂ equivalent.
    pub carbon_emissions: f64,

    /// Carbon cost factor per ton of product.
    pub cbam_factor: f64,

    /// Relative humidity, percent.
    pub humidity: f64,
}

impl Default for Measurement {
    /// A fresh all-defaults reading: every quantity at zero except the
    /// nominal 50 Hz grid frequency, timestamped now.
    fn default() -> Self {
        Self {
            timestamp: Local::now(),
            voltage: 0.0,
            current: 0.0,
            active_power: 0.0,
            reactive_power: 0.0,
            apparent_power: 0.0,
            power_factor: 0.0,
            frequency: 50.0,
            energy: 0.0,
            temperature: 0.0,
            carbon_emissions: 0.0,
            cbam_factor: 0.0,
            humidity: 0.0,
        }
    }
}

impl Measurement {
    /// The most recent reading by timestamp.
    pub fn latest(measurements: &[Self]) -> Option<&Self> {
        measurements.iter().max_by_key(|measurement| measurement.timestamp)
    }

    /// Infer the derived electrical quantities from whatever fields are
    /// actually populated: apparent power from voltage and current, active
    /// power from apparent power and power factor, reactive power from the
    /// power triangle.
    ///
    /// Only fields still at their zero default are filled. An explicitly
    /// reported value is never overwritten.
    pub fn with_derived_power(mut self) -> Self {
        if self.voltage > 0.0 && self.current > 0.0 && self.apparent_power == 0.0 {
            self.apparent_power = self.voltage * self.current;
        }
        if self.apparent_power > 0.0 && self.power_factor > 0.0 && self.active_power == 0.0 {
            self.active_power = self.apparent_power * self.power_factor;
        }
        if self.apparent_power > 0.0 && self.reactive_power == 0.0 && self.active_power > 0.0 {
            // Inconsistent inputs may push the radicand below zero.
            let radicand = self.apparent_power.powi(2) - self.active_power.powi(2);
            self.reactive_power = radicand.max(0.0).sqrt();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_default_frequency() {
        assert_abs_diff_eq!(Measurement::default().frequency, 50.0);
    }

    #[test]
    fn test_derived_power_from_voltage_and_current() {
        let measurement = Measurement {
            voltage: 220.0,
            current: 10.0,
            ..Measurement::default()
        }
        .with_derived_power();
        assert_abs_diff_eq!(measurement.apparent_power, 2200.0);
    }

    #[test]
    fn test_derived_power_chain() {
        let measurement = Measurement {
            voltage: 100.0,
            current: 10.0,
            power_factor: 0.8,
            ..Measurement::default()
        }
        .with_derived_power();
        assert_abs_diff_eq!(measurement.apparent_power, 1000.0);
        assert_abs_diff_eq!(measurement.active_power, 800.0);
        assert_abs_diff_eq!(measurement.reactive_power, 600.0);
    }

    #[test]
    fn test_derived_power_never_overwrites() {
        let measurement = Measurement {
            voltage: 220.0,
            current: 10.0,
            apparent_power: 1500.0,
            ..Measurement::default()
        }
        .with_derived_power();
        assert_abs_diff_eq!(measurement.apparent_power, 1500.0);
    }

    #[test]
    fn test_derived_power_clamps_negative_radicand() {
        let measurement = Measurement {
            apparent_power: 100.0,
            active_power: 120.0,
            ..Measurement::default()
        }
        .with_derived_power();
        assert_abs_diff_eq!(measurement.reactive_power, 0.0);
    }

    #[test]
    fn test_latest() {
        let earlier = Measurement::default();
        let later = Measurement {
            timestamp: earlier.timestamp + chrono::TimeDelta::minutes(5),
            active_power: 42.0,
            ..Measurement::default()
        };
        let measurements = [later, earlier];
        let latest = Measurement::latest(&measurements).unwrap();
        assert_abs_diff_eq!(latest.active_power, 42.0);
    }

    #[test]
    fn test_latest_empty() {
        assert!(Measurement::latest(&[]).is_none());
    }
}
