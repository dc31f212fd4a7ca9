use serde::Serialize;

use crate::{measurement::Measurement, quantity::power::Kilowatts};

/// Empirical loss fractions of active power, per component.
const TRANSFORMER_FRACTION: f64 = 0.035;
const LINE_FRACTION: f64 = 0.025;
const CONNECTION_FRACTION: f64 = 0.018;
const OTHER_FRACTION: f64 = 0.012;

/// Four-component technical-loss estimate derived from the latest reading.
///
/// This is a deterministic empirical model, not a metered quantity, and must
/// not be presented as measured data.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LossBreakdown {
    pub transformer_losses: Kilowatts,
    pub line_losses: Kilowatts,
    pub connection_losses: Kilowatts,
    pub other_losses: Kilowatts,
    pub total_losses: Kilowatts,
    pub loss_percentage: f64,
}

impl LossBreakdown {
    /// Shown when no usable reading is available: the dashboard's
    /// placeholder panel, relative to a 100 kW reference load.
    pub const FALLBACK: Self = Self {
        transformer_losses: Kilowatts(8.5),
        line_losses: Kilowatts(5.3),
        connection_losses: Kilowatts(3.2),
        other_losses: Kilowatts(2.1),
        total_losses: Kilowatts(19.1),
        loss_percentage: 19.1,
    };
}

/// Estimate technical losses from the most recent measurement.
///
/// Never fails: with no measurements, or a latest reading whose active power
/// is not a positive finite number, the fallback breakdown is returned
/// instead of propagating NaN or dividing by zero.
#[must_use]
pub fn calculate_losses(measurements: &[Measurement]) -> LossBreakdown {
    let Some(latest) = Measurement::latest(measurements) else {
        return LossBreakdown::FALLBACK;
    };
    if !latest.active_power.is_finite() || latest.active_power <= 0.0 {
        return LossBreakdown::FALLBACK;
    }
    let active_power = Kilowatts(latest.active_power);
    let transformer_losses = active_power * TRANSFORMER_FRACTION;
    let line_losses = active_power * LINE_FRACTION;
    let connection_losses = active_power * CONNECTION_FRACTION;
    let other_losses = active_power * OTHER_FRACTION;
    let total_losses = transformer_losses + line_losses + connection_losses + other_losses;
    LossBreakdown {
        transformer_losses,
        line_losses,
        connection_losses,
        other_losses,
        total_losses,
        loss_percentage: (total_losses / active_power) * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn test_empty_input_falls_back() {
        assert_eq!(calculate_losses(&[]), LossBreakdown::FALLBACK);
    }

    #[test]
    fn test_nan_active_power_falls_back() {
        let measurement = Measurement {
            active_power: f64::NAN,
            ..Measurement::default()
        };
        assert_eq!(calculate_losses(&[measurement]), LossBreakdown::FALLBACK);
    }

    #[test]
    fn test_zero_active_power_falls_back() {
        let measurement = Measurement::default();
        assert_eq!(calculate_losses(&[measurement]), LossBreakdown::FALLBACK);
    }

    #[test]
    fn test_coefficients() {
        let measurement = Measurement {
            active_power: 200.0,
            ..Measurement::default()
        };
        let losses = calculate_losses(&[measurement]);
        assert_abs_diff_eq!(losses.transformer_losses.0, 7.0);
        assert_abs_diff_eq!(losses.line_losses.0, 5.0);
        assert_abs_diff_eq!(losses.connection_losses.0, 3.6);
        assert_abs_diff_eq!(losses.other_losses.0, 2.4);
        assert_abs_diff_eq!(losses.total_losses.0, 18.0, epsilon = 1e-12);
    }

    #[test]
    fn test_percentage_is_constant_for_valid_input() {
        for active_power in [1.0, 37.5, 480.0] {
            let measurement = Measurement {
                active_power,
                ..Measurement::default()
            };
            let losses = calculate_losses(&[measurement]);
            assert_abs_diff_eq!(losses.loss_percentage, 9.0, epsilon = 1e-9);
            assert_abs_diff_eq!(losses.total_losses.0, 0.09 * active_power, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_uses_most_recent_measurement() {
        let earlier = Measurement {
            active_power: 100.0,
            ..Measurement::default()
        };
        let later = Measurement {
            timestamp: earlier.timestamp + TimeDelta::minutes(10),
            active_power: 200.0,
            ..Measurement::default()
        };
        let losses = calculate_losses(&[earlier, later]);
        assert_abs_diff_eq!(losses.total_losses.0, 18.0, epsilon = 1e-12);
    }
}
