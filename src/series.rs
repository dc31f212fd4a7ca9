use chrono::{DateTime, DurationRound, Local, TimeDelta};
use itertools::Itertools;

use crate::measurement::Measurement;

/// Aggregation bucket size for charting and tabular display.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Granularity {
    /// Pass measurements through unaggregated.
    None,

    #[value(name = "15min")]
    QuarterHour,

    Hourly,

    Daily,
}

impl Granularity {
    fn time_delta(self) -> Option<TimeDelta> {
        match self {
            Self::None => None,
            Self::QuarterHour => Some(TimeDelta::minutes(15)),
            Self::Hourly => Some(TimeDelta::hours(1)),
            Self::Daily => Some(TimeDelta::days(1)),
        }
    }
}

/// The dashboard's display-window vocabulary.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum TimeRange {
    Hour,

    #[value(name = "12hours")]
    HalfDay,

    Day,

    Week,

    Month,
}

impl TimeRange {
    #[must_use]
    pub fn window(self) -> TimeDelta {
        match self {
            Self::Hour => TimeDelta::hours(1),
            Self::HalfDay => TimeDelta::hours(12),
            Self::Day => TimeDelta::hours(24),
            Self::Week => TimeDelta::days(7),
            Self::Month => TimeDelta::days(30),
        }
    }
}

/// Collapse measurements into fixed time buckets.
///
/// The bucket key is the timestamp truncated to the granularity boundary.
/// Within a bucket every field is averaged except `energy`, a
/// consumption-over-interval quantity, which is summed. Output is sorted
/// ascending by bucket timestamp.
#[must_use]
pub fn aggregate(measurements: &[Measurement], granularity: Granularity) -> Vec<Measurement> {
    let Some(time_delta) = granularity.time_delta() else {
        return measurements.to_vec();
    };
    measurements
        .iter()
        .into_group_map_by(|measurement| {
            measurement
                .timestamp
                .duration_trunc(time_delta)
                .unwrap_or(measurement.timestamp)
        })
        .into_iter()
        .map(|(timestamp, bucket)| average_bucket(timestamp, &bucket))
        .sorted_unstable_by_key(|measurement| measurement.timestamp)
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn average_bucket(timestamp: DateTime<Local>, bucket: &[&Measurement]) -> Measurement {
    let mut sum = Measurement {
        timestamp,
        frequency: 0.0,
        ..Measurement::default()
    };
    for measurement in bucket {
        sum.voltage += measurement.voltage;
        sum.current += measurement.current;
        sum.active_power += measurement.active_power;
        sum.reactive_power += measurement.reactive_power;
        sum.apparent_power += measurement.apparent_power;
        sum.power_factor += measurement.power_factor;
        sum.frequency += measurement.frequency;
        sum.energy += measurement.energy;
        sum.temperature += measurement.temperature;
        sum.carbon_emissions += measurement.carbon_emissions;
        sum.cbam_factor += measurement.cbam_factor;
        sum.humidity += measurement.humidity;
    }
    let count = bucket.len() as f64;
    Measurement {
        timestamp,
        voltage: sum.voltage / count,
        current: sum.current / count,
        active_power: sum.active_power / count,
        reactive_power: sum.reactive_power / count,
        apparent_power: sum.apparent_power / count,
        power_factor: sum.power_factor / count,
        frequency: sum.frequency / count,
        energy: sum.energy,
        temperature: sum.temperature / count,
        carbon_emissions: sum.carbon_emissions / count,
        cbam_factor: sum.cbam_factor / count,
        humidity: sum.humidity / count,
    }
}

/// Keep only measurements within the display window, counted back from now.
#[must_use]
pub fn filter_by_time_range(measurements: &[Measurement], time_range: TimeRange) -> Vec<Measurement> {
    filter_since(measurements, Local::now() - time_range.window())
}

#[must_use]
pub fn filter_since(measurements: &[Measurement], cutoff: DateTime<Local>) -> Vec<Measurement> {
    measurements
        .iter()
        .filter(|measurement| measurement.timestamp >= cutoff)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap()
    }

    fn reading(timestamp: DateTime<Local>, active_power: f64, energy: f64) -> Measurement {
        Measurement {
            timestamp,
            active_power,
            energy,
            ..Measurement::default()
        }
    }

    #[test]
    fn test_aggregate_none_is_identity() {
        let measurements = vec![reading(at(10, 0), 100.0, 1.0), reading(at(10, 5), 120.0, 2.0)];
        assert_eq!(aggregate(&measurements, Granularity::None), measurements);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[], Granularity::Hourly).is_empty());
    }

    #[test]
    fn test_aggregate_hourly_averages_and_sums() {
        let measurements = vec![reading(at(10, 0), 100.0, 1.5), reading(at(10, 5), 120.0, 2.5)];
        let aggregated = aggregate(&measurements, Granularity::Hourly);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].timestamp, at(10, 0));
        assert_abs_diff_eq!(aggregated[0].active_power, 110.0);
        assert_abs_diff_eq!(aggregated[0].energy, 4.0);
    }

    #[test]
    fn test_aggregate_quarter_hour_buckets() {
        let measurements = vec![
            reading(at(10, 7), 100.0, 1.0),
            reading(at(10, 22), 200.0, 1.0),
            reading(at(10, 29), 300.0, 1.0),
        ];
        let aggregated = aggregate(&measurements, Granularity::QuarterHour);
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].timestamp, at(10, 0));
        assert_eq!(aggregated[1].timestamp, at(10, 15));
        assert_abs_diff_eq!(aggregated[1].active_power, 250.0);
    }

    #[test]
    fn test_aggregate_daily_bucket_key() {
        let measurements = vec![reading(at(10, 7), 100.0, 1.0), reading(at(23, 59), 200.0, 1.0)];
        let aggregated = aggregate(&measurements, Granularity::Daily);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].timestamp, at(0, 0));
    }

    #[test]
    fn test_aggregate_output_sorted() {
        let measurements = vec![
            reading(at(12, 1), 10.0, 1.0),
            reading(at(9, 1), 20.0, 1.0),
            reading(at(11, 1), 30.0, 1.0),
        ];
        let aggregated = aggregate(&measurements, Granularity::Hourly);
        let timestamps: Vec<_> =
            aggregated.iter().map(|measurement| measurement.timestamp).collect();
        assert_eq!(timestamps, vec![at(9, 0), at(11, 0), at(12, 0)]);
    }

    #[test]
    fn test_filter_since() {
        let measurements = vec![reading(at(9, 0), 1.0, 1.0), reading(at(11, 0), 2.0, 1.0)];
        let filtered = filter_since(&measurements, at(10, 0));
        assert_eq!(filtered.len(), 1);
        assert_abs_diff_eq!(filtered[0].active_power, 2.0);
    }

    #[test]
    fn test_time_range_windows() {
        assert_eq!(TimeRange::Hour.window(), TimeDelta::hours(1));
        assert_eq!(TimeRange::HalfDay.window(), TimeDelta::hours(12));
        assert_eq!(TimeRange::Day.window(), TimeDelta::hours(24));
        assert_eq!(TimeRange::Week.window(), TimeDelta::days(7));
        assert_eq!(TimeRange::Month.window(), TimeDelta::days(30));
    }
}
