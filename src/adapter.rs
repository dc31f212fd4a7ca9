use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::measurement::Measurement;

/// One raw metric row as the backend reports it.
///
/// Field names differ between the database export (snake case) and the REST
/// API (camel case), hence the aliases. A row carries exactly one scalar
/// reading, discriminated by its tag.
#[must_use]
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct RawMetricRow {
    #[serde(default, alias = "measurement_time", alias = "time")]
    pub timestamp: Option<DateTime<Local>>,

    #[serde(default, alias = "machineId")]
    pub machine_id: Option<String>,

    #[serde(default, alias = "tagId")]
    pub tag_id: String,

    #[serde_as(as = "serde_with::DefaultOnError")]
    #[serde(default)]
    pub value: f64,

    #[serde(default)]
    pub unit: String,
}

/// Which [`Measurement`] field a scalar reading populates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Field {
    Voltage,
    Current,
    ActivePower,
    ReactivePower,
    ApparentPower,
    PowerFactor,
    Frequency,
    Energy,
    Temperature,
    CarbonEmissions,
    CbamFactor,
    Humidity,
}

impl Field {
    /// The backend's tag vocabulary, case-sensitive.
    fn from_tag(tag_id: &str) -> Option<Self> {
        match tag_id {
            "ENERGY_KWH" | "KWH" | "energy" => Some(Self::Energy),
            "ENERGY_AMPS" | "AMPS" | "current" => Some(Self::Current),
            "TEMPERATURE" | "temp" => Some(Self::Temperature),
            "VOLTAGE" | "volts" => Some(Self::Voltage),
            "ACTIVE_POWER" | "power" | "kw" => Some(Self::ActivePower),
            "POWER_FACTOR" | "pf" => Some(Self::PowerFactor),
            "REACTIVE_POWER" | "kvar" => Some(Self::ReactivePower),
            "APPARENT_POWER" | "kva" => Some(Self::ApparentPower),
            "FREQUENCY" | "freq" | "hz" => Some(Self::Frequency),
            "CARBON_EMISSIONS" | "co2" => Some(Self::CarbonEmissions),
            "CBAM_FACTOR" => Some(Self::CbamFactor),
            "HUMIDITY" | "humid" => Some(Self::Humidity),
            _ => None,
        }
    }

    /// Last-resort guess for tags outside the vocabulary.
    fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            "V" => Some(Self::Voltage),
            "A" => Some(Self::Current),
            "kW" => Some(Self::ActivePower),
            "kWh" => Some(Self::Energy),
            "°C" | "C" => Some(Self::Temperature),
            _ => None,
        }
    }

    fn set(self, measurement: &mut Measurement, value: f64) {
        match self {
            Self::Voltage => measurement.voltage = value,
            Self::Current => measurement.current = value,
            Self::ActivePower => measurement.active_power = value,
            Self::ReactivePower => measurement.reactive_power = value,
            Self::ApparentPower => measurement.apparent_power = value,
            Self::PowerFactor => measurement.power_factor = value,
            Self::Frequency => measurement.frequency = value,
            Self::Energy => measurement.energy = value,
            Self::Temperature => measurement.temperature = value,
            Self::CarbonEmissions => measurement.carbon_emissions = value,
            Self::CbamFactor => measurement.cbam_factor = value,
            Self::Humidity => measurement.humidity = value,
        }
    }
}

impl RawMetricRow {
    fn to_measurement(&self) -> Measurement {
        let mut measurement = Measurement::default();
        if let Some(timestamp) = self.timestamp {
            measurement.timestamp = timestamp;
        }
        if let Some(field) =
            Field::from_tag(&self.tag_id).or_else(|| Field::from_unit(&self.unit))
        {
            field.set(&mut measurement, self.value);
        }
        measurement.with_derived_power()
    }
}

/// Normalize raw backend rows into measurements, one per row, in input order.
///
/// A row whose tag and unit are both unrecognized still yields a measurement,
/// just with every field at its default.
#[must_use]
pub fn adapt_metrics(rows: &[RawMetricRow]) -> Vec<Measurement> {
    rows.iter().map(RawMetricRow::to_measurement).collect()
}

/// One raw incident row as the backend reports it.
#[must_use]
#[derive(Debug, Deserialize)]
pub struct RawIncidentRow {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub severity: String,

    #[serde(default, alias = "machineId")]
    pub machine_id: Option<String>,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub resolved: Option<bool>,

    #[serde(default, alias = "createdAt", alias = "timestamp")]
    pub created_at: Option<DateTime<Local>>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

impl Severity {
    /// Unknown or absent severities read as medium.
    fn from_raw(severity: &str) -> Self {
        match severity.to_uppercase().as_str() {
            "LOW" => Self::Low,
            "HIGH" => Self::High,
            _ => Self::Medium,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    #[display("voltage sag")]
    VoltageSag,
    #[display("voltage swell")]
    VoltageSwell,
    #[display("harmonic distortion")]
    HarmonicDistortion,
    #[display("overload")]
    Overload,
    #[display("power factor")]
    PowerFactor,
}

impl IncidentKind {
    /// Classified from the incident title. Power factor is the catch-all.
    fn from_title(title: &str) -> Self {
        let title = title.to_lowercase();
        if title.contains("voltage") && (title.contains("sag") || title.contains("drop")) {
            Self::VoltageSag
        } else if title.contains("voltage") && (title.contains("swell") || title.contains("spike"))
        {
            Self::VoltageSwell
        } else if title.contains("harmonic") || title.contains("distortion") {
            Self::HarmonicDistortion
        } else if title.contains("overload") || title.contains("capacity") {
            Self::Overload
        } else {
            Self::PowerFactor
        }
    }
}

/// A normalized incident ready for display.
#[must_use]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub timestamp: DateTime<Local>,
    pub machine_id: Option<String>,
    pub kind: IncidentKind,
    pub severity: Severity,
    pub description: String,
    pub resolved: bool,
}

/// Normalize raw incident rows, in input order.
#[must_use]
pub fn adapt_incidents(rows: &[RawIncidentRow]) -> Vec<Incident> {
    rows.iter()
        .map(|row| {
            let description = if row.description.is_empty() {
                if row.title.is_empty() {
                    "Incident detected".to_string()
                } else {
                    row.title.clone()
                }
            } else {
                row.description.clone()
            };
            Incident {
                timestamp: row.created_at.unwrap_or_else(Local::now),
                machine_id: row.machine_id.clone(),
                kind: IncidentKind::from_title(&row.title),
                severity: Severity::from_raw(&row.severity),
                description,
                resolved: row.status == "RESOLVED" || row.resolved == Some(true),
            }
        })
        .collect()
}
