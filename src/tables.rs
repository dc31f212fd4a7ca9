use chrono::{DateTime, Local};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    adapter::{Incident, Severity},
    balancer::{Anomaly, MeasurementNode},
    losses::LossBreakdown,
    measurement::Measurement,
    quantity::{energy::KilowattHours, power::Kilowatts},
    series::Granularity,
};

/// Display styles for timestamps.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimestampFormat {
    Time,
    Date,
    DateTime,
}

#[must_use]
pub fn format_timestamp(timestamp: DateTime<Local>, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::Time => timestamp.format("%H:%M").to_string(),
        TimestampFormat::Date => timestamp.format("%b %-d").to_string(),
        TimestampFormat::DateTime => timestamp.format("%b %-d %H:%M").to_string(),
    }
}

const fn timestamp_format_for(granularity: Granularity) -> TimestampFormat {
    match granularity {
        Granularity::None => TimestampFormat::Time,
        Granularity::QuarterHour | Granularity::Hourly => TimestampFormat::DateTime,
        Granularity::Daily => TimestampFormat::Date,
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

#[must_use]
pub fn build_measurements_table(
    measurements: &[Measurement],
    granularity: Granularity,
) -> Table {
    let format = timestamp_format_for(granularity);
    let mut table = new_table();
    table.set_header(vec![
        "Time", "Voltage", "Current", "Active", "Reactive", "Apparent", "PF", "Energy", "Temp",
    ]);
    for measurement in measurements {
        table.add_row(vec![
            Cell::new(format_timestamp(measurement.timestamp, format)),
            Cell::new(format!("{:.1} V", measurement.voltage)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1} A", measurement.current)).set_alignment(CellAlignment::Right),
            Cell::new(Kilowatts(measurement.active_power)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2} kvar", measurement.reactive_power))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2} kVA", measurement.apparent_power))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", measurement.power_factor)).fg(
                if measurement.power_factor >= 0.95 {
                    Color::Green
                } else if measurement.power_factor >= 0.85 {
                    Color::DarkYellow
                } else {
                    Color::Red
                },
            ),
            Cell::new(KilowattHours(measurement.energy)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1} °C", measurement.temperature))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[must_use]
pub fn build_losses_table(losses: &LossBreakdown) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Component", "Loss"]);
    for (component, loss) in [
        ("Transformer", losses.transformer_losses),
        ("Line", losses.line_losses),
        ("Connection", losses.connection_losses),
        ("Other", losses.other_losses),
    ] {
        table.add_row(vec![Cell::new(component), Cell::new(loss).set_alignment(CellAlignment::Right)]);
    }
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(losses.total_losses)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Share of load"),
        Cell::new(format!("{:.1} %", losses.loss_percentage)).set_alignment(CellAlignment::Right),
    ]);
    table
}

#[must_use]
pub fn build_flow_table(nodes: &[MeasurementNode], anomalies: &[Anomaly]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Node", "Reading", "Source", "Deviation"]);
    for node in nodes {
        let source = if node.is_estimated {
            Cell::new("estimated").add_attribute(Attribute::Dim)
        } else {
            Cell::new("metered")
        };
        let deviation = anomalies
            .iter()
            .find(|anomaly| anomaly.node_id == node.id)
            .map_or_else(
                || Cell::new(""),
                |anomaly| Cell::new(format!("{:+.1} %", anomaly.deviation_percent)).fg(Color::Red),
            );
        table.add_row(vec![
            Cell::new(&node.id),
            Cell::new(Kilowatts(node.value)).set_alignment(CellAlignment::Right),
            source,
            deviation,
        ]);
    }
    table
}

#[must_use]
pub fn build_incidents_table(incidents: &[Incident]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Time", "Machine", "Kind", "Severity", "Status", "Description"]);
    for incident in incidents {
        let severity_color = match incident.severity {
            Severity::High => Color::Red,
            Severity::Medium => Color::DarkYellow,
            Severity::Low => Color::Green,
        };
        let status = if incident.resolved {
            Cell::new("resolved").add_attribute(Attribute::Dim)
        } else {
            Cell::new("open")
        };
        table.add_row(vec![
            Cell::new(format_timestamp(incident.timestamp, TimestampFormat::DateTime)),
            Cell::new(incident.machine_id.as_deref().unwrap_or("")),
            Cell::new(incident.kind),
            Cell::new(incident.severity).fg(severity_color),
            status,
            Cell::new(&incident.description),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_format_timestamp() {
        let timestamp = NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
            .and_local_timezone(Local)
            .unwrap();
        assert_eq!(format_timestamp(timestamp, TimestampFormat::Time), "09:05");
        assert_eq!(format_timestamp(timestamp, TimestampFormat::Date), "Aug 6");
        assert_eq!(format_timestamp(timestamp, TimestampFormat::DateTime), "Aug 6 09:05");
    }
}
