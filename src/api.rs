use std::time::Duration;

use chrono::{DateTime, Local};
use reqwest::{Client, ClientBuilder, Url};
use serde::Deserialize;
use serde_with::serde_as;

use crate::{
    adapter::{RawIncidentRow, RawMetricRow},
    prelude::*,
};

/// Thin client for the plant's backend service.
pub struct Api {
    client: Client,
    base_url: Url,
}

/// Optional row filters understood by the backend.
#[derive(Clone, Debug, Default)]
pub struct MetricsQuery {
    pub machine_id: Option<String>,
    pub tag_id: Option<String>,
    pub from_time: Option<DateTime<Local>>,
    pub to_time: Option<DateTime<Local>>,
    pub limit: Option<u32>,
}

/// Malformed rows are skipped rather than failing the whole batch.
#[must_use]
#[serde_as]
#[derive(Deserialize)]
struct MetricRows(#[serde_as(as = "serde_with::VecSkipError<_>")] Vec<RawMetricRow>);

#[must_use]
#[serde_as]
#[derive(Deserialize)]
struct IncidentRows(#[serde_as(as = "serde_with::VecSkipError<_>")] Vec<RawIncidentRow>);

impl Api {
    pub fn try_new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segment: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut().map_err(|()| anyhow!("invalid base URL"))?.push(segment);
        Ok(url)
    }

    #[instrument(skip_all)]
    pub async fn get_energy_metrics(&self, query: &MetricsQuery) -> Result<Vec<RawMetricRow>> {
        let mut url = self.endpoint("energy-metrics")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(machine_id) = &query.machine_id {
                pairs.append_pair("machineId", machine_id);
            }
            if let Some(tag_id) = &query.tag_id {
                pairs.append_pair("tagId", tag_id);
            }
            if let Some(from_time) = query.from_time {
                pairs.append_pair("fromTime", &from_time.to_rfc3339());
            }
            if let Some(to_time) = query.to_time {
                pairs.append_pair("toTime", &to_time.to_rfc3339());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        let rows: MetricRows =
            self.client.get(url).send().await?.error_for_status()?.json().await?;
        info!(n_rows = rows.0.len(), "fetched energy metrics");
        Ok(rows.0)
    }

    #[instrument(skip_all)]
    pub async fn get_energy_incidents(
        &self,
        machine_id: Option<&str>,
    ) -> Result<Vec<RawIncidentRow>> {
        let mut url = self.endpoint("energy-incidents")?;
        if let Some(machine_id) = machine_id {
            url.query_pairs_mut().append_pair("machineId", machine_id);
        }
        let rows: IncidentRows =
            self.client.get(url).send().await?.error_for_status()?.json().await?;
        info!(n_rows = rows.0.len(), "fetched energy incidents");
        Ok(rows.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_rows_are_skipped() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            [
                {"tag_id": "VOLTAGE", "value": 231.2, "unit": "V"},
                {"tag_id": "ACTIVE_POWER", "value": 42.5, "unit": "kW", "timestamp": "not a timestamp"},
                {"tag_id": "FREQUENCY", "value": 50.1, "unit": "Hz"}
            ]
        "#;
        let rows = serde_json::from_str::<MetricRows>(RESPONSE)?;
        assert_eq!(rows.0.len(), 2);
        assert_eq!(rows.0[1].tag_id, "FREQUENCY");
        Ok(())
    }
}
