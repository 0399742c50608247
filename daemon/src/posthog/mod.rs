//! PostHog entry source.
//!
//! Eligible entries come from recharge events tracked in PostHog. One HogQL
//! aggregation per draw sums the points per MSISDN over the eligibility
//! window. The HTTP client is built per request and dropped on every exit
//! path.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use promodraw_common::{models::EligibleEntry, window::EligibilityWindow};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::entries::EntryProvider;

/// Event name tracked by the top-up pipeline.
const RECHARGE_EVENT: &str = "recharge";

#[derive(Debug, Error)]
pub enum EntrySourceError {
    #[error("analytics transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analytics returned an unexpected payload: {0}")]
    UnexpectedPayload(String),
}

/// Connection settings for the PostHog query API.
#[derive(Debug, Clone)]
pub struct PostHogConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct PostHogClient {
    config: PostHogConfig,
}

impl PostHogClient {
    pub fn new(config: PostHogConfig) -> Self {
        Self { config }
    }

    fn query_for(window: &EligibilityWindow) -> String {
        format!(
            "SELECT properties.msisdn AS msisdn, sum(toInt64(properties.points)) AS points \
             FROM events \
             WHERE event = '{}' AND timestamp >= '{}' AND timestamp <= '{}' \
             GROUP BY msisdn",
            RECHARGE_EVENT,
            window.start.to_rfc3339(),
            window.end.to_rfc3339(),
        )
    }
}

#[async_trait]
impl EntryProvider for PostHogClient {
    async fn fetch_eligible_entries(
        &self,
        window: &EligibilityWindow,
    ) -> Result<Vec<EligibleEntry>, EntrySourceError> {
        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()?;

        let body = json!({
            "query": {
                "kind": "HogQL",
                "query": Self::query_for(window),
            }
        });

        debug!("querying analytics at {}", self.config.endpoint);
        let response = http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: Value = response.json().await?;
        let rows = payload
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                EntrySourceError::UnexpectedPayload("missing 'results' array".to_string())
            })?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let columns = row.as_array().ok_or_else(|| {
                EntrySourceError::UnexpectedPayload("result row is not an array".to_string())
            })?;
            let msisdn = columns
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    EntrySourceError::UnexpectedPayload("row is missing the msisdn".to_string())
                })?;
            let points = columns
                .get(1)
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    EntrySourceError::UnexpectedPayload("row is missing the points".to_string())
                })?;

            // rows without positive weight never form a ticket
            if points < 1 {
                continue;
            }
            let points = u32::try_from(points).map_err(|_| {
                EntrySourceError::UnexpectedPayload(format!(
                    "points {} out of range for {}",
                    points, msisdn
                ))
            })?;

            entries.push(EligibleEntry {
                msisdn: msisdn.to_string(),
                points,
            });
        }

        Ok(entries)
    }
}
