//! Reference `FeedFetcher` for sources whose `source_type` is `"json"`: a
//! flat JSON array of indicator rows served over HTTP. Other formats (CSV,
//! STIX) are integration points a deployment adds by implementing
//! `FeedFetcher` itself; this is the one concrete fetcher the engine ships.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::ThreatIntelSourceConfig;

use super::sync::{FeedFetcher, ParsedIndicator};
use super::{IndicatorType, Severity};

#[derive(Deserialize)]
struct FeedRow {
    #[serde(rename = "type")]
    indicator_type: String,
    value: String,
    threat_type: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    first_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

pub struct JsonFeedFetcher {
    client: reqwest::Client,
}

impl JsonFeedFetcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for JsonFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FeedFetcher for JsonFeedFetcher {
    async fn fetch(&self, source: &ThreatIntelSourceConfig) -> anyhow::Result<Vec<ParsedIndicator>> {
        let rows: Vec<FeedRow> = self.client.get(&source.url).send().await?.json().await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let indicator_type = match row.indicator_type.as_str() {
                    "url" => IndicatorType::Url,
                    "domain" => IndicatorType::Domain,
                    "ip" => IndicatorType::Ip,
                    "hash" => IndicatorType::Hash,
                    "email" => IndicatorType::Email,
                    _ => return None,
                };
                let severity = match row.severity.as_deref() {
                    Some("low") => Severity::Low,
                    Some("medium") => Severity::Medium,
                    Some("critical") => Severity::Critical,
                    _ => Severity::High,
                };
                Some(ParsedIndicator {
                    indicator_type,
                    value: row.value,
                    threat_type: row.threat_type,
                    severity,
                    confidence: row.confidence.unwrap_or(75.0),
                    first_seen: row.first_seen,
                    expires_at: row.expires_at,
                })
            })
            .collect())
    }
}
