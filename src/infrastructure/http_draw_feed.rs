use crate::domain::draw::DrawRecord;
use crate::domain::ports::DrawFeed;
use crate::infrastructure::core::{HttpClientFactory, build_url_with_query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Accepted local formats for `drawTime` when it is not RFC 3339
const LOCAL_TIME_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%H:%M:%S %d/%m/%Y", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DigitValue {
    Text(String),
    Number(u64),
}

impl DigitValue {
    fn into_string(self) -> String {
        match self {
            DigitValue::Text(s) => s.trim().to_string(),
            DigitValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawPayload {
    draw_id: String,
    numbers: Vec<DigitValue>,
    draw_time: String,
}

/// Parses an RFC 3339 timestamp, or a local wall-clock time in one of the
/// formats the draw board displays.
pub fn parse_draw_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    LOCAL_TIME_FORMATS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(raw, fmt).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|ts| ts.with_timezone(&Utc))
    })
}

/// Latest draws from a JSON endpoint returning `[{drawId, numbers, drawTime}]`
pub struct HttpDrawFeed {
    client: ClientWithMiddleware,
    url: String,
}

impl HttpDrawFeed {
    pub fn new(draws_url: &str, limit: usize, timeout: Duration) -> Result<Self> {
        let url = build_url_with_query(draws_url, &[("limit", limit.to_string())])?;
        Ok(Self {
            client: HttpClientFactory::create_client(timeout, 3),
            url,
        })
    }
}

fn into_records(payloads: Vec<DrawPayload>) -> Vec<DrawRecord> {
    payloads
        .into_iter()
        .filter_map(|p| {
            let Some(draw_time) = parse_draw_time(&p.draw_time) else {
                warn!("Skipping draw {}: unreadable drawTime {:?}", p.draw_id, p.draw_time);
                return None;
            };
            let numbers = p.numbers.into_iter().map(DigitValue::into_string).collect();
            Some(DrawRecord::new(p.draw_id.trim(), numbers, draw_time))
        })
        .collect()
}

#[async_trait]
impl DrawFeed for HttpDrawFeed {
    async fn fetch_latest_records(&self) -> Result<Vec<DrawRecord>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Draw feed request failed")?
            .error_for_status()
            .context("Draw feed returned an error status")?;

        let payloads: Vec<DrawPayload> = response
            .json()
            .await
            .context("Failed to decode draw feed payload")?;

        let records = into_records(payloads);
        debug!("Draw feed returned {} records", records.len());
        Ok(records)
    }
}
