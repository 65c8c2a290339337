use crate::domain::errors::ReadError;
use crate::domain::ports::CountdownSource;
use crate::infrastructure::core::HttpClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct CountdownPayload {
    seconds: i64,
}

/// Countdown served over HTTP.
///
/// The endpoint answers either JSON `{"seconds": 27}` or the timer text as
/// displayed (`"00:27"`, `"27"`). Refresh is a POST to an optional endpoint.
pub struct HttpCountdownSource {
    client: Client,
    countdown_url: String,
    refresh_url: Option<String>,
    timeout: Duration,
}

impl HttpCountdownSource {
    pub fn new(countdown_url: String, refresh_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: HttpClientFactory::create_plain_client(timeout),
            countdown_url,
            refresh_url,
            timeout,
        }
    }

    fn map_error(&self, e: reqwest::Error) -> ReadError {
        if e.is_timeout() {
            ReadError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }
        } else {
            ReadError::Transient {
                reason: e.to_string(),
            }
        }
    }
}

/// Parses a countdown body: JSON object, bare integer, or clock text.
///
/// Clock text keeps only its last two digits, which is how the timer
/// widget renders the seconds of a sub-three-minute cycle.
pub fn parse_countdown_body(body: &str) -> Result<i64, ReadError> {
    let trimmed = body.trim();

    if let Ok(payload) = serde_json::from_str::<CountdownPayload>(trimmed) {
        return Ok(payload.seconds);
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }

    let digits: Vec<char> = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let non_separators = trimmed.chars().filter(|c| *c != ':').count();
    if digits.is_empty() || digits.len() > 4 || digits.len() != non_separators {
        return Err(ReadError::Transient {
            reason: format!("Unrecognized countdown body: {:?}", trimmed),
        });
    }

    let tail: String = digits[digits.len().saturating_sub(2)..].iter().collect();
    tail.parse::<i64>().map_err(|e| ReadError::Transient {
        reason: format!("Unrecognized countdown body {:?}: {}", trimmed, e),
    })
}

#[async_trait]
impl CountdownSource for HttpCountdownSource {
    async fn read_countdown_seconds(&self) -> Result<i64, ReadError> {
        let response = self
            .client
            .get(&self.countdown_url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?
            .error_for_status()
            .map_err(|e| self.map_error(e))?;

        let body = response.text().await.map_err(|e| self.map_error(e))?;
        parse_countdown_body(&body)
    }

    async fn request_refresh(&self) -> Result<()> {
        let Some(url) = &self.refresh_url else {
            debug!("No refresh endpoint configured, skipping source refresh");
            return Ok(());
        };

        self.client
            .post(url)
            .send()
            .await
            .context("Refresh request failed")?
            .error_for_status()
            .context("Refresh endpoint returned an error")?;

        info!("Countdown source refreshed via {}", url);
        Ok(())
    }
}
