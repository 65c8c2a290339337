use anyhow::{Context, Result};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use url::Url;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Client with retry middleware, for background fetches that may back off
    pub fn create_client(timeout: Duration, max_retries: u32) -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

        ClientBuilder::new(Self::create_plain_client(timeout))
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    /// Client without retries. Used on the poll path, where a failed read must
    /// surface immediately and be counted.
    pub fn create_plain_client(timeout: Duration) -> Client {
        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Appends query parameters to `base_url`.
/// reqwest-middleware does not expose `.query()`, so the URL is built up front.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid URL: {}", base_url))?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k.as_ref(), v.as_ref());
        }
    }
    Ok(url.to_string())
}
