//! HTTP client construction and page fetching.
//!
//! # Example
//! ```no_run
//! use stowage_config::http::{HttpClientParams, build_http_client};
//!
//! let config: serde_yaml::Value = serde_yaml::from_str(r#"
//! http:
//!     timeout: 30
//!     connect_timeout: 10
//!     user_agent: my-crawler/1.0
//! "#).unwrap();
//!
//! let params = HttpClientParams::from_config(&config).unwrap();
//! let client = build_http_client(&params).unwrap();
//! ```
use crate::config::{ConfigError, Configurable};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("stowage/", env!("CARGO_PKG_VERSION"));

/// Parameters for configuring an HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientParams {
    pub timeout: u64,
    pub connect_timeout: u64,
    pub user_agent: String,
    /// Retry failed requests with exponential backoff for up to this many
    /// seconds. `None` means a single attempt.
    pub retry_max_elapsed: Option<u64>,
}

impl Default for HttpClientParams {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_max_elapsed: None,
        }
    }
}

impl HttpClientParams {
    /// Read the `http` section of a config:
    /// ```yaml
    /// http:
    ///     timeout: 30
    ///     connect_timeout: 10
    ///     user_agent: stowage/0.1
    ///     retry_max_elapsed: 30
    /// ```
    /// Missing fields fall back to defaults; retries stay off unless
    /// `retry_max_elapsed` is set.
    pub fn from_config(config: &serde_yaml::Value) -> Result<Self, ConfigError> {
        let retry_max_elapsed = match config.get_config_value("http.retry_max_elapsed")
        {
            None | Some(serde_yaml::Value::Null) => None,
            Some(_) => Some(config.get_config_u64("http.retry_max_elapsed", 0)?),
        };

        Ok(Self {
            timeout: config.get_config_u64("http.timeout", DEFAULT_TIMEOUT)?,
            connect_timeout: config
                .get_config_u64("http.connect_timeout", DEFAULT_CONNECT_TIMEOUT)?,
            user_agent: config
                .get_config_str("http.user_agent", DEFAULT_USER_AGENT)?,
            retry_max_elapsed,
        })
    }
}

/// Builds a `reqwest::Client` with rustls, timeouts and user agent applied.
pub fn build_http_client(
    params: &HttpClientParams,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .timeout(Duration::from_secs(params.timeout))
        .connect_timeout(Duration::from_secs(params.connect_timeout))
        .user_agent(params.user_agent.as_str())
        .build()
}

/// Fetches content from a URL.
///
/// Returns the status code together with the body; the status is not
/// checked here. With `retry_max_elapsed` set, transport errors are retried
/// with exponential backoff until that many seconds have passed.
pub async fn fetch_url_content(
    client: &reqwest::Client,
    url: &str,
    retry_max_elapsed: Option<u64>,
) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
    match retry_max_elapsed {
        None => fetch_once(client, url).await,
        Some(max_elapsed) => {
            let backoff = ExponentialBackoffBuilder::new()
                .with_max_interval(Duration::from_secs(10))
                .with_max_elapsed_time(Some(Duration::from_secs(max_elapsed)))
                .build();
            backoff::future::retry(backoff, || async move {
                fetch_once(client, url).await.map_err(|e| {
                    // A request that cannot be built fails the same way every time.
                    if e.is_builder() {
                        return backoff::Error::permanent(e);
                    }
                    tracing::warn!("Fetching {} failed, retrying: {}", url, e);
                    backoff::Error::transient(e)
                })
            })
            .await
        }
    }
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let text = response.text().await?;
    Ok((status, text))
}
