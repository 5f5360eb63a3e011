//! Metrics endpoint fetcher
//!
//! One call to [`Fetcher::poll`] is one HTTP GET. A successful poll decodes
//! the body and hands the checkpoint samples to the aggregator over the
//! bounded sample channel.

use crate::decoder::decode_samples;
use crate::error::{AppError, AppResult, FetchError, ParseError};
use crate::sample::Sample;
use reqwest::StatusCode;
use reqwest::header::CONNECTION;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long to wait for the endpoint to send response headers
pub const HEADER_TIMEOUT: Duration = Duration::from_secs(60);

/// Samples published by a poll, or why it failed
pub type PollOutcome = Result<Vec<Sample>, FetchError>;

pub struct Fetcher {
    client: reqwest::Client,
    url: String,
    samples: mpsc::Sender<Sample>,
    header_timeout: Duration,
}

impl Fetcher {
    /// Create a fetcher for `url` publishing onto `samples`
    ///
    /// The URL itself is not checked here; a malformed one fails each poll
    /// with [`FetchError::RequestConstruction`].
    pub fn new(url: impl Into<String>, samples: mpsc::Sender<Sample>) -> AppResult<Self> {
        // A poll is a single request; never keep idle connections around
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            samples,
            header_timeout: HEADER_TIMEOUT,
        })
    }

    /// Override the response header timeout
    pub fn with_header_timeout(mut self, timeout: Duration) -> Self {
        self.header_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Scrape the endpoint once and publish whatever checkpoint gauges it reports
    pub async fn poll(&self) -> PollOutcome {
        let request = self
            .client
            .get(&self.url)
            .header(CONNECTION, "close")
            .build()
            .map_err(|source| FetchError::RequestConstruction {
                url: self.url.clone(),
                source,
            })?;

        let response =
            match tokio::time::timeout(self.header_timeout, self.client.execute(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(source)) => {
                    return Err(FetchError::Transport {
                        url: self.url.clone(),
                        source,
                    });
                }
                Err(_) => {
                    return Err(FetchError::HeaderTimeout {
                        url: self.url.clone(),
                        timeout_secs: self.header_timeout.as_secs(),
                    });
                }
            };

        let status = response.status();
        if status != StatusCode::OK {
            // Drain the body so the connection is closed cleanly, but never
            // wait on it longer than on the headers
            match tokio::time::timeout(self.header_timeout, response.bytes()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(url = %self.url, error = %e, "Failed to drain error response body");
                }
                Err(_) => {
                    tracing::debug!(url = %self.url, "Gave up draining stalled error response body");
                }
            }
            return Err(FetchError::HttpStatus {
                url: self.url.clone(),
                status,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: self.url.clone(),
                source,
            })?;
        let body = std::str::from_utf8(&bytes).map_err(|e| FetchError::Parse {
            url: self.url.clone(),
            source: invalid_utf8(&bytes, e),
        })?;

        let samples = decode_samples(body).map_err(|source| FetchError::Parse {
            url: self.url.clone(),
            source,
        })?;

        tracing::debug!(url = %self.url, samples = samples.len(), "Poll succeeded");

        for sample in &samples {
            self.samples
                .send(*sample)
                .await
                .map_err(|_| FetchError::AggregatorClosed)?;
        }

        Ok(samples)
    }
}

/// Point at the line holding the first byte that is not UTF-8
fn invalid_utf8(bytes: &[u8], err: std::str::Utf8Error) -> ParseError {
    let valid = &bytes[..err.valid_up_to()];
    let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
    ParseError::new(line, "invalid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::sample_channel;

    #[tokio::test]
    async fn test_malformed_url_is_a_request_construction_error() {
        let (tx, _rx) = sample_channel();
        let fetcher = Fetcher::new("not a url", tx).expect("client should build");

        let err = fetcher.poll().await.expect_err("malformed URL cannot be fetched");
        assert!(
            matches!(err, FetchError::RequestConstruction { .. }),
            "got: {:?}",
            err
        );
        assert!(err.to_string().contains("\"not a url\""));
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_transport_error() {
        let (tx, _rx) = sample_channel();
        // Port 9 (discard) on localhost is closed in test environments
        let fetcher = Fetcher::new("http://127.0.0.1:9/metrics", tx).expect("client should build");

        let err = fetcher.poll().await.expect_err("nothing listens there");
        assert!(matches!(err, FetchError::Transport { .. }), "got: {:?}", err);
    }

    #[test]
    fn test_invalid_utf8_points_at_its_line() {
        let bytes = b"# TYPE x gauge\nx{node=\"\xff\"} 1\n";
        let err = std::str::from_utf8(bytes).unwrap_err();

        let parse = invalid_utf8(bytes, err);
        assert_eq!(parse.line, 2);
        assert!(parse.reason.contains("UTF-8"));
    }

    #[test]
    fn test_default_header_timeout_is_one_minute() {
        let (tx, _rx) = sample_channel();
        let fetcher = Fetcher::new("http://localhost:9187/metrics", tx).unwrap();
        assert_eq!(fetcher.header_timeout, Duration::from_secs(60));
        assert_eq!(fetcher.url(), "http://localhost:9187/metrics");
    }
}
