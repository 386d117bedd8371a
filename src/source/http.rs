//! HTTP snapshot source
//!
//! Fetches the aggregated snapshot with a single GET request and validates
//! the body strictly against the `HealthSnapshot` schema. The upstream is
//! an untrusted, loosely-schema'd boundary (often LLM-generated), so
//! anything that does not match the schema is rejected outright rather
//! than partially accepted.

use crate::error::FetchError;
use crate::snapshot::HealthSnapshot;
use crate::source::SnapshotSource;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Well-formed error payload some sources return with a 200 status
#[derive(Debug, Deserialize)]
struct SourceErrorBody {
    error: String,
}

/// Snapshot source backed by an HTTP endpoint
pub struct HttpSource {
    client: Client,
    endpoint: String,
}

impl HttpSource {
    /// Create a new HTTP source for the given endpoint
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be built.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn parse_body(body: &str) -> Result<HealthSnapshot, FetchError> {
        match serde_json::from_str::<HealthSnapshot>(body) {
            Ok(snapshot) => Ok(snapshot),
            Err(parse_err) => {
                // A well-formed {"error": ...} body is a reported failure,
                // not a schema violation
                if let Ok(reported) = serde_json::from_str::<SourceErrorBody>(body) {
                    return Err(FetchError::SourceError(reported.error));
                }
                Err(FetchError::InvalidPayload(parse_err.to_string()))
            }
        }
    }

    fn truncate(body: String) -> String {
        const MAX: usize = 200;
        if body.len() <= MAX {
            body
        } else {
            let mut end = MAX;
            while end > 0 && !body.is_char_boundary(end) {
                end -= 1;
            }
            body[..end].to_string()
        }
    }
}

impl SnapshotSource for HttpSource {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<HealthSnapshot, FetchError>> + Send + '_>> {
        Box::pin(async move {
            let response = self.client.get(&self.endpoint).send().await?;

            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    body: Self::truncate(body),
                });
            }

            Self::parse_body(&body)
        })
    }
}
