//! HTTP grading service client.
//!
//! Posts each descriptive answer to `{base_url}/v1/grade` and retries
//! transient failures with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use examshield_core::traits::{DescriptiveGrade, DescriptiveGrader, GradeRequest};

use crate::error::GraderError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How transient grader failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

/// Grades descriptive answers through a remote service.
pub struct RemoteGrader {
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl RemoteGrader {
    pub fn new(api_key: &str, base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            client,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn grade_once(&self, request: &GradeRequest) -> Result<DescriptiveGrade, GraderError> {
        let response = self
            .client
            .post(format!("{}/v1/grade", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GraderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    GraderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok());
            return Err(GraderError::RateLimited {
                retry_after_ms: retry_after_ms(retry_after),
            });
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(GraderError::AuthenticationFailed(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(GraderError::ApiError {
                status,
                message: body,
            });
        }

        response
            .json::<DescriptiveGrade>()
            .await
            .map_err(|e| GraderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })
    }
}

/// Milliseconds to wait from a `retry-after` header given in seconds, capped
/// at the longest backoff.
fn retry_after_ms(header: Option<&str>) -> u64 {
    let secs = header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    secs.saturating_mul(1000).min(MAX_BACKOFF.as_millis() as u64)
}

#[async_trait]
impl DescriptiveGrader for RemoteGrader {
    fn name(&self) -> &str {
        "remote"
    }

    #[instrument(skip(self, request), fields(question = %request.question_id))]
    async fn grade(&self, request: &GradeRequest) -> anyhow::Result<DescriptiveGrade> {
        let mut delay = Duration::from_millis(self.retry.initial_delay_ms);
        let mut attempt = 0;
        loop {
            match self.grade_once(request).await {
                Ok(grade) => return Ok(grade),
                Err(e) if e.is_permanent() || attempt >= self.retry.max_retries => {
                    return Err(e.into());
                }
                Err(e) => {
                    let wait = e.retry_after_ms().map(Duration::from_millis).unwrap_or(delay);
                    attempt += 1;
                    tracing::warn!(
                        "grading {} failed ({e}), retry {attempt}/{} in {}ms",
                        request.question_id,
                        self.retry.max_retries,
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}
