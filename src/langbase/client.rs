use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use super::types::{CreatePipeResponse, Message, PipeRequest, PipeResponse, PipeSpec};
use crate::config::{LangbaseConfig, RequestConfig};
use crate::error::{LangbaseError, LangbaseResult};

/// Model used for pipes created by this server.
pub const DEFAULT_MODEL: &str = "openai:gpt-4o-mini";

const RUN_PATH: &str = "/v1/pipes/run";
const PIPES_PATH: &str = "/v1/pipes";

/// Langbase Pipes API client with retrying pipe runs.
#[derive(Clone)]
pub struct LangbaseClient {
    http: Client,
    base_url: String,
    bearer: String,
    request: RequestConfig,
}

impl LangbaseClient {
    pub fn new(config: &LangbaseConfig, request: RequestConfig) -> LangbaseResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(request.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer: format!("Bearer {}", config.api_key),
            request,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a pipe, retrying every failure with exponential back-off.
    ///
    /// Exhausting the attempts yields [`LangbaseError::Unavailable`] carrying
    /// the last failure and the number of attempts made.
    pub async fn call_pipe(&self, request: PipeRequest) -> LangbaseResult<PipeResponse> {
        let attempts = self.request.max_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                warn!(
                    pipe = %request.name,
                    retry = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying Langbase request"
                );
                tokio::time::sleep(delay).await;
            }

            debug!(
                pipe = %request.name,
                messages = request.messages.len(),
                "Calling Langbase pipe"
            );
            let start = Instant::now();
            match self.post_json::<_, PipeResponse>(RUN_PATH, &request).await {
                Ok(response) => {
                    info!(
                        pipe = %request.name,
                        latency_ms = start.elapsed().as_millis(),
                        tokens = ?response.total_tokens(),
                        "Langbase pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        pipe = %request.name,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = attempt,
                        "Langbase pipe call failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(LangbaseError::Unavailable {
            message: last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string()),
            retries: attempts,
        })
    }

    /// Run a pipe and keep only its completion text.
    pub async fn complete(&self, pipe: &str, messages: Vec<Message>) -> LangbaseResult<String> {
        let response = self.call_pipe(PipeRequest::new(pipe, messages)).await?;
        if !response.success {
            warn!(pipe = %pipe, "Langbase reported an unsuccessful run");
        }
        Ok(response.completion)
    }

    /// Upsert one pipe. An existing pipe (409) counts as ready.
    pub async fn ensure_pipe(&self, spec: &PipeSpec) -> LangbaseResult<()> {
        let request = spec.to_create_request(DEFAULT_MODEL);
        match self
            .post_json::<_, CreatePipeResponse>(PIPES_PATH, &request)
            .await
        {
            Ok(created) => {
                info!(pipe = %created.name, status = %created.status, url = %created.url, "Pipe ready");
                Ok(())
            }
            Err(LangbaseError::Api { status: 409, .. }) => {
                info!(pipe = %spec.name, "Pipe already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Upsert every pipe in order, stopping at the first failure.
    pub async fn ensure_pipes(&self, specs: &[PipeSpec]) -> LangbaseResult<()> {
        for spec in specs {
            self.ensure_pipe(spec).await?;
        }
        Ok(())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.request.retry_delay_ms.saturating_mul(factor))
    }

    /// One authenticated JSON POST, without retries.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> LangbaseResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", &self.bearer)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LangbaseError::Timeout {
                        timeout_ms: self.request.timeout_ms,
                    }
                } else {
                    LangbaseError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LangbaseError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LangbaseError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str, request: RequestConfig) -> LangbaseClient {
        let config = LangbaseConfig {
            api_key: "test_key".to_string(),
            base_url: base_url.to_string(),
        };
        LangbaseClient::new(&config, request).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = client("http://localhost:9999/", RequestConfig::default());
        assert_eq!(client.base_url(), "http://localhost:9999");
        assert_eq!(client.bearer, "Bearer test_key");
    }

    #[test]
    fn test_backoff_doubles_per_retry() {
        let client = client(
            "http://localhost:9999",
            RequestConfig {
                timeout_ms: 1000,
                max_retries: 3,
                retry_delay_ms: 100,
            },
        );
        assert_eq!(client.backoff(1), Duration::from_millis(100));
        assert_eq!(client.backoff(2), Duration::from_millis(200));
        assert_eq!(client.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_saturates() {
        let client = client(
            "http://localhost:9999",
            RequestConfig {
                timeout_ms: 1000,
                max_retries: 3,
                retry_delay_ms: u64::MAX,
            },
        );
        assert_eq!(client.backoff(5), Duration::from_millis(u64::MAX));
    }
}
