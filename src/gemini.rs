use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Result, StylistError};
use crate::models::{GenerateContentRequest, GenerateContentResponse};
use crate::retry::RetryPolicy;

/// Gemini `generateContent` endpoint
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            retry,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        if self.api_key.is_empty() {
            return Err(StylistError::provider("gemini", "GEMINI_API_KEY not set"));
        }

        let url = self.endpoint(model);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let failure = match self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(req)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.map_err(|e| {
                        StylistError::decode("Gemini API response", e.to_string())
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    StylistError::provider("gemini", format!("HTTP {status}: {body}"))
                }
                Err(e) => StylistError::from_request(e, self.timeout),
            };

            if attempts >= self.retry.max_attempts {
                return Err(failure);
            }

            let delay = self.retry.delay(attempts);
            tracing::warn!(attempts, ?delay, "Gemini request failed, retrying: {}", failure);
            sleep(delay).await;
        }
    }
}
