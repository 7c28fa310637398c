use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Result, StylistError};
use crate::models::{ChatRequest, ChatResponse};
use crate::retry::RetryPolicy;

#[cfg(test)]
use mockall::automock;

/// OpenAI-compatible chat-completions endpoint
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

pub struct GroqTransport {
    client: Client,
    api_key: String,
    url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GroqTransport {
    pub fn new(api_key: String, url: String, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            url,
            timeout,
            retry,
        })
    }
}

#[async_trait]
impl Transport for GroqTransport {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let failure = match self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(req)
                .send()
                .await
            {
                Ok(response) => {
                    if response.status().is_success() {
                        return response.json().await.map_err(|e| {
                            StylistError::decode("Groq API response", e.to_string())
                        });
                    }
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    StylistError::provider("groq", format!("HTTP {status}: {body}"))
                }
                Err(e) => StylistError::from_request(e, self.timeout),
            };

            if attempts >= self.retry.max_attempts {
                tracing::debug!(attempts, "Groq request giving up");
                return Err(failure);
            }

            let delay = self.retry.delay(attempts);
            tracing::warn!(attempts, ?delay, "Groq request failed, retrying: {}", failure);
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;

    fn hello_request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            temperature: 0.0,
            max_tokens: 10,
            response_format: None,
        }
    }

    // Accepts connections but never answers.
    async fn silent_endpoint() -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        (format!("http://{addr}/chat/completions"), handle)
    }

    #[tokio::test]
    async fn test_slow_endpoint_is_timeout() {
        let (url, server) = silent_endpoint().await;
        let transport = GroqTransport::new(
            "test-key".to_string(),
            url,
            Duration::from_millis(200),
            RetryPolicy::default(),
        )
        .expect("client should build");

        let err = transport.chat(&hello_request()).await.unwrap_err();
        assert!(matches!(err, StylistError::Timeout(0)), "got {err}");
        server.abort();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_after_attempts() {
        let retry = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let transport = GroqTransport::new(
            "test-key".to_string(),
            "http://127.0.0.1:9/chat/completions".to_string(),
            Duration::from_secs(2),
            retry,
        )
        .expect("client should build");
        let req = ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            temperature: 0.0,
            max_tokens: 10,
            response_format: None,
        };
        assert!(transport.chat(&req).await.is_err());
    }
}
