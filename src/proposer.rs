use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, StylistError};
use crate::models::{ChatMessage, ChatRequest, ProposalRecord, Provider};
use crate::transport::Transport;

#[cfg(test)]
use mockall::automock;

/// A model backend that suggests one top + bottom pair.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OutfitProposer: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, text: &str) -> Result<ProposalRecord>;
}

/// Never fails: any error becomes the provider's own fallback pair.
pub async fn propose(proposer: &dyn OutfitProposer, text: &str) -> ProposalRecord {
    let provider = proposer.provider();
    match proposer.generate(text).await {
        Ok(proposal) => proposal,
        Err(e) => {
            tracing::error!(%provider, "Outfit proposer error: {}", e);
            provider.fallback()
        }
    }
}

pub struct OpenAiProposer {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProposer {
    pub fn new(api_key: String, model: String, timeout: Duration, max_attempts: u8) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        // async-openai only retries rate limits; a zero budget turns that off.
        let budget = if max_attempts > 1 { timeout } else { Duration::ZERO };
        let backoff = backoff::ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(budget))
            .build();
        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key))
            .with_http_client(http)
            .with_backoff(backoff);
        Ok(Self { client, model })
    }
}

fn openai_prompt(text: &str) -> String {
    format!(
        r#"Suggest ONLY top and bottom outfit.
No shoes, bags, watches, accessories.

Return JSON:
{{
  "top": "...",
  "bottom": "..."
}}

Request: {text}"#
    )
}

#[async_trait]
impl OutfitProposer for OpenAiProposer {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn generate(&self, text: &str) -> Result<ProposalRecord> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(openai_prompt(text))
                .build()?
                .into()])
            .response_format(ResponseFormat::JsonObject)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| StylistError::provider("openai", "empty choices"))?;

        ProposalRecord::from_json_str(&content)
    }
}

pub struct GroqProposer {
    tx: Arc<dyn Transport>,
    model: String,
}

impl GroqProposer {
    pub fn new(tx: Arc<dyn Transport>, model: String) -> Self {
        Self { tx, model }
    }
}

fn groq_prompt(text: &str) -> String {
    format!(
        r#"Suggest ONLY top and bottom outfit. No accessories.
Return ONLY valid JSON.

Request: {text}

Example JSON:
{{
  "top": "Vintage wash denim jacket",
  "bottom": "Black slim-fit chinos"
}}"#
    )
}

#[async_trait]
impl OutfitProposer for GroqProposer {
    fn provider(&self) -> Provider {
        Provider::Groq
    }

    async fn generate(&self, text: &str) -> Result<ProposalRecord> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: groq_prompt(text),
            }],
            temperature: 0.7,
            max_tokens: 300,
            response_format: Some(serde_json::json!({"type": "json_object"})),
        };

        let response = self.tx.chat(&request).await?;

        if let Some(choice) = response.choices.first() {
            ProposalRecord::from_json_str(&choice.message.content)
        } else {
            Err(StylistError::provider("groq", "empty choices"))
        }
    }
}
