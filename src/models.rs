use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StylistError};

/// Body of `POST /style`
#[derive(Debug, Clone, Deserialize)]
pub struct StyleRequest {
    pub text: String,
}

/// Structured interpretation of a styling request
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IntentRecord {
    pub top: String,
    pub bottom: String,
    pub style: String,
    pub occasion: String,
    /// Only present (and `true`) when the record is the hardcoded substitute.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl IntentRecord {
    pub fn fallback() -> Self {
        Self {
            top: "white t-shirt".to_string(),
            bottom: "blue jeans".to_string(),
            style: "casual".to_string(),
            occasion: "general".to_string(),
            fallback: true,
        }
    }
}

pub const FALLBACK_MARKER: &str = "fallback_applied";

/// The two outfit generation backends, in merge priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Groq,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Groq => "groq",
        }
    }

    /// The single definition of what this provider's failure looks like.
    pub fn fallback(&self) -> ProposalRecord {
        let (top, bottom) = match self {
            Provider::OpenAi => ("white t-shirt", "blue jeans"),
            Provider::Groq => ("Minimalist white tee", "Dark indigo jeans"),
        };
        ProposalRecord {
            top: Some(top.to_string()),
            bottom: Some(bottom.to_string()),
            error: Some(FALLBACK_MARKER.to_string()),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One provider's top/bottom suggestion
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ProposalRecord {
    pub top: Option<String>,
    pub bottom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProposalRecord {
    pub fn new(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top: Some(top.into()),
            bottom: Some(bottom.into()),
            error: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Decode the raw JSON text a model replied with.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|e| StylistError::decode("proposal", format!("{e}. Raw: {raw}")))?;
        Self::from_value(&value)
    }

    /// Models are loose about types, so numbers are accepted as text and
    /// anything else in `top`/`bottom` counts as missing. The fallback
    /// marker is never read from the payload; only [`Provider::fallback`] sets it.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            StylistError::decode("proposal", format!("expected a JSON object, got {value}"))
        })?;
        Ok(Self {
            top: obj.get("top").and_then(loose_string),
            bottom: obj.get("bottom").and_then(loose_string),
            error: None,
        })
    }
}

fn loose_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutfitSource {
    OpenAi,
    Groq,
    Fallback,
}

impl From<Provider> for OutfitSource {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::OpenAi => OutfitSource::OpenAi,
            Provider::Groq => OutfitSource::Groq,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OutfitMeta {
    pub source: OutfitSource,
}

/// Final merged outfit. `top` and `bottom` are never empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OutfitRecord {
    pub top: String,
    pub bottom: String,
    pub meta: OutfitMeta,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub request_id: String,
    pub intent: IntentRecord,
    pub top_bottom_only: bool,
    pub outfit: OutfitRecord,
}

/// A purchasable item found by a retailer search
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub price: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub retailer: String,
}

// Chat-completions message format (Groq, OpenAI compatible)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

// Chat-completions request format
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
}

// Chat-completions response format
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

// Gemini generateContent request format
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

// Gemini generateContent response format
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_fallback_flag_serialization() {
        let happy = IntentRecord {
            fallback: false,
            ..IntentRecord::fallback()
        };
        let v = serde_json::to_value(&happy).unwrap();
        assert!(v.get("fallback").is_none());

        let v = serde_json::to_value(IntentRecord::fallback()).unwrap();
        assert_eq!(v["fallback"], json!(true));
        assert_eq!(v["occasion"], json!("general"));
    }

    #[test]
    fn test_proposal_decode_loose_fields() {
        let p = ProposalRecord::from_json_str(r#"{"top": "linen shirt", "bottom": 501, "shoes": "loafers"}"#)
            .unwrap();
        assert_eq!(p.top.as_deref(), Some("linen shirt"));
        assert_eq!(p.bottom.as_deref(), Some("501"));
        assert!(!p.is_fallback());

        let p = ProposalRecord::from_json_str(r#"{"top": null, "bottom": ["a"]}"#).unwrap();
        assert_eq!(p, ProposalRecord::default());
    }

    #[test]
    fn test_payload_error_key_is_not_a_fallback_marker() {
        for raw in [
            r#"{"top":"navy blazer","bottom":"grey trousers","error":""}"#,
            r#"{"top":"navy blazer","bottom":"grey trousers","error":"fallback_applied"}"#,
        ] {
            let p = ProposalRecord::from_json_str(raw).unwrap();
            assert_eq!(p.error, None);
            assert!(!p.is_fallback());

            let out = crate::merge::combine(&p, &ProposalRecord::default(), None);
            assert_eq!(out.top, "Navy Blazer");
            assert_eq!(out.bottom, "Grey Trousers");
            assert_eq!(out.meta.source, OutfitSource::OpenAi);
        }
    }

    #[test]
    fn test_proposal_decode_rejects_non_objects() {
        assert!(ProposalRecord::from_json_str("[1, 2]").is_err());
        assert!(ProposalRecord::from_json_str("not json").is_err());
    }

    #[test]
    fn test_provider_fallbacks_are_marked() {
        for provider in [Provider::OpenAi, Provider::Groq] {
            let fb = provider.fallback();
            assert!(fb.is_fallback());
            assert_eq!(fb.error.as_deref(), Some(FALLBACK_MARKER));
        }
        assert_ne!(Provider::OpenAi.fallback(), Provider::Groq.fallback());
    }

    #[test]
    fn test_outfit_source_serializes_lowercase() {
        let meta = OutfitMeta { source: OutfitSource::OpenAi };
        assert_eq!(serde_json::to_value(meta).unwrap(), json!({"source": "openai"}));
    }

    #[test]
    fn test_gemini_response_text() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"top\":"}, {"text": "\"tee\"}"}]}}]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("{\"top\":\"tee\"}"));

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.text().is_none());
    }
}
