use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Result, StylistError};
use crate::gemini::Generator;
use crate::models::{Content, GenerateContentRequest, GenerationConfig, IntentRecord, Part};

#[cfg(test)]
use mockall::automock;

pub struct GeminiIntent {
    tx: Arc<dyn Generator>,
    model: String,
}

impl GeminiIntent {
    pub fn new(tx: Arc<dyn Generator>, model: String) -> Self {
        Self { tx, model }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IntentParser: Send + Sync {
    async fn parse(&self, text: &str) -> Result<IntentRecord>;
}

/// Never fails: any parse error becomes [`IntentRecord::fallback`].
pub async fn extract_intent(parser: &dyn IntentParser, text: &str) -> IntentRecord {
    match parser.parse(text).await {
        Ok(intent) => intent,
        Err(e) => {
            tracing::error!("Gemini error: {}", e);
            IntentRecord::fallback()
        }
    }
}

fn intent_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "top": {"type": "STRING"},
            "bottom": {"type": "STRING"},
            "style": {"type": "STRING"},
            "occasion": {"type": "STRING"}
        },
        "required": ["top", "bottom", "style", "occasion"]
    })
}

fn intent_prompt(text: &str) -> String {
    format!(
        r#"Extract clothing intent from this request:
"{text}"

Return ONLY JSON with keys:
top, bottom, style, occasion

Do NOT include shoes, bags, accessories."#
    )
}

#[async_trait]
impl IntentParser for GeminiIntent {
    async fn parse(&self, text: &str) -> Result<IntentRecord> {
        tracing::info!("Parsing styling intent with Gemini");

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(intent_prompt(text)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: intent_schema(),
            },
        };

        let response = self.tx.generate(&self.model, &request).await?;

        let json_string = response.text().ok_or_else(|| {
            StylistError::provider("gemini", "response contained no candidate text")
        })?;

        let intent: IntentRecord = serde_json::from_str(json_string.trim()).map_err(|e| {
            StylistError::decode(
                "Gemini intent JSON",
                format!("{e}. Raw: {json_string}"),
            )
        })?;

        // A model answer is never the substitute record, whatever it claims.
        Ok(IntentRecord {
            fallback: false,
            ..intent
        })
    }
}
