use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::{Result, StylistError};
use crate::intent::{IntentParser, extract_intent};
use crate::merge::combine;
use crate::models::{IntentRecord, ProposalRecord, ResponseRecord};
use crate::proposer::{OutfitProposer, propose};

/// Orchestrates one styling request: intent, two proposals in parallel, merge.
pub struct StylePipeline {
    intent: Arc<dyn IntentParser>,
    proposer_a: Arc<dyn OutfitProposer>,
    proposer_b: Arc<dyn OutfitProposer>,
    intent_as_merge_fallback: bool,
}

/// Short identifier used to correlate log lines for one request.
pub fn new_request_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("req_{}", &hex[..8])
}

impl StylePipeline {
    pub fn new(
        intent: Arc<dyn IntentParser>,
        proposer_a: Arc<dyn OutfitProposer>,
        proposer_b: Arc<dyn OutfitProposer>,
    ) -> Self {
        Self {
            intent,
            proposer_a,
            proposer_b,
            intent_as_merge_fallback: false,
        }
    }

    /// Let the extracted intent fill fields neither proposal supplied.
    pub fn with_intent_as_merge_fallback(mut self, enabled: bool) -> Self {
        self.intent_as_merge_fallback = enabled;
        self
    }

    /// Runs the request in its own task. Only a failure outside the
    /// per-provider guards surfaces as an error.
    pub async fn handle(self: &Arc<Self>, text: &str) -> Result<ResponseRecord> {
        let request_id = new_request_id();
        let pipeline = Arc::clone(self);
        let text = text.to_string();
        let id = request_id.clone();

        let span = tracing::info_span!("style", request_id = %request_id);
        let task = tokio::spawn(async move { pipeline.run(id, &text).await }.instrument(span));

        task.await.map_err(|e| {
            tracing::error!(request_id = %request_id, "Styling engine error: {}", e);
            StylistError::Internal(format!("styling task failed: {e}"))
        })
    }

    pub async fn run(&self, request_id: String, text: &str) -> ResponseRecord {
        let intent = self.guarded_intent(text).await;
        tracing::info!(fallback = intent.fallback, "Intent extracted");

        let (proposal_a, proposal_b) = tokio::join!(
            Self::await_proposal(self.spawn_proposal(&self.proposer_a, text), &self.proposer_a),
            Self::await_proposal(self.spawn_proposal(&self.proposer_b, text), &self.proposer_b),
        );

        let merge_intent = self.intent_as_merge_fallback.then_some(&intent);
        let outfit = combine(&proposal_a, &proposal_b, merge_intent);
        tracing::info!(source = ?outfit.meta.source, "Outfit merged");

        ResponseRecord {
            request_id,
            intent,
            top_bottom_only: true,
            outfit,
        }
    }

    async fn guarded_intent(&self, text: &str) -> IntentRecord {
        let parser = Arc::clone(&self.intent);
        let text = text.to_string();
        let task = tokio::spawn(
            async move { extract_intent(parser.as_ref(), &text).await }.in_current_span(),
        );
        match task.await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!("Gemini error: {}", e);
                IntentRecord::fallback()
            }
        }
    }

    fn spawn_proposal(
        &self,
        proposer: &Arc<dyn OutfitProposer>,
        text: &str,
    ) -> JoinHandle<ProposalRecord> {
        let proposer = Arc::clone(proposer);
        let text = text.to_string();
        tokio::spawn(async move { propose(proposer.as_ref(), &text).await }.in_current_span())
    }

    async fn await_proposal(
        task: JoinHandle<ProposalRecord>,
        proposer: &Arc<dyn OutfitProposer>,
    ) -> ProposalRecord {
        match task.await {
            Ok(proposal) => proposal,
            Err(e) => {
                let provider = proposer.provider();
                tracing::error!(%provider, "AI generation error: {}", e);
                provider.fallback()
            }
        }
    }
}
