//! Priority merge of two outfit proposals into the final answer.
//!
//! Per field, the first usable value wins: proposal A, proposal B, the
//! optional intent, then a hardcoded default. A proposal carrying an
//! `error` marker is a provider fallback and counts as empty. Attribution
//! is per record: `source` is `openai` whenever A supplied *any* field,
//! even if the final `top` came from B.

use crate::models::{IntentRecord, OutfitMeta, OutfitRecord, OutfitSource, ProposalRecord};

pub const DEFAULT_TOP: &str = "White Premium Tee";
pub const DEFAULT_BOTTOM: &str = "Black Tailored Chinos";

fn usable(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn proposal_field<'a>(
    proposal: &'a ProposalRecord,
    pick: fn(&ProposalRecord) -> &Option<String>,
) -> Option<&'a str> {
    if proposal.is_fallback() {
        return None;
    }
    usable(pick(proposal).as_deref())
}

fn contributed(proposal: &ProposalRecord) -> bool {
    proposal_field(proposal, |p| &p.top).is_some()
        || proposal_field(proposal, |p| &p.bottom).is_some()
}

pub fn combine(
    proposal_a: &ProposalRecord,
    proposal_b: &ProposalRecord,
    intent: Option<&IntentRecord>,
) -> OutfitRecord {
    let top = proposal_field(proposal_a, |p| &p.top)
        .or_else(|| proposal_field(proposal_b, |p| &p.top))
        .or_else(|| intent.and_then(|i| usable(Some(i.top.as_str()))))
        .unwrap_or(DEFAULT_TOP);

    let bottom = proposal_field(proposal_a, |p| &p.bottom)
        .or_else(|| proposal_field(proposal_b, |p| &p.bottom))
        .or_else(|| intent.and_then(|i| usable(Some(i.bottom.as_str()))))
        .unwrap_or(DEFAULT_BOTTOM);

    let source = if contributed(proposal_a) {
        OutfitSource::OpenAi
    } else if contributed(proposal_b) {
        OutfitSource::Groq
    } else {
        OutfitSource::Fallback
    };

    OutfitRecord {
        top: title_case(top.trim()),
        bottom: title_case(bottom.trim()),
        meta: OutfitMeta { source },
    }
}

/// Uppercase the first letter of every run of cased letters, lowercase the
/// rest. Uncased characters (digits, punctuation, CJK) end a run.
/// "slim-fit t-shirt" becomes "Slim-Fit T-Shirt".
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        let cased = c.is_lowercase() || c.is_uppercase();
        if cased && prev_cased {
            out.extend(c.to_lowercase());
        } else if cased {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_cased = cased;
    }
    out
}
