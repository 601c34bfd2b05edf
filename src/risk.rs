use crate::actions;
use crate::models::{InteractionRecord, RiskAssessment, RiskLabel, TextSignals};
use crate::signals;

// Weights are kept in basis points so sums such as 15 + 20 + 25 land exactly
// on the 60% threshold.
const BASE_BPS: u32 = 1_500;
const NEGATIVE_SENTIMENT_BPS: u32 = 3_000;
const COMPLAINT_INTENT_BPS: u32 = 2_000;
const NEGATIVE_KEYWORD_BPS: u32 = 2_500;
const CAP_BPS: u32 = 9_500;

pub const NEGATIVE_SENTIMENT_THRESHOLD: f64 = -0.3;

/// Missing or non-numeric sentiment is neutral.
pub fn normalize_sentiment(sentiment: Option<f64>) -> f64 {
    match sentiment {
        Some(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

pub fn churn_probability(sentiment: Option<f64>, signals: &TextSignals) -> f64 {
    let mut bps = BASE_BPS;
    if normalize_sentiment(sentiment) < NEGATIVE_SENTIMENT_THRESHOLD {
        bps += NEGATIVE_SENTIMENT_BPS;
    }
    if signals.has_complaint_or_churn_intent {
        bps += COMPLAINT_INTENT_BPS;
    }
    if signals.has_negative_keyword {
        bps += NEGATIVE_KEYWORD_BPS;
    }

    bps.min(CAP_BPS) as f64 / 10_000.0
}

pub fn model_confidence(probability: f64) -> f64 {
    85.0 + probability * 10.0
}

pub fn assess_text(
    customer_id: &str,
    text: Option<&str>,
    sentiment: Option<f64>,
    intent: Option<&str>,
) -> RiskAssessment {
    let signals = signals::extract_signals(text, intent);
    let probability = churn_probability(sentiment, &signals);
    let label = RiskLabel::from_probability(probability);

    RiskAssessment {
        customer_id: customer_id.to_string(),
        probability,
        label,
        recommended_action: actions::select_action(label, intent, customer_id).to_string(),
        reasoning: actions::select_reasoning(label, customer_id).to_string(),
        model_confidence: model_confidence(probability),
    }
}

pub fn assess(record: &InteractionRecord) -> RiskAssessment {
    assess_text(
        &record.customer_id,
        record.transcript_text.as_deref(),
        record.sentiment_score,
        record.primary_intent.as_deref(),
    )
}

/// Scores every record and orders the results by descending probability,
/// keeping the record next to its assessment.
pub fn assess_all(records: &[InteractionRecord]) -> Vec<(InteractionRecord, RiskAssessment)> {
    let mut scored: Vec<(InteractionRecord, RiskAssessment)> = records
        .iter()
        .map(|record| (record.clone(), assess(record)))
        .collect();
    scored.sort_by(|a, b| {
        b.1.probability
            .partial_cmp(&a.1.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.call_timestamp.cmp(&a.0.call_timestamp))
    });
    scored
}
