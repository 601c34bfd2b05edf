use crate::models::TextSignals;

pub const NEGATIVE_PHRASES: [&str; 5] = [
    "frustrated",
    "unacceptable",
    "considering leaving",
    "switching",
    "elsewhere",
];

const CHURN_INTENT_MARKERS: [&str; 2] = ["complaint", "churn"];

pub fn extract_signals(text: Option<&str>, intent: Option<&str>) -> TextSignals {
    TextSignals {
        has_negative_keyword: has_negative_keyword(text.unwrap_or_default()),
        has_complaint_or_churn_intent: has_complaint_or_churn_intent(intent.unwrap_or_default()),
    }
}

pub fn has_negative_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    NEGATIVE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

pub fn has_complaint_or_churn_intent(intent: &str) -> bool {
    let lowered = intent.to_lowercase();
    CHURN_INTENT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
