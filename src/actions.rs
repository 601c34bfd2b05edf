//! Next-best-action lookup.
//!
//! Each label has a fixed table of recommendations. The entry is picked by a
//! stable digest of the customer id, so the same customer always gets the
//! same line across runs and machines.

use crate::models::RiskLabel;

const HIGH_ACTIONS: [&str; 4] = [
    "URGENT: Senior advisor intervention required - customer showing high frustration",
    "Immediate callback required - address service quality concerns",
    "Executive escalation recommended - multiple complaint indicators",
    "Priority retention offer - prevent churn with personalized benefits",
];

const MEDIUM_ACTIONS: [&str; 4] = [
    "Follow up within 24 hours to address concerns",
    "Schedule proactive check-in call within 48 hours",
    "Provide additional technical support resources",
    "Offer account review meeting to discuss concerns",
];

const LOW_ACTIONS: [&str; 4] = [
    "Standard follow-up communication",
    "Upsell opportunity - provide investment advisory consultation",
    "Offer consolidation services and educational resources",
    "Provide quarterly portfolio review and recommendations",
];

const HIGH_REASONING: [&str; 4] = [
    "Multiple negative calls and complaints indicate high churn risk",
    "Significant service quality issues and escalating frustration",
    "Pattern of unresolved technical problems affecting satisfaction",
    "Recent complaints about fees and poor investment performance",
];

const MEDIUM_REASONING: [&str; 4] = [
    "Some technical issues and concerns noted",
    "Occasional negative sentiment in recent interactions",
    "Minor service issues requiring attention",
    "Moderate dissatisfaction with recent account changes",
];

const LOW_REASONING: [&str; 4] = [
    "Generally positive customer interactions",
    "Stable account activity with good engagement",
    "Positive sentiment in recent calls",
    "Satisfied customer with growth potential",
];

// Low-risk intents that map straight to an upsell line.
const LOW_INTENT_ACTIONS: [(&str, &str); 3] = [
    (
        "investment",
        "Upsell opportunity - provide investment advisory consultation",
    ),
    (
        "insurance",
        "Upsell opportunity - provide insurance advisory consultation",
    ),
    (
        "consolidation",
        "Offer consolidation services and educational resources",
    ),
];

pub fn actions_for(label: RiskLabel) -> &'static [&'static str] {
    match label {
        RiskLabel::High => &HIGH_ACTIONS,
        RiskLabel::Medium => &MEDIUM_ACTIONS,
        RiskLabel::Low => &LOW_ACTIONS,
    }
}

fn reasoning_for(label: RiskLabel) -> &'static [&'static str] {
    match label {
        RiskLabel::High => &HIGH_REASONING,
        RiskLabel::Medium => &MEDIUM_REASONING,
        RiskLabel::Low => &LOW_REASONING,
    }
}

pub fn select_action(label: RiskLabel, intent: Option<&str>, customer_id: &str) -> &'static str {
    if label == RiskLabel::Low {
        if let Some(intent) = intent {
            let lowered = intent.to_lowercase();
            if let Some((_, action)) = LOW_INTENT_ACTIONS
                .iter()
                .find(|(marker, _)| lowered.contains(marker))
            {
                return *action;
            }
        }
    }

    pick(actions_for(label), customer_id)
}

pub fn select_reasoning(label: RiskLabel, customer_id: &str) -> &'static str {
    pick(reasoning_for(label), customer_id)
}

fn pick(table: &'static [&'static str], customer_id: &str) -> &'static str {
    table[rotation_index(customer_id, table.len())]
}

pub fn rotation_index(customer_id: &str, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let digest = blake3::hash(customer_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % len as u64) as usize
}
