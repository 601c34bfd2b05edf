use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One call transcript as stored in `churn_demo.interactions`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractionRecord {
    pub call_id: String,
    pub customer_id: String,
    pub call_timestamp: DateTime<Utc>,
    pub transcript_text: Option<String>,
    pub sentiment_score: Option<f64>,
    pub primary_intent: Option<String>,
}

/// Customer attributes shown alongside a score. Never fed into scoring.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub customer_name: String,
    pub age: Option<i32>,
    pub tenure_years: Option<i32>,
    pub account_balance: Option<f64>,
    pub investment_option: Option<String>,
}

/// Seeded ground-truth row from `churn_demo.customer_analytics`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticsRow {
    pub customer_id: String,
    pub customer_name: String,
    pub churn_risk_score: String,
    pub churn_probability: f64,
    pub next_best_action: String,
    pub nba_reasoning: String,
    pub model_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 3] = [RiskLabel::High, RiskLabel::Medium, RiskLabel::Low];

    /// The only place the label thresholds live.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.6 {
            RiskLabel::High
        } else if probability >= 0.3 {
            RiskLabel::Medium
        } else {
            RiskLabel::Low
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLabel::Low),
            "medium" => Some(RiskLabel::Medium),
            "high" => Some(RiskLabel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low",
            RiskLabel::Medium => "Medium",
            RiskLabel::High => "High",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const POSITIVE_FLOOR: f64 = 0.3;
    pub const NEGATIVE_CEILING: f64 = -0.3;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::POSITIVE_FLOOR {
            SentimentLabel::Positive
        } else if score <= Self::NEGATIVE_CEILING {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextSignals {
    pub has_negative_keyword: bool,
    pub has_complaint_or_churn_intent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub customer_id: String,
    pub probability: f64,
    pub label: RiskLabel,
    pub recommended_action: String,
    pub reasoning: String,
    pub model_confidence: f64,
}

#[derive(Debug, Clone)]
pub struct LabelSummary {
    pub label: RiskLabel,
    pub count: usize,
    pub avg_probability: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RiskDistribution {
    pub total: usize,
    pub by_label: Vec<LabelSummary>,
    pub avg_probability: f64,
    pub avg_confidence: f64,
}

/// One calendar day of call sentiment, banded like `SentimentLabel`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentimentTrendDay {
    pub call_date: NaiveDate,
    pub call_count: i64,
    pub avg_sentiment: Option<f64>,
    pub negative_calls: i64,
    pub positive_calls: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentCount {
    pub primary_intent: String,
    pub call_count: i64,
    pub avg_sentiment: Option<f64>,
}

/// Book-wide totals over `churn_demo.customers`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PortfolioSummary {
    pub customer_count: i64,
    pub total_aum: f64,
    pub avg_balance: Option<f64>,
}

/// Data that was either read from the warehouse or replaced by a labelled
/// placeholder because the read failed.
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    Live(T),
    Placeholder(String),
}

impl<T> Fetched<T> {
    pub fn live(&self) -> Option<&T> {
        match self {
            Fetched::Live(value) => Some(value),
            Fetched::Placeholder(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_boundaries_are_exact() {
        assert_eq!(RiskLabel::from_probability(0.6), RiskLabel::High);
        assert_eq!(RiskLabel::from_probability(0.3), RiskLabel::Medium);
        assert_eq!(RiskLabel::from_probability(0.2999), RiskLabel::Low);
        assert_eq!(RiskLabel::from_probability(0.5999), RiskLabel::Medium);
        assert_eq!(RiskLabel::from_probability(0.95), RiskLabel::High);
    }

    #[test]
    fn label_parse_ignores_case_and_whitespace() {
        assert_eq!(RiskLabel::parse(" high "), Some(RiskLabel::High));
        assert_eq!(RiskLabel::parse("MEDIUM"), Some(RiskLabel::Medium));
        assert_eq!(RiskLabel::parse("unknown"), None);
    }

    #[test]
    fn sentiment_label_bands() {
        assert_eq!(SentimentLabel::from_score(0.3), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(-0.3), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
    }
}
