use std::fmt::Write;

use crate::db::OverlayRow;
use crate::models::{
    AnalyticsRow, CustomerProfile, Fetched, IntentCount, InteractionRecord, LabelSummary,
    PortfolioSummary, RiskDistribution, RiskLabel, SentimentLabel, SentimentTrendDay,
};

/// Everything the markdown report reads, each part fetched independently.
pub struct ReportData {
    pub analytics: Fetched<Vec<AnalyticsRow>>,
    pub portfolio: Fetched<PortfolioSummary>,
    pub trend: Fetched<Vec<SentimentTrendDay>>,
    pub intents: Fetched<Vec<IntentCount>>,
    pub overlay: Fetched<Vec<OverlayRow>>,
}

pub fn summarize_distribution(rows: &[AnalyticsRow]) -> RiskDistribution {
    if rows.is_empty() {
        return RiskDistribution::default();
    }

    // Labels are recomputed from probability so the seeded text column cannot
    // drift from the shared thresholds.
    let by_label = RiskLabel::ALL
        .iter()
        .map(|&label| {
            let matching: Vec<&AnalyticsRow> = rows
                .iter()
                .filter(|row| RiskLabel::from_probability(row.churn_probability) == label)
                .collect();
            LabelSummary {
                label,
                count: matching.len(),
                avg_probability: average(matching.iter().map(|row| row.churn_probability)),
            }
        })
        .collect();

    RiskDistribution {
        total: rows.len(),
        by_label,
        avg_probability: average(rows.iter().map(|row| row.churn_probability)),
        avg_confidence: average(rows.iter().map(|row| row.model_confidence)),
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn placeholder(output: &mut String, reason: &str) {
    let _ = writeln!(output, "> Placeholder: {reason}. No scores shown.");
}

fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn build_report(data: &ReportData) -> String {
    let analytics = &data.analytics;
    let overlay = &data.overlay;
    let mut output = String::new();

    let _ = writeln!(output, "# Churn Risk Overview");
    let _ = writeln!(
        output,
        "Seeded analytics compared with scores computed from call transcripts."
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Book Overview");

    match &data.portfolio {
        Fetched::Placeholder(reason) => placeholder(&mut output, reason),
        Fetched::Live(portfolio) if portfolio.customer_count == 0 => {
            let _ = writeln!(output, "No customers recorded.");
        }
        Fetched::Live(portfolio) => {
            let _ = writeln!(output, "- Customers on book: {}", portfolio.customer_count);
            let _ = writeln!(
                output,
                "- Assets under management: {:.0}",
                portfolio.total_aum
            );
            if let Some(avg_balance) = portfolio.avg_balance {
                let _ = writeln!(output, "- Average balance: {avg_balance:.0}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Distribution");

    match analytics {
        Fetched::Placeholder(reason) => placeholder(&mut output, reason),
        Fetched::Live(rows) if rows.is_empty() => {
            let _ = writeln!(output, "No customer analytics recorded.");
        }
        Fetched::Live(rows) => {
            let distribution = summarize_distribution(rows);
            let _ = writeln!(output, "- Customers: {}", distribution.total);
            for summary in distribution.by_label.iter() {
                let _ = writeln!(
                    output,
                    "- {}: {} customers (avg probability {:.0}%)",
                    summary.label,
                    summary.count,
                    summary.avg_probability * 100.0
                );
            }
            let _ = writeln!(
                output,
                "- Average churn probability: {:.1}%",
                distribution.avg_probability * 100.0
            );
            let _ = writeln!(
                output,
                "- Average model confidence: {:.1}%",
                distribution.avg_confidence
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Customers");

    match analytics {
        Fetched::Placeholder(reason) => placeholder(&mut output, reason),
        Fetched::Live(rows) if rows.is_empty() => {
            let _ = writeln!(output, "No customer analytics recorded.");
        }
        Fetched::Live(rows) => {
            let mut ranked: Vec<&AnalyticsRow> = rows.iter().collect();
            ranked.sort_by(|a, b| {
                b.churn_probability
                    .partial_cmp(&a.churn_probability)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            for row in ranked.iter().take(10) {
                let _ = writeln!(
                    output,
                    "- {} ({}) {} at {:.0}%: {}",
                    row.customer_name,
                    row.customer_id,
                    RiskLabel::from_probability(row.churn_probability),
                    row.churn_probability * 100.0,
                    row.next_best_action
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Trend");

    match &data.trend {
        Fetched::Placeholder(reason) => placeholder(&mut output, reason),
        Fetched::Live(days) if days.is_empty() => {
            let _ = writeln!(output, "No interactions recorded.");
        }
        Fetched::Live(days) => {
            for day in days.iter() {
                let average = day
                    .avg_sentiment
                    .map(|avg| format!("{avg:.2} ({})", SentimentLabel::from_score(avg)))
                    .unwrap_or_else(|| "no scored calls".to_string());
                let _ = writeln!(
                    output,
                    "- {}: {} calls, average sentiment {}, {} negative, {} positive",
                    day.call_date, day.call_count, average, day.negative_calls, day.positive_calls
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Intent Mix");

    match &data.intents {
        Fetched::Placeholder(reason) => placeholder(&mut output, reason),
        Fetched::Live(intents) if intents.is_empty() => {
            let _ = writeln!(output, "No interactions recorded.");
        }
        Fetched::Live(intents) => {
            for intent in intents.iter() {
                let _ = writeln!(
                    output,
                    "- {}: {} calls (average sentiment {})",
                    intent.primary_intent,
                    intent.call_count,
                    optional(intent.avg_sentiment.map(|avg| format!("{avg:.2}")))
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Computed Overlay");

    match overlay {
        Fetched::Placeholder(reason) => placeholder(&mut output, reason),
        Fetched::Live(rows) if rows.is_empty() => {
            let _ = writeln!(output, "No interactions recorded.");
        }
        Fetched::Live(rows) => {
            let disagreements = rows.iter().filter(|row| row.disagrees()).count();
            let _ = writeln!(
                output,
                "{} interactions scored, {} disagree with the seeded label.",
                rows.len(),
                disagreements
            );
            for row in rows.iter() {
                let seeded = row
                    .seeded_label
                    .map(|label| label.to_string())
                    .unwrap_or_else(|| "none".to_string());
                let marker = if row.disagrees() { " (differs)" } else { "" };
                let _ = writeln!(
                    output,
                    "- {} {} on {}: computed {} at {:.0}%, seeded {}{}. Next: {}",
                    row.record.call_id,
                    row.record.customer_id,
                    row.record.call_timestamp.format("%Y-%m-%d %H:%M"),
                    row.assessment.label,
                    row.assessment.probability * 100.0,
                    seeded,
                    marker,
                    row.assessment.recommended_action
                );
            }
        }
    }

    output
}

/// Advisor view of one customer: profile attributes followed by each call
/// with its sentiment band.
pub fn render_customer_history(profile: &CustomerProfile, calls: &[InteractionRecord]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{} ({})", profile.customer_name, profile.customer_id);
    let _ = writeln!(
        output,
        "- Age: {}, tenure: {} years",
        optional(profile.age),
        optional(profile.tenure_years)
    );
    let _ = writeln!(
        output,
        "- Balance: {}, investment option: {}",
        optional(profile.account_balance.map(|balance| format!("{balance:.0}"))),
        optional(profile.investment_option.as_deref())
    );

    if calls.is_empty() {
        let _ = writeln!(output, "No calls recorded.");
        return output;
    }

    let _ = writeln!(output, "Calls:");
    for call in calls.iter() {
        let sentiment = call
            .sentiment_score
            .filter(|score| score.is_finite())
            .map(|score| format!("{} ({score:.2})", SentimentLabel::from_score(score)))
            .unwrap_or_else(|| "unscored".to_string());
        let _ = writeln!(
            output,
            "- {} {} {} [{}]: {}",
            call.call_id,
            call.call_timestamp.format("%Y-%m-%d %H:%M"),
            sentiment,
            call.primary_intent.as_deref().unwrap_or("Unclassified"),
            call.transcript_text.as_deref().unwrap_or("(no transcript)")
        );
    }

    output
}
