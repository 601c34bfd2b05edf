use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::actions;
use crate::models::{
    AnalyticsRow, CustomerProfile, Fetched, IntentCount, InteractionRecord, PortfolioSummary,
    RiskAssessment, RiskLabel, SentimentLabel, SentimentTrendDay,
};
use crate::risk;
use crate::warehouse::{decode_rows, SqlParam, Warehouse, WarehouseError};

pub const DEMO_TABLES: [&str; 3] = [
    "churn_demo.customers",
    "churn_demo.interactions",
    "churn_demo.customer_analytics",
];

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// (customer_id, name, age, tenure_years, balance, investment option, seeded churn probability, confidence)
type SeedCustomer = (&'static str, &'static str, i32, i32, f64, &'static str, f64, f64);

const SEED_CUSTOMERS: [SeedCustomer; 15] = [
    ("CUST001", "Sarah Chen", 34, 5, 125_000.0, "Growth", 0.18, 92.1),
    ("CUST002", "David Lee", 42, 8, 180_000.0, "Balanced", 0.22, 91.5),
    ("CUST003", "Maria Garcia", 45, 7, 89_000.0, "Balanced", 0.78, 88.5),
    ("CUST004", "John Smith", 38, 3, 95_000.0, "Growth", 0.15, 93.2),
    ("CUST005", "Lisa Thompson", 52, 12, 220_000.0, "Conservative", 0.48, 76.8),
    ("CUST006", "Emily White", 64, 15, 780_000.0, "Conservative", 0.25, 90.8),
    ("CUST007", "James Wilson", 41, 6, 145_000.0, "Growth", 0.72, 85.2),
    ("CUST008", "Michael Davis", 48, 9, 165_000.0, "Balanced", 0.42, 78.3),
    ("CUST009", "Robert Johnson", 35, 4, 110_000.0, "Growth", 0.19, 91.9),
    ("CUST010", "Amanda Martinez", 43, 7, 175_000.0, "Balanced", 0.21, 92.4),
    ("CUST011", "Jennifer Miller", 39, 5, 135_000.0, "Growth", 0.45, 75.9),
    ("CUST012", "Patricia Brown", 46, 8, 155_000.0, "Balanced", 0.69, 87.1),
    ("CUST013", "Daniel Anderson", 37, 4, 120_000.0, "Growth", 0.17, 93.1),
    ("CUST014", "Christopher Taylor", 44, 6, 140_000.0, "Balanced", 0.39, 79.1),
    ("CUST015", "Jessica Thomas", 40, 5, 130_000.0, "Growth", 0.23, 91.2),
];

// (call_id, customer_id, minutes after 09:00 on the demo day, sentiment, intent, transcript)
const SEED_CALLS: [(&str, &str, u32, f64, &str, &str); 13] = [
    ("CALL001", "CUST001", 5, 0.1, "Account Inquiry",
        "Hi, I noticed some deductions on my balance this month and wanted to understand them. The market has been rough lately."),
    ("CALL002", "CUST002", 10, 0.4, "Super Consolidation",
        "I changed jobs last year and want to roll my old fund into this account. Can you walk me through it?"),
    ("CALL003", "CUST003", 15, -0.6, "Complaint",
        "I still haven't received my annual statement. This is the third time I've called and it's unacceptable. I'm frustrated."),
    ("CALL004", "CUST004", 20, 0.5, "Investment Inquiry",
        "I'd like to explore ESG investment options and maybe diversify my portfolio a bit."),
    ("CALL005", "CUST005", 25, 0.2, "Retirement Planning",
        "I'm getting close to retirement and want advice on withdrawal strategies."),
    ("CALL006", "CUST006", 30, 0.3, "General Inquiry",
        "Just a general question about which account features I have access to online."),
    ("CALL007", "CUST007", 35, 0.1, "Account Update",
        "I need to update my address and phone number, please."),
    ("CALL008", "CUST008", 40, 0.4, "Investment Inquiry",
        "Do you offer sustainable investment options? I'm interested in switching part of my balance into one."),
    ("CALL009", "CUST009", 45, -0.2, "Technical Support",
        "The website keeps logging me out when I try to view my transactions."),
    ("CALL010", "CUST010", 50, 0.6, "Insurance Inquiry",
        "Can you tell me more about the insurance cover included with my account?"),
    ("CALL011", "CUST003", 55, -0.8, "Churn Risk",
        "Honestly I'm considering leaving. Another fund has lower fees and I can move my money elsewhere."),
    ("CALL012", "CUST007", 60, -0.5, "Complaint",
        "The fees went up again without notice. I'm frustrated and thinking about switching providers."),
    ("CALL013", "CUST012", 65, -0.4, "Fee Question",
        "Why am I paying more in fees than last year? Nobody has explained it to me."),
];

fn demo_timestamp(minutes_after_nine: u32) -> anyhow::Result<DateTime<Utc>> {
    let base = Utc
        .with_ymd_and_hms(2025, 7, 10, 9, 0, 0)
        .single()
        .context("invalid demo date")?;
    Ok(base + chrono::Duration::minutes(i64::from(minutes_after_nine)))
}

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub customers: u64,
    pub interactions: u64,
    pub analytics: u64,
}

pub async fn seed(warehouse: &dyn Warehouse) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (id, name, age, tenure_years, balance, investment, _, _) in SEED_CUSTOMERS {
        summary.customers += warehouse
            .execute(
                r#"
                INSERT INTO churn_demo.customers
                (customer_id, customer_name, age, tenure_years, account_balance, investment_option)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (customer_id) DO UPDATE
                SET customer_name = EXCLUDED.customer_name,
                    age = EXCLUDED.age,
                    tenure_years = EXCLUDED.tenure_years,
                    account_balance = EXCLUDED.account_balance,
                    investment_option = EXCLUDED.investment_option
                "#,
                &[
                    SqlParam::from(id),
                    SqlParam::from(name),
                    SqlParam::from(age),
                    SqlParam::from(tenure_years),
                    SqlParam::from(balance),
                    SqlParam::from(investment),
                ],
            )
            .await
            .with_context(|| format!("failed to seed customer {id}"))?;
    }

    for (call_id, customer_id, minutes, sentiment, intent, transcript) in SEED_CALLS {
        let timestamp = demo_timestamp(minutes)?;
        summary.interactions += warehouse
            .execute(
                r#"
                INSERT INTO churn_demo.interactions
                (call_id, customer_id, call_timestamp, transcript_text, sentiment_score, primary_intent)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (call_id) DO UPDATE
                SET transcript_text = EXCLUDED.transcript_text,
                    sentiment_score = EXCLUDED.sentiment_score,
                    primary_intent = EXCLUDED.primary_intent
                "#,
                &[
                    SqlParam::from(call_id),
                    SqlParam::from(customer_id),
                    SqlParam::from(timestamp),
                    SqlParam::from(transcript),
                    SqlParam::from(sentiment),
                    SqlParam::from(intent),
                ],
            )
            .await
            .with_context(|| format!("failed to seed interaction {call_id}"))?;
    }

    for (id, name, _, _, _, _, churn_probability, confidence) in SEED_CUSTOMERS {
        let label = RiskLabel::from_probability(churn_probability);
        let latest_intent = SEED_CALLS
            .iter()
            .rev()
            .find(|call| call.1 == id)
            .map(|call| call.4);

        summary.analytics += warehouse
            .execute(
                r#"
                INSERT INTO churn_demo.customer_analytics
                (customer_id, customer_name, churn_risk_score, churn_probability,
                 next_best_action, nba_reasoning, model_confidence)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (customer_id) DO UPDATE
                SET churn_risk_score = EXCLUDED.churn_risk_score,
                    churn_probability = EXCLUDED.churn_probability,
                    next_best_action = EXCLUDED.next_best_action,
                    nba_reasoning = EXCLUDED.nba_reasoning,
                    model_confidence = EXCLUDED.model_confidence
                "#,
                &[
                    SqlParam::from(id),
                    SqlParam::from(name),
                    SqlParam::from(label.as_str()),
                    SqlParam::from(churn_probability),
                    SqlParam::from(actions::select_action(label, latest_intent, id)),
                    SqlParam::from(actions::select_reasoning(label, id)),
                    SqlParam::from(confidence),
                ],
            )
            .await
            .with_context(|| format!("failed to seed analytics for {id}"))?;
    }

    info!(
        customers = summary.customers,
        interactions = summary.interactions,
        analytics = summary.analytics,
        "seed complete"
    );
    Ok(summary)
}

pub async fn fetch_interactions(
    warehouse: &dyn Warehouse,
    customer_id: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<InteractionRecord>, WarehouseError> {
    let mut query = String::from(
        "SELECT call_id, customer_id, call_timestamp, transcript_text, sentiment_score, primary_intent \
         FROM churn_demo.interactions",
    );
    let mut params = Vec::new();

    if let Some(customer_id) = customer_id {
        params.push(SqlParam::from(customer_id));
        query.push_str(&format!(" WHERE customer_id = ${}", params.len()));
    }
    query.push_str(" ORDER BY call_timestamp DESC, call_id");
    if let Some(limit) = limit {
        params.push(SqlParam::Int(i32::try_from(limit).unwrap_or(i32::MAX)));
        query.push_str(&format!(" LIMIT ${}", params.len()));
    }

    decode_rows(warehouse.query(&query, &params).await?)
}

pub async fn fetch_customer(
    warehouse: &dyn Warehouse,
    customer_id: &str,
) -> Result<Option<CustomerProfile>, WarehouseError> {
    let rows = warehouse
        .query(
            "SELECT customer_id, customer_name, age, tenure_years, account_balance, investment_option \
             FROM churn_demo.customers WHERE customer_id = $1",
            &[SqlParam::from(customer_id)],
        )
        .await?;
    Ok(decode_rows(rows)?.into_iter().next())
}

/// Customer count and assets under management across the book.
pub async fn fetch_portfolio(warehouse: &dyn Warehouse) -> Result<PortfolioSummary, WarehouseError> {
    let rows = warehouse
        .query(
            "SELECT COUNT(*) AS customer_count, \
             COALESCE(SUM(account_balance), 0) AS total_aum, \
             AVG(account_balance) AS avg_balance \
             FROM churn_demo.customers",
            &[],
        )
        .await?;
    Ok(decode_rows(rows)?.into_iter().next().unwrap_or_default())
}

/// Daily call volume and average sentiment, with calls counted into the
/// negative and positive `SentimentLabel` bands.
pub async fn fetch_sentiment_trend(
    warehouse: &dyn Warehouse,
) -> Result<Vec<SentimentTrendDay>, WarehouseError> {
    let rows = warehouse
        .query(
            r#"
            SELECT (call_timestamp AT TIME ZONE 'UTC')::date AS call_date,
                   COUNT(*) AS call_count,
                   AVG(sentiment_score) AS avg_sentiment,
                   COUNT(*) FILTER (WHERE sentiment_score <= $1) AS negative_calls,
                   COUNT(*) FILTER (WHERE sentiment_score >= $2) AS positive_calls
            FROM churn_demo.interactions
            GROUP BY 1
            ORDER BY 1
            "#,
            &[
                SqlParam::from(SentimentLabel::NEGATIVE_CEILING),
                SqlParam::from(SentimentLabel::POSITIVE_FLOOR),
            ],
        )
        .await?;
    decode_rows(rows)
}

pub async fn fetch_intent_mix(warehouse: &dyn Warehouse) -> Result<Vec<IntentCount>, WarehouseError> {
    let rows = warehouse
        .query(
            r#"
            SELECT COALESCE(NULLIF(TRIM(primary_intent), ''), 'Unclassified') AS primary_intent,
                   COUNT(*) AS call_count,
                   AVG(sentiment_score) AS avg_sentiment
            FROM churn_demo.interactions
            GROUP BY 1
            ORDER BY 2 DESC, 1
            "#,
            &[],
        )
        .await?;
    decode_rows(rows)
}

pub async fn fetch_analytics(warehouse: &dyn Warehouse) -> Result<Vec<AnalyticsRow>, WarehouseError> {
    let rows = warehouse
        .query(
            "SELECT customer_id, customer_name, churn_risk_score, churn_probability, \
             next_best_action, nba_reasoning, model_confidence \
             FROM churn_demo.customer_analytics ORDER BY churn_probability DESC, customer_id",
            &[],
        )
        .await?;
    decode_rows(rows)
}

/// Row count per demo table; a table that cannot be read reports its error.
pub async fn data_status(warehouse: &dyn Warehouse) -> Vec<(&'static str, Result<i64, WarehouseError>)> {
    let mut status = Vec::new();

    for table in DEMO_TABLES {
        let count = warehouse
            .query(&format!("SELECT COUNT(*) AS row_count FROM {table}"), &[])
            .await
            .and_then(|rows| {
                rows.first()
                    .and_then(|row| row.get("row_count"))
                    .and_then(|value| value.as_i64())
                    .ok_or_else(|| WarehouseError::Decode(format!("no row_count for {table}")))
            });
        status.push((table, count));
    }

    status
}

pub fn fetched<T>(what: &str, result: Result<T, WarehouseError>) -> Fetched<T> {
    match result {
        Ok(value) => Fetched::Live(value),
        Err(err) => {
            warn!(error = %err, "{what} unavailable, rendering placeholder");
            Fetched::Placeholder(format!("{what} unavailable: {err}"))
        }
    }
}

pub async fn import_csv(warehouse: &dyn Warehouse, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        call_id: Option<String>,
        customer_id: String,
        customer_name: String,
        call_timestamp: DateTime<Utc>,
        transcript_text: Option<String>,
        sentiment_score: Option<f64>,
        primary_intent: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;

        // Existing customers keep their profile; the CSV only introduces new ones.
        warehouse
            .execute(
                r#"
                INSERT INTO churn_demo.customers (customer_id, customer_name)
                VALUES ($1, $2)
                ON CONFLICT (customer_id) DO NOTHING
                "#,
                &[
                    SqlParam::from(row.customer_id.as_str()),
                    SqlParam::from(row.customer_name.as_str()),
                ],
            )
            .await?;

        let call_id = row
            .call_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let sentiment = row.sentiment_score.map(|s| s.clamp(-1.0, 1.0));
        let transcript = row
            .transcript_text
            .as_deref()
            .filter(|text| !text.trim().is_empty());

        let affected = warehouse
            .execute(
                r#"
                INSERT INTO churn_demo.interactions
                (call_id, customer_id, call_timestamp, transcript_text, sentiment_score, primary_intent)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (call_id) DO NOTHING
                "#,
                &[
                    SqlParam::from(call_id.as_str()),
                    SqlParam::from(row.customer_id.as_str()),
                    SqlParam::from(row.call_timestamp),
                    SqlParam::from(transcript),
                    SqlParam::from(sentiment),
                    SqlParam::from(row.primary_intent.as_deref()),
                ],
            )
            .await?;

        if affected > 0 {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "csv import complete");
    Ok(inserted)
}

/// Scores stored interactions and pairs each with the seeded label for its
/// customer, when one exists.
pub async fn overlay(
    warehouse: &dyn Warehouse,
    customer_id: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<OverlayRow>, WarehouseError> {
    let interactions = fetch_interactions(warehouse, customer_id, limit).await?;
    let analytics = fetch_analytics(warehouse).await?;

    Ok(risk::assess_all(&interactions)
        .into_iter()
        .map(|(record, assessment)| {
            let seeded_label = analytics
                .iter()
                .find(|row| row.customer_id == record.customer_id)
                .and_then(|row| RiskLabel::parse(&row.churn_risk_score));
            OverlayRow {
                record,
                assessment,
                seeded_label,
            }
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct OverlayRow {
    pub record: InteractionRecord,
    pub assessment: RiskAssessment,
    pub seeded_label: Option<RiskLabel>,
}

impl OverlayRow {
    pub fn disagrees(&self) -> bool {
        self.seeded_label
            .is_some_and(|label| label != self.assessment.label)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::warehouse::fake::FakeWarehouse;

    fn interaction_row(call_id: &str, customer_id: &str, text: &str, sentiment: f64, intent: &str) -> serde_json::Value {
        json!({
            "call_id": call_id,
            "customer_id": customer_id,
            "call_timestamp": "2025-07-10T09:15:20+00:00",
            "transcript_text": text,
            "sentiment_score": sentiment,
            "primary_intent": intent,
        })
    }

    fn analytics_row(customer_id: &str, label: &str, probability: f64) -> serde_json::Value {
        json!({
            "customer_id": customer_id,
            "customer_name": "Maria Garcia",
            "churn_risk_score": label,
            "churn_probability": probability,
            "next_best_action": "Standard follow-up communication",
            "nba_reasoning": "Generally positive customer interactions",
            "model_confidence": 90.0,
        })
    }

    #[test]
    fn seed_data_labels_match_probabilities() {
        let high = SEED_CUSTOMERS
            .iter()
            .filter(|c| RiskLabel::from_probability(c.6) == RiskLabel::High)
            .count();
        let medium = SEED_CUSTOMERS
            .iter()
            .filter(|c| RiskLabel::from_probability(c.6) == RiskLabel::Medium)
            .count();
        assert_eq!(high, 3);
        assert_eq!(medium, 4);
        assert!(SEED_CALLS
            .iter()
            .all(|call| SEED_CUSTOMERS.iter().any(|c| c.0 == call.1)));
    }

    #[tokio::test]
    async fn seed_writes_every_table() {
        let warehouse = FakeWarehouse::default();
        let summary = seed(&warehouse).await.unwrap();

        assert_eq!(summary.customers, 15);
        assert_eq!(summary.interactions, SEED_CALLS.len() as u64);
        assert_eq!(summary.analytics, 15);

        let statements = warehouse.statements.lock().unwrap();
        let transcript = SqlParam::Text(Some(SEED_CALLS[2].5.to_string()));
        let (sql, params) = statements
            .iter()
            .find(|(_, params)| params.contains(&transcript))
            .unwrap();
        assert!(!sql.contains("haven't"));
        assert_eq!(params[0], SqlParam::from("CALL003"));
        assert!(matches!(params[2], SqlParam::Timestamp(_)));
    }

    #[tokio::test]
    async fn fetch_interactions_filters_by_customer() {
        let warehouse = FakeWarehouse::default().respond(
            "churn_demo.interactions",
            vec![interaction_row("CALL003", "CUST003", "frustrated", -0.6, "Complaint")],
        );

        let records = fetch_interactions(&warehouse, Some("CUST003"), Some(5)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].primary_intent.as_deref(), Some("Complaint"));

        let queries = warehouse.queries.lock().unwrap();
        let (sql, params) = &queries[0];
        assert!(sql.contains("WHERE customer_id = $1"));
        assert!(sql.ends_with("LIMIT $2"));
        assert_eq!(params, &vec![SqlParam::from("CUST003"), SqlParam::Int(5)]);
    }

    #[tokio::test]
    async fn fetch_interactions_without_filters_binds_nothing() {
        let warehouse = FakeWarehouse::default();
        fetch_interactions(&warehouse, None, Some(3)).await.unwrap();

        let queries = warehouse.queries.lock().unwrap();
        assert!(!queries[0].0.contains("WHERE"));
        assert!(queries[0].0.ends_with("LIMIT $1"));
        assert_eq!(queries[0].1, vec![SqlParam::Int(3)]);
    }

    #[tokio::test]
    async fn sentiment_trend_binds_label_bands() {
        let warehouse = FakeWarehouse::default().respond(
            "FILTER (WHERE sentiment_score",
            vec![json!({
                "call_date": "2025-07-10",
                "call_count": 13,
                "avg_sentiment": 0.0923,
                "negative_calls": 4,
                "positive_calls": 6,
            })],
        );

        let trend = fetch_sentiment_trend(&warehouse).await.unwrap();
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].call_date.to_string(), "2025-07-10");
        assert_eq!(trend[0].negative_calls, 4);

        let queries = warehouse.queries.lock().unwrap();
        assert_eq!(
            queries[0].1,
            vec![SqlParam::from(-0.3), SqlParam::from(0.3)]
        );
    }

    #[tokio::test]
    async fn intent_mix_decodes_unclassified_and_null_averages() {
        let warehouse = FakeWarehouse::default().respond(
            "primary_intent",
            vec![
                json!({ "primary_intent": "Complaint", "call_count": 2, "avg_sentiment": -0.55 }),
                json!({ "primary_intent": "Unclassified", "call_count": 1, "avg_sentiment": null }),
            ],
        );

        let mix = fetch_intent_mix(&warehouse).await.unwrap();
        assert_eq!(mix.len(), 2);
        assert_eq!(mix[1].primary_intent, "Unclassified");
        assert_eq!(mix[1].avg_sentiment, None);
    }

    #[tokio::test]
    async fn portfolio_defaults_when_no_row_returned() {
        let warehouse = FakeWarehouse::default();
        let portfolio = fetch_portfolio(&warehouse).await.unwrap();
        assert_eq!(portfolio.customer_count, 0);
        assert_eq!(portfolio.total_aum, 0.0);

        let warehouse = FakeWarehouse::default().respond(
            "total_aum",
            vec![json!({ "customer_count": 15, "total_aum": 2_764_000.0, "avg_balance": 184_266.67 })],
        );
        let portfolio = fetch_portfolio(&warehouse).await.unwrap();
        assert_eq!(portfolio.customer_count, 15);
        assert_eq!(portfolio.total_aum, 2_764_000.0);
    }

    #[tokio::test]
    async fn fetch_customer_binds_id_and_returns_first_row() {
        let warehouse = FakeWarehouse::default().respond(
            "churn_demo.customers WHERE",
            vec![json!({
                "customer_id": "CUST003",
                "customer_name": "Maria Garcia",
                "age": 45,
                "tenure_years": 7,
                "account_balance": 89000.0,
                "investment_option": "Balanced",
            })],
        );

        let profile = fetch_customer(&warehouse, "CUST003").await.unwrap().unwrap();
        assert_eq!(profile.customer_name, "Maria Garcia");
        assert_eq!(warehouse.queries.lock().unwrap()[0].1, vec![SqlParam::from("CUST003")]);

        let missing = fetch_customer(&FakeWarehouse::default(), "CUST999").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn data_status_reports_failures_per_table() {
        let warehouse = FakeWarehouse::default()
            .respond("churn_demo.customers", vec![json!({ "row_count": 15 })])
            .respond("churn_demo.interactions", vec![json!({ "row_count": 13 })])
            .fail_on("customer_analytics");

        let status = data_status(&warehouse).await;
        assert_eq!(status.len(), 3);
        assert_eq!(status[0].1.as_ref().ok(), Some(&15));
        assert_eq!(status[1].1.as_ref().ok(), Some(&13));
        assert!(status[2].1.is_err());
    }

    #[tokio::test]
    async fn overlay_flags_disagreement_with_seeded_label() {
        let warehouse = FakeWarehouse::default()
            .respond(
                "churn_demo.interactions",
                vec![
                    interaction_row("CALL003", "CUST003", "this is unacceptable", -0.6, "Complaint"),
                    interaction_row("CALL004", "CUST004", "ESG options please", 0.5, "Investment Inquiry"),
                ],
            )
            .respond(
                "churn_demo.customer_analytics",
                vec![analytics_row("CUST003", "Low", 0.2), analytics_row("CUST004", "Low", 0.15)],
            );

        let rows = overlay(&warehouse, None, None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.call_id, "CALL003");
        assert_eq!(rows[0].assessment.label, RiskLabel::High);
        assert!(rows[0].disagrees());
        assert!(!rows[1].disagrees());
    }

    #[test]
    fn fetched_wraps_errors_as_placeholders() {
        let result: Result<Vec<AnalyticsRow>, _> =
            Err(WarehouseError::Connection("refused".to_string()));
        match fetched("customer analytics", result) {
            Fetched::Placeholder(reason) => assert!(reason.contains("refused")),
            Fetched::Live(_) => panic!("expected placeholder"),
        }
    }

    #[tokio::test]
    async fn import_generates_ids_and_counts_inserts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "call_id,customer_id,customer_name,call_timestamp,transcript_text,sentiment_score,primary_intent"
        )
        .unwrap();
        writeln!(
            file,
            "CALL900,CUST900,Test Person,2025-07-11T10:00:00Z,I'm frustrated,-0.7,Complaint"
        )
        .unwrap();
        writeln!(
            file,
            ",CUST901,Other Person,2025-07-11T10:05:00Z,Just checking in,,"
        )
        .unwrap();

        let warehouse = FakeWarehouse::default();
        let inserted = import_csv(&warehouse, file.path()).await.unwrap();
        assert_eq!(inserted, 2);

        let statements = warehouse.statements.lock().unwrap();
        let interactions: Vec<&Vec<SqlParam>> = statements
            .iter()
            .filter(|(sql, _)| sql.contains("churn_demo.interactions"))
            .map(|(_, params)| params)
            .collect();
        assert_eq!(interactions.len(), 2);
        match &interactions[1][0] {
            SqlParam::Text(Some(id)) => assert!(id.starts_with("import-")),
            other => panic!("unexpected call id {other:?}"),
        }
        assert_eq!(interactions[1][4], SqlParam::Float(None));
        assert_eq!(interactions[1][5], SqlParam::Text(None));
        assert_eq!(interactions[0][4], SqlParam::Float(Some(-0.7)));
    }

    #[tokio::test]
    async fn import_keeps_existing_customers_and_blank_transcripts_are_null() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "call_id,customer_id,customer_name,call_timestamp,transcript_text,sentiment_score,primary_intent"
        )
        .unwrap();
        writeln!(file, "CALL950,CUST003,Renamed Person,2025-07-12T08:00:00Z,,0.1,Account Inquiry").unwrap();

        let warehouse = FakeWarehouse::default();
        import_csv(&warehouse, file.path()).await.unwrap();

        let statements = warehouse.statements.lock().unwrap();
        let (customer_sql, _) = statements
            .iter()
            .find(|(sql, _)| sql.contains("churn_demo.customers"))
            .unwrap();
        assert!(customer_sql.contains("ON CONFLICT (customer_id) DO NOTHING"));
        assert!(!customer_sql.contains("DO UPDATE"));

        let (_, params) = statements
            .iter()
            .find(|(sql, _)| sql.contains("churn_demo.interactions"))
            .unwrap();
        assert_eq!(params[3], SqlParam::Text(None));
    }
}
