use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod actions;
mod cache;
mod config;
mod db;
mod models;
mod report;
mod risk;
mod signals;
mod warehouse;

use cache::CachedWarehouse;
use models::SentimentLabel;
use warehouse::PgWarehouse;

#[derive(Parser)]
#[command(name = "churn-signals")]
#[command(about = "Churn risk scoring over customer call transcripts", long_about = None)]
struct Cli {
    /// Connections file used when DATABASE_URL is not set
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single transcript without touching the warehouse
    Score {
        #[arg(long)]
        text: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        sentiment: Option<f64>,
        #[arg(long)]
        intent: Option<String>,
        #[arg(long, default_value = "CUSTOM")]
        customer: String,
        #[arg(long)]
        json: bool,
    },
    #[command(flatten)]
    Warehouse(WarehouseCommand),
}

/// Commands that need a warehouse connection.
#[derive(Subcommand)]
enum WarehouseCommand {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo customers, calls and seeded analytics
    Seed,
    /// Import interactions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Score stored interactions and compare with seeded labels
    Assess {
        #[arg(long)]
        customer: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "churn-report.md")]
        out: PathBuf,
    },
    /// Show row counts for the demo tables
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("churn_signals=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            text,
            sentiment,
            intent,
            customer,
            json,
        } => print_score(text.as_deref(), sentiment, intent.as_deref(), &customer, json),
        Commands::Warehouse(command) => run(command, cli.config.as_deref()).await,
    }
}

async fn run(command: WarehouseCommand, config_path: Option<&Path>) -> anyhow::Result<()> {
    let settings = config::load(config_path)?;
    info!(source = %settings.connection.describe(), "connecting to warehouse");

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(settings.connection.url())
        .await
        .context("failed to connect to Postgres")?;
    let warehouse = CachedWarehouse::new(
        PgWarehouse::new(pool),
        settings.cache_capacity,
        settings.cache_ttl,
    );

    match command {
        WarehouseCommand::InitDb => {
            db::init_db(warehouse.inner().pool()).await?;
            println!("Schema ready.");
        }
        WarehouseCommand::Seed => {
            let summary = db::seed(&warehouse).await?;
            println!(
                "Seed data inserted: {} customers, {} interactions, {} analytics rows.",
                summary.customers, summary.interactions, summary.analytics
            );
        }
        WarehouseCommand::Import { csv } => {
            let inserted = db::import_csv(&warehouse, &csv).await?;
            println!("Inserted {inserted} interactions from {}.", csv.display());
        }
        WarehouseCommand::Assess { customer, limit } => {
            if let Some(customer_id) = customer.as_deref() {
                match db::fetch_customer(&warehouse, customer_id).await? {
                    Some(profile) => {
                        let calls =
                            db::fetch_interactions(&warehouse, Some(customer_id), Some(limit)).await?;
                        print!("{}", report::render_customer_history(&profile, &calls));
                        println!();
                    }
                    None => println!("No customer profile found for {customer_id}."),
                }
            }

            let rows = db::overlay(&warehouse, customer.as_deref(), Some(limit)).await?;

            if rows.is_empty() {
                println!("No interactions found.");
                return Ok(());
            }

            println!("Interactions by computed churn risk:");
            for row in rows.iter() {
                let seeded = row
                    .seeded_label
                    .map(|label| label.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!(
                    "- {} ({}) {} {:.0}% (seeded {}){}: {}",
                    row.record.call_id,
                    row.record.customer_id,
                    row.assessment.label,
                    row.assessment.probability * 100.0,
                    seeded,
                    if row.disagrees() { " differs" } else { "" },
                    row.assessment.recommended_action
                );
            }
        }
        WarehouseCommand::Report { out } => {
            let data = report::ReportData {
                analytics: db::fetched("customer analytics", db::fetch_analytics(&warehouse).await),
                portfolio: db::fetched("portfolio", db::fetch_portfolio(&warehouse).await),
                trend: db::fetched("sentiment trend", db::fetch_sentiment_trend(&warehouse).await),
                intents: db::fetched("intent mix", db::fetch_intent_mix(&warehouse).await),
                overlay: db::fetched("interactions", db::overlay(&warehouse, None, Some(20)).await),
            };
            let report = report::build_report(&data);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        WarehouseCommand::Status => {
            for (table, count) in db::data_status(&warehouse).await {
                match count {
                    Ok(count) => println!("- {table}: {count} rows"),
                    Err(err) => println!("- {table}: unavailable ({err})"),
                }
            }
            let portfolio = db::fetched("portfolio", db::fetch_portfolio(&warehouse).await);
            if let Some(portfolio) = portfolio.live() {
                println!(
                    "{} customers holding {:.0} in assets under management.",
                    portfolio.customer_count, portfolio.total_aum
                );
            }
        }
    }

    Ok(())
}

fn print_score(
    text: Option<&str>,
    sentiment: Option<f64>,
    intent: Option<&str>,
    customer: &str,
    json: bool,
) -> anyhow::Result<()> {
    let assessment = risk::assess_text(customer, text, sentiment, intent);

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    let signals = signals::extract_signals(text, intent);
    let sentiment = risk::normalize_sentiment(sentiment);
    println!(
        "Sentiment {:.2} ({}), negative language: {}, complaint/churn intent: {}",
        sentiment,
        SentimentLabel::from_score(sentiment),
        signals.has_negative_keyword,
        signals.has_complaint_or_churn_intent
    );
    println!(
        "Churn risk {} at {:.0}% (confidence {:.1}%)",
        assessment.label,
        assessment.probability * 100.0,
        assessment.model_confidence
    );
    println!("Next best action: {}", assessment.recommended_action);
    println!("Reasoning: {}", assessment.reasoning);
    Ok(())
}
