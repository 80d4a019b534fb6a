mod ai;
mod analysis;
mod config;
mod data;
mod output;
mod report;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use ai::writer::PostWriter;
use analysis::chart::ChartData;
use analysis::summary::{analyze, BasketSummary};
use config::{Config, EnvConfig, ReportMode};
use data::broker::OandaClient;
use output::artifacts::ArtifactWriter;
use output::slack::SlackNotifier;
use report::formatter::format_markdown;
use report::prompt::DEFAULT_DAILY_TEMPLATE;
use report::{daily_recap, monthly_recap};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("🚀 Basket recap starting...");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    info!("Loading configuration from {}", config_path);
    let config = Config::load(&config_path)?;
    let env_config = EnvConfig::load()?;

    let report_date = config.report.report_date(Local::now().date_naive());
    let log_dir = env_config
        .log_dir
        .clone()
        .unwrap_or_else(|| config.system.log_dir.clone());

    info!("Mode: {:?}, report date: {}", config.report.mode, report_date);
    info!("Post writer: {}", config.writer.enabled);
    info!("Slack notifications: {}", config.notifications.slack_enabled);
    info!("Broker totals: {}", env_config.broker.is_some());

    // Aggregate
    let parsed = data::reader::load_for_report(config.report.mode, Path::new(&log_dir), report_date)
        .context("Failed to load trading logs")?;
    info!(
        "📊 {} snapshots and {} news events loaded, {} lines skipped",
        parsed.snapshots().count(),
        parsed.news_events().count(),
        parsed.skipped
    );

    let analysis = analyze(&parsed.records, &config.analysis);
    if analysis.snapshot_count == 0 {
        warn!("No snapshots found in {}", log_dir);
    }

    let recap = match config.report.mode {
        ReportMode::Daily => {
            let template = match &config.report.prompt_template {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("Failed to read prompt template: {}", path))?,
                None => DEFAULT_DAILY_TEMPLATE.to_string(),
            };
            daily_recap(&parsed.records, &template, config.analysis.window(), report_date)
        }
        ReportMode::Monthly => {
            let mut summary = BasketSummary::from_analysis(&analysis, &config.report.strategy_name)?;
            match &env_config.broker {
                Some(credentials) => {
                    let broker = OandaClient::new(credentials.clone());
                    match broker
                        .fetch_closed_trades_summary(summary.start_date, summary.end_date)
                        .await
                    {
                        Ok(trades) => summary = summary.with_closed_trades(&trades),
                        Err(e) => warn!("Closed-trade totals unavailable: {:#}", e),
                    }
                }
                None => info!("Broker not configured, recap will omit trade totals"),
            }
            log_summary(&summary);
            monthly_recap(&summary, &config.report.author)
        }
    };

    // Artifacts
    let artifacts = ArtifactWriter::new(&config.system.output_dir)?;
    info!("Writing artifacts to {}", artifacts.output_dir().display());
    let tag_date = recap.tag_date;
    artifacts.write_basket_scores(&analysis.series, tag_date)?;
    artifacts.write_chart(
        &ChartData::build(&analysis, config.analysis.chart_interval_minutes),
        tag_date,
    )?;
    artifacts.write_prompt(&recap.prompt, tag_date)?;

    // Post
    if !config.writer.enabled {
        info!("✅ Post writer disabled, prompt and artifacts saved");
        return Ok(());
    }
    let Some(api_key) = env_config.openai_api_key.clone() else {
        warn!("OPENAI_API_KEY not set, skipping post generation");
        return Ok(());
    };

    let writer = PostWriter::new(config.writer.clone(), api_key)?;
    let raw_post = writer.generate_post(&recap.prompt).await?;
    let markdown = format_markdown(&raw_post, &config.report.author, Utc::now())?;
    let post_path = artifacts.write_post(&markdown, tag_date)?;

    if config.notifications.slack_enabled {
        match &env_config.slack_webhook_url {
            Some(url) => {
                if let Err(e) = SlackNotifier::new(url.clone()).notify_post_saved(&post_path).await {
                    warn!("Slack notification failed: {:#}", e);
                }
            }
            None => warn!("Slack enabled but SLACK_WEBHOOK not set"),
        }
    }

    info!("✅ Recap complete: {}", post_path.display());
    Ok(())
}

fn log_summary(summary: &BasketSummary) {
    info!(
        "Basket {} → {}: final {:.1}, peak {:.1}, drawdown {:.1} pips",
        summary.start_date,
        summary.end_date,
        summary.final_pips,
        summary.peak_pips,
        summary.max_drawdown_pips
    );
    for (idx, mover) in summary.top_movers.iter().enumerate() {
        info!(
            "  {}. {} | {:.1} → {:.1} ({:+.1} pips) at {}",
            idx + 1,
            mover.titles.join(", "),
            mover.start_score,
            mover.end_score,
            mover.change,
            mover.minute
        );
    }
}
