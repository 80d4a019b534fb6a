use chrono::SecondsFormat;
use crate::analysis::events::EventImpact;
use crate::analysis::summary::BasketSummary;
use crate::data::types::LogRecord;

pub const LOGS_PLACEHOLDER: &str = "{{LOGS}}";

pub const DEFAULT_DAILY_TEMPLATE: &str = "\
You are a professional trading blog writer.
Using the trading log below, write a concise, natural-sounding daily forex trade summary.
Cover how the basket opened, how it reacted to the news events, and where it closed.
Format all output as clean markdown with a bold title on the first line.

{{LOGS}}
";

/// One human-readable line per log record.
pub fn format_log_entry(record: &LogRecord) -> String {
    let ts = record.timestamp().to_rfc3339_opts(SecondsFormat::AutoSi, false);
    match record {
        LogRecord::NewsEvent(e) => format!(
            "[News Event @ {}] {} ({}, {}) - Forecast: {}, Actual: {}",
            ts,
            e.title,
            e.currency,
            e.impact,
            e.forecast.as_deref().unwrap_or("n/a"),
            e.actual.as_deref().unwrap_or("n/a"),
        ),
        LogRecord::Snapshot(s) => format!(
            "[Snapshot @ {}] {} - Units: {}, Price: {}, PnL: {} pips",
            ts,
            s.pair,
            s.units,
            s.live_price,
            s.pips.map(|p| p.to_string()).unwrap_or_else(|| "n/a".to_string()),
        ),
    }
}

/// Fill a daily template with the context records. Templates without the
/// placeholder get the log appended.
pub fn build_daily_prompt(template: &str, records: &[LogRecord]) -> String {
    let logs = records
        .iter()
        .map(format_log_entry)
        .collect::<Vec<_>>()
        .join("\n");

    if template.contains(LOGS_PLACEHOLDER) {
        template.replace(LOGS_PLACEHOLDER, &logs)
    } else {
        format!("{}\n\n{}", template.trim_end(), logs)
    }
}

pub fn describe_top_movers(movers: &[EventImpact]) -> String {
    let mut text = String::new();
    for (idx, mover) in movers.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} at {} - Basket moved {:.1} pips {}.\n",
            idx + 1,
            mover.titles.join(", "),
            mover.minute,
            mover.change,
            mover.direction(),
        ));
    }
    text
}

pub fn build_monthly_prompt(summary: &BasketSummary, author: &str) -> String {
    let movers = if summary.top_movers.is_empty() {
        "No news event moved the basket.\n".to_string()
    } else {
        describe_top_movers(&summary.top_movers)
    };

    format!(
        r#"You are a professional trading blog writer.
Using the following information, write a detailed and natural-sounding forex trading blog post.
The blog post is a monthly recap of trades by the trading strategy.
Focus on clarity, professionalism, and storytelling. Make it easy to read and concise.

Start the file with a YAML frontmatter holding:
    - author: {author}
    - pubDatetime and modDatetime: the current time in ISO format
    - title: a bold blog title taken from the content
    - slug: a kebab-case version of the title
    - featured: false
    - draft: false
    - tags: forex, skyengine, analysis, algotrading
    - description: a short 1-2 sentence summary that does not repeat the title
After the frontmatter, repeat the title as a bold Markdown heading.

Strategy Name: {strategy}
Basket Start Date: {start}
Basket End Date: {end}
Major Event: {major}

Major Events and Basket Reactions:
{movers}
Total Trades: {total_trades}
Final Profit: {final_profit}
Final Pips: {final_pips}
Peak Pips: {peak}
Max Drawdown Pips: {drawdown}

Structure the post with these sections:
- Setup and Trigger
- Journey of the Trade
- Expiry and Closure
- Reflections and Next Steps
"#,
        author = author,
        strategy = summary.strategy_name,
        start = summary.start_date,
        end = summary.end_date,
        major = summary.major_event,
        movers = movers,
        total_trades = summary
            .total_trades
            .map(|t| t.to_string())
            .unwrap_or_else(|| "n/a".to_string()),
        final_profit = summary
            .final_profit
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "n/a".to_string()),
        final_pips = summary.final_pips,
        peak = summary.peak_pips,
        drawdown = summary.max_drawdown_pips,
    )
}
