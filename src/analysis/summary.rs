use chrono::NaiveDate;
use tracing::info;
use crate::analysis::basket::{bucket_snapshots, find_extrema, score_buckets, BasketSeries, Extrema};
use crate::analysis::events::{
    compute_event_impacts, dedup_news_events, group_news_events_by_minute, rank_top_movers,
    EventImpact, NewsClusters,
};
use crate::config::AnalysisConfig;
use crate::data::broker::ClosedTradesSummary;
use crate::data::types::{LogRecord, NewsEvent, Snapshot};

const UNKNOWN_MAJOR_EVENT: &str = "Unknown Major Event";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Not enough data to build a summary: no snapshots in the log")]
    NoData,
}

/// Everything derived from one pass over a log set.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub snapshot_count: usize,
    /// Deduplicated and ordered by timestamp.
    pub news_events: Vec<NewsEvent>,
    pub series: BasketSeries,
    pub extrema: Option<Extrema>,
    pub clusters: NewsClusters,
    pub impacts: Vec<EventImpact>,
    pub top_movers: Vec<EventImpact>,
    pub first_snapshot: Option<Snapshot>,
    pub last_snapshot: Option<Snapshot>,
}

/// Run the whole aggregation: bucket, score, extrema, news clustering and
/// impact ranking. Pure in its inputs.
pub fn analyze(records: &[LogRecord], config: &AnalysisConfig) -> Analysis {
    let snapshots: Vec<&Snapshot> = records.iter().filter_map(LogRecord::as_snapshot).collect();
    let news_events: Vec<NewsEvent> = dedup_news_events(records.iter().filter_map(LogRecord::as_news_event))
        .into_iter()
        .cloned()
        .collect();

    let buckets = bucket_snapshots(snapshots.iter().copied());
    let series = score_buckets(&buckets);
    let extrema = find_extrema(&series);

    let clusters = group_news_events_by_minute(&news_events);
    let impacts = compute_event_impacts(&clusters, &series, config.window());
    let top_movers = rank_top_movers(&impacts, config.top_movers_per_side);

    info!(
        "Analyzed {} snapshots in {} buckets, {} news events in {} clusters ({} with basket data)",
        snapshots.len(),
        series.len(),
        news_events.len(),
        clusters.len(),
        impacts.len()
    );

    Analysis {
        snapshot_count: snapshots.len(),
        first_snapshot: snapshots.iter().min_by(|a, b| a.cmp_chronological(b)).map(|s| (*s).clone()),
        last_snapshot: snapshots.iter().max_by(|a, b| a.cmp_chronological(b)).map(|s| (*s).clone()),
        news_events,
        series,
        extrema,
        clusters,
        impacts,
        top_movers,
    }
}

/// The figures a recap post is written from.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketSummary {
    pub strategy_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub major_event: String,
    pub final_pips: f64,
    pub peak_pips: f64,
    pub max_drawdown_pips: f64,
    pub top_movers: Vec<EventImpact>,
    /// Broker totals, when a broker account is configured.
    pub total_trades: Option<u32>,
    pub final_profit: Option<f64>,
}

impl BasketSummary {
    pub fn from_analysis(analysis: &Analysis, strategy_name: &str) -> Result<Self, AnalysisError> {
        let (first, last) = match (&analysis.first_snapshot, &analysis.last_snapshot) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(AnalysisError::NoData),
        };

        let final_pips = analysis.series.values().next_back().copied().unwrap_or(0.0);
        let (peak_pips, max_drawdown_pips) = analysis
            .extrema
            .as_ref()
            .map(|e| (e.max_score, e.min_score))
            .unwrap_or((0.0, 0.0));

        let major_event = analysis
            .news_events
            .iter()
            .find(|e| e.is_high_impact())
            .or_else(|| analysis.news_events.first())
            .map(|e| e.title.clone())
            .unwrap_or_else(|| UNKNOWN_MAJOR_EVENT.to_string());

        Ok(Self {
            strategy_name: strategy_name.to_string(),
            start_date: first.timestamp.date_naive(),
            end_date: last.timestamp.date_naive(),
            major_event,
            final_pips: round1(final_pips),
            peak_pips: round1(peak_pips),
            max_drawdown_pips: round1(max_drawdown_pips),
            top_movers: analysis.top_movers.clone(),
            total_trades: None,
            final_profit: None,
        })
    }

    pub fn with_closed_trades(mut self, trades: &ClosedTradesSummary) -> Self {
        self.total_trades = Some(trades.total_trades);
        self.final_profit = Some(trades.final_profit);
        self
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
