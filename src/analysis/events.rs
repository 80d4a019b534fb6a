use chrono::{DateTime, Duration, FixedOffset};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use crate::analysis::basket::BasketSeries;
use crate::data::types::{MinuteKey, NewsEvent};

/// News titles released within the same minute.
pub type NewsClusters = BTreeMap<MinuteKey, Vec<String>>;

/// How the basket moved around one news cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct EventImpact {
    pub minute: MinuteKey,
    pub titles: Vec<String>,
    pub start_score: f64,
    pub end_score: f64,
    pub change: f64,
    pub abs_change: f64,
}

impl EventImpact {
    pub fn direction(&self) -> &'static str {
        if self.change > 0.0 {
            "up"
        } else {
            "down"
        }
    }
}

/// Drop repeated (title, timestamp) pairs, keeping the first occurrence.
/// The result is ordered by timestamp, then title.
pub fn dedup_news_events<'a, I>(events: I) -> Vec<&'a NewsEvent>
where
    I: IntoIterator<Item = &'a NewsEvent>,
{
    let mut seen: HashSet<(&'a str, DateTime<FixedOffset>)> = HashSet::new();
    let mut unique: Vec<&'a NewsEvent> = events
        .into_iter()
        .filter(|&e| seen.insert((e.title.as_str(), e.timestamp)))
        .collect();
    unique.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.title.cmp(&b.title)));
    unique
}

/// Deduplicate, then cluster titles by the minute they were released in.
pub fn group_news_events_by_minute<'a, I>(events: I) -> NewsClusters
where
    I: IntoIterator<Item = &'a NewsEvent>,
{
    let mut clusters = NewsClusters::new();
    for event in dedup_news_events(events) {
        let titles = clusters
            .entry(MinuteKey::from_timestamp(&event.timestamp))
            .or_default();
        if !titles.contains(&event.title) {
            titles.push(event.title.clone());
        }
    }
    clusters
}

/// Basket change across `window` either side of each cluster. Clusters with
/// no scored bucket inside their window, or whose window runs past the
/// representable time range, are left out.
pub fn compute_event_impacts(
    clusters: &NewsClusters,
    scores: &BasketSeries,
    window: Duration,
) -> Vec<EventImpact> {
    let mut impacts = Vec::new();

    for (minute, titles) in clusters {
        let (Some(start), Some(end)) = (minute.checked_shift(-window), minute.checked_shift(window)) else {
            warn!("Window around {} is out of range, skipping ({})", minute, titles.join(", "));
            continue;
        };
        let mut in_window = scores.range(start..=end);

        let Some((_, &start_score)) = in_window.next() else {
            debug!("No basket data around {} ({})", minute, titles.join(", "));
            continue;
        };
        let end_score = in_window.next_back().map(|(_, &s)| s).unwrap_or(start_score);
        let change = end_score - start_score;

        debug!("Cluster {} {:?}: {:.1} pips", minute, titles, change);

        impacts.push(EventImpact {
            minute: *minute,
            titles: titles.clone(),
            start_score,
            end_score,
            change,
            abs_change: change.abs(),
        });
    }

    impacts
}

/// Largest gains and largest losses, ranked separately by size and each cut
/// to `per_side`. Gainers come first. Clusters that left the basket flat are
/// in neither list.
pub fn rank_top_movers(impacts: &[EventImpact], per_side: usize) -> Vec<EventImpact> {
    let side = |gaining: bool| {
        let mut moves: Vec<EventImpact> = impacts
            .iter()
            .filter(|i| if gaining { i.change > 0.0 } else { i.change < 0.0 })
            .cloned()
            .collect();
        moves.sort_by(|a, b| b.abs_change.total_cmp(&a.abs_change));
        moves.truncate(per_side);
        moves
    };

    let mut top = side(true);
    top.extend(side(false));
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::parse_timestamp;

    fn event(title: &str, ts: &str) -> NewsEvent {
        NewsEvent {
            timestamp: parse_timestamp(ts).unwrap(),
            title: title.to_string(),
            currency: "USD".to_string(),
            impact: "High".to_string(),
            forecast: None,
            actual: None,
        }
    }

    fn key(ts: &str) -> MinuteKey {
        MinuteKey::from_timestamp(&parse_timestamp(ts).unwrap())
    }

    fn impact(minute: &str, change: f64) -> EventImpact {
        EventImpact {
            minute: key(minute),
            titles: vec![minute.to_string()],
            start_score: 0.0,
            end_score: change,
            change,
            abs_change: change.abs(),
        }
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let events = vec![
            event("NFP", "2025-01-01T09:00:00Z"),
            event("NFP", "2025-01-01T09:00:00Z"),
        ];
        assert_eq!(dedup_news_events(&events).len(), 1);
    }

    #[test]
    fn test_same_title_different_time_kept() {
        let events = vec![
            event("NFP", "2025-01-01T09:00:00Z"),
            event("NFP", "2025-01-01T10:00:00Z"),
        ];
        assert_eq!(dedup_news_events(&events).len(), 2);
    }

    #[test]
    fn test_same_minute_forms_one_cluster() {
        let events = vec![
            event("Unemployment Rate", "2025-01-01T09:00:30Z"),
            event("NFP", "2025-01-01T09:00:00Z"),
        ];

        let clusters = group_news_events_by_minute(&events);
        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[&key("2025-01-01T09:00:00Z")],
            vec!["NFP".to_string(), "Unemployment Rate".to_string()]
        );
    }

    #[test]
    fn test_cluster_titles_distinct() {
        let events = vec![
            event("NFP", "2025-01-01T09:00:00Z"),
            event("NFP", "2025-01-01T09:00:20Z"),
        ];
        let clusters = group_news_events_by_minute(&events);
        assert_eq!(clusters[&key("2025-01-01T09:00:00Z")], vec!["NFP".to_string()]);
    }

    #[test]
    fn test_impact_window() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-01-01T07:59:00Z"), 100.0);
        scores.insert(key("2025-01-01T08:00:00Z"), 2.0);
        scores.insert(key("2025-01-01T09:00:00Z"), 5.0);
        scores.insert(key("2025-01-01T10:00:00Z"), 11.0);
        scores.insert(key("2025-01-01T10:01:00Z"), -100.0);

        let clusters = group_news_events_by_minute(&[event("NFP", "2025-01-01T09:00:00Z")]);
        let impacts = compute_event_impacts(&clusters, &scores, Duration::minutes(60));

        assert_eq!(impacts.len(), 1);
        assert_eq!(impacts[0].start_score, 2.0);
        assert_eq!(impacts[0].end_score, 11.0);
        assert_eq!(impacts[0].change, 9.0);
        assert_eq!(impacts[0].abs_change, 9.0);
        assert_eq!(impacts[0].direction(), "up");
    }

    #[test]
    fn test_single_bucket_window_is_flat() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-01-01T09:30:00Z"), 7.0);

        let clusters = group_news_events_by_minute(&[event("CPI", "2025-01-01T09:00:00Z")]);
        let impacts = compute_event_impacts(&clusters, &scores, Duration::minutes(60));

        assert_eq!(impacts.len(), 1);
        assert_eq!(impacts[0].change, 0.0);
    }

    #[test]
    fn test_empty_window_skipped() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-01-01T12:00:00Z"), 7.0);

        let clusters = group_news_events_by_minute(&[
            event("NFP", "2025-01-01T09:00:00Z"),
            event("CPI", "2025-01-01T12:30:00Z"),
        ]);
        let impacts = compute_event_impacts(&clusters, &scores, Duration::minutes(60));

        assert_eq!(impacts.len(), 1);
        assert_eq!(impacts[0].titles, vec!["CPI".to_string()]);
        assert!(impacts.iter().all(|i| i.minute != key("2025-01-01T09:00:00Z")));
    }

    #[test]
    fn test_no_scores_no_impacts() {
        let clusters = group_news_events_by_minute(&[event("NFP", "2025-01-01T09:00:00Z")]);
        assert!(compute_event_impacts(&clusters, &BasketSeries::new(), Duration::minutes(60)).is_empty());
    }

    #[test]
    fn test_rank_top_movers_per_side() {
        let impacts = vec![
            impact("2025-01-01T01:00:00Z", 4.0),
            impact("2025-01-01T02:00:00Z", -9.0),
            impact("2025-01-01T03:00:00Z", 12.0),
            impact("2025-01-01T04:00:00Z", 1.0),
            impact("2025-01-01T05:00:00Z", 7.0),
            impact("2025-01-01T06:00:00Z", 0.0),
            impact("2025-01-01T07:00:00Z", -2.0),
        ];

        let top = rank_top_movers(&impacts, 3);
        let changes: Vec<f64> = top.iter().map(|i| i.change).collect();
        assert_eq!(changes, vec![12.0, 7.0, 4.0, -9.0, -2.0]);
    }

    #[test]
    fn test_rank_ties_keep_chronological_order() {
        let impacts = vec![
            impact("2025-01-01T01:00:00Z", 5.0),
            impact("2025-01-01T02:00:00Z", -3.0),
            impact("2025-01-01T03:00:00Z", 5.0),
            impact("2025-01-01T04:00:00Z", -3.0),
            impact("2025-01-01T05:00:00Z", 5.0),
        ];

        let top = rank_top_movers(&impacts, 2);
        let minutes: Vec<MinuteKey> = top.iter().map(|i| i.minute).collect();
        assert_eq!(
            minutes,
            vec![
                key("2025-01-01T01:00:00Z"),
                key("2025-01-01T03:00:00Z"),
                key("2025-01-01T02:00:00Z"),
                key("2025-01-01T04:00:00Z"),
            ]
        );
    }

    #[test]
    fn test_offsets_share_cluster_and_window() {
        let events = vec![
            event("NFP", "2025-01-01T09:00:00Z"),
            event("Unemployment Rate", "2025-01-01T10:00:40+01:00"),
        ];
        let clusters = group_news_events_by_minute(&events);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[&key("2025-01-01T09:00:00Z")].len(), 2);

        let mut scores = BasketSeries::new();
        scores.insert(key("2025-01-01T09:30:00+01:00"), 1.0);
        scores.insert(key("2025-01-01T09:45:00Z"), 4.0);
        let impacts = compute_event_impacts(&clusters, &scores, Duration::minutes(60));
        assert_eq!(impacts[0].change, 3.0);
    }

    #[test]
    fn test_oversized_window_skipped() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-01-01T09:00:00Z"), 1.0);

        let clusters = group_news_events_by_minute(&[event("NFP", "2025-01-01T09:00:00Z")]);
        let impacts = compute_event_impacts(&clusters, &scores, Duration::minutes(1_000_000_000_000));
        assert!(impacts.is_empty());
    }

    #[test]
    fn test_rank_top_movers_empty() {
        assert!(rank_top_movers(&[], 3).is_empty());
    }
}
