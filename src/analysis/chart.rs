use serde::Serialize;
use crate::analysis::basket::{find_extrema, resample_series, BasketSeries};
use crate::analysis::summary::Analysis;
use crate::data::types::MinuteKey;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: MinuteKey,
    pub basket_pips: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMarker {
    pub timestamp: MinuteKey,
    pub titles: Vec<String>,
}

/// Plot-ready basket series with the points worth annotating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub interval_minutes: i64,
    pub points: Vec<ChartPoint>,
    pub high: Option<ChartPoint>,
    pub low: Option<ChartPoint>,
    pub last: Option<ChartPoint>,
    pub events: Vec<EventMarker>,
}

impl ChartData {
    pub fn build(analysis: &Analysis, interval_minutes: i64) -> Self {
        let series = resample_series(&analysis.series, interval_minutes);
        let extrema = find_extrema(&series);

        let point = |key: &MinuteKey| point_at(&series, key);
        let high = extrema.as_ref().and_then(|e| e.max_keys.first()).and_then(point);
        let low = extrema.as_ref().and_then(|e| e.min_keys.first()).and_then(point);

        Self {
            interval_minutes,
            points: series
                .iter()
                .map(|(k, v)| ChartPoint { timestamp: *k, basket_pips: *v })
                .collect(),
            high,
            low,
            last: series
                .iter()
                .next_back()
                .map(|(k, v)| ChartPoint { timestamp: *k, basket_pips: *v }),
            events: analysis
                .clusters
                .iter()
                .map(|(k, titles)| EventMarker { timestamp: *k, titles: titles.clone() })
                .collect(),
        }
    }
}

fn point_at(series: &BasketSeries, key: &MinuteKey) -> Option<ChartPoint> {
    series
        .get(key)
        .map(|v| ChartPoint { timestamp: *key, basket_pips: *v })
}
