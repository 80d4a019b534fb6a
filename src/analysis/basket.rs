use chrono::Duration;
use std::collections::BTreeMap;
use crate::data::types::{MinuteKey, Snapshot};

/// Basket score per minute, ordered by time.
pub type BasketSeries = BTreeMap<MinuteKey, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Extrema {
    pub max_score: f64,
    pub max_keys: Vec<MinuteKey>,
    pub min_score: f64,
    pub min_keys: Vec<MinuteKey>,
}

/// Group snapshots by the minute they were taken in. Every snapshot lands in
/// exactly one bucket.
pub fn bucket_snapshots<'a, I>(snapshots: I) -> BTreeMap<MinuteKey, Vec<&'a Snapshot>>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut buckets: BTreeMap<MinuteKey, Vec<&'a Snapshot>> = BTreeMap::new();
    for snap in snapshots {
        buckets
            .entry(MinuteKey::from_timestamp(&snap.timestamp))
            .or_default()
            .push(snap);
    }
    buckets
}

/// Sum the pips of each bucket. Snapshots without pips are left out of the
/// sum, so a bucket with none of them scores 0.0.
pub fn score_buckets(buckets: &BTreeMap<MinuteKey, Vec<&Snapshot>>) -> BasketSeries {
    buckets
        .iter()
        .map(|(key, snaps)| {
            let total: f64 = snaps.iter().filter_map(|s| s.pips).sum();
            (*key, total)
        })
        .collect()
}

/// Highest and lowest basket scores with every bucket that reached them.
pub fn find_extrema(scores: &BasketSeries) -> Option<Extrema> {
    let mut iter = scores.iter();
    let (first_key, &first_score) = iter.next()?;

    let mut extrema = Extrema {
        max_score: first_score,
        max_keys: vec![*first_key],
        min_score: first_score,
        min_keys: vec![*first_key],
    };

    for (key, &score) in iter {
        if score > extrema.max_score {
            extrema.max_score = score;
            extrema.max_keys = vec![*key];
        } else if score == extrema.max_score {
            extrema.max_keys.push(*key);
        }

        if score < extrema.min_score {
            extrema.min_score = score;
            extrema.min_keys = vec![*key];
        } else if score == extrema.min_score {
            extrema.min_keys.push(*key);
        }
    }

    Some(extrema)
}

/// Re-sum a minute series onto `interval_minutes` floors counted from local
/// midnight. Intervals that do not divide a day evenly restart at midnight.
pub fn resample_series(scores: &BasketSeries, interval_minutes: i64) -> BasketSeries {
    if interval_minutes <= 1 {
        return scores.clone();
    }

    let mut resampled = BasketSeries::new();
    for (key, score) in scores {
        let offset = key.minute_of_day() % interval_minutes;
        let floor = key.checked_shift(Duration::minutes(-offset)).unwrap_or(*key);
        *resampled.entry(floor).or_insert(0.0) += score;
    }
    resampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::parse_timestamp;

    fn snap(ts: &str, pips: Option<f64>) -> Snapshot {
        Snapshot {
            timestamp: parse_timestamp(ts).unwrap(),
            pair: "EUR_USD".to_string(),
            units: 1000,
            live_price: 1.1,
            pips,
        }
    }

    fn key(ts: &str) -> MinuteKey {
        MinuteKey::from_timestamp(&parse_timestamp(ts).unwrap())
    }

    #[test]
    fn test_same_minute_shares_bucket() {
        let snaps = vec![
            snap("2025-04-09T09:00:00Z", Some(1.0)),
            snap("2025-04-09T09:00:42.5Z", None),
            snap("2025-04-09T09:00:59Z", Some(2.0)),
            snap("2025-04-09T10:00:00Z", Some(2.0)),
        ];

        let buckets = bucket_snapshots(&snaps);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&key("2025-04-09T09:00:00Z")].len(), 3);
        assert_eq!(buckets.values().map(Vec::len).sum::<usize>(), snaps.len());
    }

    #[test]
    fn test_score_example() {
        let snaps = vec![
            snap("2025-04-09T09:00:00Z", Some(5.0)),
            snap("2025-04-09T09:00:10Z", Some(3.0)),
            snap("2025-04-09T09:01:00Z", Some(-2.0)),
        ];

        let scores = score_buckets(&bucket_snapshots(&snaps));
        assert_eq!(scores[&key("2025-04-09T09:00:00Z")], 8.0);
        assert_eq!(scores[&key("2025-04-09T09:01:00Z")], -2.0);

        let extrema = find_extrema(&scores).unwrap();
        assert_eq!(extrema.max_score, 8.0);
        assert_eq!(extrema.max_keys, vec![key("2025-04-09T09:00:00Z")]);
        assert_eq!(extrema.min_score, -2.0);
        assert_eq!(extrema.min_keys, vec![key("2025-04-09T09:01:00Z")]);
    }

    #[test]
    fn test_bucket_without_pips_scores_zero() {
        let snaps = vec![
            snap("2025-04-09T09:00:00Z", None),
            snap("2025-04-09T09:00:30Z", None),
        ];

        let scores = score_buckets(&bucket_snapshots(&snaps));
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[&key("2025-04-09T09:00:00Z")], 0.0);
    }

    #[test]
    fn test_extrema_empty() {
        assert!(find_extrema(&BasketSeries::new()).is_none());
    }

    #[test]
    fn test_extrema_ties_kept() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-04-09T09:00:00Z"), 4.0);
        scores.insert(key("2025-04-09T09:01:00Z"), -1.0);
        scores.insert(key("2025-04-09T09:02:00Z"), 4.0);
        scores.insert(key("2025-04-09T09:03:00Z"), -1.0);
        scores.insert(key("2025-04-09T09:04:00Z"), 0.0);

        let extrema = find_extrema(&scores).unwrap();
        assert_eq!(
            extrema.max_keys,
            vec![key("2025-04-09T09:00:00Z"), key("2025-04-09T09:02:00Z")]
        );
        assert_eq!(
            extrema.min_keys,
            vec![key("2025-04-09T09:01:00Z"), key("2025-04-09T09:03:00Z")]
        );
    }

    #[test]
    fn test_extrema_single_bucket_is_both() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-04-09T09:00:00Z"), 3.5);

        let extrema = find_extrema(&scores).unwrap();
        assert_eq!(extrema.max_keys, extrema.min_keys);
        assert_eq!(extrema.max_score, 3.5);
        assert_eq!(extrema.min_score, 3.5);
    }

    #[test]
    fn test_extrema_symmetric_under_negation() {
        let values = [3.0, -7.5, 12.0, 12.0, -7.5, 0.0, 4.25];
        let scores: BasketSeries = values
            .iter()
            .enumerate()
            .map(|(i, v)| (key(&format!("2025-04-09T09:{:02}:00Z", i)), *v))
            .collect();
        let negated: BasketSeries = scores.iter().map(|(k, v)| (*k, -v)).collect();

        let a = find_extrema(&scores).unwrap();
        let b = find_extrema(&negated).unwrap();

        assert_eq!(a.max_score, -b.min_score);
        assert_eq!(a.min_score, -b.max_score);
        assert_eq!(a.max_keys, b.min_keys);
        assert_eq!(a.min_keys, b.max_keys);
    }

    #[test]
    fn test_resample_to_quarter_hours() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-04-09T09:00:00Z"), 1.0);
        scores.insert(key("2025-04-09T09:14:00Z"), 2.0);
        scores.insert(key("2025-04-09T09:15:00Z"), 4.0);
        scores.insert(key("2025-04-09T09:44:00Z"), 8.0);

        let resampled = resample_series(&scores, 15);
        assert_eq!(resampled.len(), 3);
        assert_eq!(resampled[&key("2025-04-09T09:00:00Z")], 3.0);
        assert_eq!(resampled[&key("2025-04-09T09:15:00Z")], 4.0);
        assert_eq!(resampled[&key("2025-04-09T09:30:00Z")], 8.0);
    }

    #[test]
    fn test_resample_one_minute_is_identity() {
        let mut scores = BasketSeries::new();
        scores.insert(key("2025-04-09T09:07:00Z"), 1.0);
        assert_eq!(resample_series(&scores, 1), scores);
    }
}
