use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// One line of a trading log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogRecord {
    Snapshot(Snapshot),
    NewsEvent(NewsEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "iso_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    pub pair: String,
    pub units: i64,
    pub live_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pips: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEvent {
    #[serde(with = "iso_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    pub title: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub forecast: Option<String>,
    #[serde(default)]
    pub actual: Option<String>,
}

impl LogRecord {
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        match self {
            LogRecord::Snapshot(s) => s.timestamp,
            LogRecord::NewsEvent(e) => e.timestamp,
        }
    }

    pub fn as_snapshot(&self) -> Option<&Snapshot> {
        match self {
            LogRecord::Snapshot(s) => Some(s),
            LogRecord::NewsEvent(_) => None,
        }
    }

    pub fn as_news_event(&self) -> Option<&NewsEvent> {
        match self {
            LogRecord::NewsEvent(e) => Some(e),
            LogRecord::Snapshot(_) => None,
        }
    }
}

impl Snapshot {
    /// Order by instant, breaking ties on the remaining fields so that the
    /// earliest and latest snapshot do not depend on log order.
    pub fn cmp_chronological(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.pair.cmp(&other.pair))
            .then_with(|| self.units.cmp(&other.units))
            .then_with(|| self.live_price.total_cmp(&other.live_price))
            .then_with(|| match (self.pips, other.pips) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
            .then_with(|| {
                self.timestamp
                    .offset()
                    .local_minus_utc()
                    .cmp(&other.timestamp.offset().local_minus_utc())
            })
    }
}

impl NewsEvent {
    pub fn is_high_impact(&self) -> bool {
        self.impact.eq_ignore_ascii_case("high")
    }
}

/// A timestamp truncated to the minute, keeping the offset it was logged with.
///
/// Keys compare by instant, so two logs written with different offsets still
/// land on the same bucket when they describe the same minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinuteKey(DateTime<FixedOffset>);

impl MinuteKey {
    pub fn from_timestamp(ts: &DateTime<FixedOffset>) -> Self {
        let truncated = ts
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(*ts);
        Self(truncated)
    }

    /// Minutes elapsed since local midnight.
    pub fn minute_of_day(&self) -> i64 {
        i64::from(self.0.hour()) * 60 + i64::from(self.0.minute())
    }

    /// `None` when the result falls outside the representable range.
    pub fn checked_shift(&self, by: Duration) -> Option<Self> {
        self.0.checked_add_signed(by).map(Self)
    }
}

impl fmt::Display for MinuteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%:z"))
    }
}

impl Serialize for MinuteKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse an ISO-8601 timestamp as written by the trading engine.
///
/// Accepts RFC 3339, a space instead of `T`, and naive timestamps (read as UTC+00:00).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt);
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    FixedOffset::east_opt(0).map(|utc| utc.from_utc_datetime(&naive))
}

mod iso_timestamp {
    use super::*;
    use serde::{de::Error, Deserializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}
