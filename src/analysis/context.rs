use chrono::Duration;
use std::collections::BTreeSet;
use crate::analysis::events::dedup_news_events;
use crate::data::types::{LogRecord, Snapshot};

/// The slice of a day's log a daily post is written from: every news event
/// once, the snapshots within `window` of any event, and the first and last
/// snapshot of the day. Ordered by timestamp with exact repeats removed.
pub fn context_records(records: &[LogRecord], window: Duration) -> Vec<LogRecord> {
    let snapshots: Vec<&Snapshot> = records.iter().filter_map(LogRecord::as_snapshot).collect();
    let events = dedup_news_events(records.iter().filter_map(LogRecord::as_news_event));

    let mut picked: BTreeSet<usize> = BTreeSet::new();
    for event in &events {
        // A bound past the representable range leaves that side open.
        let start = event.timestamp.checked_sub_signed(window);
        let end = event.timestamp.checked_add_signed(window);
        picked.extend(
            snapshots
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    start.map_or(true, |start| s.timestamp >= start)
                        && end.map_or(true, |end| s.timestamp <= end)
                })
                .map(|(idx, _)| idx),
        );
    }

    let earliest = snapshots
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp_chronological(b))
        .map(|(i, _)| i);
    let latest = snapshots
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.cmp_chronological(b))
        .map(|(i, _)| i);
    picked.extend(earliest);
    picked.extend(latest);

    let mut selected: Vec<LogRecord> = events
        .into_iter()
        .map(|e| LogRecord::NewsEvent(e.clone()))
        .chain(picked.into_iter().map(|idx| LogRecord::Snapshot(snapshots[idx].clone())))
        .collect();
    selected.sort_by_key(LogRecord::timestamp);

    let mut context: Vec<LogRecord> = Vec::with_capacity(selected.len());
    for record in selected {
        let repeated = context
            .iter()
            .rev()
            .take_while(|r| r.timestamp() == record.timestamp())
            .any(|r| *r == record);
        if !repeated {
            context.push(record);
        }
    }
    context
}
