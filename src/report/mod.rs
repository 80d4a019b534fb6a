pub mod formatter;
pub mod prompt;

use chrono::{Duration, NaiveDate};
use crate::analysis::context::context_records;
use crate::analysis::summary::BasketSummary;
use crate::data::types::LogRecord;
use prompt::{build_daily_prompt, build_monthly_prompt};

/// A prompt and the date its artifacts are filed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Recap {
    pub prompt: String,
    pub tag_date: NaiveDate,
}

/// Daily recaps work from the context slice alone and are filed under the
/// report date, so a day without snapshots still gets a prompt.
pub fn daily_recap(records: &[LogRecord], template: &str, window: Duration, report_date: NaiveDate) -> Recap {
    Recap {
        prompt: build_daily_prompt(template, &context_records(records, window)),
        tag_date: report_date,
    }
}

pub fn monthly_recap(summary: &BasketSummary, author: &str) -> Recap {
    Recap {
        prompt: build_monthly_prompt(summary, author),
        tag_date: summary.end_date,
    }
}
