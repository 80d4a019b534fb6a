use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use crate::config::ReportMode;
use crate::data::types::{LogRecord, NewsEvent, Snapshot};

/// Records recovered from one or more log files, plus the count of lines that
/// could not be used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLog {
    pub records: Vec<LogRecord>,
    pub skipped: usize,
}

impl ParsedLog {
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.records.iter().filter_map(LogRecord::as_snapshot)
    }

    pub fn news_events(&self) -> impl Iterator<Item = &NewsEvent> {
        self.records.iter().filter_map(LogRecord::as_news_event)
    }

    fn merge(&mut self, other: ParsedLog) {
        self.records.extend(other.records);
        self.skipped += other.skipped;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogReadError {
    #[error("Log path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LogReadError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            LogReadError::NotFound(path.to_path_buf())
        } else {
            LogReadError::Io { path: path.to_path_buf(), source }
        }
    }
}

/// Parse JSON lines into records. Bad lines are counted and skipped.
pub fn parse_records<I, S>(lines: I) -> ParsedLog
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedLog::default();

    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<LogRecord>(line) {
            Ok(record) => parsed.records.push(record),
            Err(e) => {
                debug!("Skipping log line {}: {}", idx + 1, e);
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

pub fn read_log_file(path: &Path) -> Result<ParsedLog, LogReadError> {
    let bytes = fs::read(path).map_err(|e| LogReadError::from_io(path, e))?;
    let contents = String::from_utf8_lossy(&bytes);
    let parsed = parse_records(contents.lines());

    if parsed.skipped > 0 {
        warn!("{}: skipped {} malformed lines", path.display(), parsed.skipped);
    }
    debug!("{}: {} records", path.display(), parsed.records.len());

    Ok(parsed)
}

/// Read every `*.log` file in `dir` whose name starts with `prefix`, in
/// filename order.
pub fn load_log_dir(dir: &Path, prefix: &str) -> Result<ParsedLog, LogReadError> {
    let entries = fs::read_dir(dir).map_err(|e| LogReadError::from_io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LogReadError::from_io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && name.ends_with(".log") {
            files.push(entry.path());
        }
    }
    files.sort();

    if files.is_empty() {
        warn!("No log files matching {}*.log in {}", prefix, dir.display());
    }

    let mut merged = ParsedLog::default();
    for file in &files {
        merged.merge(read_log_file(file)?);
    }

    info!(
        "Loaded {} records from {} files ({} lines skipped)",
        merged.records.len(),
        files.len(),
        merged.skipped
    );
    Ok(merged)
}

pub fn daily_log_name(date: NaiveDate) -> String {
    format!("blog_logs_{}.log", date.format("%Y-%m-%d"))
}

pub fn monthly_log_prefix(date: NaiveDate) -> String {
    format!("blog_logs_{}", date.format("%Y-%m"))
}

/// Load the log set a report covers: one day's file, or every file of the month.
pub fn load_for_report(mode: ReportMode, log_dir: &Path, date: NaiveDate) -> Result<ParsedLog, LogReadError> {
    match mode {
        ReportMode::Daily => {
            let path = log_dir.join(daily_log_name(date));
            info!("Reading daily log {}", path.display());
            read_log_file(&path)
        }
        ReportMode::Monthly => load_log_dir(log_dir, &monthly_log_prefix(date)),
    }
}
