use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub report: ReportConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub log_dir: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    Daily,
    Monthly,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub mode: ReportMode,
    pub strategy_name: String,
    #[serde(default = "default_author")]
    pub author: String,
    /// Fixed report date; daily reports default to yesterday, monthly to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Template file for daily prompts. `{{LOGS}}` marks where the log lines go.
    #[serde(default)]
    pub prompt_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
    #[serde(default = "default_top_movers")]
    pub top_movers_per_side: usize,
    #[serde(default = "default_chart_interval")]
    pub chart_interval_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub slack_enabled: bool,
}

/// Longest accepted event window: one month either side.
pub const MAX_WINDOW_MINUTES: i64 = 31 * 24 * 60;

fn default_author() -> String { "Amber".to_string() }
fn default_window_minutes() -> i64 { 60 }
fn default_top_movers() -> usize { 3 }
fn default_chart_interval() -> i64 { 15 }
fn default_api_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_model() -> String { "gpt-4".to_string() }
fn default_max_tokens() -> u32 { 1500 }
fn default_temperature() -> f64 { 0.7 }
fn default_timeout() -> u64 { 120 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            top_movers_per_side: default_top_movers(),
            chart_interval_minutes: default_chart_interval(),
        }
    }
}

impl AnalysisConfig {
    pub fn window(&self) -> Duration {
        Duration::minutes(self.window_minutes.clamp(0, MAX_WINDOW_MINUTES))
    }

    fn validate(&self) -> Result<()> {
        if !(0..=MAX_WINDOW_MINUTES).contains(&self.window_minutes) {
            bail!(
                "analysis.window_minutes must be between 0 and {}, got {}",
                MAX_WINDOW_MINUTES,
                self.window_minutes
            );
        }
        if self.chart_interval_minutes < 1 {
            bail!(
                "analysis.chart_interval_minutes must be positive, got {}",
                self.chart_interval_minutes
            );
        }
        Ok(())
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ReportConfig {
    /// The day (daily) or month (monthly) this run reports on.
    pub fn report_date(&self, today: NaiveDate) -> NaiveDate {
        if let Some(date) = self.date {
            return date;
        }
        match self.mode {
            ReportMode::Daily => today - Duration::days(1),
            ReportMode::Monthly => today,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub openai_api_key: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub log_dir: Option<String>,
    pub broker: Option<BrokerCredentials>,
}

/// OANDA access for closed-trade totals. Only present when all three
/// variables are set.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerCredentials {
    pub api_key: String,
    pub account_id: String,
    pub base_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.analysis.validate()?;
        Ok(config)
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            slack_webhook_url: non_empty_var("SLACK_WEBHOOK"),
            log_dir: non_empty_var("LOG_DIR"),
            broker: broker_credentials(
                non_empty_var("OANDA_API_KEY"),
                non_empty_var("OANDA_ACCOUNT_ID"),
                non_empty_var("OANDA_BASE_URL"),
            ),
        })
    }
}

fn broker_credentials(
    api_key: Option<String>,
    account_id: Option<String>,
    base_url: Option<String>,
) -> Option<BrokerCredentials> {
    Some(BrokerCredentials {
        api_key: api_key?,
        account_id: account_id?,
        base_url: base_url?.trim_end_matches('/').to_string(),
    })
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse(
            r#"
            [system]
            log_dir = "logs"
            output_dir = "out"

            [report]
            mode = "monthly"
            strategy_name = "BlueFire"
            "#,
        )
        .unwrap();

        assert_eq!(config.report.mode, ReportMode::Monthly);
        assert_eq!(config.report.author, "Amber");
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.analysis.window(), Duration::minutes(60));
        assert!(!config.writer.enabled);
        assert!(!config.notifications.slack_enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [system]
            log_dir = "logs"
            output_dir = "out"

            [report]
            mode = "daily"
            strategy_name = "BlueFire"
            author = "Skye"
            date = "2025-04-09"
            prompt_template = "prompts/daily.txt"

            [analysis]
            window_minutes = 30
            top_movers_per_side = 2

            [writer]
            enabled = true
            model = "gpt-4o"

            [notifications]
            slack_enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.report.date, NaiveDate::from_ymd_opt(2025, 4, 9));
        assert_eq!(config.analysis.window_minutes, 30);
        assert_eq!(config.analysis.chart_interval_minutes, 15);
        assert_eq!(config.writer.model, "gpt-4o");
        assert_eq!(config.writer.max_tokens, 1500);
        assert!(config.notifications.slack_enabled);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let result = Config::parse(
            r#"
            [system]
            log_dir = "logs"
            output_dir = "out"

            [report]
            mode = "weekly"
            strategy_name = "BlueFire"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_analysis_ranges_validated() {
        let config_with = |analysis: &str| {
            Config::parse(&format!(
                r#"
                [system]
                log_dir = "logs"
                output_dir = "out"

                [report]
                mode = "daily"
                strategy_name = "BlueFire"

                [analysis]
                {}
                "#,
                analysis
            ))
        };

        assert!(config_with("window_minutes = 1000000000000").is_err());
        assert!(config_with("window_minutes = -5").is_err());
        assert!(config_with("chart_interval_minutes = 0").is_err());
        assert!(config_with("window_minutes = 44640").is_ok());
    }

    #[test]
    fn test_window_clamped() {
        let analysis = AnalysisConfig {
            window_minutes: i64::MAX,
            ..AnalysisConfig::default()
        };
        assert_eq!(analysis.window(), Duration::minutes(MAX_WINDOW_MINUTES));
    }

    #[test]
    fn test_broker_credentials_need_all_vars() {
        let creds = broker_credentials(
            Some("key".to_string()),
            Some("001-001-1234567-001".to_string()),
            Some("https://api-fxpractice.oanda.com/v3/".to_string()),
        )
        .unwrap();
        assert_eq!(creds.base_url, "https://api-fxpractice.oanda.com/v3");

        assert!(broker_credentials(Some("key".to_string()), None, Some("url".to_string())).is_none());
        assert!(broker_credentials(None, None, None).is_none());
    }

    #[test]
    fn test_report_date_defaults() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let mut report = ReportConfig {
            mode: ReportMode::Daily,
            strategy_name: "BlueFire".to_string(),
            author: default_author(),
            date: None,
            prompt_template: None,
        };

        assert_eq!(report.report_date(today), NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());

        report.mode = ReportMode::Monthly;
        assert_eq!(report.report_date(today), today);

        report.date = NaiveDate::from_ymd_opt(2025, 3, 15);
        assert_eq!(report.report_date(today), NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    }
}
