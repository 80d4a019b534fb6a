use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};
use crate::config::BrokerCredentials;

/// Closed-trade totals for a date range, as reported by the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTradesSummary {
    pub total_trades: u32,
    pub final_profit: f64,
    pub final_pips: f64,
}

pub struct OandaClient {
    client: Client,
    credentials: BrokerCredentials,
}

#[derive(Debug, Deserialize)]
struct TradesResponse {
    #[serde(default)]
    trades: Vec<ClosedTrade>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosedTrade {
    #[serde(default)]
    instrument: String,
    #[serde(default)]
    close_time: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    realized_pl: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    initial_units: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    price: f64,
}

/// OANDA sends decimals as strings.
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl OandaClient {
    pub fn new(credentials: BrokerCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
        }
    }

    /// Totals for trades closed between `start` and `end`, both inclusive.
    pub async fn fetch_closed_trades_summary(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ClosedTradesSummary> {
        let url = format!(
            "{}/accounts/{}/trades",
            self.credentials.base_url, self.credentials.account_id
        );

        let response = self.client
            .get(&url)
            .bearer_auth(&self.credentials.api_key)
            .query(&[("state", "CLOSED")])
            .send()
            .await
            .context("Failed to fetch closed trades")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Broker returned {}: {}", status, body);
        }

        let parsed: TradesResponse = response
            .json()
            .await
            .context("Failed to parse closed trades response")?;

        let summary = summarize_closed_trades(&parsed.trades, start, end);
        info!(
            "💰 {} closed trades between {} and {}: {:.2} profit, {:.1} pips",
            summary.total_trades, start, end, summary.final_profit, summary.final_pips
        );
        Ok(summary)
    }
}

fn summarize_closed_trades(trades: &[ClosedTrade], start: NaiveDate, end: NaiveDate) -> ClosedTradesSummary {
    let mut total_trades = 0;
    let mut profit = 0.0;
    let mut pips = 0.0;

    for trade in trades {
        let Some(closed_on) = trade.close_time.as_deref().and_then(close_date) else {
            continue;
        };
        if closed_on < start || closed_on > end {
            continue;
        }
        let Some(trade_pips) = trade_pips(trade) else {
            continue;
        };

        debug!(
            "{} | units {} | open {:.5} | realized {:.4} | {:.1} pips",
            trade.instrument, trade.initial_units, trade.price, trade.realized_pl, trade_pips
        );
        total_trades += 1;
        profit += trade.realized_pl;
        pips += trade_pips;
    }

    ClosedTradesSummary {
        total_trades,
        final_profit: (profit * 100.0).round() / 100.0,
        final_pips: (pips * 10.0).round() / 10.0,
    }
}

fn close_date(close_time: &str) -> Option<NaiveDate> {
    let day = close_time.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Realized pips for one trade, signed like its P/L. JPY pairs quote to two
/// decimals, so their per-unit pip value is scaled by the open price.
fn trade_pips(trade: &ClosedTrade) -> Option<f64> {
    if trade.initial_units == 0.0 || trade.price == 0.0 {
        return None;
    }

    let is_jpy = trade.instrument.contains("JPY");
    let pip_size = if is_jpy { 0.01 } else { 0.0001 };
    let pip_value_per_unit = if is_jpy { pip_size / trade.price } else { pip_size };

    let pips = trade.realized_pl.abs() / (trade.initial_units.abs() * pip_value_per_unit);
    Some(if trade.realized_pl < 0.0 { -pips } else { pips })
}
