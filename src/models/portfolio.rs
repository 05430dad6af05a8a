// Portfolio and action-log records fetched from the training backend.
// Bodies that are not JSON fail as a whole (ParseError, raw kept);
// individual bad records are dropped and counted (ValidationError).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RawDataPoint;
use crate::error::TelemetryError;

/// Trade decision recorded per step (0 = hold, 1 = buy, 2 = sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Hold,
    Buy,
    Sell,
}

impl TradeAction {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Hold),
            1 => Some(Self::Buy),
            2 => Some(Self::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRow {
    pub step: u64,
    pub portfolio_value: f64,
    pub action: Option<TradeAction>,
    pub price: Option<f64>,
}

impl PortfolioRow {
    /// Reads one trade-log record (`Step`, `Portfolio Value`, optional `Action`, `Price`).
    pub fn from_value(value: &Value) -> Result<Self, TelemetryError> {
        let step = value
            .get("Step")
            .and_then(Value::as_u64)
            .ok_or_else(|| TelemetryError::Validation("Step missing or not a non-negative integer".into()))?;
        let portfolio_value = value
            .get("Portfolio Value")
            .and_then(Value::as_f64)
            .ok_or_else(|| TelemetryError::Validation("Portfolio Value missing or not a number".into()))?;
        let action = value
            .get("Action")
            .and_then(Value::as_i64)
            .and_then(TradeAction::from_code);
        let price = value.get("Price").and_then(Value::as_f64);
        Ok(Self {
            step,
            portfolio_value,
            action,
            price,
        })
    }

    pub fn point(&self) -> RawDataPoint {
        RawDataPoint::new(self.step, self.portfolio_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub total_value: f64,
    pub rows: Vec<PortfolioRow>,
    pub dropped: usize,
}

impl Portfolio {
    pub fn points(&self) -> Vec<RawDataPoint> {
        self.rows.iter().map(PortfolioRow::point).collect()
    }
}

#[derive(Deserialize)]
struct PortfolioBody {
    total_value: f64,
    #[serde(default)]
    stocks: Vec<Value>,
}

pub fn parse_portfolio(raw: &str) -> Result<Portfolio, TelemetryError> {
    let body: PortfolioBody =
        serde_json::from_str(raw).map_err(|e| TelemetryError::parse(&e, raw))?;
    let mut rows = Vec::with_capacity(body.stocks.len());
    let mut dropped = 0;
    for record in &body.stocks {
        match PortfolioRow::from_value(record) {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::debug!(error = %e, "dropping portfolio row");
                dropped += 1;
            }
        }
    }
    Ok(Portfolio {
        total_value: body.total_value,
        rows,
        dropped,
    })
}

/// Action-log timestamp as sent by the backend: epoch number or preformatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionTimestamp {
    Epoch(f64),
    Text(String),
}

/// `action` is passed through as sent: usually a label like "buy", but any
/// truthy JSON value (e.g. a numeric code) is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: ActionTimestamp,
    pub action: Value,
    pub value: f64,
}

/// JSON truthiness: null, false, 0, NaN and "" are falsy; arrays and objects are not.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl ActionLogEntry {
    /// Accepts a record only if `timestamp` is a non-zero number or non-empty string,
    /// `action` is truthy and `value` is a number.
    pub fn from_value(value: &Value) -> Result<Self, TelemetryError> {
        let timestamp = match value.get("timestamp") {
            Some(Value::Number(n)) => match n.as_f64() {
                Some(t) if t != 0.0 => ActionTimestamp::Epoch(t),
                _ => return Err(TelemetryError::Validation("timestamp is zero".into())),
            },
            Some(Value::String(s)) if !s.is_empty() => ActionTimestamp::Text(s.clone()),
            _ => {
                return Err(TelemetryError::Validation(
                    "timestamp missing or empty".into(),
                ));
            }
        };
        let action = match value.get("action") {
            Some(action) if is_truthy(action) => action.clone(),
            _ => {
                return Err(TelemetryError::Validation("action missing or falsy".into()));
            }
        };
        let amount = value
            .get("value")
            .and_then(Value::as_f64)
            .ok_or_else(|| TelemetryError::Validation("value missing or not a number".into()))?;
        Ok(Self {
            timestamp,
            action,
            value: amount,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogReport {
    pub entries: Vec<ActionLogEntry>,
    pub dropped: usize,
}

impl ActionLogReport {
    /// Keeps valid records in order; never fails on a bad record.
    pub fn from_records(records: &[Value]) -> Self {
        let mut report = Self::default();
        for record in records {
            match ActionLogEntry::from_value(record) {
                Ok(entry) => report.entries.push(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "dropping action-log entry");
                    report.dropped += 1;
                }
            }
        }
        report
    }
}

pub fn parse_action_logs(raw: &str) -> Result<ActionLogReport, TelemetryError> {
    let records: Vec<Value> =
        serde_json::from_str(raw).map_err(|e| TelemetryError::parse(&e, raw))?;
    Ok(ActionLogReport::from_records(&records))
}
