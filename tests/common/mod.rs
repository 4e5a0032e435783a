#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use quantframe::domain::bar::{Bar, Ohlc};
use quantframe::domain::error::QuantframeError;
use quantframe::domain::parameter::ParameterValues;
use quantframe::domain::resolution::Resolution;
use quantframe::domain::strategies::rsi::RsiParameter;
use quantframe::ports::history_port::HistoryPort;
use std::cell::Cell;
use std::collections::HashMap;

/// Spread added to the bid to form the ask side of test bars.
pub const SPREAD: f64 = 0.0002;

/// History served from memory. Returns every stored bar regardless of the
/// requested window so callers' own window filtering gets exercised.
pub struct MockHistoryPort {
    pub data: HashMap<(String, Resolution), Vec<Bar>>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockHistoryPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, resolution: Resolution, bars: Vec<Bar>) -> Self {
        self.data.insert((symbol.to_string(), resolution), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl HistoryPort for MockHistoryPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, QuantframeError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuantframeError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(&(symbol.to_string(), resolution))
            .cloned()
            .unwrap_or_default())
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn minute(i: i64) -> DateTime<Utc> {
    t0() + TimeDelta::minutes(i)
}

/// Flat M1 bar closing at `close` with the ask `SPREAD` above the bid.
pub fn flat_bar(i: i64, close: f64) -> Bar {
    let ask = close + SPREAD;
    Bar::historical(
        Resolution::M1,
        minute(i),
        Ohlc::new(close, close, close, close),
        Ohlc::new(ask, ask, ask, ask),
        1.0,
    )
}

pub fn make_bars(start: i64, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| flat_bar(start + i as i64, c))
        .collect()
}

/// Closes for which a 14 period RSI crosses up through 30 at index 15 and
/// down through 70 at index 17.
pub fn rsi_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
    closes.extend_from_slice(&[99.0, 125.0, 115.0, 115.0, 115.0]);
    closes
}

/// The RSI scenario bars plus noise bars on both sides of `[t0, t0 + 20m)`.
pub fn rsi_history() -> MockHistoryPort {
    let mut bars = make_bars(-5, &[50.0, 60.0, 40.0, 70.0, 30.0]);
    bars.extend(make_bars(0, &rsi_closes()));
    bars.extend(make_bars(20, &[10.0, 200.0, 10.0]));
    MockHistoryPort::new().with_bars("EURUSD", Resolution::M1, bars)
}

pub fn rsi_params(period: i64, lower: i64, upper: i64) -> ParameterValues<RsiParameter> {
    ParameterValues::new()
        .with(RsiParameter::RsiPeriod, period)
        .unwrap()
        .with(RsiParameter::RsiLowerBound, lower)
        .unwrap()
        .with(RsiParameter::RsiUpperBound, upper)
        .unwrap()
        .with(RsiParameter::TradeSymbol, "EURUSD")
        .unwrap()
}
