//! Market quote as delivered by the ingestion collaborator.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub bid: f64,
    pub ask: Option<f64>,
}

impl Quote {
    pub fn bid_ask(symbol: &str, time: DateTime<Utc>, bid: f64, ask: f64) -> Self {
        Quote {
            symbol: symbol.to_string(),
            time,
            bid,
            ask: Some(ask),
        }
    }

    /// Single-price quote; only the bid side of bars is updated.
    pub fn price(symbol: &str, time: DateTime<Utc>, price: f64) -> Self {
        Quote {
            symbol: symbol.to_string(),
            time,
            bid: price,
            ask: None,
        }
    }

    pub fn spread(&self) -> Option<f64> {
        self.ask.map(|ask| ask - self.bid)
    }
}
