//! Entries and exits accepted during a replay.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub index: usize,
    pub time: Option<DateTime<Utc>>,
    pub price: f64,
    pub amount: f64,
    pub label: String,
}

/// A closed round trip: one entry and its exit.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry: TradeEvent,
    pub exit: TradeEvent,
}

impl Trade {
    /// Price difference times traded amount.
    pub fn profit(&self) -> f64 {
        (self.exit.price - self.entry.price) * self.entry.amount
    }

    pub fn pips(&self, pip: f64) -> f64 {
        (self.exit.price - self.entry.price) / pip
    }

    pub fn is_profitable(&self) -> bool {
        self.profit() > 0.0
    }

    /// Bars between entry and exit.
    pub fn bars_held(&self) -> usize {
        self.exit.index - self.entry.index
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradingRecord {
    trades: Vec<Trade>,
    open: Option<TradeEvent>,
}

impl TradingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.open.is_none()
    }

    pub fn current_entry(&self) -> Option<&TradeEvent> {
        self.open.as_ref()
    }

    /// Record an entry. Returns false when a position is already open.
    pub fn enter(&mut self, event: TradeEvent) -> bool {
        if self.open.is_some() {
            return false;
        }
        self.open = Some(event);
        true
    }

    /// Record the exit of the open position.
    pub fn exit(&mut self, event: TradeEvent) -> Option<&Trade> {
        let entry = self.open.take()?;
        self.trades.push(Trade { entry, exit: event });
        self.trades.last()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn last_trade(&self) -> Option<&Trade> {
        self.trades.last()
    }
}
