//! Market orders issued by strategies and the execution reports they get back.

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub label: String,
    pub symbol: String,
    pub amount: f64,
}

/// Closes the position opened under `label`.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseOrder {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    Open(OpenOrder),
    Close(CloseOrder),
}

impl Order {
    /// Market buy labelled `<strategy>:<symbol>:<index>`.
    pub fn open(strategy: &str, symbol: &str, index: usize, amount: f64) -> Self {
        Order::Open(OpenOrder {
            label: format!("{}:{}:{}", strategy, symbol, index),
            symbol: symbol.to_string(),
            amount,
        })
    }

    pub fn close(label: &str) -> Self {
        Order::Close(CloseOrder {
            label: label.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Order::Open(o) => &o.label,
            Order::Close(c) => &c.label,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Order::Open(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Accepted,
    Rejected { reason: String },
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Accepted => write!(f, "accepted"),
            OrderStatus::Rejected { reason } => write!(f, "rejected: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderReport {
    pub order: Order,
    pub status: OrderStatus,
    /// Fill price; NaN when rejected.
    pub price: f64,
    pub amount: f64,
    pub commission: f64,
    pub time: Option<DateTime<Utc>>,
}

impl OrderReport {
    pub fn rejected(order: &Order, reason: impl Into<String>) -> Self {
        OrderReport {
            order: order.clone(),
            status: OrderStatus::Rejected {
                reason: reason.into(),
            },
            price: f64::NAN,
            amount: 0.0,
            commission: 0.0,
            time: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OrderStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_label_is_deterministic() {
        let a = Order::open("RsiStrategy_bullish_30-70", "EURUSD", 15, 1000.0);
        let b = Order::open("RsiStrategy_bullish_30-70", "EURUSD", 15, 1000.0);
        assert_eq!(a, b);
        assert_eq!(a.label(), "RsiStrategy_bullish_30-70:EURUSD:15");
        assert!(a.is_open());
    }

    #[test]
    fn close_refers_to_open_label() {
        let open = Order::open("s", "EURUSD", 3, 1.0);
        let close = Order::close(open.label());
        assert_eq!(close.label(), open.label());
        assert!(!close.is_open());
    }

    #[test]
    fn rejected_report() {
        let order = Order::close("missing");
        let report = OrderReport::rejected(&order, "no such position");
        assert!(!report.is_accepted());
        assert!(report.price.is_nan());
        assert_eq!(report.status.to_string(), "rejected: no such position");
    }
}
