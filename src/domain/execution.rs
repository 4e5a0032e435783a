//! Simulated order execution for replays.
//!
//! Market orders fill at the close of the bar they are issued on: buys at the
//! ask close (bid when the bar has no ask side), sells at the bid close. An
//! optional slippage moves the fill against the trader and a commission is
//! charged per fill.

use std::collections::HashMap;
use tracing::debug;

use crate::domain::bar::Bar;
use crate::domain::order::{Order, OrderReport, OrderStatus};
use crate::ports::order_port::OrderPort;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Buy: market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Sell: market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// In-memory [`OrderPort`] tracking open positions by label.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecution {
    config: ExecutionConfig,
    open: HashMap<String, f64>,
}

impl SimulatedExecution {
    pub fn new(config: ExecutionConfig) -> Self {
        SimulatedExecution {
            config,
            open: HashMap::new(),
        }
    }

    pub fn open_positions(&self) -> usize {
        self.open.len()
    }

    fn fill(&self, order: &Order, market_price: f64, amount: f64, market: &Bar) -> OrderReport {
        let price = if order.is_open() {
            apply_slippage_buy(market_price, self.config.slippage_pct)
        } else {
            apply_slippage_sell(market_price, self.config.slippage_pct)
        };
        OrderReport {
            order: order.clone(),
            status: OrderStatus::Accepted,
            price,
            amount,
            commission: calculate_commission(price * amount, &self.config),
            time: market.end_time(),
        }
    }
}

impl OrderPort for SimulatedExecution {
    fn execute(&mut self, order: &Order, market: &Bar) -> OrderReport {
        if market.is_nan() {
            return OrderReport::rejected(order, "no market data");
        }
        let report = match order {
            Order::Open(open) => {
                if self.open.contains_key(&open.label) {
                    return OrderReport::rejected(order, "label already open");
                }
                if open.amount.is_nan() || open.amount <= 0.0 {
                    return OrderReport::rejected(order, "amount must be positive");
                }
                let price = market.buy_close();
                if price.is_nan() {
                    return OrderReport::rejected(order, "no market price");
                }
                let report = self.fill(order, price, open.amount, market);
                self.open.insert(open.label.clone(), open.amount);
                report
            }
            Order::Close(close) => {
                let Some(amount) = self.open.get(&close.label).copied() else {
                    return OrderReport::rejected(order, "no open position with this label");
                };
                let price = market.close();
                if price.is_nan() {
                    return OrderReport::rejected(order, "no market price");
                }
                let report = self.fill(order, price, amount, market);
                self.open.remove(&close.label);
                report
            }
        };
        debug!(label = %order.label(), price = report.price, "order filled");
        report
    }
}
