//! Strategy decision hooks and the context they run in.

use crate::domain::bar::Bar;
use crate::domain::error::QuantframeError;
use crate::domain::instrument::{InstrumentSeriesSet, SeriesView};
use crate::domain::order::{Order, OrderReport};
use crate::domain::parameter::{ParameterKey, ParameterValues};
use crate::domain::resolution::Resolution;
use crate::domain::trading_record::TradingRecord;
use crate::ports::order_port::OrderPort;

/// What a strategy sees while deciding on one bar: the market data replayed
/// so far and an order port to act through.
pub struct StrategyContext<'a> {
    market: &'a InstrumentSeriesSet,
    orders: &'a mut dyn OrderPort,
    index: usize,
    bar: Bar,
    reports: Vec<OrderReport>,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        market: &'a InstrumentSeriesSet,
        orders: &'a mut dyn OrderPort,
        index: usize,
    ) -> Result<Self, QuantframeError> {
        let bar = market.primary().bar(index)?;
        Ok(StrategyContext {
            market,
            orders,
            index,
            bar,
            reports: Vec::new(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Bar being decided on.
    pub fn bar(&self) -> &Bar {
        &self.bar
    }

    pub fn market(&self) -> &'a InstrumentSeriesSet {
        self.market
    }

    pub fn series(&self, resolution: Resolution) -> Result<SeriesView<'a>, QuantframeError> {
        self.market.series(resolution)
    }

    /// Execute against the current bar. Every report, accepted or not, is kept.
    pub fn execute(&mut self, order: Order) -> OrderReport {
        let report = self.orders.execute(&order, &self.bar);
        self.reports.push(report.clone());
        report
    }

    pub fn reports(&self) -> &[OrderReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<OrderReport> {
        self.reports
    }
}

/// A tradeable strategy replayed bar by bar.
///
/// `should_enter` is asked while no position is open, `should_exit` while one
/// is. Both may place orders through the context; the runner records the fills
/// that come back accepted.
pub trait TradeStrategy {
    type Key: ParameterKey;

    fn name(&self) -> &str;

    fn symbol(&self) -> &str;

    fn resolution(&self) -> Resolution;

    /// Bars needed before decisions are meaningful; earlier indices are skipped.
    fn unstable_period(&self) -> usize {
        0
    }

    fn parameters(&self) -> &ParameterValues<Self::Key>;

    fn should_enter(
        &mut self,
        index: usize,
        record: &TradingRecord,
        ctx: &mut StrategyContext<'_>,
    ) -> Result<bool, QuantframeError>;

    fn should_exit(
        &mut self,
        index: usize,
        record: &TradingRecord,
        ctx: &mut StrategyContext<'_>,
    ) -> Result<bool, QuantframeError>;
}
