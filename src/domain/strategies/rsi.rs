//! Bullish RSI strategy: buy when RSI crosses up through the lower bound,
//! sell when it crosses down through the upper bound.

use tracing::info;

use crate::domain::error::QuantframeError;
use crate::domain::indicator::{Rsi, crossed_above, crossed_below};
use crate::domain::order::Order;
use crate::domain::parameter::{ParameterKey, ParameterValues, ValueKind};
use crate::domain::resolution::Resolution;
use crate::domain::strategy::{StrategyContext, TradeStrategy};
use crate::domain::trading_record::TradingRecord;

/// Amount bought per entry unless overridden.
pub const DEFAULT_ORDER_AMOUNT: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RsiParameter {
    RsiPeriod,
    RsiLowerBound,
    RsiUpperBound,
    TradeSymbol,
}

impl ParameterKey for RsiParameter {
    fn name(&self) -> &'static str {
        match self {
            RsiParameter::RsiPeriod => "RSI_PERIOD",
            RsiParameter::RsiLowerBound => "RSI_LOWER_BOUND",
            RsiParameter::RsiUpperBound => "RSI_UPPER_BOUND",
            RsiParameter::TradeSymbol => "TRADE_SYMBOL",
        }
    }

    fn kind(&self) -> ValueKind {
        match self {
            RsiParameter::TradeSymbol => ValueKind::Text,
            _ => ValueKind::Int,
        }
    }

    fn all() -> &'static [Self] {
        &[
            RsiParameter::RsiPeriod,
            RsiParameter::RsiLowerBound,
            RsiParameter::RsiUpperBound,
            RsiParameter::TradeSymbol,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct RsiStrategy {
    name: String,
    symbol: String,
    resolution: Resolution,
    period: usize,
    lower: f64,
    upper: f64,
    amount: f64,
    parameters: ParameterValues<RsiParameter>,
    rsi: Rsi,
    /// RSI by primary index, filled lazily up to the latest decision.
    values: Vec<Option<f64>>,
}

fn construction_failed(reason: String) -> QuantframeError {
    QuantframeError::StrategyConstructionFailed { reason }
}

impl RsiStrategy {
    pub fn from_parameters(
        parameters: &ParameterValues<RsiParameter>,
        resolution: Resolution,
    ) -> Result<Self, QuantframeError> {
        parameters.validate()?;
        let period = parameters.get_int(RsiParameter::RsiPeriod)?;
        let lower = parameters.get_int(RsiParameter::RsiLowerBound)?;
        let upper = parameters.get_int(RsiParameter::RsiUpperBound)?;
        let symbol = parameters.get_str(RsiParameter::TradeSymbol)?;

        if period < 1 {
            return Err(construction_failed(format!(
                "RSI period must be at least 1, got {}",
                period
            )));
        }
        if !(0..=100).contains(&lower) || !(0..=100).contains(&upper) {
            return Err(construction_failed(format!(
                "RSI bounds must lie in 0..=100, got {}-{}",
                lower, upper
            )));
        }
        if lower >= upper {
            return Err(construction_failed(format!(
                "RSI lower bound {} must be below upper bound {}",
                lower, upper
            )));
        }
        if symbol.trim().is_empty() {
            return Err(construction_failed("trade symbol is empty".to_string()));
        }

        let period = period as usize;
        Ok(RsiStrategy {
            name: format!("RsiStrategy_bullish_{}-{}", lower, upper),
            symbol: symbol.to_string(),
            resolution,
            period,
            lower: lower as f64,
            upper: upper as f64,
            amount: DEFAULT_ORDER_AMOUNT,
            parameters: parameters.clone(),
            rsi: Rsi::new(period),
            values: Vec::new(),
        })
    }

    /// Recipe for [`crate::domain::producer::Producer`] building strategies at
    /// `resolution` with `amount` per entry.
    pub fn recipe(
        resolution: Resolution,
        amount: f64,
    ) -> impl Fn(&ParameterValues<RsiParameter>) -> Result<RsiStrategy, QuantframeError> {
        move |parameters: &ParameterValues<RsiParameter>| {
            Ok(Self::from_parameters(parameters, resolution)?.with_amount(amount))
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// RSI values up to and including `index`.
    fn rsi_through(
        &mut self,
        index: usize,
        ctx: &StrategyContext<'_>,
    ) -> Result<&[Option<f64>], QuantframeError> {
        let series = ctx.series(self.resolution)?;
        while self.values.len() <= index {
            let bar = series.bar(self.values.len())?;
            self.values.push(self.rsi.next(bar.close()));
        }
        Ok(&self.values[..=index])
    }
}

impl TradeStrategy for RsiStrategy {
    type Key = RsiParameter;

    fn name(&self) -> &str {
        &self.name
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn unstable_period(&self) -> usize {
        self.period
    }

    fn parameters(&self) -> &ParameterValues<RsiParameter> {
        &self.parameters
    }

    fn should_enter(
        &mut self,
        index: usize,
        _record: &TradingRecord,
        ctx: &mut StrategyContext<'_>,
    ) -> Result<bool, QuantframeError> {
        let lower = self.lower;
        if !crossed_above(self.rsi_through(index, ctx)?, lower) {
            return Ok(false);
        }
        let report = ctx.execute(Order::open(&self.name, &self.symbol, index, self.amount));
        info!(
            strategy = %self.name,
            index,
            price = report.price,
            status = %report.status,
            "opening position"
        );
        Ok(true)
    }

    fn should_exit(
        &mut self,
        index: usize,
        record: &TradingRecord,
        ctx: &mut StrategyContext<'_>,
    ) -> Result<bool, QuantframeError> {
        let upper = self.upper;
        if !crossed_below(self.rsi_through(index, ctx)?, upper) {
            return Ok(false);
        }
        let Some(entry) = record.current_entry() else {
            return Ok(false);
        };
        let report = ctx.execute(Order::close(&entry.label));
        info!(
            strategy = %self.name,
            index,
            price = report.price,
            status = %report.status,
            "closing position"
        );
        Ok(true)
    }
}
