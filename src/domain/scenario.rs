//! Replay results.

use chrono::{DateTime, Utc};

use crate::domain::error::QuantframeError;
use crate::domain::parameter::{ParameterKey, ParameterValues};
use crate::domain::primary_series::PrimarySeries;
use crate::domain::resolution::Resolution;
use crate::domain::trading_record::{Trade, TradingRecord};

/// Outcome of replaying one strategy over one window.
#[derive(Debug, Clone)]
pub struct TradeScenario<K: ParameterKey> {
    pub strategy: String,
    pub symbol: String,
    pub resolution: Resolution,
    pub parameters: ParameterValues<K>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// The replayed bars.
    pub series: PrimarySeries,
    pub record: TradingRecord,
}

impl<K: ParameterKey> TradeScenario<K> {
    pub fn trades(&self) -> &[Trade] {
        self.record.trades()
    }

    pub fn bar_count(&self) -> usize {
        self.series.bar_count()
    }
}

/// One slot of a parameter-space run.
#[derive(Debug)]
pub struct ScenarioResult<K: ParameterKey> {
    pub parameters: ParameterValues<K>,
    pub outcome: Result<TradeScenario<K>, QuantframeError>,
}

impl<K: ParameterKey> ScenarioResult<K> {
    pub fn scenario(&self) -> Option<&TradeScenario<K>> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&QuantframeError> {
        self.outcome.as_ref().err()
    }
}
