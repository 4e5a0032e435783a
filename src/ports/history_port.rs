//! Historical market data port.

use crate::domain::bar::Bar;
use crate::domain::error::QuantframeError;
use crate::domain::resolution::Resolution;
use chrono::{DateTime, Utc};

pub trait HistoryPort {
    /// Closed bars of `symbol` at `resolution` beginning in `[from, to)`,
    /// oldest first.
    fn fetch_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, QuantframeError>;
}
