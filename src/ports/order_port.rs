//! Order execution port.

use crate::domain::bar::Bar;
use crate::domain::order::{Order, OrderReport};

pub trait OrderPort {
    /// Execute `order` against the current market bar and report the outcome.
    fn execute(&mut self, order: &Order, market: &Bar) -> OrderReport;
}
