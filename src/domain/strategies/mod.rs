//! Concrete strategies.

pub mod rsi;
