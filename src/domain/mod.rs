//! Core domain types and logic.

pub mod error;
pub mod resolution;
pub mod bar;
pub mod quote;
pub mod primary_series;
pub mod aggregated_series;
pub mod instrument;
pub mod catalog;
pub mod parameter;
pub mod parameter_space;
pub mod producer;
pub mod order;
pub mod execution;
pub mod trading_record;
pub mod strategy;
pub mod scenario;
pub mod indicator;
pub mod strategies;
pub mod backtest;
pub mod criterion;
pub mod config_validation;
