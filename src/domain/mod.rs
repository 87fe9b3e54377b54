//! Core domain types and logic.

pub mod bar;
pub mod resolution;
pub mod clock;
pub mod feed;
pub mod indicator;
pub mod indicator_engine;
pub mod warmup;
pub mod order;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod strategy;
pub mod strategies;
pub mod dispatcher;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
