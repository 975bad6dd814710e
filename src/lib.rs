//! Online reinforcement-learning index advisor.
//!
//! Given a slow query, indexpilot inspects its execution plan, derives a
//! bounded catalog of candidate secondary indexes, and learns by repeated
//! measurement which candidate durably helps: each episode measures the
//! query, applies one chosen action, measures again, and rewards the
//! latency delta. Index creation is additive and idempotent; a training run
//! never mutates data and never rolls an index back.

pub mod config;
pub mod db;
pub mod oracle;
pub mod tuner;

pub use config::{Config, DatabaseConfig, TunerConfig};
pub use db::Database;
pub use tuner::{Optimizer, TrainingSummary};
