pub mod postgres;
pub mod simulated;
pub mod sqlite;

pub use self::postgres::PostgresBackend;
pub use self::simulated::SimulatedDatabase;
pub use self::sqlite::SqliteBackend;

use std::time::Duration;
use thiserror::Error;

/// Name prefix for indexes this tool creates. Used by `reset-indexes` to
/// find (and only find) advisor-managed indexes.
pub const MANAGED_INDEX_PREFIX: &str = "idx_";

/// One line of a query's execution plan: a table and how it is accessed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PlanRow {
    pub table: String,
    /// Index the planner chose for this step, if any.
    pub access_key: Option<String>,
    pub estimated_rows: u64,
}

/// Result of executing a query: how many rows came back and how long the
/// round trip took, with the full result set already consumed.
#[derive(Debug, Clone, Copy)]
pub struct QueryOutcome {
    pub rows: u64,
    pub elapsed: Duration,
}

/// Classified outcome of a DDL statement. "Already exists" is a value, not
/// an error: repeated index creation is expected during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlOutcome {
    Applied,
    AlreadyExists,
}

/// An index discovered in the target schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub table: String,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("postgres error: {0}")]
    Postgres(#[from] ::postgres::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("query failed: {0}")]
    Execution(String),
}

/// The entire contract the tuning loop requires from a database.
///
/// Implementations open a connection, perform one unit of work, and release
/// the connection before returning — no connection state is held across
/// calls. Connection pooling, retries, and credentials belong to the
/// backend, not to callers.
pub trait Database: Send + Sync {
    /// Run a read-only plan explanation for `query`.
    fn explain(&self, query: &str) -> Result<Vec<PlanRow>, DbError>;

    /// Execute `query`, consume the full result set, and report the
    /// wall-clock elapsed time.
    fn execute(&self, query: &str) -> Result<QueryOutcome, DbError>;

    /// Execute a DDL statement, classifying the duplicate-object condition
    /// as `DdlOutcome::AlreadyExists`.
    fn execute_ddl(&self, ddl: &str) -> Result<DdlOutcome, DbError>;

    /// List indexes whose names start with `prefix`.
    fn list_managed_indexes(&self, prefix: &str) -> Result<Vec<IndexInfo>, DbError>;

    /// Drop one index previously returned by `list_managed_indexes`.
    fn drop_index(&self, index: &IndexInfo) -> Result<(), DbError>;
}
