use crate::db::Database;
use crate::tuner::plan::query_fragment;

/// Measures the wall-clock latency of one query execution.
///
/// A failed execution never aborts a training run: it is reported as the
/// configured penalty latency instead, so the reward stays a well-defined
/// real number.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionProbe {
    penalty_latency_secs: f64,
}

impl ExecutionProbe {
    pub fn new(penalty_latency_secs: f64) -> Self {
        Self {
            penalty_latency_secs,
        }
    }

    /// Execute `query`, consuming the full result set, and return the
    /// elapsed time in seconds. Returns the penalty latency on any failure.
    pub fn measure(&self, db: &dyn Database, query: &str) -> f64 {
        match db.execute(query) {
            Ok(outcome) => {
                tracing::debug!(
                    rows = outcome.rows,
                    elapsed_secs = outcome.elapsed.as_secs_f64(),
                    "query probe completed"
                );
                outcome.elapsed.as_secs_f64()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    query = query_fragment(query),
                    penalty_secs = self.penalty_latency_secs,
                    "query execution failed, charging penalty latency"
                );
                self.penalty_latency_secs
            }
        }
    }
}
