use crate::config::TunerConfig;
use crate::db::Database;
use crate::tuner::applicator::{ActionApplicator, SchemaChangeLog};
use crate::tuner::catalog::{ActionCatalog, CandidateRules};
use crate::tuner::plan::{self, normalize_sql};
use crate::tuner::probe::ExecutionProbe;
use std::sync::Arc;

/// The logical state of the tuning chain. A single query in a single
/// context yields exactly one non-terminal state; a multi-query
/// generalization would key this by a query fingerprint instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    SlowQuery,
}

/// What one environment step produced. `done` is unconditionally true:
/// an episode is exactly one action application.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    pub reward: f64,
    pub done: bool,
    pub latency_before: f64,
    pub latency_after: f64,
}

/// Single-state decision process around one target query.
///
/// Construction normalizes the query, inspects its plan once, and builds the
/// action catalog once; the catalog is fixed for the environment's lifetime.
/// `step` measures, applies the chosen action, measures again, and rewards
/// the latency delta. Database failures never surface as errors here — they
/// are absorbed into the penalty-latency and no-op conventions below.
pub struct Environment {
    db: Arc<dyn Database>,
    query: String,
    catalog: ActionCatalog,
    probe: ExecutionProbe,
    applicator: ActionApplicator,
}

impl Environment {
    pub fn new(
        db: Arc<dyn Database>,
        query: &str,
        rules: &CandidateRules,
        config: &TunerConfig,
    ) -> Self {
        let query = normalize_sql(query);
        let plan_rows = plan::inspect(db.as_ref(), &query);
        let catalog = ActionCatalog::build(&plan_rows, rules, config.max_actions);
        for (i, action) in catalog.actions().iter().enumerate() {
            tracing::info!(index = i, action = %action, "candidate action");
        }
        Self {
            db,
            query,
            catalog,
            probe: ExecutionProbe::new(config.penalty_latency_secs),
            applicator: ActionApplicator::new(),
        }
    }

    /// Reset has no side effects on the catalog or the schema.
    pub fn reset(&self) -> QueryState {
        QueryState::SlowQuery
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn change_log(&self) -> &SchemaChangeLog {
        self.applicator.change_log()
    }

    /// One reference measurement, used for the pre-training baseline.
    pub fn measure_runtime(&self) -> f64 {
        self.probe.measure(self.db.as_ref(), &self.query)
    }

    pub fn step(&mut self, action_index: usize) -> StepOutcome {
        let latency_before = self.measure_runtime();

        match self.catalog.get(action_index).cloned() {
            Some(action) => {
                tracing::info!(index = action_index, action = %action, "applying action");
                self.applicator.apply(self.db.as_ref(), &action);
            }
            None => {
                tracing::warn!(
                    index = action_index,
                    catalog_len = self.catalog.len(),
                    "action index out of range, treating as no-op"
                );
            }
        }

        let latency_after = self.measure_runtime();
        StepOutcome {
            reward: latency_before - latency_after,
            done: true,
            latency_before,
            latency_after,
        }
    }
}
