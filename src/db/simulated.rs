use crate::db::{Database, DbError, DdlOutcome, IndexInfo, PlanRow, QueryOutcome};
use parking_lot::Mutex;
use std::time::Duration;

/// In-memory scripted backend.
///
/// Replays a fixed plan and scripted latencies instead of talking to a
/// server, while recording every DDL statement it receives. The tuning loop
/// can run end to end against it, which is how most of the test suite
/// exercises schema-changing behavior without a live database.
pub struct SimulatedDatabase {
    plan: Vec<PlanRow>,
    /// Latency reported while no index has been created.
    unindexed_latency: f64,
    /// Latency reported once at least one index exists.
    indexed_latency: f64,
    fail_execution: bool,
    fail_explain: bool,
    fail_ddl: bool,
    state: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    ddl_log: Vec<String>,
    indexes: Vec<IndexInfo>,
}

impl SimulatedDatabase {
    pub fn new() -> Self {
        Self {
            plan: Vec::new(),
            unindexed_latency: 1.0,
            indexed_latency: 1.0,
            fail_execution: false,
            fail_explain: false,
            fail_ddl: false,
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn with_plan(mut self, plan: Vec<PlanRow>) -> Self {
        self.plan = plan;
        self
    }

    /// Script the latency drop an effective index would produce.
    pub fn with_latencies(mut self, unindexed: f64, indexed: f64) -> Self {
        self.unindexed_latency = unindexed;
        self.indexed_latency = indexed;
        self
    }

    /// Make every `execute` call fail, as a broken query would.
    pub fn failing_execution(mut self) -> Self {
        self.fail_execution = true;
        self
    }

    /// Make every `explain` call fail, as a permissions problem would.
    pub fn failing_explain(mut self) -> Self {
        self.fail_explain = true;
        self
    }

    /// Make every DDL statement fail, as a lock timeout would.
    pub fn failing_ddl(mut self) -> Self {
        self.fail_ddl = true;
        self
    }

    /// Every DDL statement received so far, in order.
    pub fn issued_ddl(&self) -> Vec<String> {
        self.state.lock().ddl_log.clone()
    }

    pub fn created_indexes(&self) -> Vec<IndexInfo> {
        self.state.lock().indexes.clone()
    }
}

impl Default for SimulatedDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Database for SimulatedDatabase {
    fn explain(&self, query: &str) -> Result<Vec<PlanRow>, DbError> {
        if self.fail_explain {
            return Err(DbError::Execution(format!(
                "explain rejected: {}",
                truncate(query)
            )));
        }
        Ok(self.plan.clone())
    }

    fn execute(&self, query: &str) -> Result<QueryOutcome, DbError> {
        if self.fail_execution {
            return Err(DbError::Execution(format!(
                "query rejected: {}",
                truncate(query)
            )));
        }
        let latency = if self.state.lock().indexes.is_empty() {
            self.unindexed_latency
        } else {
            self.indexed_latency
        };
        Ok(QueryOutcome {
            rows: 1,
            elapsed: Duration::from_secs_f64(latency),
        })
    }

    fn execute_ddl(&self, ddl: &str) -> Result<DdlOutcome, DbError> {
        let mut state = self.state.lock();
        state.ddl_log.push(ddl.to_string());

        if self.fail_ddl {
            return Err(DbError::Execution("ddl rejected: lock timeout".into()));
        }
        let Some((name, table)) = parse_create_index(ddl) else {
            return Err(DbError::Execution(format!("unsupported ddl: {ddl}")));
        };
        if state.indexes.iter().any(|i| i.name == name) {
            return Ok(DdlOutcome::AlreadyExists);
        }
        state.indexes.push(IndexInfo { name, table });
        Ok(DdlOutcome::Applied)
    }

    fn list_managed_indexes(&self, prefix: &str) -> Result<Vec<IndexInfo>, DbError> {
        Ok(self
            .state
            .lock()
            .indexes
            .iter()
            .filter(|i| i.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn drop_index(&self, index: &IndexInfo) -> Result<(), DbError> {
        self.state.lock().indexes.retain(|i| i.name != index.name);
        Ok(())
    }
}

fn parse_create_index(ddl: &str) -> Option<(String, String)> {
    let mut tokens = ddl.split_whitespace();
    if tokens.next()? != "CREATE" || tokens.next()? != "INDEX" {
        return None;
    }
    let name = tokens.next()?.to_string();
    if tokens.next()? != "ON" {
        return None;
    }
    let table = tokens.next()?.split('(').next()?.to_string();
    Some((name, table))
}

fn truncate(query: &str) -> &str {
    match query.char_indices().nth(80) {
        Some((idx, _)) => &query[..idx],
        None => query,
    }
}
