use crate::db::{Database, DbError, DdlOutcome};
use crate::tuner::action::Action;
use chrono::{DateTime, Utc};

/// Outcome of applying one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// A new index was created.
    Created,
    /// The index was already present; success-equivalent.
    AlreadyExists,
    /// The action issues no DDL by construction.
    NoOp,
    /// DDL failed for another reason; the schema is unchanged and the
    /// subsequent latency measurement reflects that.
    Failed,
}

/// One durable schema change attempted during a training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AppliedChange {
    pub index_name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub outcome: ApplyOutcome,
    pub at: DateTime<Utc>,
}

/// Chronological record of every DDL-issuing apply in one environment's
/// lifetime. Index creations are cumulative and never rolled back, so the
/// log is what a run leaves behind in the schema.
#[derive(Debug, Default)]
pub struct SchemaChangeLog {
    entries: Vec<AppliedChange>,
}

impl SchemaChangeLog {
    pub fn entries(&self) -> &[AppliedChange] {
        &self.entries
    }

    fn record(&mut self, change: AppliedChange) {
        self.entries.push(change);
    }
}

/// Translates chosen actions into DDL against the live database.
///
/// `NoOp` and `UseExisting` are pure no-ops. Index creation tolerates the
/// duplicate case and logs (never propagates) other DDL failures.
pub struct ActionApplicator {
    log: SchemaChangeLog,
}

impl ActionApplicator {
    pub fn new() -> Self {
        Self {
            log: SchemaChangeLog::default(),
        }
    }

    pub fn change_log(&self) -> &SchemaChangeLog {
        &self.log
    }

    pub fn apply(&mut self, db: &dyn Database, action: &Action) -> ApplyOutcome {
        let Action::CreateIndex { table, columns } = action else {
            tracing::debug!(action = %action, "no-op action, nothing to apply");
            return ApplyOutcome::NoOp;
        };

        // index_name/ddl are always Some for CreateIndex.
        let index_name = action.index_name().unwrap_or_default();
        let ddl = action.ddl().unwrap_or_default();

        let outcome = match db.execute_ddl(&ddl) {
            Ok(DdlOutcome::Applied) => {
                tracing::info!(index = %index_name, table = %table, "index created");
                ApplyOutcome::Created
            }
            Ok(DdlOutcome::AlreadyExists) => {
                tracing::info!(index = %index_name, "index already exists, skipping");
                ApplyOutcome::AlreadyExists
            }
            Err(e) => {
                log_ddl_failure(&index_name, &e);
                ApplyOutcome::Failed
            }
        };

        self.log.record(AppliedChange {
            index_name,
            table: table.clone(),
            columns: columns.clone(),
            outcome,
            at: Utc::now(),
        });
        outcome
    }
}

impl Default for ActionApplicator {
    fn default() -> Self {
        Self::new()
    }
}

fn log_ddl_failure(index_name: &str, e: &DbError) {
    tracing::warn!(index = %index_name, error = %e, "index creation failed, treating as no-op");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SimulatedDatabase;

    #[test]
    fn noop_actions_issue_no_ddl() {
        let db = SimulatedDatabase::new();
        let mut applicator = ActionApplicator::new();

        assert_eq!(applicator.apply(&db, &Action::NoOp), ApplyOutcome::NoOp);
        assert_eq!(
            applicator.apply(
                &db,
                &Action::UseExisting {
                    index_name: "idx_users_city".into()
                }
            ),
            ApplyOutcome::NoOp
        );
        assert!(db.issued_ddl().is_empty());
        assert!(applicator.change_log().entries().is_empty());
    }

    #[test]
    fn second_apply_of_same_index_is_already_exists() {
        let db = SimulatedDatabase::new();
        let mut applicator = ActionApplicator::new();
        let action = Action::create_index("users", &["city"]);

        assert_eq!(applicator.apply(&db, &action), ApplyOutcome::Created);
        assert_eq!(applicator.apply(&db, &action), ApplyOutcome::AlreadyExists);

        let entries = applicator.change_log().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].outcome, ApplyOutcome::Created);
        assert_eq!(entries[1].outcome, ApplyOutcome::AlreadyExists);
        assert_eq!(entries[0].index_name, "idx_users_city");
    }

    #[test]
    fn ddl_failure_degrades_to_failed_outcome() {
        let db = SimulatedDatabase::new().failing_ddl();
        let mut applicator = ActionApplicator::new();
        let action = Action::create_index("users", &["city"]);
        assert_eq!(applicator.apply(&db, &action), ApplyOutcome::Failed);
        assert_eq!(applicator.change_log().entries().len(), 1);
        assert_eq!(applicator.change_log().entries()[0].outcome, ApplyOutcome::Failed);
    }
}
