use std::fmt;

/// One candidate schema change the tuner may apply to a query.
///
/// A closed variant rather than a free-form record: every action either
/// creates a specific index, acknowledges one the planner already uses, or
/// does nothing. `NoOp` and `UseExisting` never touch the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    NoOp,
    CreateIndex { table: String, columns: Vec<String> },
    UseExisting { index_name: String },
}

impl Action {
    pub fn create_index(table: impl Into<String>, columns: &[&str]) -> Self {
        Action::CreateIndex {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// True for actions that by construction issue no DDL.
    pub fn is_noop(&self) -> bool {
        !matches!(self, Action::CreateIndex { .. })
    }

    /// Deterministic index name, so repeated application of the same action
    /// is idempotent at the name level: `idx_<table>_<col>_<col>`.
    pub fn index_name(&self) -> Option<String> {
        match self {
            Action::CreateIndex { table, columns } => {
                Some(format!("idx_{}_{}", table, columns.join("_")))
            }
            _ => None,
        }
    }

    /// The DDL this action implies, if any.
    pub fn ddl(&self) -> Option<String> {
        match self {
            Action::CreateIndex { table, columns } => Some(format!(
                "CREATE INDEX {} ON {}({})",
                self.index_name()?,
                table,
                columns.join(", ")
            )),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::NoOp => write!(f, "do nothing (no new index)"),
            Action::CreateIndex { table, columns } => {
                write!(f, "create index on {}({})", table, columns.join(", "))
            }
            Action::UseExisting { index_name } => {
                write!(f, "use existing index {index_name} (already in place)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_name_is_deterministic() {
        let a = Action::create_index("users", &["city", "age"]);
        let b = Action::create_index("users", &["city", "age"]);
        assert_eq!(a.index_name(), b.index_name());
        assert_eq!(a.index_name().as_deref(), Some("idx_users_city_age"));
    }

    #[test]
    fn ddl_only_for_create_index() {
        assert_eq!(Action::NoOp.ddl(), None);
        assert_eq!(
            Action::UseExisting {
                index_name: "idx_x".into()
            }
            .ddl(),
            None
        );
        assert_eq!(
            Action::create_index("users", &["city"]).ddl().as_deref(),
            Some("CREATE INDEX idx_users_city ON users(city)")
        );
    }

    #[test]
    fn noop_classification() {
        assert!(Action::NoOp.is_noop());
        assert!(Action::UseExisting {
            index_name: "idx_x".into()
        }
        .is_noop());
        assert!(!Action::create_index("users", &["city"]).is_noop());
    }

    #[test]
    fn descriptions_name_the_change() {
        assert_eq!(
            Action::create_index("orders", &["user_id", "status"]).description(),
            "create index on orders(user_id, status)"
        );
        assert!(Action::NoOp.description().contains("do nothing"));
    }
}
