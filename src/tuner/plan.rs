use crate::db::{Database, PlanRow};

/// Repair artifacts that statement-digest text leaves in aggregate calls:
/// `COUNT ( ... )` becomes `COUNT(...)`, in either case.
pub fn normalize_sql(sql: &str) -> String {
    let mut out = sql.trim().to_string();
    for func in ["COUNT", "SUM", "AVG", "MIN", "MAX"] {
        out = out.replace(&format!("{func} ("), &format!("{func}("));
        let lower = func.to_lowercase();
        out = out.replace(&format!("{lower} ("), &format!("{lower}("));
    }
    out
}

/// Run a read-only plan explanation for `query`.
///
/// Fails soft: any backend error is logged and produces an empty plan, which
/// callers must treat as a valid, common input (the catalog builder falls
/// back to its static candidate list).
pub fn inspect(db: &dyn Database, query: &str) -> Vec<PlanRow> {
    match db.explain(query) {
        Ok(rows) => {
            tracing::debug!(rows = rows.len(), "plan explanation returned");
            rows
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                query = query_fragment(query),
                "plan explanation failed, continuing without a plan"
            );
            Vec::new()
        }
    }
}

/// Plan-derived features of a query, summarized from its first plan row.
/// This is the input shape the optional slow-query oracle consumes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PlanFeatures {
    pub access_key: Option<String>,
    pub estimated_rows: u64,
}

impl PlanFeatures {
    pub fn from_plan(rows: &[PlanRow]) -> Option<Self> {
        rows.first().map(|r| Self {
            access_key: r.access_key.clone(),
            estimated_rows: r.estimated_rows,
        })
    }
}

pub(crate) fn query_fragment(query: &str) -> &str {
    match query.char_indices().nth(120) {
        Some((idx, _)) => &query[..idx],
        None => query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SimulatedDatabase;

    #[test]
    fn normalize_repairs_digest_spacing() {
        assert_eq!(
            normalize_sql("SELECT COUNT ( * ) FROM users"),
            "SELECT COUNT( * ) FROM users"
        );
        assert_eq!(
            normalize_sql("select avg ( duration ) from sessions"),
            "select avg( duration ) from sessions"
        );
    }

    #[test]
    fn normalize_trims_whitespace() {
        assert_eq!(normalize_sql("  SELECT 1  \n"), "SELECT 1");
    }

    #[test]
    fn inspect_degrades_to_empty_on_error() {
        let db = SimulatedDatabase::new().failing_explain();
        assert!(inspect(&db, "SELECT 1").is_empty());
    }

    #[test]
    fn inspect_passes_plan_through() {
        let db = SimulatedDatabase::new().with_plan(vec![PlanRow {
            table: "users".into(),
            access_key: None,
            estimated_rows: 42,
        }]);
        let rows = inspect(&db, "SELECT * FROM users");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].estimated_rows, 42);
    }

    #[test]
    fn features_come_from_first_row() {
        let rows = vec![
            PlanRow {
                table: "users".into(),
                access_key: Some("idx_users_city".into()),
                estimated_rows: 10,
            },
            PlanRow {
                table: "orders".into(),
                access_key: None,
                estimated_rows: 9000,
            },
        ];
        let features = PlanFeatures::from_plan(&rows).unwrap();
        assert_eq!(features.access_key.as_deref(), Some("idx_users_city"));
        assert_eq!(features.estimated_rows, 10);
        assert!(PlanFeatures::from_plan(&[]).is_none());
    }
}
