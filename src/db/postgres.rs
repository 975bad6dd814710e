use crate::db::{Database, DbError, DdlOutcome, IndexInfo, PlanRow, QueryOutcome};
use postgres::error::SqlState;
use postgres::{Client, NoTls};
use std::time::Instant;

/// Live PostgreSQL backend over the synchronous `postgres` client.
///
/// Each call connects, performs one unit of work, and drops the connection.
pub struct PostgresBackend {
    url: String,
}

impl PostgresBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn connect(&self) -> Result<Client, DbError> {
        Ok(Client::connect(&self.url, NoTls)?)
    }
}

impl Database for PostgresBackend {
    fn explain(&self, query: &str) -> Result<Vec<PlanRow>, DbError> {
        let mut client = self.connect()?;
        let rows = client.query(&format!("EXPLAIN (FORMAT JSON) {query}"), &[])?;

        let mut plan_rows = Vec::new();
        for row in rows {
            let doc: serde_json::Value = row.get(0);
            // EXPLAIN (FORMAT JSON) yields [{"Plan": {...}}]
            if let Some(plans) = doc.as_array() {
                for entry in plans {
                    if let Some(root) = entry.get("Plan") {
                        collect_plan_nodes(root, &mut plan_rows);
                    }
                }
            }
        }
        Ok(plan_rows)
    }

    fn execute(&self, query: &str) -> Result<QueryOutcome, DbError> {
        let mut client = self.connect()?;
        let start = Instant::now();
        let rows = client.query(query, &[])?;
        let elapsed = start.elapsed();
        Ok(QueryOutcome {
            rows: rows.len() as u64,
            elapsed,
        })
    }

    fn execute_ddl(&self, ddl: &str) -> Result<DdlOutcome, DbError> {
        let mut client = self.connect()?;
        match client.batch_execute(ddl) {
            Ok(()) => Ok(DdlOutcome::Applied),
            Err(e) if is_duplicate(&e) => Ok(DdlOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    fn list_managed_indexes(&self, prefix: &str) -> Result<Vec<IndexInfo>, DbError> {
        let mut client = self.connect()?;
        let pattern = format!("{prefix}%");
        let rows = client.query(
            "SELECT indexname, tablename FROM pg_indexes
             WHERE schemaname = 'public' AND indexname LIKE $1
             ORDER BY indexname",
            &[&pattern],
        )?;
        Ok(rows
            .iter()
            .map(|r| IndexInfo {
                name: r.get(0),
                table: r.get(1),
            })
            .collect())
    }

    fn drop_index(&self, index: &IndexInfo) -> Result<(), DbError> {
        let mut client = self.connect()?;
        client.batch_execute(&format!("DROP INDEX IF EXISTS \"{}\"", index.name))?;
        Ok(())
    }
}

/// Depth-first walk of an EXPLAIN (FORMAT JSON) plan tree, collecting one
/// `PlanRow` per node that touches a relation.
fn collect_plan_nodes(node: &serde_json::Value, out: &mut Vec<PlanRow>) {
    if let Some(table) = node.get("Relation Name").and_then(|v| v.as_str()) {
        out.push(PlanRow {
            table: table.to_string(),
            access_key: node
                .get("Index Name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            estimated_rows: node
                .get("Plan Rows")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        });
    }
    if let Some(children) = node.get("Plans").and_then(|v| v.as_array()) {
        for child in children {
            collect_plan_nodes(child, out);
        }
    }
}

fn is_duplicate(e: &postgres::Error) -> bool {
    matches!(
        e.code(),
        Some(&SqlState::DUPLICATE_TABLE) | Some(&SqlState::DUPLICATE_OBJECT)
    )
}
