use crate::db::{Database, DbError, DdlOutcome, IndexInfo, PlanRow, QueryOutcome};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Embedded SQLite backend over a file database.
///
/// Mirrors the server backends: every call opens its own connection and
/// releases it on return, so schema changes made by one call are visible to
/// the next without shared state.
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, DbError> {
        Ok(Connection::open(&self.path)?)
    }
}

impl Database for SqliteBackend {
    fn explain(&self, query: &str) -> Result<Vec<PlanRow>, DbError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {query}"))?;
        // EXPLAIN QUERY PLAN columns: id, parent, notused, detail
        let details = stmt
            .query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(details.iter().filter_map(|d| parse_eqp_detail(d)).collect())
    }

    fn execute(&self, query: &str) -> Result<QueryOutcome, DbError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(query)?;
        let start = Instant::now();
        let mut rows = stmt.query([])?;
        let mut count: u64 = 0;
        while rows.next()?.is_some() {
            count += 1;
        }
        let elapsed = start.elapsed();
        Ok(QueryOutcome {
            rows: count,
            elapsed,
        })
    }

    fn execute_ddl(&self, ddl: &str) -> Result<DdlOutcome, DbError> {
        let conn = self.connect()?;
        match conn.execute_batch(ddl) {
            Ok(()) => Ok(DdlOutcome::Applied),
            // SQLite has no dedicated error code for a duplicate index name;
            // it reports SQLITE_ERROR with an "already exists" message.
            Err(e) if e.to_string().contains("already exists") => Ok(DdlOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    fn list_managed_indexes(&self, prefix: &str) -> Result<Vec<IndexInfo>, DbError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT name, tbl_name FROM sqlite_master
             WHERE type = 'index' AND name LIKE ?1
             ORDER BY name",
        )?;
        let indexes = stmt
            .query_map(rusqlite::params![format!("{prefix}%")], |row| {
                Ok(IndexInfo {
                    name: row.get(0)?,
                    table: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(indexes)
    }

    fn drop_index(&self, index: &IndexInfo) -> Result<(), DbError> {
        let conn = self.connect()?;
        conn.execute_batch(&format!("DROP INDEX IF EXISTS \"{}\"", index.name))?;
        Ok(())
    }
}

/// Parse one EXPLAIN QUERY PLAN detail line into a `PlanRow`.
///
/// Lines look like `SCAN users`, `SEARCH users USING INDEX idx_users_city
/// (city=?)`, or `SCAN users USING COVERING INDEX idx_users_city`; older
/// SQLite versions insert a `TABLE` keyword. Non-scan lines (temp b-trees,
/// subquery markers) carry no table and are skipped.
fn parse_eqp_detail(detail: &str) -> Option<PlanRow> {
    let mut tokens = detail.split_whitespace();
    match tokens.next()? {
        "SCAN" | "SEARCH" => {}
        _ => return None,
    }

    let mut table = tokens.next()?;
    if table == "TABLE" {
        table = tokens.next()?;
    }

    let rest: Vec<&str> = tokens.collect();
    let access_key = rest
        .windows(2)
        .find(|w| w[0] == "INDEX")
        .map(|w| w[1].trim_end_matches('(').to_string());

    Some(PlanRow {
        table: table.to_string(),
        access_key,
        // EXPLAIN QUERY PLAN carries no row estimates.
        estimated_rows: 0,
    })
}
