//! End-to-end training runs: once against the scripted in-memory backend,
//! once against a real SQLite file with a real schema.

use indexpilot::config::TunerConfig;
use indexpilot::db::{Database, PlanRow, SimulatedDatabase, SqliteBackend};
use indexpilot::tuner::env::QueryState;
use indexpilot::tuner::{Optimizer, QLearningAgent};
use std::sync::Arc;
use tempfile::TempDir;

fn users_plan() -> Vec<PlanRow> {
    vec![PlanRow {
        table: "users".into(),
        access_key: None,
        estimated_rows: 2550,
    }]
}

#[test]
fn simulated_four_episode_scenario() {
    let db = Arc::new(
        SimulatedDatabase::new()
            .with_plan(users_plan())
            .with_latencies(1.0, 0.4),
    );
    let optimizer = Optimizer::new(db.clone(), TunerConfig::default());

    let mut agent = QLearningAgent::with_seed(0.5, 0.9, 0.3, 42);
    let summary =
        optimizer.optimize_with_agent(&mut agent, "SELECT * FROM users WHERE city = 'X'", 4);

    // Plan shows `users` with no key: NoOp + the three users candidates.
    assert_eq!(summary.episodes.len(), 4);
    let env = optimizer.environment("SELECT * FROM users WHERE city = 'X'");
    assert_eq!(env.catalog().len(), 4);

    // Best action is the one from the max-reward episode.
    let best_ep = summary
        .episodes
        .iter()
        .max_by(|a, b| a.reward.total_cmp(&b.reward))
        .unwrap();
    assert_eq!(summary.best_action, best_ep.action);

    // aggregate_gain = initial - mean(latency_after).
    let mean_after = summary.episodes.iter().map(|e| e.latency_after).sum::<f64>() / 4.0;
    assert!((summary.aggregate_gain - (summary.initial_latency - mean_after)).abs() < 1e-9);
}

#[test]
fn sqlite_training_creates_a_durable_index() {
    let tmp = TempDir::new().unwrap();
    let backend = SqliteBackend::new(tmp.path().join("shop.db"));
    backend
        .execute_ddl(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, city TEXT, age INTEGER);
             INSERT INTO users (city, age) VALUES
                ('lyon', 30), ('paris', 41), ('lyon', 25), ('nice', 58), ('paris', 19);",
        )
        .unwrap();

    let db: Arc<dyn Database> = Arc::new(SqliteBackend::new(tmp.path().join("shop.db")));
    let optimizer = Optimizer::new(db.clone(), TunerConfig::default());

    // Steer a greedy agent toward the composite-index action so the run is
    // deterministic: catalog order is NoOp, (city), (age), (city, age).
    let mut agent = QLearningAgent::with_seed(0.5, 0.9, 0.0, 7);
    agent.update(QueryState::SlowQuery, 3, 1.0, QueryState::SlowQuery, 4);

    let summary =
        optimizer.optimize_with_agent(&mut agent, "SELECT * FROM users WHERE city = 'lyon'", 4);

    assert_eq!(summary.episodes.len(), 4);
    assert!(summary.episodes.iter().all(|e| e.latency_before >= 0.0));
    assert!(summary.episodes.iter().all(|e| e.latency_after >= 0.0));

    // The index survived the run; re-creating it is reported as duplicate.
    let indexes = db.list_managed_indexes("idx_").unwrap();
    assert!(indexes.iter().any(|i| i.name == "idx_users_city_age"));
    assert_eq!(
        db.execute_ddl("CREATE INDEX idx_users_city_age ON users(city, age)")
            .unwrap(),
        indexpilot::db::DdlOutcome::AlreadyExists
    );

    // Later plans now route through the created index.
    let plan = db
        .explain("SELECT * FROM users WHERE city = 'lyon'")
        .unwrap();
    assert_eq!(plan[0].access_key.as_deref(), Some("idx_users_city_age"));
}

#[test]
fn one_agent_tolerates_catalogs_of_different_sizes() {
    let planned = Arc::new(
        SimulatedDatabase::new()
            .with_plan(users_plan())
            .with_latencies(0.5, 0.5),
    );
    // Explain fails here, so the catalog falls back to the static list.
    let unplanned = Arc::new(SimulatedDatabase::new().failing_explain());

    let config = TunerConfig::default();
    let mut agent = QLearningAgent::with_seed(0.5, 0.9, 1.0, 11);

    let small = Optimizer::new(planned, config.clone())
        .optimize_with_agent(&mut agent, "SELECT * FROM users WHERE city = 'X'", 3);
    let large = Optimizer::new(unplanned, config)
        .optimize_with_agent(&mut agent, "SELECT * FROM users WHERE city = 'X'", 3);

    assert_eq!(small.episodes.len(), 3);
    assert_eq!(large.episodes.len(), 3);
    // Fallback catalog: NoOp + ten static candidates.
    assert!(large.episodes.iter().all(|e| e.action < 11));
}
