use crate::config::TunerConfig;
use crate::db::Database;
use crate::oracle::SlowQueryOracle;
use crate::tuner::agent::QLearningAgent;
use crate::tuner::catalog::CandidateRules;
use crate::tuner::env::Environment;
use crate::tuner::plan::{self, PlanFeatures};
use std::sync::Arc;

/// One select-action / apply / measure / update cycle.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EpisodeRecord {
    pub episode: usize,
    pub action: usize,
    pub latency_before: f64,
    pub latency_after: f64,
    pub reward: f64,
}

/// Result of one training run against one query.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingSummary {
    pub query: String,
    pub initial_latency: f64,
    pub mean_latency_after: f64,
    pub aggregate_gain: f64,
    pub best_action: usize,
    pub best_description: String,
    pub episodes: Vec<EpisodeRecord>,
    /// Model-estimated slow probability before/after training, when an
    /// oracle is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_probability_before: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_probability_after: Option<f64>,
}

/// Drive `episodes` trials of one environment/agent pair and summarize.
///
/// The baseline latency is measured once before any action. Each episode is
/// single-step, so the agent is updated with the same state as current and
/// next. Zero episodes yield the degenerate no-op summary rather than an
/// error.
pub fn train_on_query(
    env: &mut Environment,
    agent: &mut QLearningAgent,
    episodes: usize,
) -> TrainingSummary {
    let n_actions = env.catalog().len();
    let mut state = env.reset();

    let initial_latency = env.measure_runtime();
    tracing::info!(
        initial_latency_secs = initial_latency,
        episodes,
        n_actions,
        "starting training run"
    );

    let mut records: Vec<EpisodeRecord> = Vec::with_capacity(episodes);

    for episode in 1..=episodes {
        let action = agent.choose_action(state, n_actions);
        let outcome = env.step(action);
        agent.update(state, action, outcome.reward, state, n_actions);

        tracing::info!(
            episode,
            action,
            latency_before_secs = outcome.latency_before,
            latency_after_secs = outcome.latency_after,
            reward = outcome.reward,
            "episode finished"
        );

        records.push(EpisodeRecord {
            episode,
            action,
            latency_before: outcome.latency_before,
            latency_after: outcome.latency_after,
            reward: outcome.reward,
        });

        if outcome.done {
            state = env.reset();
        }
    }

    summarize(env, initial_latency, records)
}

fn summarize(
    env: &Environment,
    initial_latency: f64,
    episodes: Vec<EpisodeRecord>,
) -> TrainingSummary {
    let describe = |index: usize| {
        env.catalog()
            .get(index)
            .map(|a| a.description())
            .unwrap_or_else(|| format!("action {index}"))
    };

    if episodes.is_empty() {
        return TrainingSummary {
            query: env.query().to_string(),
            initial_latency,
            mean_latency_after: initial_latency,
            aggregate_gain: 0.0,
            best_action: 0,
            best_description: describe(0),
            episodes,
            slow_probability_before: None,
            slow_probability_after: None,
        };
    }

    let best_action = episodes
        .iter()
        .max_by(|a, b| a.reward.total_cmp(&b.reward))
        .map(|e| e.action)
        .unwrap_or(0);

    let mean_latency_after =
        episodes.iter().map(|e| e.latency_after).sum::<f64>() / episodes.len() as f64;
    let aggregate_gain = initial_latency - mean_latency_after;

    tracing::info!(
        mean_latency_after_secs = mean_latency_after,
        aggregate_gain_secs = aggregate_gain,
        best_action,
        "training run finished"
    );

    TrainingSummary {
        query: env.query().to_string(),
        initial_latency,
        mean_latency_after,
        aggregate_gain,
        best_action,
        best_description: describe(best_action),
        episodes,
        slow_probability_before: None,
        slow_probability_after: None,
    }
}

/// The one inbound operation the surrounding CLI or router calls.
///
/// Owns the database handle, the candidate rules, and the tuning
/// hyperparameters; builds a fresh environment per query. By default each
/// query also gets a fresh agent, which sidesteps the cross-query
/// action-index aliasing documented on `QLearningAgent`.
pub struct Optimizer {
    db: Arc<dyn Database>,
    rules: CandidateRules,
    config: TunerConfig,
    oracle: Option<Arc<dyn SlowQueryOracle>>,
}

impl Optimizer {
    pub fn new(db: Arc<dyn Database>, config: TunerConfig) -> Self {
        Self {
            db,
            rules: CandidateRules::ecommerce(),
            config,
            oracle: None,
        }
    }

    pub fn with_rules(mut self, rules: CandidateRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn SlowQueryOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn environment(&self, query: &str) -> Environment {
        Environment::new(self.db.clone(), query, &self.rules, &self.config)
    }

    pub fn optimize(&self, query: &str, episodes: usize) -> TrainingSummary {
        let mut agent = QLearningAgent::new(
            self.config.alpha,
            self.config.gamma,
            self.config.epsilon,
        );
        self.optimize_with_agent(&mut agent, query, episodes)
    }

    /// Variant for callers that deliberately reuse one agent across queries.
    pub fn optimize_with_agent(
        &self,
        agent: &mut QLearningAgent,
        query: &str,
        episodes: usize,
    ) -> TrainingSummary {
        let slow_before = self.predict_slow(query);
        let mut env = self.environment(query);
        let mut summary = train_on_query(&mut env, agent, episodes);
        summary.slow_probability_before = slow_before;
        summary.slow_probability_after = self.predict_slow(query);
        summary
    }

    fn predict_slow(&self, query: &str) -> Option<f64> {
        let oracle = self.oracle.as_ref()?;
        let rows = plan::inspect(self.db.as_ref(), query);
        let features = PlanFeatures::from_plan(&rows)?;
        Some(oracle.predict_slow(&features))
    }
}
