use crate::tuner::env::QueryState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Tabular Q-learning policy with epsilon-greedy action selection.
///
/// Values are keyed by `(state, action_index)` with a default of 0.0 for
/// unseen pairs, so the same agent tolerates catalogs of different sizes —
/// `n_actions` is supplied per call. Note the aliasing hazard that comes
/// with that: index 2 of one query's catalog and index 2 of another's are
/// the same table cell even when they name different schema changes. Scope
/// one agent per query unless the catalogs are known to line up.
pub struct QLearningAgent {
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    q: HashMap<(QueryState, usize), f64>,
    rng: StdRng,
}

impl QLearningAgent {
    pub fn new(alpha: f64, gamma: f64, epsilon: f64) -> Self {
        Self::with_rng(alpha, gamma, epsilon, StdRng::from_os_rng())
    }

    /// Deterministic construction for reproducible runs and tests.
    pub fn with_seed(alpha: f64, gamma: f64, epsilon: f64, seed: u64) -> Self {
        Self::with_rng(alpha, gamma, epsilon, StdRng::seed_from_u64(seed))
    }

    fn with_rng(alpha: f64, gamma: f64, epsilon: f64, rng: StdRng) -> Self {
        Self {
            alpha,
            gamma,
            epsilon,
            q: HashMap::new(),
            rng,
        }
    }

    pub fn q_value(&self, state: QueryState, action: usize) -> f64 {
        self.q.get(&(state, action)).copied().unwrap_or(0.0)
    }

    /// Epsilon-greedy selection over `[0, n_actions)`.
    ///
    /// Exploration draws a uniform index; exploitation is argmax over the
    /// known (default-zero) values, breaking ties toward the lowest index.
    /// Pure computation — never blocks on I/O.
    pub fn choose_action(&mut self, state: QueryState, n_actions: usize) -> usize {
        if n_actions <= 1 {
            return 0;
        }

        if self.epsilon > 0.0 && self.rng.random::<f64>() < self.epsilon {
            return self.rng.random_range(0..n_actions);
        }

        let mut best = 0;
        let mut best_q = self.q_value(state, 0);
        for action in 1..n_actions {
            let q = self.q_value(state, action);
            if q > best_q {
                best_q = q;
                best = action;
            }
        }
        best
    }

    /// Standard Q-learning update:
    /// `Q(s,a) += alpha * (reward + gamma * max_a' Q(s',a') - Q(s,a))`.
    ///
    /// With single-step episodes and `next_state == state` the future term
    /// degenerates to `gamma * max_a Q(s,a)`; callers wanting a pure bandit
    /// update set `gamma = 0`.
    pub fn update(
        &mut self,
        state: QueryState,
        action: usize,
        reward: f64,
        next_state: QueryState,
        n_actions: usize,
    ) {
        let max_next = (0..n_actions)
            .map(|a| self.q_value(next_state, a))
            .fold(f64::NEG_INFINITY, f64::max);
        let max_next = if max_next.is_finite() { max_next } else { 0.0 };
        let old = self.q_value(state, action);
        let new = old + self.alpha * (reward + self.gamma * max_next - old);
        self.q.insert((state, action), new);
    }
}
