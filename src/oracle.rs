use crate::tuner::plan::PlanFeatures;

/// Optional collaborator: a model that estimates the probability that a
/// query is slow from its plan features. The tuning loop never requires
/// one; when attached, its estimate is reported alongside measured latency.
pub trait SlowQueryOracle: Send + Sync {
    fn predict_slow(&self, features: &PlanFeatures) -> f64;
}

/// Trivial threshold oracle: a plan step scanning more rows than the
/// threshold without an index is called slow. Good enough for wiring and
/// tests; a trained classifier plugs in through the same trait.
pub struct RowCountOracle {
    pub row_threshold: u64,
}

impl SlowQueryOracle for RowCountOracle {
    fn predict_slow(&self, features: &PlanFeatures) -> f64 {
        match (&features.access_key, features.estimated_rows) {
            (Some(_), _) => 0.1,
            (None, rows) if rows >= self.row_threshold => 0.9,
            (None, _) => 0.4,
        }
    }
}
