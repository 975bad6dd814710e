pub mod action;
pub mod agent;
pub mod applicator;
pub mod catalog;
pub mod env;
pub mod plan;
pub mod probe;
pub mod trainer;

pub use action::Action;
pub use agent::QLearningAgent;
pub use catalog::{ActionCatalog, CandidateRules};
pub use env::{Environment, QueryState, StepOutcome};
pub use trainer::{train_on_query, EpisodeRecord, Optimizer, TrainingSummary};
