pub mod constant_scorer;
pub mod scorer;
pub mod smartcore_scorer;

pub use constant_scorer::ConstantScorer;
pub use scorer::Scorer;
pub use smartcore_scorer::SmartCoreScorer;
