pub mod decision;

pub use decision::{make_decision, DecisionError, DecisionRules};
