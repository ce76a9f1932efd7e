//! Safety scoring for launchd files.

pub mod safety;
pub mod weights;

pub use safety::{score, SafetyInputs};
pub use weights::{paranoid_weights, ScoreWeights, MAX_SCORE};
