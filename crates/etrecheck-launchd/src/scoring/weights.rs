//! Safety score weights and presets.

use serde::{Deserialize, Serialize};

use etrecheck_core::{LaunchdError, Result};

/// Highest possible safety score.
pub const MAX_SCORE: i32 = 100;

/// Tunable weights for the safety score.
///
/// Only the ordering between tiers is a contract; [`ScoreWeights::validate`]
/// enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Apple-signed, living in an Apple directory
    pub apple: i32,
    /// Apple-signed, living anywhere else
    pub apple_elsewhere: i32,
    /// Developer ID signed
    pub developer: i32,
    /// Not signed
    pub unsigned: i32,
    /// Signature unknown or not checked yet
    pub unknown: i32,
    /// Matched as adware, whatever else is true
    pub adware: i32,
    /// Lowest score a non-adware file can reach
    pub floor: i32,
    /// Deducted when the descriptor cannot be read
    pub descriptor_penalty: i32,
    /// Deducted when the executable cannot be read
    pub executable_penalty: i32,
    /// Deducted when other referenced files cannot be read
    pub other_files_penalty: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            apple: MAX_SCORE,
            apple_elsewhere: 85,
            developer: 75,
            unsigned: 50,
            unknown: 40,
            adware: 0,
            floor: 1,
            descriptor_penalty: 30,
            executable_penalty: 20,
            other_files_penalty: 10,
        }
    }
}

impl ScoreWeights {
    /// Score of an otherwise unknown file whose descriptor is unreadable
    #[must_use]
    pub const fn inaccessible_baseline(&self) -> i32 {
        self.unknown - self.descriptor_penalty
    }

    /// Check that the tiers keep their required ordering.
    pub fn validate(&self) -> Result<()> {
        let ordered = MAX_SCORE >= self.apple
            && self.apple >= self.apple_elsewhere
            && self.apple_elsewhere >= self.developer
            && self.apple > self.developer
            && self.developer > self.unsigned
            && self.unsigned >= self.unknown
            && self.floor > self.adware
            && self.adware >= 0;
        if !ordered {
            return Err(LaunchdError::Config(format!(
                "score tiers out of order: apple {} >= apple_elsewhere {} >= developer {} > \
                 unsigned {} >= unknown {} with apple above developer, floor {} > adware {} >= 0",
                self.apple,
                self.apple_elsewhere,
                self.developer,
                self.unsigned,
                self.unknown,
                self.floor,
                self.adware
            )));
        }

        let penalties = [
            self.descriptor_penalty,
            self.executable_penalty,
            self.other_files_penalty,
        ];
        if penalties.iter().any(|p| *p < 0) {
            return Err(LaunchdError::Config("score penalties must not be negative".into()));
        }
        if self.inaccessible_baseline() < self.floor {
            return Err(LaunchdError::Config(format!(
                "descriptor penalty {} pushes unknown files below the floor {}",
                self.descriptor_penalty, self.floor
            )));
        }
        Ok(())
    }
}

/// Paranoid weights: anything that cannot be verified is punished harder.
#[must_use]
pub const fn paranoid_weights() -> ScoreWeights {
    ScoreWeights {
        apple: MAX_SCORE,
        apple_elsewhere: 70,
        developer: 60,
        unsigned: 35,
        unknown: 35,
        adware: 0,
        floor: 1,
        descriptor_penalty: 30,
        executable_penalty: 30,
        other_files_penalty: 15,
    }
}
