//! Safety scoring for launchd files.

use serde::Serialize;

use etrecheck_core::{LaunchdContext, Signature};

use super::weights::{ScoreWeights, MAX_SCORE};

/// Everything the safety score depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetyInputs {
    /// Where the descriptor lives
    pub context: LaunchdContext,
    /// Executable signature
    pub signature: Signature,
    /// Matched by an adware signature
    pub adware: bool,
    /// Descriptor readable
    pub descriptor_accessible: bool,
    /// Executable readable (only meaningful once the signature is checked)
    pub executable_accessible: bool,
    /// Other referenced files readable (same caveat)
    pub other_files_accessible: bool,
}

/// Compute the safety score: higher is safer.
///
/// Adware wins over everything: an adware match scores exactly
/// `weights.adware`, below every non-adware outcome. Otherwise the
/// signature tier sets the base and each unreadable file deducts its
/// penalty, never going below `weights.floor`. Executable and other-file
/// penalties only apply once the signature has been checked.
#[must_use]
pub fn score(inputs: &SafetyInputs, weights: &ScoreWeights) -> i32 {
    if inputs.adware || inputs.signature == Signature::Adware {
        return weights.adware;
    }

    let base = match inputs.signature {
        Signature::Apple if inputs.context == LaunchdContext::Apple => weights.apple,
        Signature::Apple => weights.apple_elsewhere,
        Signature::Developer => weights.developer,
        Signature::Unsigned => weights.unsigned,
        Signature::Unknown | Signature::NotChecked | Signature::Adware => weights.unknown,
    };

    let mut penalty = 0;
    if !inputs.descriptor_accessible {
        penalty += weights.descriptor_penalty;
    }
    if inputs.signature.is_checked() {
        if !inputs.executable_accessible {
            penalty += weights.executable_penalty;
        }
        if !inputs.other_files_accessible {
            penalty += weights.other_files_penalty;
        }
    }

    (base - penalty).clamp(weights.floor, MAX_SCORE)
}
