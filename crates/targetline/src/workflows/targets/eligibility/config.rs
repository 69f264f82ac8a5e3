use serde::{Deserialize, Serialize};

const DEFAULT_QUIZ_PASS_RATIO: f32 = 0.0;

/// Policy dials for the acceptance rules that are a matter of course design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    /// Whether a submission awaiting review blocks a new one. When disabled the new submission
    /// supersedes the pending one.
    pub block_while_under_review: bool,
    /// Fraction of correct answers a quiz attempt needs to be recorded as passed.
    ///
    /// Quizzes are single shot whatever this is set to. An attempt below the ratio leaves the
    /// target Failed, and the quiz rule still denies a new attempt with
    /// `IneligibilityReason::QuizAlreadyAttempted` even though a Failed latest submission
    /// otherwise allows resubmission.
    pub quiz_pass_ratio: f32,
}

impl EligibilityConfig {
    pub fn new(block_while_under_review: bool, quiz_pass_ratio: f32) -> Self {
        let quiz_pass_ratio = if quiz_pass_ratio.is_finite() {
            quiz_pass_ratio.clamp(0.0, 1.0)
        } else {
            DEFAULT_QUIZ_PASS_RATIO
        };

        Self {
            block_while_under_review,
            quiz_pass_ratio,
        }
    }
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self::new(true, DEFAULT_QUIZ_PASS_RATIO)
    }
}
