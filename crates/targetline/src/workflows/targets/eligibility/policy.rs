use serde::Serialize;

use super::super::domain::{CompletionMethod, LockReason, Target, TargetStatus};
use super::super::status::Resolution;
use super::config::EligibilityConfig;

/// Why a learner group may not create a new submission right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibilityReason {
    CourseEnded,
    AccessEnded,
    IncompletePrerequisites,
    AlreadyPassed,
    QuizAlreadyAttempted,
    AwaitingReview,
}

impl IneligibilityReason {
    pub const fn message(self) -> &'static str {
        match self {
            IneligibilityReason::CourseEnded => "course ended",
            IneligibilityReason::AccessEnded => "access ended",
            IneligibilityReason::IncompletePrerequisites => "incomplete prerequisites",
            IneligibilityReason::AlreadyPassed => "non-resubmittable target already passed",
            IneligibilityReason::QuizAlreadyAttempted => "quiz already attempted",
            IneligibilityReason::AwaitingReview => "submission awaiting review",
        }
    }
}

impl From<LockReason> for IneligibilityReason {
    fn from(reason: LockReason) -> Self {
        match reason {
            LockReason::CourseEnded => IneligibilityReason::CourseEnded,
            LockReason::AccessEnded => IneligibilityReason::AccessEnded,
            LockReason::PrerequisitesIncomplete => IneligibilityReason::IncompletePrerequisites,
        }
    }
}

/// Outcome of an eligibility check, as consumed by the overlay's submit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub allowed: bool,
    pub reason: Option<IneligibilityReason>,
}

impl Eligibility {
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub const fn denied(reason: IneligibilityReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    pub fn into_result(self) -> Result<(), IneligibilityReason> {
        match self.reason {
            Some(reason) if !self.allowed => Err(reason),
            _ => Ok(()),
        }
    }
}

/// Decides whether a new submission may be recorded for a resolved target.
#[derive(Debug, Clone, Default)]
pub struct SubmissionAcceptancePolicy {
    config: EligibilityConfig,
}

impl SubmissionAcceptancePolicy {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    pub fn evaluate(&self, target: &Target, resolution: &Resolution) -> Eligibility {
        if let TargetStatus::Locked(reason) = resolution.status {
            return Eligibility::denied(reason.into());
        }

        if resolution.status == TargetStatus::Passed && !target.resubmittable {
            return Eligibility::denied(IneligibilityReason::AlreadyPassed);
        }

        if matches!(target.completion, CompletionMethod::Quiz(_))
            && resolution
                .latest
                .as_ref()
                .is_some_and(|latest| latest.quiz_score.is_some())
        {
            return Eligibility::denied(IneligibilityReason::QuizAlreadyAttempted);
        }

        if resolution.status == TargetStatus::Submitted && self.config.block_while_under_review {
            return Eligibility::denied(IneligibilityReason::AwaitingReview);
        }

        Eligibility::allowed()
    }
}
