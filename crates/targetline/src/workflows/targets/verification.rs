use chrono::{DateTime, Utc};

use super::domain::{LearnerGroup, Submission, SubmissionId, Target};
use super::error::TargetServiceError;
use super::status::Resolution;

/// Result of preparing an auto-verification.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoVerification {
    /// A fresh passing record that still needs to be written as latest.
    Recorded(Submission),
    /// The latest record already passes; nothing to write.
    AlreadyVerified(Submission),
}

impl AutoVerification {
    pub fn into_submission(self) -> Submission {
        match self {
            AutoVerification::Recorded(submission)
            | AutoVerification::AlreadyVerified(submission) => submission,
        }
    }
}

/// Synthesizes passing records for targets that need no coach.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoVerificationRecorder;

impl AutoVerificationRecorder {
    pub fn description(target: &Target) -> String {
        format!("Target '{}' was auto-verified", target.title)
    }

    pub fn prepare(
        &self,
        target: &Target,
        resolution: &Resolution,
        id: SubmissionId,
        now: DateTime<Utc>,
    ) -> Result<AutoVerification, TargetServiceError> {
        if let Some(latest) = resolution.latest.as_ref().filter(|latest| latest.is_passed()) {
            if !target.resubmittable {
                return Err(TargetServiceError::AlreadyPassed);
            }
            return Ok(AutoVerification::AlreadyVerified(latest.clone()));
        }

        Ok(AutoVerification::Recorded(verified_submission(
            target,
            &resolution.group,
            id,
            Self::description(target),
            now,
        )))
    }
}

/// Passing record stamped at `now`, used by auto-verification and quiz completion.
pub(crate) fn verified_submission(
    target: &Target,
    group: &LearnerGroup,
    id: SubmissionId,
    description: String,
    now: DateTime<Utc>,
) -> Submission {
    Submission {
        id,
        target_id: target.id.clone(),
        learner_group_id: group.id.clone(),
        description,
        links: Vec::new(),
        files: Vec::new(),
        created_at: now,
        evaluated_at: Some(now),
        passed_at: Some(now),
        evaluator: None,
        latest: true,
        grades: Vec::new(),
        quiz_score: None,
        quiz_answers: Vec::new(),
        feedback: Vec::new(),
        iteration: group.iteration,
    }
}
