//! Target status resolution and submission eligibility.
//!
//! A target's status for a learner group is derived on every request from the course calendar,
//! the group's access window, the prerequisite graph and the latest recorded submission. Nothing
//! here caches a status. Writes go through [`TargetService`], which checks the acceptance policy
//! and swaps the latest-submission marker atomically.

pub mod domain;
pub mod eligibility;
pub mod error;
pub mod header;
pub mod memory;
pub mod prerequisites;
pub mod quiz;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;
pub mod verification;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    AnswerOption, AnswerOptionId, Coach, CoachId, CompletionMethod, Course, CourseId,
    CriterionGrade, CriterionId, Evaluation, EvaluationCriterion, Feedback, FileAttachment,
    LearnerGroup, LearnerGroupId, LockReason, QuestionId, Quiz, QuizAnswer, QuizQuestion,
    Submission, SubmissionDraft, SubmissionId, SubmissionOutcome, Target, TargetId, TargetRole,
    TargetStatus,
};
pub use eligibility::{
    Eligibility, EligibilityConfig, IneligibilityReason, SubmissionAcceptancePolicy,
    ValidationError,
};
pub use error::{NotFoundError, RecordKind, TargetServiceError};
pub use header::{HeaderIcon, TargetHeaderView};
pub use memory::{CatalogRegistrationError, InMemorySubmissionStore, InMemoryTargetCatalog};
pub use quiz::{QuizScore, QuizScorer};
pub use repository::{CatalogError, RepositoryError, SubmissionStore, TargetCatalog};
pub use router::target_router;
pub use service::{Clock, LinkVisit, QuizAttempt, SystemClock, TargetService};
pub use status::{Resolution, TargetStatusResolver};
pub use verification::{AutoVerification, AutoVerificationRecorder};
pub use views::{
    EligibilityView, FeedbackView, GradeView, QuizResultView, SubmissionView, TargetStatusView,
    TeamMemberView,
};
