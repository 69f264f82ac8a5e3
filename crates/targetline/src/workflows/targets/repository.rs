use super::domain::{
    Coach, CoachId, Course, CourseId, CriterionId, Evaluation, EvaluationCriterion, Feedback,
    LearnerGroup, LearnerGroupId, Submission, SubmissionId, Target, TargetId,
};

/// Read access to curriculum records. Writes happen through administrative tooling.
pub trait TargetCatalog: Send + Sync {
    fn course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError>;
    fn learner_group(&self, id: &LearnerGroupId) -> Result<Option<LearnerGroup>, RepositoryError>;
    fn target(&self, id: &TargetId) -> Result<Option<Target>, RepositoryError>;
    fn criterion(&self, id: &CriterionId) -> Result<Option<EvaluationCriterion>, RepositoryError>;
    fn coach(&self, id: &CoachId) -> Result<Option<Coach>, RepositoryError>;
    /// Individual learner groups whose `team` is the given group.
    fn team_members(&self, team: &LearnerGroupId) -> Result<Vec<LearnerGroup>, RepositoryError>;
}

/// Append-only submission log with an atomically maintained `latest` marker per
/// (target, learner group).
pub trait SubmissionStore: Send + Sync {
    fn latest(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Option<Submission>, RepositoryError>;

    /// Every submission for the pair, oldest first.
    fn history(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Vec<Submission>, RepositoryError>;

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError>;

    /// Insert `submission` as the new latest, clearing the flag on the previous latest in the
    /// same transaction. Fails with [`RepositoryError::Conflict`] when the current latest is not
    /// `expected_latest`.
    fn record_latest(
        &self,
        expected_latest: Option<&SubmissionId>,
        submission: Submission,
    ) -> Result<Submission, RepositoryError>;

    /// Grade a submission. The store checks that it is still latest and unevaluated in the same
    /// transaction as the write and fails with [`RepositoryError::Conflict`] otherwise.
    fn record_evaluation(
        &self,
        id: &SubmissionId,
        evaluation: Evaluation,
    ) -> Result<Submission, RepositoryError>;

    /// Append a feedback entry, leaving every other field as currently stored.
    fn append_feedback(
        &self,
        id: &SubmissionId,
        feedback: Feedback,
    ) -> Result<Submission, RepositoryError>;

    /// Delete a submission that is currently latest and promote the most recent remaining one.
    /// Returns the promoted submission, if any.
    fn remove_latest(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record changed concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Rejected curriculum definitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("target {target} lists unknown prerequisite {prerequisite}")]
    UnknownPrerequisite { target: String, prerequisite: String },
    #[error("prerequisite cycle detected: {}", .path.join(" -> "))]
    PrerequisiteCycle { path: Vec<String> },
    #[error("target {target} belongs to course {course} which is not registered")]
    UnknownCourse { target: String, course: String },
    #[error("target {target} references unknown evaluation criterion {criterion}")]
    UnknownCriterion { target: String, criterion: String },
}
