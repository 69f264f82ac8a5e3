use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for curriculum targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(pub String);

/// Identifier for a team or an individual learner; submissions are tracked per group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LearnerGroupId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CriterionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoachId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnswerOptionId(pub String);

/// A course bounds every target it contains; once it ends, submissions close for everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub ends_at: Option<DateTime<Utc>>,
}

/// A team, or an individual learner who may belong to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerGroup {
    pub id: LearnerGroupId,
    pub course_id: CourseId,
    pub name: String,
    /// Set on individual learners that are part of a team.
    #[serde(default)]
    pub team: Option<LearnerGroupId>,
    #[serde(default)]
    pub access_ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_iteration")]
    pub iteration: u32,
}

fn default_iteration() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: CoachId,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub course_ids: Vec<CourseId>,
    #[serde(default)]
    pub group_ids: Vec<LearnerGroupId>,
}

impl Coach {
    /// Coaches are only named to learners when enrolled in the course, with the group or with the
    /// group's team.
    pub fn is_enrolled_with(&self, group: &LearnerGroup) -> bool {
        self.course_ids.contains(&group.course_id)
            || self.group_ids.contains(&group.id)
            || group
                .team
                .as_ref()
                .is_some_and(|team| self.group_ids.contains(team))
    }
}

const DEFAULT_GRADE_LABELS: [&str; 3] = ["Bad", "Good", "Great"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    pub id: CriterionId,
    pub course_id: CourseId,
    pub name: String,
    pub pass_grade: u8,
    pub max_grade: u8,
    #[serde(default)]
    pub grade_labels: Vec<String>,
}

impl EvaluationCriterion {
    pub fn passes(&self, grade: u8) -> bool {
        grade >= self.pass_grade
    }

    pub fn grade_label(&self, grade: u8) -> String {
        let index = usize::from(grade.saturating_sub(1));
        if let Some(label) = self.grade_labels.get(index) {
            return label.clone();
        }

        if self.grade_labels.is_empty() {
            if let Some(label) = DEFAULT_GRADE_LABELS.get(index) {
                return (*label).to_string();
            }
        }

        grade.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Team,
    Individual,
}

impl TargetRole {
    pub const fn label(self) -> &'static str {
        match self {
            TargetRole::Team => "team",
            TargetRole::Individual => "individual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: AnswerOptionId,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<AnswerOption>,
    pub correct_option: AnswerOptionId,
}

impl QuizQuestion {
    pub fn option(&self, id: &AnswerOptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|option| &option.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    pub fn question(&self, id: &QuestionId) -> Option<&QuizQuestion> {
        self.questions.iter().find(|question| &question.id == id)
    }
}

/// How a learner completes a target. A target carries exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionMethod {
    /// Work submitted for a coach to grade against the listed criteria.
    Evaluated { criteria: Vec<CriterionId> },
    LinkToComplete { url: String },
    Quiz(Quiz),
    MarkAsComplete,
}

impl CompletionMethod {
    pub const fn label(&self) -> &'static str {
        match self {
            CompletionMethod::Evaluated { .. } => "submit_work",
            CompletionMethod::LinkToComplete { .. } => "visit_link",
            CompletionMethod::Quiz(_) => "take_quiz",
            CompletionMethod::MarkAsComplete => "mark_as_complete",
        }
    }

    pub const fn is_auto_verified(&self) -> bool {
        matches!(
            self,
            CompletionMethod::LinkToComplete { .. } | CompletionMethod::MarkAsComplete
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub course_id: CourseId,
    pub title: String,
    pub type_description: String,
    pub role: TargetRole,
    pub resubmittable: bool,
    #[serde(default)]
    pub days_to_complete: Option<u16>,
    #[serde(default)]
    pub session_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub points_earnable: Option<u32>,
    #[serde(default)]
    pub prerequisites: BTreeSet<TargetId>,
    pub completion: CompletionMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub filename: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionGrade {
    pub criterion_id: CriterionId,
    pub grade: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question_id: QuestionId,
    pub option_id: AnswerOptionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub coach_id: CoachId,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

/// A timeline event recorded against a target for a learner group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub target_id: TargetId,
    pub learner_group_id: LearnerGroupId,
    pub description: String,
    pub links: Vec<String>,
    pub files: Vec<FileAttachment>,
    pub created_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub passed_at: Option<DateTime<Utc>>,
    pub evaluator: Option<CoachId>,
    pub latest: bool,
    pub grades: Vec<CriterionGrade>,
    pub quiz_score: Option<String>,
    pub quiz_answers: Vec<QuizAnswer>,
    pub feedback: Vec<Feedback>,
    pub iteration: u32,
}

impl Submission {
    pub fn outcome(&self) -> SubmissionOutcome {
        match (self.passed_at, self.evaluated_at) {
            (Some(_), _) => SubmissionOutcome::Passed,
            (None, Some(_)) => SubmissionOutcome::Failed,
            (None, None) => SubmissionOutcome::AwaitingReview,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.passed_at.is_some()
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated_at.is_some() || self.passed_at.is_some()
    }

    pub fn apply(&mut self, evaluation: Evaluation) {
        self.passed_at = evaluation.passed.then_some(evaluation.evaluated_at);
        self.evaluated_at = Some(evaluation.evaluated_at);
        self.evaluator = Some(evaluation.evaluator);
        self.grades = evaluation.grades;
    }
}

/// A coach's verdict on a submission, written in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub grades: Vec<CriterionGrade>,
    pub evaluator: CoachId,
    pub evaluated_at: DateTime<Utc>,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    AwaitingReview,
    Passed,
    Failed,
}

impl SubmissionOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionOutcome::AwaitingReview => "Submitted",
            SubmissionOutcome::Passed => "Passed",
            SubmissionOutcome::Failed => "Failed",
        }
    }
}

/// Learner-provided work before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub description: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    CourseEnded,
    AccessEnded,
    PrerequisitesIncomplete,
}

impl LockReason {
    pub const fn message(self) -> &'static str {
        match self {
            LockReason::CourseEnded => {
                "The course has ended and submissions are disabled for all targets!"
            }
            LockReason::AccessEnded => "Your access to this course has ended.",
            LockReason::PrerequisitesIncomplete => {
                "This target has pre-requisites that are incomplete."
            }
        }
    }
}

/// Derived status of a target for one learner group. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Locked(LockReason),
    Pending,
    Submitted,
    Passed,
    Failed,
}

impl TargetStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TargetStatus::Locked(_) => "Locked",
            TargetStatus::Pending => "Pending",
            TargetStatus::Submitted => "Submitted",
            TargetStatus::Passed => "Passed",
            TargetStatus::Failed => "Failed",
        }
    }

    pub const fn lock_reason(self) -> Option<LockReason> {
        match self {
            TargetStatus::Locked(reason) => Some(reason),
            _ => None,
        }
    }

    pub const fn is_locked(self) -> bool {
        matches!(self, TargetStatus::Locked(_))
    }
}
