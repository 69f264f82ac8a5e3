use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    AnswerOptionId, Coach, EvaluationCriterion, LearnerGroup, LockReason, Quiz, Submission,
    TargetStatus,
};
use super::eligibility::Eligibility;
use super::quiz::QuizScore;

const UNKNOWN_COACH: &str = "Unknown Coach";

#[derive(Debug, Clone, Serialize)]
pub struct TargetStatusView {
    pub target_id: String,
    pub learner_group_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_message: Option<&'static str>,
}

impl TargetStatusView {
    pub fn new(target_id: &str, learner_group_id: &str, status: TargetStatus) -> Self {
        let lock_reason = status.lock_reason();
        Self {
            target_id: target_id.to_string(),
            learner_group_id: learner_group_id.to_string(),
            status: status.label(),
            lock_reason,
            lock_message: lock_reason.map(LockReason::message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibilityView {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<Eligibility> for EligibilityView {
    fn from(eligibility: Eligibility) -> Self {
        Self {
            allowed: eligibility.allowed,
            reason: eligibility.reason.map(|reason| reason.message()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeView {
    pub criterion: String,
    pub grade: u8,
    pub label: String,
    pub passed: bool,
}

impl GradeView {
    /// e.g. `"Quality of work: Good"`
    pub fn summary(&self) -> String {
        format!("{}: {}", self.criterion, self.label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackView {
    pub coach_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_title: Option<String>,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of the "Submissions & Feedback" tab.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub submission_id: String,
    pub description: String,
    pub links: Vec<String>,
    pub files: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: &'static str,
    pub latest: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grades: Vec<GradeView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feedback: Vec<FeedbackView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_score: Option<String>,
}

impl SubmissionView {
    /// `group` is the learner group viewing the history. `criteria` and `coaches` hold whatever the
    /// catalog could resolve; coaches not enrolled with the course, the group or its team are shown
    /// anonymously.
    pub fn build(
        submission: &Submission,
        group: &LearnerGroup,
        criteria: &[EvaluationCriterion],
        coaches: &[Coach],
    ) -> Self {
        let grades = submission
            .grades
            .iter()
            .filter_map(|grade| {
                criteria
                    .iter()
                    .find(|criterion| criterion.id == grade.criterion_id)
                    .map(|criterion| GradeView {
                        criterion: criterion.name.clone(),
                        grade: grade.grade,
                        label: criterion.grade_label(grade.grade),
                        passed: criterion.passes(grade.grade),
                    })
            })
            .collect();

        let feedback = submission
            .feedback
            .iter()
            .map(|entry| {
                let coach = coaches
                    .iter()
                    .find(|coach| coach.id == entry.coach_id)
                    .filter(|coach| coach.is_enrolled_with(group));
                FeedbackView {
                    coach_name: coach
                        .map(|coach| coach.name.clone())
                        .unwrap_or_else(|| UNKNOWN_COACH.to_string()),
                    coach_title: coach.map(|coach| coach.title.clone()),
                    feedback: entry.feedback.clone(),
                    created_at: entry.created_at,
                }
            })
            .collect();

        Self {
            submission_id: submission.id.0.clone(),
            description: submission.description.clone(),
            links: submission.links.clone(),
            files: submission
                .files
                .iter()
                .map(|file| file.filename.clone())
                .collect(),
            created_at: submission.created_at,
            status: submission.outcome().label(),
            latest: submission.latest,
            grades,
            feedback,
            quiz_score: submission.quiz_score.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberView {
    pub learner_group_id: String,
    pub name: String,
    pub notice: String,
}

impl From<&LearnerGroup> for TeamMemberView {
    fn from(member: &LearnerGroup) -> Self {
        Self {
            learner_group_id: member.id.0.clone(),
            name: member.name.clone(),
            notice: format!("{} has not completed this target.", member.name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResultView {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Result screen shown right after a quiz is submitted.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResultView {
    pub submission_id: String,
    pub description: String,
    pub score: String,
    pub status: &'static str,
    pub questions: Vec<QuestionResultView>,
}

impl QuizResultView {
    pub fn build(submission: &Submission, quiz: &Quiz, score: &QuizScore) -> Self {
        let questions = score
            .results
            .iter()
            .filter_map(|result| {
                let question = quiz.question(&result.question_id)?;
                let value = |id: &AnswerOptionId| {
                    question.option(id).map(|option| option.value.clone())
                };
                Some(QuestionResultView {
                    question: question.question.clone(),
                    chosen_answer: result.chosen_option.as_ref().and_then(value),
                    correct_answer: value(&result.correct_option).unwrap_or_default(),
                    is_correct: result.is_correct,
                })
            })
            .collect();

        Self {
            submission_id: submission.id.0.clone(),
            description: submission.description.clone(),
            score: score.to_string(),
            status: submission.outcome().label(),
            questions,
        }
    }
}
