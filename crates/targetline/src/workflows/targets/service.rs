use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    Coach, CoachId, CompletionMethod, CriterionGrade, CriterionId, Evaluation,
    EvaluationCriterion, Feedback, LearnerGroup, LearnerGroupId, Quiz, QuizAnswer, Submission,
    SubmissionDraft, SubmissionId, Target, TargetId, TargetRole, TargetStatus,
};
use super::eligibility::{
    validate_draft, Eligibility, EligibilityConfig, IneligibilityReason,
    SubmissionAcceptancePolicy, ValidationError,
};
use super::error::{NotFoundError, RecordKind, TargetServiceError};
use super::header::TargetHeaderView;
use super::quiz::{QuizScore, QuizScorer};
use super::repository::{RepositoryError, SubmissionStore, TargetCatalog};
use super::status::{Resolution, TargetStatusResolver};
use super::verification::{verified_submission, AutoVerification, AutoVerificationRecorder};
use super::views::{QuizResultView, SubmissionView, TeamMemberView};

/// Source of the current instant; swapped out in tests to move past course deadlines.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission_id() -> SubmissionId {
    let id = SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SubmissionId(format!("sub-{id:06}"))
}

/// A lost race on the latest marker is retried once before giving up.
const WRITE_ATTEMPTS: usize = 2;

enum Write {
    Record(Submission),
    Keep(Submission),
}

/// Stored quiz submission plus the graded answers behind it.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    pub submission: Submission,
    pub score: QuizScore,
    pub result: QuizResultView,
}

#[derive(Debug, Clone)]
pub struct LinkVisit {
    pub url: String,
    pub submission: Submission,
}

/// Service composing status resolution, the acceptance policy and the submission store.
pub struct TargetService<C, S> {
    catalog: Arc<C>,
    store: Arc<S>,
    policy: Arc<SubmissionAcceptancePolicy>,
    scorer: QuizScorer,
    recorder: AutoVerificationRecorder,
    clock: Arc<dyn Clock>,
}

impl<C, S> TargetService<C, S>
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    pub fn new(catalog: Arc<C>, store: Arc<S>, config: EligibilityConfig) -> Self {
        Self::with_clock(catalog, store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        catalog: Arc<C>,
        store: Arc<S>,
        config: EligibilityConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            store,
            policy: Arc::new(SubmissionAcceptancePolicy::new(config)),
            scorer: QuizScorer,
            recorder: AutoVerificationRecorder,
            clock,
        }
    }

    pub fn config(&self) -> &EligibilityConfig {
        self.policy.config()
    }

    fn resolver(&self, now: DateTime<Utc>) -> TargetStatusResolver<'_, C, S> {
        TargetStatusResolver::new(self.catalog.as_ref(), self.store.as_ref(), now)
    }

    fn load(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<(Target, LearnerGroup), TargetServiceError> {
        let resolver = self.resolver(self.clock.now());
        Ok((
            resolver.load_target(target_id)?,
            resolver.load_group(group_id)?,
        ))
    }

    fn resolve(
        &self,
        target: &Target,
        group: &LearnerGroup,
    ) -> Result<Resolution, TargetServiceError> {
        self.resolver(self.clock.now()).resolve(target, group)
    }

    /// Current status of a target for a learner group.
    pub fn status(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<TargetStatus, TargetServiceError> {
        self.resolver(self.clock.now()).status(target_id, group_id)
    }

    pub fn can_submit(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<Eligibility, TargetServiceError> {
        let (target, group) = self.load(target_id, group_id)?;
        let resolution = self.resolve(&target, &group)?;
        Ok(self.policy.evaluate(&target, &resolution))
    }

    /// Record work for coach review.
    pub fn submit(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
        draft: SubmissionDraft,
    ) -> Result<Submission, TargetServiceError> {
        validate_draft(&draft)?;
        let (target, group) = self.load(target_id, group_id)?;
        if !matches!(target.completion, CompletionMethod::Evaluated { .. }) {
            return Err(ValidationError::WrongCompletionMethod {
                expected: target.completion.label(),
            }
            .into());
        }

        let links: Vec<String> = draft
            .links
            .iter()
            .map(|link| link.trim().to_string())
            .collect();

        let submission = self.write_latest(&target, &group, |resolution, now| {
            self.ensure_eligible(&target, resolution)?;
            Ok(Write::Record(Submission {
                id: next_submission_id(),
                target_id: target.id.clone(),
                learner_group_id: resolution.group.id.clone(),
                description: draft.description.clone(),
                links: links.clone(),
                files: draft.files.clone(),
                created_at: now,
                evaluated_at: None,
                passed_at: None,
                evaluator: None,
                latest: true,
                grades: Vec::new(),
                quiz_score: None,
                quiz_answers: Vec::new(),
                feedback: Vec::new(),
                iteration: resolution.group.iteration,
            }))
        })?;

        info!(
            submission_id = %submission.id.0,
            target_id = %target.id.0,
            group_id = %submission.learner_group_id.0,
            attachments = submission.links.len() + submission.files.len(),
            "submission queued for review"
        );
        Ok(submission)
    }

    /// Grade a single-shot quiz attempt and store it as a completed submission.
    pub fn take_quiz(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
        answers: Vec<QuizAnswer>,
    ) -> Result<QuizAttempt, TargetServiceError> {
        let (target, group) = self.load(target_id, group_id)?;
        let CompletionMethod::Quiz(quiz) = &target.completion else {
            return Err(ValidationError::WrongCompletionMethod {
                expected: target.completion.label(),
            }
            .into());
        };
        validate_answers(quiz, &answers)?;

        let score = self.scorer.score(quiz, &answers);
        let passed = score.passes(self.config().quiz_pass_ratio);
        let description = format!("Target '{}' was completed by answering a quiz", target.title);

        let submission = self.write_latest(&target, &group, |resolution, now| {
            self.ensure_eligible(&target, resolution)?;
            let mut submission = verified_submission(
                &target,
                &resolution.group,
                next_submission_id(),
                description.clone(),
                now,
            );
            if !passed {
                submission.passed_at = None;
            }
            submission.quiz_score = Some(score.to_string());
            submission.quiz_answers = answers.clone();
            Ok(Write::Record(submission))
        })?;

        info!(
            submission_id = %submission.id.0,
            target_id = %target.id.0,
            score = %score,
            passed,
            "quiz attempt recorded"
        );

        let result = QuizResultView::build(&submission, quiz, &score);
        Ok(QuizAttempt {
            submission,
            score,
            result,
        })
    }

    /// Mark a target complete without a coach. Repeated calls never create a second latest record.
    pub fn auto_verify(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<Submission, TargetServiceError> {
        let (target, group) = self.load(target_id, group_id)?;
        if !target.completion.is_auto_verified() {
            return Err(ValidationError::WrongCompletionMethod {
                expected: target.completion.label(),
            }
            .into());
        }

        let submission = self.write_latest(&target, &group, |resolution, now| {
            match self.policy.evaluate(&target, resolution).reason {
                None | Some(IneligibilityReason::AlreadyPassed) => {}
                Some(reason) => return Err(reason.into()),
            }

            Ok(
                match self
                    .recorder
                    .prepare(&target, resolution, next_submission_id(), now)?
                {
                    AutoVerification::Recorded(submission) => Write::Record(submission),
                    AutoVerification::AlreadyVerified(submission) => Write::Keep(submission),
                },
            )
        })?;

        info!(
            submission_id = %submission.id.0,
            target_id = %target.id.0,
            group_id = %submission.learner_group_id.0,
            "target auto-verified"
        );
        Ok(submission)
    }

    /// Complete a link target and hand back the link the learner should be sent to.
    pub fn visit_link(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<LinkVisit, TargetServiceError> {
        let target = self.resolver(self.clock.now()).load_target(target_id)?;
        let CompletionMethod::LinkToComplete { url } = target.completion else {
            return Err(ValidationError::WrongCompletionMethod {
                expected: target.completion.label(),
            }
            .into());
        };

        let submission = self.auto_verify(target_id, group_id)?;
        Ok(LinkVisit { url, submission })
    }

    /// Withdraw the latest submission while it is still awaiting review. The previous submission,
    /// if any, becomes latest again.
    pub fn undo_submission(
        &self,
        group_id: &LearnerGroupId,
        submission_id: &SubmissionId,
    ) -> Result<Option<Submission>, TargetServiceError> {
        let submission = self.load_submission(submission_id)?;
        let group = self.resolver(self.clock.now()).load_group(group_id)?;

        let owns = submission.learner_group_id == group.id
            || group.team.as_ref() == Some(&submission.learner_group_id);
        if !owns {
            return Err(ValidationError::NotOwner.into());
        }
        if !submission.latest {
            return Err(ValidationError::NotLatest.into());
        }
        if submission.is_evaluated() {
            return Err(ValidationError::AlreadyEvaluated.into());
        }

        let promoted = match self.store.remove_latest(submission_id) {
            Ok(promoted) => promoted,
            Err(RepositoryError::Conflict) => return Err(ValidationError::NotLatest.into()),
            Err(RepositoryError::NotFound) => return Err(missing_submission(submission_id)),
            Err(other) => return Err(other.into()),
        };

        info!(
            submission_id = %submission_id.0,
            restored = promoted.as_ref().map(|previous| previous.id.0.as_str()).unwrap_or("none"),
            "submission withdrawn"
        );
        Ok(promoted)
    }

    /// Record a coach's grades. The submission passes only when every criterion passes.
    pub fn grade(
        &self,
        submission_id: &SubmissionId,
        coach_id: &CoachId,
        grades: Vec<CriterionGrade>,
    ) -> Result<Submission, TargetServiceError> {
        let submission = self.load_submission(submission_id)?;
        self.load_coach(coach_id)?;
        let target = self
            .resolver(self.clock.now())
            .load_target(&submission.target_id)?;

        let CompletionMethod::Evaluated { criteria } = &target.completion else {
            return Err(ValidationError::WrongCompletionMethod {
                expected: target.completion.label(),
            }
            .into());
        };
        if !submission.latest {
            return Err(ValidationError::NotLatest.into());
        }
        if submission.is_evaluated() {
            return Err(ValidationError::AlreadyEvaluated.into());
        }

        if let Some(unexpected) = grades
            .iter()
            .find(|grade| !criteria.contains(&grade.criterion_id))
        {
            return Err(ValidationError::UnexpectedCriterion {
                criterion: unexpected.criterion_id.0.clone(),
            }
            .into());
        }

        let mut recorded = Vec::with_capacity(criteria.len());
        let mut passed = true;
        for criterion in self.load_criteria(criteria)? {
            let grade = grades
                .iter()
                .find(|grade| grade.criterion_id == criterion.id)
                .ok_or_else(|| ValidationError::MissingGrade {
                    criterion: criterion.name.clone(),
                })?;

            if grade.grade == 0 || grade.grade > criterion.max_grade {
                return Err(ValidationError::GradeOutOfRange {
                    criterion: criterion.name.clone(),
                    grade: grade.grade,
                    max: criterion.max_grade,
                }
                .into());
            }

            passed &= criterion.passes(grade.grade);
            recorded.push(grade.clone());
        }

        let evaluation = Evaluation {
            grades: recorded,
            evaluator: coach_id.clone(),
            evaluated_at: self.clock.now(),
            passed,
        };
        let submission = match self.store.record_evaluation(submission_id, evaluation) {
            Ok(graded) => graded,
            Err(RepositoryError::Conflict) => return Err(self.evaluation_conflict(submission_id)),
            Err(RepositoryError::NotFound) => return Err(missing_submission(submission_id)),
            Err(other) => return Err(other.into()),
        };

        info!(
            submission_id = %submission.id.0,
            coach_id = %coach_id.0,
            passed,
            "submission graded"
        );
        Ok(submission)
    }

    pub fn add_feedback(
        &self,
        submission_id: &SubmissionId,
        coach_id: &CoachId,
        feedback: &str,
    ) -> Result<Submission, TargetServiceError> {
        if feedback.trim().is_empty() {
            return Err(ValidationError::EmptyFeedback.into());
        }

        self.load_coach(coach_id)?;
        let entry = Feedback {
            coach_id: coach_id.clone(),
            feedback: feedback.trim().to_string(),
            created_at: self.clock.now(),
        };

        match self.store.append_feedback(submission_id, entry) {
            Ok(submission) => Ok(submission),
            Err(RepositoryError::NotFound) => Err(missing_submission(submission_id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Submission history for the "Submissions & Feedback" tab, newest first.
    pub fn submissions(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<Vec<SubmissionView>, TargetServiceError> {
        let (target, group) = self.load(target_id, group_id)?;
        let resolution = self.resolve(&target, &group)?;
        let tracked = resolution.group;

        let criteria = match &target.completion {
            CompletionMethod::Evaluated { criteria } => self.load_criteria(criteria)?,
            _ => Vec::new(),
        };

        let mut history = self.store.history(&target.id, &tracked.id)?;
        history.reverse();

        let mut coaches: Vec<Coach> = Vec::new();
        for coach_id in history
            .iter()
            .flat_map(|submission| submission.feedback.iter().map(|entry| &entry.coach_id))
        {
            if coaches.iter().any(|coach| &coach.id == coach_id) {
                continue;
            }
            if let Some(coach) = self.catalog.coach(coach_id)? {
                coaches.push(coach);
            }
        }

        Ok(history
            .iter()
            .map(|submission| SubmissionView::build(submission, &group, &criteria, &coaches))
            .collect())
    }

    /// Teammates who still have to pass an individual target.
    pub fn pending_team_members(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
    ) -> Result<Vec<TeamMemberView>, TargetServiceError> {
        let (target, group) = self.load(target_id, group_id)?;
        let Some(team_id) = group.team.as_ref() else {
            return Ok(Vec::new());
        };
        if target.role != TargetRole::Individual {
            return Ok(Vec::new());
        }

        let mut pending = Vec::new();
        for member in self.catalog.team_members(team_id)? {
            if member.id == group.id {
                continue;
            }
            if self.resolve(&target, &member)?.status != TargetStatus::Passed {
                pending.push(TeamMemberView::from(&member));
            }
        }
        Ok(pending)
    }

    pub fn header(
        &self,
        target_id: &TargetId,
        group_id: &LearnerGroupId,
        display_date: bool,
    ) -> Result<TargetHeaderView, TargetServiceError> {
        let (target, group) = self.load(target_id, group_id)?;
        let resolution = self.resolve(&target, &group)?;
        Ok(TargetHeaderView::new(&target, resolution.status, display_date))
    }

    fn ensure_eligible(
        &self,
        target: &Target,
        resolution: &Resolution,
    ) -> Result<(), TargetServiceError> {
        self.policy
            .evaluate(target, resolution)
            .into_result()
            .map_err(TargetServiceError::from)
    }

    /// Re-resolve, prepare and write with the latest marker swapped atomically. A concurrent
    /// writer invalidates the resolution, so the whole step is repeated.
    fn write_latest<F>(
        &self,
        target: &Target,
        group: &LearnerGroup,
        mut prepare: F,
    ) -> Result<Submission, TargetServiceError>
    where
        F: FnMut(&Resolution, DateTime<Utc>) -> Result<Write, TargetServiceError>,
    {
        for attempt in 1..=WRITE_ATTEMPTS {
            let now = self.clock.now();
            let resolution = self.resolver(now).resolve(target, group)?;
            let submission = match prepare(&resolution, now)? {
                Write::Keep(existing) => return Ok(existing),
                Write::Record(submission) => submission,
            };

            let expected = resolution.latest.as_ref().map(|latest| &latest.id);
            match self.store.record_latest(expected, submission) {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::Conflict) => {
                    warn!(
                        target_id = %target.id.0,
                        group_id = %resolution.group.id.0,
                        attempt,
                        "latest submission changed concurrently"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(TargetServiceError::TryAgain)
    }

    /// Explain a rejected evaluation from the submission as it is stored now.
    fn evaluation_conflict(&self, id: &SubmissionId) -> TargetServiceError {
        match self.store.fetch(id) {
            Ok(Some(current)) if current.is_evaluated() => ValidationError::AlreadyEvaluated.into(),
            Ok(Some(current)) if !current.latest => ValidationError::NotLatest.into(),
            Ok(Some(_)) => TargetServiceError::TryAgain,
            Ok(None) => missing_submission(id),
            Err(err) => err.into(),
        }
    }

    fn load_submission(&self, id: &SubmissionId) -> Result<Submission, TargetServiceError> {
        self.store
            .fetch(id)?
            .ok_or_else(|| missing_submission(id))
    }

    fn load_coach(&self, id: &CoachId) -> Result<(), TargetServiceError> {
        match self.catalog.coach(id)? {
            Some(_) => Ok(()),
            None => Err(NotFoundError::new(RecordKind::Coach, id.0.clone()).into()),
        }
    }

    fn load_criteria(
        &self,
        ids: &[CriterionId],
    ) -> Result<Vec<EvaluationCriterion>, TargetServiceError> {
        ids.iter()
            .map(|id| {
                self.catalog
                    .criterion(id)?
                    .ok_or_else(|| NotFoundError::new(RecordKind::Criterion, id.0.clone()).into())
            })
            .collect()
    }
}

fn missing_submission(id: &SubmissionId) -> TargetServiceError {
    NotFoundError::new(RecordKind::Submission, id.0.clone()).into()
}

fn validate_answers(quiz: &Quiz, answers: &[QuizAnswer]) -> Result<(), ValidationError> {
    for answer in answers {
        let question = quiz
            .question(&answer.question_id)
            .ok_or_else(|| ValidationError::UnknownQuestion {
                question: answer.question_id.0.clone(),
            })?;
        if question.option(&answer.option_id).is_none() {
            return Err(ValidationError::UnknownAnswerOption {
                question: answer.question_id.0.clone(),
                option: answer.option_id.0.clone(),
            });
        }
    }
    Ok(())
}
