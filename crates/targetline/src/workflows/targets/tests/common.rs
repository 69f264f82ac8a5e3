use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::targets::domain::{
    AnswerOption, AnswerOptionId, Coach, CoachId, CompletionMethod, Course, CourseId,
    CriterionGrade, CriterionId, Evaluation, EvaluationCriterion, Feedback, LearnerGroup,
    LearnerGroupId, QuestionId, Quiz, QuizAnswer, QuizQuestion, Submission, SubmissionDraft,
    SubmissionId, Target, TargetId, TargetRole,
};
use crate::workflows::targets::repository::{RepositoryError, SubmissionStore, TargetCatalog};
use crate::workflows::targets::{
    Clock, EligibilityConfig, InMemorySubmissionStore, InMemoryTargetCatalog, TargetService,
};

pub(super) type MemoryService = TargetService<InMemoryTargetCatalog, InMemorySubmissionStore>;

pub(super) const COURSE: &str = "course-founders";
pub(super) const QUALITY: &str = "crit-quality";
pub(super) const CLARITY: &str = "crit-clarity";
pub(super) const COACH: &str = "coach-jordan";
pub(super) const OUTSIDE_COACH: &str = "coach-visiting";
/// Enrolled with TEAM only.
pub(super) const TEAM_COACH: &str = "coach-casey";
pub(super) const TEAM: &str = "team-rocket";
pub(super) const LEARNER_A: &str = "learner-ada";
pub(super) const LEARNER_B: &str = "learner-ben";
pub(super) const SOLO: &str = "learner-solo";
pub(super) const EXPIRED: &str = "learner-expired";

/// Mark-as-complete, single shot.
pub(super) const BASICS: &str = "t-basics";
/// Reviewed against quality and clarity, resubmittable.
pub(super) const ESSAY: &str = "t-essay";
/// Reviewed against quality, single shot, requires BASICS.
pub(super) const FINAL: &str = "t-final";
/// Mark-as-complete, resubmittable, requires BASICS.
pub(super) const WRAPUP: &str = "t-wrapup";
pub(super) const QUIZ: &str = "t-quiz";
pub(super) const HANDBOOK: &str = "t-handbook";
pub(super) const INTRO: &str = "t-intro";
pub(super) const TEAM_PITCH: &str = "t-team-pitch";

pub(super) const HANDBOOK_URL: &str = "https://example.com/handbook";

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub(super) fn after_course_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
}

pub(super) fn target_id(id: &str) -> TargetId {
    TargetId(id.to_string())
}

pub(super) fn group_id(id: &str) -> LearnerGroupId {
    LearnerGroupId(id.to_string())
}

pub(super) fn coach_id(id: &str) -> CoachId {
    CoachId(id.to_string())
}

pub(super) fn grade(criterion: &str, grade: u8) -> CriterionGrade {
    CriterionGrade {
        criterion_id: CriterionId(criterion.to_string()),
        grade,
    }
}

pub(super) fn answer(question: &str, option: &str) -> QuizAnswer {
    QuizAnswer {
        question_id: QuestionId(question.to_string()),
        option_id: AnswerOptionId(option.to_string()),
    }
}

pub(super) fn draft() -> SubmissionDraft {
    SubmissionDraft {
        description: "Interviewed five customers and summarised the findings.".to_string(),
        links: vec!["https://example.com/notes".to_string()],
        files: Vec::new(),
    }
}

fn group(id: &str, team: Option<&str>, access_ends_at: Option<DateTime<Utc>>) -> LearnerGroup {
    LearnerGroup {
        id: group_id(id),
        course_id: CourseId(COURSE.to_string()),
        name: match id {
            LEARNER_A => "Ada".to_string(),
            LEARNER_B => "Ben".to_string(),
            other => other.to_string(),
        },
        team: team.map(group_id),
        access_ends_at,
        iteration: 2,
    }
}

fn criterion(id: &str, name: &str) -> EvaluationCriterion {
    EvaluationCriterion {
        id: CriterionId(id.to_string()),
        course_id: CourseId(COURSE.to_string()),
        name: name.to_string(),
        pass_grade: 2,
        max_grade: 3,
        grade_labels: Vec::new(),
    }
}

pub(super) fn target(
    id: &str,
    role: TargetRole,
    resubmittable: bool,
    prerequisites: &[&str],
    completion: CompletionMethod,
) -> Target {
    Target {
        id: target_id(id),
        course_id: CourseId(COURSE.to_string()),
        title: format!("Title of {id}"),
        type_description: "Task".to_string(),
        role,
        resubmittable,
        days_to_complete: Some(7),
        session_at: None,
        points_earnable: None,
        prerequisites: prerequisites.iter().map(|id| target_id(id)).collect(),
        completion,
    }
}

fn quiz() -> Quiz {
    let question = |id: &str, options: &[&str], correct: &str| QuizQuestion {
        id: QuestionId(id.to_string()),
        question: format!("Question {id}"),
        description: None,
        options: options
            .iter()
            .map(|option| AnswerOption {
                id: AnswerOptionId(option.to_string()),
                value: format!("Option {option}"),
            })
            .collect(),
        correct_option: AnswerOptionId(correct.to_string()),
    };

    Quiz {
        questions: vec![
            question("q1", &["o1", "o2"], "o2"),
            question("q2", &["o3", "o4"], "o4"),
        ],
    }
}

pub(super) fn evaluated(criteria: &[&str]) -> CompletionMethod {
    CompletionMethod::Evaluated {
        criteria: criteria
            .iter()
            .map(|id| CriterionId(id.to_string()))
            .collect(),
    }
}

pub(super) fn seeded_catalog() -> InMemoryTargetCatalog {
    let catalog = InMemoryTargetCatalog::default();
    catalog
        .add_course(Course {
            id: CourseId(COURSE.to_string()),
            name: "Founder School".to_string(),
            ends_at: Some(Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap()),
        })
        .unwrap();

    for group in [
        group(TEAM, None, None),
        group(LEARNER_A, Some(TEAM), None),
        group(LEARNER_B, Some(TEAM), None),
        group(SOLO, None, None),
        group(
            EXPIRED,
            None,
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()),
        ),
    ] {
        catalog.add_learner_group(group).unwrap();
    }

    catalog
        .add_criterion(criterion(QUALITY, "Quality of work"))
        .unwrap();
    catalog.add_criterion(criterion(CLARITY, "Clarity")).unwrap();

    catalog
        .add_coach(Coach {
            id: coach_id(COACH),
            name: "Jordan Lee".to_string(),
            title: "Mentor".to_string(),
            course_ids: vec![CourseId(COURSE.to_string())],
            group_ids: Vec::new(),
        })
        .unwrap();
    catalog
        .add_coach(Coach {
            id: coach_id(OUTSIDE_COACH),
            name: "Riley Moss".to_string(),
            title: "Guest".to_string(),
            course_ids: Vec::new(),
            group_ids: Vec::new(),
        })
        .unwrap();
    catalog
        .add_coach(Coach {
            id: coach_id(TEAM_COACH),
            name: "Casey Hart".to_string(),
            title: "Team Coach".to_string(),
            course_ids: Vec::new(),
            group_ids: vec![group_id(TEAM)],
        })
        .unwrap();

    let mut quiz_target = target(
        QUIZ,
        TargetRole::Individual,
        false,
        &[],
        CompletionMethod::Quiz(quiz()),
    );
    quiz_target.days_to_complete = Some(60);

    for target in [
        target(
            BASICS,
            TargetRole::Individual,
            false,
            &[],
            CompletionMethod::MarkAsComplete,
        ),
        target(
            ESSAY,
            TargetRole::Individual,
            true,
            &[],
            evaluated(&[QUALITY, CLARITY]),
        ),
        target(
            FINAL,
            TargetRole::Individual,
            false,
            &[BASICS],
            evaluated(&[QUALITY]),
        ),
        target(
            WRAPUP,
            TargetRole::Individual,
            true,
            &[BASICS],
            CompletionMethod::MarkAsComplete,
        ),
        quiz_target,
        target(
            HANDBOOK,
            TargetRole::Individual,
            true,
            &[],
            CompletionMethod::LinkToComplete {
                url: HANDBOOK_URL.to_string(),
            },
        ),
        target(
            INTRO,
            TargetRole::Individual,
            true,
            &[],
            CompletionMethod::MarkAsComplete,
        ),
        target(
            TEAM_PITCH,
            TargetRole::Team,
            true,
            &[],
            evaluated(&[QUALITY]),
        ),
    ] {
        catalog.add_target(target).unwrap();
    }

    catalog
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryTargetCatalog>,
    Arc<InMemorySubmissionStore>,
) {
    build_service_with(EligibilityConfig::default(), now())
}

pub(super) fn build_service_with(
    config: EligibilityConfig,
    at: DateTime<Utc>,
) -> (
    MemoryService,
    Arc<InMemoryTargetCatalog>,
    Arc<InMemorySubmissionStore>,
) {
    let catalog = Arc::new(seeded_catalog());
    let store = Arc::new(InMemorySubmissionStore::default());
    let service = TargetService::with_clock(
        catalog.clone(),
        store.clone(),
        config,
        Arc::new(FixedClock(at)),
    );
    (service, catalog, store)
}

pub(super) fn latest_count(store: &InMemorySubmissionStore, target: &str, group: &str) -> usize {
    store
        .all()
        .unwrap()
        .iter()
        .filter(|submission| {
            submission.latest
                && submission.target_id == target_id(target)
                && submission.learner_group_id == group_id(group)
        })
        .count()
}

/// Catalog that serves extra targets on top of the seeded ones without registration checks.
pub(super) struct OverlayCatalog {
    pub(super) inner: InMemoryTargetCatalog,
    pub(super) extra: HashMap<TargetId, Target>,
}

impl OverlayCatalog {
    pub(super) fn with_cycle() -> Self {
        let mut extra = HashMap::new();
        for (id, prerequisite) in [("t-loop-a", "t-loop-b"), ("t-loop-b", "t-loop-a")] {
            let mut looping = target(
                id,
                TargetRole::Individual,
                true,
                &[],
                CompletionMethod::MarkAsComplete,
            );
            looping.prerequisites = BTreeSet::from([target_id(prerequisite)]);
            extra.insert(looping.id.clone(), looping);
        }
        Self {
            inner: seeded_catalog(),
            extra,
        }
    }
}

impl TargetCatalog for OverlayCatalog {
    fn course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        self.inner.course(id)
    }

    fn learner_group(&self, id: &LearnerGroupId) -> Result<Option<LearnerGroup>, RepositoryError> {
        self.inner.learner_group(id)
    }

    fn target(&self, id: &TargetId) -> Result<Option<Target>, RepositoryError> {
        match self.extra.get(id) {
            Some(target) => Ok(Some(target.clone())),
            None => self.inner.target(id),
        }
    }

    fn criterion(&self, id: &CriterionId) -> Result<Option<EvaluationCriterion>, RepositoryError> {
        self.inner.criterion(id)
    }

    fn coach(&self, id: &CoachId) -> Result<Option<Coach>, RepositoryError> {
        self.inner.coach(id)
    }

    fn team_members(&self, team: &LearnerGroupId) -> Result<Vec<LearnerGroup>, RepositoryError> {
        self.inner.team_members(team)
    }
}

/// Store that loses the latest-marker race a fixed number of times before delegating.
#[derive(Default)]
pub(super) struct ContendedStore {
    pub(super) inner: InMemorySubmissionStore,
    pub(super) conflicts: usize,
    pub(super) attempts: AtomicUsize,
}

impl ContendedStore {
    pub(super) fn losing(conflicts: usize) -> Self {
        Self {
            conflicts,
            ..Self::default()
        }
    }

    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SubmissionStore for ContendedStore {
    fn latest(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Option<Submission>, RepositoryError> {
        self.inner.latest(target, group)
    }

    fn history(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        self.inner.history(target, group)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn record_latest(
        &self,
        expected_latest: Option<&SubmissionId>,
        submission: Submission,
    ) -> Result<Submission, RepositoryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.conflicts {
            return Err(RepositoryError::Conflict);
        }
        self.inner.record_latest(expected_latest, submission)
    }

    fn record_evaluation(
        &self,
        id: &SubmissionId,
        evaluation: Evaluation,
    ) -> Result<Submission, RepositoryError> {
        self.inner.record_evaluation(id, evaluation)
    }

    fn append_feedback(
        &self,
        id: &SubmissionId,
        feedback: Feedback,
    ) -> Result<Submission, RepositoryError> {
        self.inner.append_feedback(id, feedback)
    }

    fn remove_latest(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        self.inner.remove_latest(id)
    }
}

pub(super) struct UnavailableStore;

impl SubmissionStore for UnavailableStore {
    fn latest(
        &self,
        _target: &TargetId,
        _group: &LearnerGroupId,
    ) -> Result<Option<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(
        &self,
        _target: &TargetId,
        _group: &LearnerGroupId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record_latest(
        &self,
        _expected_latest: Option<&SubmissionId>,
        _submission: Submission,
    ) -> Result<Submission, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record_evaluation(
        &self,
        _id: &SubmissionId,
        _evaluation: Evaluation,
    ) -> Result<Submission, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn append_feedback(
        &self,
        _id: &SubmissionId,
        _feedback: Feedback,
    ) -> Result<Submission, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove_latest(&self, _id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// A write another coach commits while the service is between reading and grading a submission.
pub(super) enum Interleaved {
    Feedback(Feedback),
    Evaluation(Evaluation),
}

/// Store that commits one interleaved write right before the first evaluation it receives.
#[derive(Default)]
pub(super) struct InterleavedStore {
    pub(super) inner: InMemorySubmissionStore,
    pub(super) pending: Mutex<Option<Interleaved>>,
}

impl InterleavedStore {
    pub(super) fn before_evaluation(write: Interleaved) -> Self {
        Self {
            pending: Mutex::new(Some(write)),
            ..Self::default()
        }
    }
}

impl SubmissionStore for InterleavedStore {
    fn latest(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Option<Submission>, RepositoryError> {
        self.inner.latest(target, group)
    }

    fn history(
        &self,
        target: &TargetId,
        group: &LearnerGroupId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        self.inner.history(target, group)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn record_latest(
        &self,
        expected_latest: Option<&SubmissionId>,
        submission: Submission,
    ) -> Result<Submission, RepositoryError> {
        self.inner.record_latest(expected_latest, submission)
    }

    fn record_evaluation(
        &self,
        id: &SubmissionId,
        evaluation: Evaluation,
    ) -> Result<Submission, RepositoryError> {
        let pending = self.pending.lock().unwrap().take();
        match pending {
            Some(Interleaved::Feedback(feedback)) => {
                self.inner.append_feedback(id, feedback)?;
            }
            Some(Interleaved::Evaluation(other)) => {
                self.inner.record_evaluation(id, other)?;
            }
            None => {}
        }
        self.inner.record_evaluation(id, evaluation)
    }

    fn append_feedback(
        &self,
        id: &SubmissionId,
        feedback: Feedback,
    ) -> Result<Submission, RepositoryError> {
        self.inner.append_feedback(id, feedback)
    }

    fn remove_latest(&self, id: &SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        self.inner.remove_latest(id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
