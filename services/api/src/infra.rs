use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use targetline::workflows::targets::{
    AnswerOption, AnswerOptionId, CatalogRegistrationError, Clock, Coach, CoachId,
    CompletionMethod, Course, CourseId, CriterionId, EvaluationCriterion, InMemoryTargetCatalog,
    LearnerGroup, LearnerGroupId, QuestionId, Quiz, QuizQuestion, Target, TargetId, TargetRole,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const COURSE_ID: &str = "course-launchpad";
pub(crate) const COACH_ID: &str = "coach-amara";
pub(crate) const TEAM_ID: &str = "team-northwind";
pub(crate) const LENA_ID: &str = "learner-lena";
pub(crate) const OMAR_ID: &str = "learner-omar";
pub(crate) const PRIYA_ID: &str = "learner-priya";

pub(crate) const EVIDENCE_ID: &str = "crit-evidence";
pub(crate) const COMMUNICATION_ID: &str = "crit-communication";

pub(crate) const ORIENTATION_ID: &str = "t-orientation";
pub(crate) const HANDBOOK_ID: &str = "t-handbook";
pub(crate) const MARKET_QUIZ_ID: &str = "t-market-quiz";
pub(crate) const INTERVIEWS_ID: &str = "t-customer-interviews";
pub(crate) const PITCH_ID: &str = "t-demo-day-pitch";

/// Targets in the order they appear on the sample curriculum.
pub(crate) const CURRICULUM: [&str; 5] = [
    ORIENTATION_ID,
    HANDBOOK_ID,
    MARKET_QUIZ_ID,
    INTERVIEWS_ID,
    PITCH_ID,
];

/// Clock pinned to one instant, used when the demo evaluates a chosen day.
pub(crate) struct FixedClock(pub(crate) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Sample launchpad course with one team of two and a solo learner. The course closes 90 days
/// after `opened_at`.
pub(crate) fn seed_catalog(
    opened_at: DateTime<Utc>,
) -> Result<InMemoryTargetCatalog, CatalogRegistrationError> {
    let catalog = InMemoryTargetCatalog::default();
    let course_id = CourseId(COURSE_ID.to_string());

    catalog.add_course(Course {
        id: course_id.clone(),
        name: "Startup Launchpad".to_string(),
        ends_at: Some(opened_at + Duration::days(90)),
    })?;

    for (id, name, team) in [
        (TEAM_ID, "Northwind", None),
        (LENA_ID, "Lena", Some(TEAM_ID)),
        (OMAR_ID, "Omar", Some(TEAM_ID)),
        (PRIYA_ID, "Priya", None),
    ] {
        catalog.add_learner_group(LearnerGroup {
            id: LearnerGroupId(id.to_string()),
            course_id: course_id.clone(),
            name: name.to_string(),
            team: team.map(|team| LearnerGroupId(team.to_string())),
            access_ends_at: None,
            iteration: 1,
        })?;
    }

    for (id, name) in [
        (EVIDENCE_ID, "Evidence of customer research"),
        (COMMUNICATION_ID, "Communication"),
    ] {
        catalog.add_criterion(EvaluationCriterion {
            id: CriterionId(id.to_string()),
            course_id: course_id.clone(),
            name: name.to_string(),
            pass_grade: 2,
            max_grade: 3,
            grade_labels: Vec::new(),
        })?;
    }

    catalog.add_coach(Coach {
        id: CoachId(COACH_ID.to_string()),
        name: "Amara Okafor".to_string(),
        title: "Program Coach".to_string(),
        course_ids: vec![course_id.clone()],
        group_ids: Vec::new(),
    })?;

    let target = |id: &str, title: &str, role, resubmittable, prerequisites: &[&str], completion| {
        Target {
            id: TargetId(id.to_string()),
            course_id: course_id.clone(),
            title: title.to_string(),
            type_description: "Task".to_string(),
            role,
            resubmittable,
            days_to_complete: None,
            session_at: None,
            points_earnable: None,
            prerequisites: prerequisites
                .iter()
                .map(|id| TargetId(id.to_string()))
                .collect::<BTreeSet<_>>(),
            completion,
        }
    };

    let mut orientation = target(
        ORIENTATION_ID,
        "Complete the orientation checklist",
        TargetRole::Individual,
        false,
        &[],
        CompletionMethod::MarkAsComplete,
    );
    orientation.days_to_complete = Some(3);

    let handbook = target(
        HANDBOOK_ID,
        "Read the founder handbook",
        TargetRole::Individual,
        true,
        &[],
        CompletionMethod::LinkToComplete {
            url: "https://example.com/launchpad/handbook".to_string(),
        },
    );

    let mut market_quiz = target(
        MARKET_QUIZ_ID,
        "Market sizing quiz",
        TargetRole::Individual,
        false,
        &[ORIENTATION_ID],
        CompletionMethod::Quiz(market_quiz()),
    );
    market_quiz.days_to_complete = Some(7);

    let mut interviews = target(
        INTERVIEWS_ID,
        "Run five customer interviews",
        TargetRole::Team,
        true,
        &[ORIENTATION_ID],
        CompletionMethod::Evaluated {
            criteria: vec![
                CriterionId(EVIDENCE_ID.to_string()),
                CriterionId(COMMUNICATION_ID.to_string()),
            ],
        },
    );
    interviews.points_earnable = Some(20);
    interviews.days_to_complete = Some(14);

    let mut pitch = target(
        PITCH_ID,
        "Present at demo day",
        TargetRole::Team,
        false,
        &[INTERVIEWS_ID],
        CompletionMethod::Evaluated {
            criteria: vec![CriterionId(COMMUNICATION_ID.to_string())],
        },
    );
    pitch.type_description = "Session".to_string();
    pitch.session_at = Some(opened_at + Duration::days(60));

    for target in [orientation, handbook, market_quiz, interviews, pitch] {
        catalog.add_target(target)?;
    }

    Ok(catalog)
}

fn market_quiz() -> Quiz {
    let question = |id: &str, text: &str, options: &[(&str, &str)], correct: &str| QuizQuestion {
        id: QuestionId(id.to_string()),
        question: text.to_string(),
        description: None,
        options: options
            .iter()
            .map(|(option, value)| AnswerOption {
                id: AnswerOptionId(option.to_string()),
                value: value.to_string(),
            })
            .collect(),
        correct_option: AnswerOptionId(correct.to_string()),
    };

    Quiz {
        questions: vec![
            question(
                "q-tam",
                "What does TAM stand for?",
                &[
                    ("q-tam-a", "Total addressable market"),
                    ("q-tam-b", "Target acquisition model"),
                ],
                "q-tam-a",
            ),
            question(
                "q-som",
                "Which market is the smallest?",
                &[
                    ("q-som-a", "Serviceable available market"),
                    ("q-som-b", "Serviceable obtainable market"),
                ],
                "q-som-b",
            ),
        ],
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
