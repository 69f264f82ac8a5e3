use super::common::*;
use std::sync::Arc;
use std::thread;

use crate::workflows::targets::domain::TargetStatus;
use crate::workflows::targets::{
    EligibilityConfig, Evaluation, Feedback, HeaderIcon, InMemorySubmissionStore, RecordKind,
    SubmissionStore, TargetService, TargetServiceError, ValidationError,
};

#[test]
fn one_failing_criterion_fails_the_submission() {
    let (service, _, _) = build_service();
    let essay = target_id(ESSAY);
    let solo = group_id(SOLO);

    let submission = service.submit(&essay, &solo, draft()).expect("submitted");
    let graded = service
        .grade(
            &submission.id,
            &coach_id(COACH),
            vec![grade(QUALITY, 2), grade(CLARITY, 1)],
        )
        .expect("graded");

    assert!(graded.evaluated_at.is_some());
    assert!(graded.passed_at.is_none());
    assert_eq!(graded.evaluator, Some(coach_id(COACH)));
    assert_eq!(service.status(&essay, &solo).unwrap(), TargetStatus::Failed);
}

#[test]
fn grading_requires_every_criterion_within_range() {
    let (service, _, _) = build_service();
    let submission = service
        .submit(&target_id(ESSAY), &group_id(SOLO), draft())
        .expect("submitted");
    let coach = coach_id(COACH);

    assert!(matches!(
        service.grade(&submission.id, &coach, vec![grade(QUALITY, 2)]),
        Err(TargetServiceError::Validation(ValidationError::MissingGrade { criterion }))
            if criterion == "Clarity"
    ));
    assert!(matches!(
        service.grade(
            &submission.id,
            &coach,
            vec![grade(QUALITY, 4), grade(CLARITY, 2)]
        ),
        Err(TargetServiceError::Validation(ValidationError::GradeOutOfRange {
            grade: 4,
            max: 3,
            ..
        }))
    ));
    assert!(matches!(
        service.grade(
            &submission.id,
            &coach,
            vec![grade(QUALITY, 2), grade(CLARITY, 2), grade("crit-other", 2)]
        ),
        Err(TargetServiceError::Validation(
            ValidationError::UnexpectedCriterion { .. }
        ))
    ));
    assert!(matches!(
        service.grade(
            &submission.id,
            &coach_id("coach-nobody"),
            vec![grade(QUALITY, 2), grade(CLARITY, 2)]
        ),
        Err(TargetServiceError::NotFound(error)) if error.kind == RecordKind::Coach
    ));

    service
        .grade(
            &submission.id,
            &coach,
            vec![grade(CLARITY, 3), grade(QUALITY, 2)],
        )
        .expect("complete grades accepted");
    assert!(matches!(
        service.grade(
            &submission.id,
            &coach,
            vec![grade(QUALITY, 3), grade(CLARITY, 3)]
        ),
        Err(TargetServiceError::Validation(
            ValidationError::AlreadyEvaluated
        ))
    ));
}

#[test]
fn only_the_latest_submission_can_be_graded() {
    let (service, _, _) = build_service_with(EligibilityConfig::new(false, 0.0), now());
    let essay = target_id(ESSAY);
    let solo = group_id(SOLO);

    let first = service.submit(&essay, &solo, draft()).expect("first");
    service.submit(&essay, &solo, draft()).expect("second");

    assert!(matches!(
        service.grade(
            &first.id,
            &coach_id(COACH),
            vec![grade(QUALITY, 3), grade(CLARITY, 3)]
        ),
        Err(TargetServiceError::Validation(ValidationError::NotLatest))
    ));
}

#[test]
fn undo_restores_the_previous_submission() {
    let (service, _, store) = build_service();
    let essay = target_id(ESSAY);
    let solo = group_id(SOLO);

    let first = service.submit(&essay, &solo, draft()).expect("first");
    service
        .grade(
            &first.id,
            &coach_id(COACH),
            vec![grade(QUALITY, 1), grade(CLARITY, 1)],
        )
        .expect("graded");
    let second = service.submit(&essay, &solo, draft()).expect("second");
    assert_eq!(service.status(&essay, &solo).unwrap(), TargetStatus::Submitted);

    let restored = service
        .undo_submission(&solo, &second.id)
        .expect("undo succeeds")
        .expect("previous submission restored");

    assert_eq!(restored.id, first.id);
    assert!(restored.latest);
    assert_eq!(service.status(&essay, &solo).unwrap(), TargetStatus::Failed);
    assert_eq!(latest_count(&store, ESSAY, SOLO), 1);
    assert_eq!(store.all().unwrap().len(), 1);
}

#[test]
fn undo_guards_ownership_and_evaluation() {
    let (service, _, _) = build_service();
    let essay = target_id(ESSAY);
    let solo = group_id(SOLO);

    let submission = service.submit(&essay, &solo, draft()).expect("submitted");
    assert!(matches!(
        service.undo_submission(&group_id(LEARNER_A), &submission.id),
        Err(TargetServiceError::Validation(ValidationError::NotOwner))
    ));

    service
        .grade(
            &submission.id,
            &coach_id(COACH),
            vec![grade(QUALITY, 3), grade(CLARITY, 3)],
        )
        .expect("graded");
    assert!(matches!(
        service.undo_submission(&solo, &submission.id),
        Err(TargetServiceError::Validation(
            ValidationError::AlreadyEvaluated
        ))
    ));
}

#[test]
fn team_members_can_undo_team_submissions() {
    let (service, _, _) = build_service();
    let submission = service
        .submit(&target_id(TEAM_PITCH), &group_id(LEARNER_A), draft())
        .expect("submitted for the team");

    let restored = service
        .undo_submission(&group_id(LEARNER_B), &submission.id)
        .expect("teammate can withdraw");
    assert!(restored.is_none());
    assert_eq!(
        service
            .status(&target_id(TEAM_PITCH), &group_id(LEARNER_A))
            .unwrap(),
        TargetStatus::Pending
    );
}

#[test]
fn history_lists_newest_first_with_grades_and_feedback() {
    let (service, _, _) = build_service();
    let essay = target_id(ESSAY);
    let solo = group_id(SOLO);

    let first = service.submit(&essay, &solo, draft()).expect("first");
    service
        .grade(
            &first.id,
            &coach_id(COACH),
            vec![grade(QUALITY, 3), grade(CLARITY, 1)],
        )
        .expect("graded");
    service
        .add_feedback(&first.id, &coach_id(COACH), "Tighten the summary.")
        .expect("feedback from enrolled coach");
    service
        .add_feedback(&first.id, &coach_id(OUTSIDE_COACH), "Nice interviews!")
        .expect("feedback from visiting coach");
    let second = service.submit(&essay, &solo, draft()).expect("second");

    let history = service.submissions(&essay, &solo).expect("history loads");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].submission_id, second.id.0);
    assert_eq!(history[0].status, "Submitted");
    assert!(history[0].latest);

    let graded = &history[1];
    assert_eq!(graded.status, "Failed");
    let summaries: Vec<String> = graded.grades.iter().map(|grade| grade.summary()).collect();
    assert_eq!(summaries, vec!["Quality of work: Great", "Clarity: Bad"]);
    assert_eq!(graded.feedback[0].coach_name, "Jordan Lee");
    assert_eq!(graded.feedback[0].coach_title.as_deref(), Some("Mentor"));
    assert_eq!(graded.feedback[1].coach_name, "Unknown Coach");
}

#[test]
fn coaches_enrolled_with_the_team_are_named_to_its_members() {
    let (service, _, _) = build_service();
    let essay = target_id(ESSAY);
    let ada = group_id(LEARNER_A);

    let submission = service.submit(&essay, &ada, draft()).expect("submitted");
    service
        .add_feedback(&submission.id, &coach_id(TEAM_COACH), "Good start.")
        .expect("feedback from team coach");

    let history = service.submissions(&essay, &ada).expect("history loads");
    assert_eq!(history[0].feedback[0].coach_name, "Casey Hart");
    assert_eq!(
        history[0].feedback[0].coach_title.as_deref(),
        Some("Team Coach")
    );

    let solo_submission = service
        .submit(&essay, &group_id(SOLO), draft())
        .expect("solo submitted");
    service
        .add_feedback(&solo_submission.id, &coach_id(TEAM_COACH), "Keep going.")
        .expect("feedback on another learner");
    let history = service
        .submissions(&essay, &group_id(SOLO))
        .expect("history loads");
    assert_eq!(history[0].feedback[0].coach_name, "Unknown Coach");
}

#[test]
fn feedback_committed_while_grading_is_kept() {
    let catalog = Arc::new(seeded_catalog());
    let feedback = Feedback {
        coach_id: coach_id(TEAM_COACH),
        feedback: "Cite your sources.".to_string(),
        created_at: now(),
    };
    let store = Arc::new(InterleavedStore::before_evaluation(Interleaved::Feedback(
        feedback,
    )));
    let service = TargetService::with_clock(
        catalog,
        store.clone(),
        EligibilityConfig::default(),
        Arc::new(FixedClock(now())),
    );

    let submission = service
        .submit(&target_id(ESSAY), &group_id(SOLO), draft())
        .expect("submitted");
    let graded = service
        .grade(
            &submission.id,
            &coach_id(COACH),
            vec![grade(QUALITY, 3), grade(CLARITY, 3)],
        )
        .expect("graded");

    assert!(graded.is_passed());
    let stored = store
        .fetch(&submission.id)
        .unwrap()
        .expect("submission stored");
    assert_eq!(stored.feedback.len(), 1);
    assert_eq!(stored.feedback[0].feedback, "Cite your sources.");
    assert_eq!(stored.evaluator, Some(coach_id(COACH)));
}

#[test]
fn competing_grades_keep_the_first_verdict() {
    let catalog = Arc::new(seeded_catalog());
    let rival = Evaluation {
        grades: vec![grade(QUALITY, 1), grade(CLARITY, 1)],
        evaluator: coach_id(TEAM_COACH),
        evaluated_at: now(),
        passed: false,
    };
    let store = Arc::new(InterleavedStore::before_evaluation(
        Interleaved::Evaluation(rival),
    ));
    let service = TargetService::with_clock(
        catalog,
        store.clone(),
        EligibilityConfig::default(),
        Arc::new(FixedClock(now())),
    );

    let submission = service
        .submit(&target_id(ESSAY), &group_id(SOLO), draft())
        .expect("submitted");
    let result = service.grade(
        &submission.id,
        &coach_id(COACH),
        vec![grade(QUALITY, 3), grade(CLARITY, 3)],
    );

    assert!(matches!(
        result,
        Err(TargetServiceError::Validation(
            ValidationError::AlreadyEvaluated
        ))
    ));
    let stored = store
        .fetch(&submission.id)
        .unwrap()
        .expect("submission stored");
    assert_eq!(stored.evaluator, Some(coach_id(TEAM_COACH)));
    assert!(!stored.is_passed());
    assert_eq!(
        service.status(&target_id(ESSAY), &group_id(SOLO)).unwrap(),
        TargetStatus::Failed
    );
}

#[test]
fn concurrent_feedback_and_grading_are_all_kept() {
    let (service, _, store) = build_service();
    let service = Arc::new(service);
    let submission = service
        .submit(&target_id(ESSAY), &group_id(SOLO), draft())
        .expect("submitted");

    let mut handles: Vec<_> = (0..6)
        .map(|index| {
            let service = service.clone();
            let id = submission.id.clone();
            thread::spawn(move || {
                service
                    .add_feedback(&id, &coach_id(COACH), &format!("Note {index}"))
                    .map(|_| ())
            })
        })
        .collect();
    let grader = service.clone();
    let id = submission.id.clone();
    handles.push(thread::spawn(move || {
        grader
            .grade(
                &id,
                &coach_id(COACH),
                vec![grade(QUALITY, 2), grade(CLARITY, 2)],
            )
            .map(|_| ())
    }));

    for handle in handles {
        handle.join().expect("thread completes").expect("write accepted");
    }

    let stored = store
        .fetch(&submission.id)
        .unwrap()
        .expect("submission stored");
    assert_eq!(stored.feedback.len(), 6);
    assert!(stored.is_passed());
}

#[test]
fn blank_feedback_is_rejected() {
    let (service, _, _) = build_service();
    let submission = service
        .submit(&target_id(ESSAY), &group_id(SOLO), draft())
        .expect("submitted");
    assert!(matches!(
        service.add_feedback(&submission.id, &coach_id(COACH), "   "),
        Err(TargetServiceError::Validation(ValidationError::EmptyFeedback))
    ));
}

#[test]
fn pending_team_members_lists_teammates_without_a_pass() {
    let (service, _, _) = build_service();
    let intro = target_id(INTRO);

    assert_eq!(
        service
            .pending_team_members(&intro, &group_id(LEARNER_A))
            .expect("team progress")
            .iter()
            .map(|member| member.notice.as_str())
            .collect::<Vec<_>>(),
        vec!["Ben has not completed this target."]
    );

    service
        .auto_verify(&intro, &group_id(LEARNER_B))
        .expect("ben completes");
    assert!(service
        .pending_team_members(&intro, &group_id(LEARNER_A))
        .expect("team progress")
        .is_empty());

    assert!(service
        .pending_team_members(&target_id(TEAM_PITCH), &group_id(LEARNER_A))
        .expect("team targets have no per-member progress")
        .is_empty());
    assert!(service
        .pending_team_members(&intro, &group_id(SOLO))
        .expect("solo learners have no team")
        .is_empty());
}

#[test]
fn header_reflects_status_and_time_required() {
    let (service, _, _) = build_service();
    let header = service
        .header(&target_id(QUIZ), &group_id(SOLO), false)
        .expect("header resolves");

    assert_eq!(header.icon, HeaderIcon::PersonalTodo);
    assert_eq!(header.date_line.as_deref(), Some("Time required: 60 days"));
    assert_eq!(header.status, "Pending");
}

#[test]
fn quiz_scores_one_of_two_and_passes_by_default() {
    let (service, _, store) = build_service();
    let attempt = service
        .take_quiz(
            &target_id(QUIZ),
            &group_id(SOLO),
            vec![answer("q1", "o1"), answer("q2", "o4")],
        )
        .expect("quiz recorded");

    assert_eq!(attempt.score.to_string(), "1/2");
    assert_eq!(attempt.submission.quiz_score.as_deref(), Some("1/2"));
    assert_eq!(
        attempt.submission.description,
        "Target 'Title of t-quiz' was completed by answering a quiz"
    );
    assert_eq!(attempt.result.status, "Passed");
    assert_eq!(
        attempt.result.questions[0].chosen_answer.as_deref(),
        Some("Option o1")
    );
    assert_eq!(attempt.result.questions[0].correct_answer, "Option o2");
    assert_eq!(
        service
            .status(&target_id(QUIZ), &group_id(SOLO))
            .unwrap(),
        TargetStatus::Passed
    );
    assert_eq!(latest_count(&store, QUIZ, SOLO), 1);
}

#[test]
fn quiz_answers_must_reference_known_options() {
    let (service, _, store) = build_service();
    assert!(matches!(
        service.take_quiz(
            &target_id(QUIZ),
            &group_id(SOLO),
            vec![answer("q1", "o9")]
        ),
        Err(TargetServiceError::Validation(
            ValidationError::UnknownAnswerOption { .. }
        ))
    ));
    assert!(matches!(
        service.take_quiz(
            &target_id(QUIZ),
            &group_id(SOLO),
            vec![answer("q7", "o1")]
        ),
        Err(TargetServiceError::Validation(
            ValidationError::UnknownQuestion { .. }
        ))
    ));
    assert!(store.all().unwrap().is_empty());
}

#[test]
fn lost_race_is_retried_once() {
    let catalog = Arc::new(seeded_catalog());
    let store = Arc::new(ContendedStore::losing(1));
    let service = TargetService::with_clock(
        catalog,
        store.clone(),
        EligibilityConfig::default(),
        Arc::new(FixedClock(now())),
    );

    service
        .submit(&target_id(ESSAY), &group_id(SOLO), draft())
        .expect("second attempt succeeds");
    assert_eq!(store.attempts(), 2);
}

#[test]
fn repeated_lost_races_surface_try_again() {
    let catalog = Arc::new(seeded_catalog());
    let store = Arc::new(ContendedStore::losing(usize::MAX));
    let service = TargetService::with_clock(
        catalog,
        store.clone(),
        EligibilityConfig::default(),
        Arc::new(FixedClock(now())),
    );

    let error = service
        .submit(&target_id(ESSAY), &group_id(SOLO), draft())
        .expect_err("store never accepts the write");
    assert!(matches!(error, TargetServiceError::TryAgain));
    assert_eq!(error.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(store.attempts(), 2);
    assert!(store.inner.all().unwrap().is_empty());
}

#[test]
fn concurrent_submissions_leave_a_single_latest() {
    let catalog = Arc::new(seeded_catalog());
    let store = Arc::new(InMemorySubmissionStore::default());
    let service = Arc::new(TargetService::with_clock(
        catalog,
        store.clone(),
        EligibilityConfig::new(false, 0.0),
        Arc::new(FixedClock(now())),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            thread::spawn(move || service.submit(&target_id(ESSAY), &group_id(SOLO), draft()))
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.join().expect("thread completes") {
            Ok(_) => accepted += 1,
            Err(TargetServiceError::TryAgain) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert!(accepted >= 1);
    assert_eq!(store.all().unwrap().len(), accepted);
    assert_eq!(latest_count(&store, ESSAY, SOLO), 1);
}
