use crate::infra::{
    seed_catalog, FixedClock, COACH_ID, COMMUNICATION_ID, CURRICULUM, EVIDENCE_ID, HANDBOOK_ID,
    INTERVIEWS_ID, LENA_ID, MARKET_QUIZ_ID, OMAR_ID, ORIENTATION_ID, PITCH_ID,
};
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use targetline::error::AppError;
use targetline::workflows::admissions::{AdmissionsImporter, AdmissionsSummary, CountTable};
use targetline::workflows::targets::{
    AnswerOptionId, CoachId, CriterionGrade, CriterionId, EligibilityConfig,
    InMemorySubmissionStore, InMemoryTargetCatalog, LearnerGroupId, QuestionId, QuizAnswer,
    SubmissionDraft, TargetId, TargetService, TargetServiceError, TargetStatus,
};

type DemoService = TargetService<InMemoryTargetCatalog, InMemorySubmissionStore>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First day of the sample course (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) course_start: Option<NaiveDate>,
    /// How many days into the course the walk-through happens. The course runs for 90 days.
    #[arg(long, default_value_t = 7)]
    pub(crate) days_in: i64,
    /// Let a new submission supersede one that is still awaiting review.
    #[arg(long)]
    pub(crate) allow_resubmit_under_review: bool,
    /// Share of correct quiz answers required to pass (0.0 - 1.0).
    #[arg(long)]
    pub(crate) quiz_pass_ratio: Option<f32>,
}

#[derive(Args, Debug)]
pub(crate) struct AdmissionsReportArgs {
    /// Applicant export with Name, Reference and Paid columns
    #[arg(long)]
    pub(crate) applicants: PathBuf,
    /// Payment export with Application ID, University Location and Paid At columns
    #[arg(long)]
    pub(crate) applications: PathBuf,
    /// Print the summary as JSON instead of tables
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_admissions_report(args: AdmissionsReportArgs) -> Result<(), AppError> {
    let AdmissionsReportArgs {
        applicants,
        applications,
        json,
    } = args;

    let summary = AdmissionsImporter::from_paths(&applicants, &applications)?;
    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Admissions summary unavailable: {err}"),
        }
        return Ok(());
    }

    render_admissions_summary(&summary);
    Ok(())
}

fn render_admissions_summary(summary: &AdmissionsSummary) {
    println!("Admissions report");
    render_count_table(
        "Paid applicants by reference",
        &summary.paid_applicants_by_reference,
    );
    render_count_table(
        "Paid applications by university location",
        &summary.paid_applications_by_location,
    );
    render_count_table(
        "Paid applications by day",
        &summary.paid_applications_by_date,
    );
}

fn render_count_table(title: &str, table: &CountTable) {
    println!("\n{title} (total {})", table.total());
    if table.is_empty() {
        println!("  - none");
        return;
    }
    for (label, count) in table.iter() {
        println!("  - {label}: {count}");
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        course_start,
        days_in,
        allow_resubmit_under_review,
        quiz_pass_ratio,
    } = args;

    let course_start = course_start.unwrap_or_else(|| Utc::now().date_naive());
    let opened_at = Utc.from_utc_datetime(&course_start.and_time(NaiveTime::default()));
    let now = opened_at + Duration::days(days_in) + Duration::hours(12);
    let config = EligibilityConfig::new(
        !allow_resubmit_under_review,
        quiz_pass_ratio.unwrap_or(0.0).clamp(0.0, 1.0),
    );

    let catalog = Arc::new(seed_catalog(opened_at).map_err(TargetServiceError::from)?);
    let service: DemoService = TargetService::with_clock(
        catalog,
        Arc::new(InMemorySubmissionStore::default()),
        config,
        Arc::new(FixedClock(now)),
    );

    let lena = group(LENA_ID);
    let omar = group(OMAR_ID);

    println!("Target progress demo");
    println!(
        "Course opened {} | evaluating day {} | pending reviews {} | quiz pass ratio {:.2}",
        course_start,
        days_in,
        if service.config().block_while_under_review {
            "block resubmission"
        } else {
            "are superseded"
        },
        service.config().quiz_pass_ratio
    );
    render_statuses(&service, "Lena", &lena)?;

    println!("\nLena completes orientation");
    let Some(submission) = report(service.auto_verify(&target(ORIENTATION_ID), &lena)) else {
        return Ok(());
    };
    println!("- {} ({})", submission.description, submission.id.0);

    println!("\nLena opens the founder handbook");
    let Some(visit) = report(service.visit_link(&target(HANDBOOK_ID), &lena)) else {
        return Ok(());
    };
    println!("- Redirect to {}", visit.url);

    println!("\nLena takes the market sizing quiz");
    let answers = vec![
        quiz_answer("q-tam", "q-tam-a"),
        quiz_answer("q-som", "q-som-a"),
    ];
    let Some(attempt) = report(service.take_quiz(&target(MARKET_QUIZ_ID), &lena, answers)) else {
        return Ok(());
    };
    println!(
        "- {} -> {}",
        attempt.result.description, attempt.result.status
    );
    for question in &attempt.result.questions {
        println!(
            "  - {} chosen: {} | correct: {}{}",
            question.question,
            question.chosen_answer.as_deref().unwrap_or("(no answer)"),
            question.correct_answer,
            if question.is_correct { "" } else { " (missed)" }
        );
    }

    let interviews = target(INTERVIEWS_ID);
    println!("\nLena submits customer interviews for team Northwind");
    let draft = SubmissionDraft {
        description: "Interviewed five shop owners about inventory tracking.".to_string(),
        links: vec!["https://example.com/northwind/interview-notes".to_string()],
        files: Vec::new(),
    };
    let Some(first) = report(service.submit(&interviews, &lena, draft.clone())) else {
        return Ok(());
    };
    println!(
        "- Recorded {} against {}",
        first.id.0, first.learner_group_id.0
    );
    println!(
        "- Omar sees {} until orientation is complete",
        service.status(&interviews, &omar)?.label()
    );
    let Some(_) = report(service.auto_verify(&target(ORIENTATION_ID), &omar)) else {
        return Ok(());
    };
    println!(
        "- After orientation Omar sees {}",
        service.status(&interviews, &omar)?.label()
    );

    let eligibility = service.can_submit(&interviews, &omar)?;
    match eligibility.reason {
        Some(reason) => println!("- Another submission now: denied ({})", reason.message()),
        None => println!("- Another submission now: allowed"),
    }

    let coach = CoachId(COACH_ID.to_string());
    println!("\nCoach Amara reviews the interviews");
    let Some(graded) = report(service.grade(
        &first.id,
        &coach,
        vec![grade(EVIDENCE_ID, 1), grade(COMMUNICATION_ID, 3)],
    )) else {
        return Ok(());
    };
    println!("- {} is {}", graded.id.0, graded.outcome().label());
    report(service.add_feedback(
        &first.id,
        &coach,
        "Great notes. Add the interview questions and quote customers directly.",
    ));

    let Some(second) = report(service.submit(&interviews, &omar, draft)) else {
        return Ok(());
    };
    let Some(graded) = report(service.grade(
        &second.id,
        &coach,
        vec![grade(EVIDENCE_ID, 3), grade(COMMUNICATION_ID, 2)],
    )) else {
        return Ok(());
    };
    println!(
        "- Omar resubmitted as {} -> {}",
        graded.id.0,
        graded.outcome().label()
    );

    println!("\nSubmissions & feedback");
    for view in service.submissions(&interviews, &lena)? {
        let grades: Vec<String> = view.grades.iter().map(|grade| grade.summary()).collect();
        println!(
            "- {} [{}{}] {}",
            view.submission_id,
            view.status,
            if view.latest { ", latest" } else { "" },
            grades.join("; ")
        );
        for feedback in &view.feedback {
            println!("  - {}: {}", feedback.coach_name, feedback.feedback);
        }
    }

    println!("\nTeammates still to read the handbook");
    let pending = service.pending_team_members(&target(HANDBOOK_ID), &lena)?;
    if pending.is_empty() {
        println!("- none");
    }
    for member in pending {
        println!("- {}", member.notice);
    }

    let header = service.header(&target(PITCH_ID), &lena, true)?;
    println!(
        "\nNext up: {} ({:?}) {}",
        header.title,
        header.icon,
        header.date_line.unwrap_or_default()
    );

    render_statuses(&service, "Lena", &lena)?;
    render_statuses(&service, "Omar", &omar)?;
    Ok(())
}

fn render_statuses(
    service: &DemoService,
    name: &str,
    group: &LearnerGroupId,
) -> Result<(), AppError> {
    println!("\nCurriculum for {name}");
    for id in CURRICULUM {
        let status = service.status(&target(id), group)?;
        match status {
            TargetStatus::Locked(reason) => {
                println!("- {id}: {} ({})", status.label(), reason.message())
            }
            _ => println!("- {id}: {}", status.label()),
        }
    }
    Ok(())
}

fn report<T>(result: Result<T, TargetServiceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            println!("  Rejected: {err}");
            None
        }
    }
}

fn target(id: &str) -> TargetId {
    TargetId(id.to_string())
}

fn group(id: &str) -> LearnerGroupId {
    LearnerGroupId(id.to_string())
}

fn grade(criterion: &str, grade: u8) -> CriterionGrade {
    CriterionGrade {
        criterion_id: CriterionId(criterion.to_string()),
        grade,
    }
}

fn quiz_answer(question: &str, option: &str) -> QuizAnswer {
    QuizAnswer {
        question_id: QuestionId(question.to_string()),
        option_id: AnswerOptionId(option.to_string()),
    }
}
