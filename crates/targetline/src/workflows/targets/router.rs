use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    CoachId, CriterionGrade, LearnerGroupId, QuizAnswer, SubmissionDraft, SubmissionId, TargetId,
};
use super::repository::{SubmissionStore, TargetCatalog};
use super::service::TargetService;
use super::views::{EligibilityView, TargetStatusView};

type SharedService<C, S> = Arc<TargetService<C, S>>;

#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub answers: Vec<QuizAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub coach_id: String,
    pub grades: Vec<CriterionGrade>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub coach_id: String,
    pub feedback: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HeaderQuery {
    #[serde(default)]
    pub display_date: bool,
}

/// Router exposing learner-facing target endpoints and coach review endpoints.
pub fn target_router<C, S>(service: SharedService<C, S>) -> Router
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    const PAIR: &str = "/api/v1/targets/:target_id/groups/:group_id";

    Router::new()
        .route(&format!("{PAIR}/status"), get(status_handler::<C, S>))
        .route(
            &format!("{PAIR}/eligibility"),
            get(eligibility_handler::<C, S>),
        )
        .route(
            &format!("{PAIR}/submissions"),
            get(history_handler::<C, S>).post(submit_handler::<C, S>),
        )
        .route(
            &format!("{PAIR}/submissions/:submission_id"),
            delete(undo_handler::<C, S>),
        )
        .route(&format!("{PAIR}/quiz"), post(quiz_handler::<C, S>))
        .route(
            &format!("{PAIR}/auto-verify"),
            post(auto_verify_handler::<C, S>),
        )
        .route(
            &format!("{PAIR}/link-visit"),
            post(link_visit_handler::<C, S>),
        )
        .route(
            &format!("{PAIR}/team-progress"),
            get(team_progress_handler::<C, S>),
        )
        .route(&format!("{PAIR}/header"), get(header_handler::<C, S>))
        .route(
            "/api/v1/submissions/:submission_id/grades",
            post(grade_handler::<C, S>),
        )
        .route(
            "/api/v1/submissions/:submission_id/feedback",
            post(feedback_handler::<C, S>),
        )
        .with_state(service)
}

fn pair(target_id: String, group_id: String) -> (TargetId, LearnerGroupId) {
    (TargetId(target_id), LearnerGroupId(group_id))
}

pub(crate) async fn status_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.status(&target, &group) {
        Ok(status) => {
            let view = TargetStatusView::new(&target.0, &group.0, status);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn eligibility_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.can_submit(&target, &group) {
        Ok(eligibility) => {
            (StatusCode::OK, Json(EligibilityView::from(eligibility))).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn history_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.submissions(&target, &group) {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submit_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
    Json(draft): Json<SubmissionDraft>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.submit(&target, &group, draft) {
        Ok(submission) => {
            let payload = json!({
                "submission_id": submission.id.0,
                "status": submission.outcome().label(),
                "created_at": submission.created_at,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn undo_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((_target_id, group_id, submission_id)): Path<(String, String, String)>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let group = LearnerGroupId(group_id);
    match service.undo_submission(&group, &SubmissionId(submission_id)) {
        Ok(restored) => {
            let payload = json!({
                "restored_submission_id": restored.map(|submission| submission.id.0),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn quiz_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
    Json(request): Json<QuizRequest>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.take_quiz(&target, &group, request.answers) {
        Ok(attempt) => (StatusCode::CREATED, Json(attempt.result)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn auto_verify_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.auto_verify(&target, &group) {
        Ok(submission) => {
            let payload = json!({
                "submission_id": submission.id.0,
                "description": submission.description,
                "status": submission.outcome().label(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn link_visit_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.visit_link(&target, &group) {
        Ok(visit) => {
            let payload = json!({
                "url": visit.url,
                "submission_id": visit.submission.id.0,
                "status": visit.submission.outcome().label(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn team_progress_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.pending_team_members(&target, &group) {
        Ok(pending) => (StatusCode::OK, Json(pending)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn header_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((target_id, group_id)): Path<(String, String)>,
    Query(query): Query<HeaderQuery>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let (target, group) = pair(target_id, group_id);
    match service.header(&target, &group, query.display_date) {
        Ok(header) => (StatusCode::OK, Json(header)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn grade_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(submission_id): Path<String>,
    Json(request): Json<GradeRequest>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let id = SubmissionId(submission_id);
    match service.grade(&id, &CoachId(request.coach_id), request.grades) {
        Ok(submission) => {
            let payload = json!({
                "submission_id": submission.id.0,
                "status": submission.outcome().label(),
                "evaluated_at": submission.evaluated_at,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn feedback_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(submission_id): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> Response
where
    C: TargetCatalog + 'static,
    S: SubmissionStore + 'static,
{
    let id = SubmissionId(submission_id);
    match service.add_feedback(&id, &CoachId(request.coach_id), &request.feedback) {
        Ok(submission) => {
            let payload = json!({
                "submission_id": submission.id.0,
                "feedback_count": submission.feedback.len(),
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}
