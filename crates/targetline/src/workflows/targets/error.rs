use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::eligibility::{IneligibilityReason, ValidationError};
use super::repository::{CatalogError, RepositoryError};

/// Kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Course,
    LearnerGroup,
    Target,
    Submission,
    Coach,
    Criterion,
}

impl RecordKind {
    pub const fn label(self) -> &'static str {
        match self {
            RecordKind::Course => "course",
            RecordKind::LearnerGroup => "learner group",
            RecordKind::Target => "target",
            RecordKind::Submission => "submission",
            RecordKind::Coach => "coach",
            RecordKind::Criterion => "evaluation criterion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} '{id}' not found", .kind.label())]
pub struct NotFoundError {
    pub kind: RecordKind,
    pub id: String,
}

impl NotFoundError {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Error raised by the target service and its components.
#[derive(Debug, thiserror::Error)]
pub enum TargetServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("target has already been passed and cannot be completed again")]
    AlreadyPassed,
    #[error("submission not accepted: {}", .0.message())]
    Ineligible(IneligibilityReason),
    #[error("submission state changed while saving, please try again")]
    TryAgain,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TargetServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TargetServiceError::Validation(_) | TargetServiceError::Catalog(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            TargetServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            TargetServiceError::AlreadyPassed | TargetServiceError::Ineligible(_) => {
                StatusCode::CONFLICT
            }
            TargetServiceError::TryAgain => StatusCode::SERVICE_UNAVAILABLE,
            TargetServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TargetServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            TargetServiceError::Ineligible(reason) => json!({
                "error": self.to_string(),
                "reason": reason.message(),
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<IneligibilityReason> for TargetServiceError {
    fn from(reason: IneligibilityReason) -> Self {
        match reason {
            IneligibilityReason::AlreadyPassed => TargetServiceError::AlreadyPassed,
            other => TargetServiceError::Ineligible(other),
        }
    }
}
