//! Error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diyguide_core::DiyGuideError;
use serde::Serialize;

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl From<&DiyGuideError> for ErrorBody {
    fn from(err: &DiyGuideError) -> Self {
        let details = match err {
            DiyGuideError::Validation { missing, .. } => missing.clone(),
            DiyGuideError::StructureViolation { problems } => problems.clone(),
            _ => Vec::new(),
        };
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
            stage: err.stage().map(|s| s.to_string()),
            details,
        }
    }
}

/// An error returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                error: message.into(),
                kind: "not_found".to_string(),
                stage: None,
                details: Vec::new(),
            },
        }
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(err: &DiyGuideError) -> StatusCode {
    match err {
        DiyGuideError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DiyGuideError::Configuration { .. } => StatusCode::PRECONDITION_FAILED,
        DiyGuideError::RunInProgress => StatusCode::CONFLICT,
        DiyGuideError::Search(_)
        | DiyGuideError::NoSearchResults { .. }
        | DiyGuideError::Reasoning { .. }
        | DiyGuideError::StructureViolation { .. } => StatusCode::BAD_GATEWAY,
        DiyGuideError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DiyGuideError> for ApiError {
    fn from(err: DiyGuideError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorBody::from(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diyguide_core::{CredentialKind, ReasoningError, ReasoningFailureKind, SearchError, Stage};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                DiyGuideError::Validation {
                    missing: vec!["budget".into()],
                    message: "missing".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DiyGuideError::missing_credential(CredentialKind::Search),
                StatusCode::PRECONDITION_FAILED,
            ),
            (DiyGuideError::RunInProgress, StatusCode::CONFLICT),
            (SearchError::Timeout.into(), StatusCode::BAD_GATEWAY),
            (
                ReasoningError::new(ReasoningFailureKind::BadRequest, "bad")
                    .in_stage(Stage::Synthesizing),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DiyGuideError::StructureViolation { problems: vec![] },
                StatusCode::BAD_GATEWAY,
            ),
            (DiyGuideError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err}");
        }
    }

    #[test]
    fn test_body_carries_kind_and_stage() {
        let err = ReasoningError::new(ReasoningFailureKind::Unauthorized, "bad key")
            .in_stage(Stage::Researching);
        let body = ErrorBody::from(&err);
        assert_eq!(body.kind, "reasoning_provider");
        assert_eq!(body.stage.as_deref(), Some("research"));
        assert!(body.details.is_empty());
    }
}
