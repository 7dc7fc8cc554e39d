//! Guide generation and retrieval endpoints.

use std::str::FromStr;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use diyguide_core::{
    DiyGuideError, InstructionStyle, Location, PreferencesBuilder, ProjectGuideDocument,
    ProjectPreferences, ProjectType, RunState, SkillLevel, Timeline, Tool, ToolOpenness,
    UnknownOption, EXPORT_FILE_NAME,
};
use diyguide_pipeline::RunTrace;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::credentials::CredentialsInput;
use super::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// The preference form, using the labels from `GET /api/v1/options`.
#[derive(Debug, Default, Deserialize)]
pub struct GuideForm {
    pub project_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub available_tools: Vec<String>,
    pub open_to_extra_tools: Option<String>,
    #[serde(default)]
    pub material_preferences: Vec<String>,
    pub skill_level: Option<String>,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    #[serde(default)]
    pub safety_considerations: Vec<String>,
    pub instruction_style: Option<String>,

    /// Keys for this request only.
    #[serde(flatten)]
    pub credentials: CredentialsInput,
}

fn parse_label<T: FromStr<Err = UnknownOption>>(
    value: Option<&str>,
) -> Result<Option<T>, UnknownOption> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(label) => label.parse().map(Some),
        None => Ok(None),
    }
}

impl GuideForm {
    /// Build validated preferences. Blank selections count as missing.
    pub fn to_preferences(&self) -> Result<ProjectPreferences, DiyGuideError> {
        self.builder()
            .map_err(|e| DiyGuideError::Validation {
                missing: Vec::new(),
                message: e.to_string(),
            })?
            .build()
    }

    fn builder(&self) -> Result<PreferencesBuilder, UnknownOption> {
        let mut builder = ProjectPreferences::builder();

        if let Some(project_type) = parse_label::<ProjectType>(self.project_type.as_deref())? {
            builder = builder.project_type(project_type);
        }
        if let Some(description) = &self.description {
            builder = builder.description(description.clone());
        }
        if let Some(location) = parse_label::<Location>(self.location.as_deref())? {
            builder = builder.location(location);
        }
        for tool in &self.available_tools {
            if let Some(tool) = parse_label::<Tool>(Some(tool))? {
                builder = builder.tool(tool);
            }
        }
        if let Some(openness) = parse_label::<ToolOpenness>(self.open_to_extra_tools.as_deref())? {
            builder = builder.open_to_extra_tools(openness);
        }
        builder = builder.materials(self.material_preferences.iter().cloned());
        if let Some(level) = parse_label::<SkillLevel>(self.skill_level.as_deref())? {
            builder = builder.skill_level(level);
        }
        if let Some(budget) = &self.budget {
            builder = builder.budget(budget.clone());
        }
        if let Some(timeline) = parse_label::<Timeline>(self.timeline.as_deref())? {
            builder = builder.timeline(timeline);
        }
        builder = builder.safety_considerations(self.safety_considerations.iter().cloned());
        if let Some(style) = parse_label::<InstructionStyle>(self.instruction_style.as_deref())? {
            builder = builder.instruction_style(style);
        }

        Ok(builder)
    }
}

#[derive(Debug, Serialize)]
pub struct GuideResponse {
    pub run_id: Uuid,
    pub query: String,
    pub research_items: usize,
    pub document: ProjectGuideDocument,
    pub trace: RunTrace,
}

#[derive(Debug, Serialize)]
pub struct LastGuideResponse {
    pub query: Option<String>,
    pub document: ProjectGuideDocument,
    pub last_error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: RunState,
    pub has_document: bool,
    pub last_error: Option<ErrorBody>,
}

/// Run the pipeline for a submitted form.
pub async fn generate_guide(
    State(state): State<AppState>,
    Json(mut form): Json<GuideForm>,
) -> Result<Json<GuideResponse>, ApiError> {
    let request_credentials = std::mem::take(&mut form.credentials).into_credentials();
    let credentials = state.credentials_for(request_credentials).await;

    // Missing keys are reported before the form is even looked at.
    if let Err(err) = credentials.require() {
        return Err(state.reject(err).await.into());
    }

    let preferences = match form.to_preferences() {
        Ok(preferences) => preferences,
        Err(err) => return Err(state.reject(err).await.into()),
    };

    let outcome = state.generate(&credentials, preferences).await?;
    info!(
        "📄 Guide {} ready ({} research items)",
        outcome.document.id(),
        outcome.research_items
    );

    Ok(Json(GuideResponse {
        run_id: outcome.run_id,
        query: outcome.query,
        research_items: outcome.research_items,
        document: outcome.document,
        trace: outcome.trace,
    }))
}

/// The last good guide, with the error of any later failed run.
pub async fn get_guide(State(state): State<AppState>) -> Result<Json<LastGuideResponse>, ApiError> {
    let session = state.session.read().await;
    let document = session
        .last_document()
        .cloned()
        .ok_or_else(|| ApiError::not_found("No guide has been generated yet"))?;

    Ok(Json(LastGuideResponse {
        query: session.last_query().map(str::to_string),
        document,
        last_error: session.last_error().map(ErrorBody::from),
    }))
}

/// The last good guide as a plain-text attachment.
pub async fn download_guide(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = state.session.read().await;
    let document = session
        .last_document()
        .ok_or_else(|| ApiError::not_found("No guide has been generated yet"))?;

    let etag = format!("\"{}\"", document.content_hash());
    let matches = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag));
    let etag_value = HeaderValue::from_str(&etag)
        .map_err(|e| ApiError::from(DiyGuideError::Internal(e.to_string())))?;

    if matches {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response());
    }

    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ApiError::from(DiyGuideError::Internal(e.to_string())))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::ETAG, etag_value),
        ],
        document.to_plain_text(),
    )
        .into_response())
}

/// Discard the held guide.
pub async fn delete_guide(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state
        .session
        .write()
        .await
        .clear_document()
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ApiError::not_found("No guide to delete"))
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let run_state = state.pipeline.state().await;
    let session = state.session.read().await;
    Json(StatusResponse {
        state: run_state,
        has_document: session.last_document().is_some(),
        last_error: session.last_error().map(ErrorBody::from),
    })
}
