//! Session credential endpoints. Keys are accepted but never echoed back.

use axum::{extract::State, http::StatusCode, Json};
use diyguide_pipeline::{ApiKey, Credentials};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

/// Keys supplied by the user. Absent fields leave the stored key untouched.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsInput {
    pub openai_api_key: Option<String>,
    pub serpapi_api_key: Option<String>,
}

impl CredentialsInput {
    pub fn into_credentials(self) -> Credentials {
        Credentials::new(
            self.openai_api_key.and_then(ApiKey::new),
            self.serpapi_api_key.and_then(ApiKey::new),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct CredentialsStatus {
    pub openai_configured: bool,
    pub serpapi_configured: bool,
}

impl From<&Credentials> for CredentialsStatus {
    fn from(credentials: &Credentials) -> Self {
        Self {
            openai_configured: credentials.reasoning.is_some(),
            serpapi_configured: credentials.search.is_some(),
        }
    }
}

pub async fn set_credentials(
    State(state): State<AppState>,
    Json(input): Json<CredentialsInput>,
) -> Json<CredentialsStatus> {
    let mut session = state.session.write().await;
    let current = std::mem::take(&mut session.credentials);
    session.credentials = input.into_credentials().or(&current);

    let status = CredentialsStatus::from(&session.credentials);
    info!(
        openai = status.openai_configured,
        serpapi = status.serpapi_configured,
        "🔑 Session credentials updated"
    );
    Json(status)
}

pub async fn get_credentials(State(state): State<AppState>) -> Json<CredentialsStatus> {
    let session = state.session.read().await;
    Json(CredentialsStatus::from(&session.credentials))
}

pub async fn clear_credentials(State(state): State<AppState>) -> StatusCode {
    state.session.write().await.credentials = Credentials::default();
    info!("🔑 Session credentials cleared");
    StatusCode::NO_CONTENT
}
