//! Application state.

use std::sync::Arc;

use diyguide_core::{DiyGuideError, ProjectPreferences, Result};
use diyguide_pipeline::{Credentials, GuidePipeline, GuideSession, RunOutcome};
use tokio::sync::RwLock;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The guide pipeline. Allows one run at a time.
    pub pipeline: Arc<GuidePipeline>,

    /// Credentials and the last good guide.
    pub session: Arc<RwLock<GuideSession>>,
}

impl AppState {
    pub fn new(pipeline: GuidePipeline, credentials: Credentials) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            session: Arc::new(RwLock::new(GuideSession::new(credentials))),
        }
    }

    /// Session credentials with any per-request keys taking precedence.
    pub async fn credentials_for(&self, request: Credentials) -> Credentials {
        let session = self.session.read().await;
        request.or(&session.credentials)
    }

    /// Run the pipeline and fold the result into the session. The session
    /// lock is not held while the run is in flight.
    pub async fn generate(
        &self,
        credentials: &Credentials,
        preferences: ProjectPreferences,
    ) -> Result<RunOutcome> {
        let result = self.pipeline.run(credentials, preferences).await;
        self.session.write().await.record(&result);
        result
    }

    /// Record a trigger rejected before the pipeline could run.
    pub async fn reject(&self, err: DiyGuideError) -> DiyGuideError {
        let err = self.pipeline.reject(err).await;
        self.session.write().await.record(&Err(err.clone()));
        err
    }
}
