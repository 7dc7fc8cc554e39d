//! Pipeline orchestrator.
//!
//! Sequences validation, research and synthesis for one run at a time and
//! tracks the run state machine:
//! `Idle -> Validating -> Researching -> Synthesizing -> Done | Failed`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use diyguide_core::{
    DiyGuideError, ProjectGuideDocument, ProjectPreferences, Result, RunState, Stage,
};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::provider::{Credentials, PipelineConfig, ReasoningProvider, SearchProvider};
use crate::research::ResearchStage;
use crate::synthesis::SynthesisStage;

/// One state change during a run.
#[derive(Debug, Clone, Serialize)]
pub struct StageEvent {
    pub state: RunState,
    pub at: DateTime<Utc>,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
}

/// Timeline of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub events: Vec<StageEvent>,
    #[serde(skip)]
    clock: Option<Instant>,
}

impl RunTrace {
    fn start(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            events: Vec::new(),
            clock: Some(Instant::now()),
        }
    }

    fn record(&mut self, state: RunState) {
        let elapsed_ms = self
            .clock
            .map(|c| c.elapsed().as_millis() as u64)
            .unwrap_or_default();
        self.events.push(StageEvent {
            state,
            at: Utc::now(),
            elapsed_ms,
        });
    }

    /// States visited, in order.
    pub fn states(&self) -> Vec<RunState> {
        self.events.iter().map(|e| e.state).collect()
    }

    /// Total run time in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map(|e| e.elapsed_ms).unwrap_or_default()
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub query: String,
    pub research_items: usize,
    pub document: ProjectGuideDocument,
    pub trace: RunTrace,
}

/// The user's session: credentials plus the last good guide.
///
/// A failed run records its error but keeps the previous document.
#[derive(Debug, Clone, Default)]
pub struct GuideSession {
    pub credentials: Credentials,
    last_document: Option<ProjectGuideDocument>,
    last_query: Option<String>,
    last_error: Option<DiyGuideError>,
}

impl GuideSession {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// Fold a run result into the session.
    pub fn record(&mut self, result: &Result<RunOutcome>) {
        match result {
            Ok(outcome) => {
                self.last_document = Some(outcome.document.clone());
                self.last_query = Some(outcome.query.clone());
                self.last_error = None;
            }
            // A rejected second trigger says nothing about the session's run.
            Err(DiyGuideError::RunInProgress) => {}
            Err(err) => self.last_error = Some(err.clone()),
        }
    }

    pub fn last_document(&self) -> Option<&ProjectGuideDocument> {
        self.last_document.as_ref()
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn last_error(&self) -> Option<&DiyGuideError> {
        self.last_error.as_ref()
    }

    /// Drop the held document and error.
    pub fn clear_document(&mut self) -> Option<ProjectGuideDocument> {
        self.last_error = None;
        self.last_query = None;
        self.last_document.take()
    }
}

/// Marks a run as failed if its future is dropped mid-stage.
struct AbandonGuard<'a>(&'a RwLock<RunState>);

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.try_write() {
            if state.is_active() {
                warn!("Guide run abandoned while {:?}", *state);
                *state = RunState::Failed;
            }
        }
    }
}

/// Runs the research and synthesis stages in order.
pub struct GuidePipeline {
    research: ResearchStage,
    synthesis: SynthesisStage,
    config: PipelineConfig,
    state: RwLock<RunState>,
    run_lock: Mutex<()>,
}

impl GuidePipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        reasoning: Arc<dyn ReasoningProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            research: ResearchStage::new(search, reasoning.clone(), config.clone()),
            synthesis: SynthesisStage::new(reasoning, config.clone()),
            config,
            state: RwLock::new(RunState::Idle),
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current run state.
    pub async fn state(&self) -> RunState {
        *self.state.read().await
    }

    /// Run the whole pipeline once.
    ///
    /// Fails with [`DiyGuideError::RunInProgress`] if another run holds the
    /// pipeline. Missing credentials fail before any provider is called.
    pub async fn run(
        &self,
        credentials: &Credentials,
        preferences: ProjectPreferences,
    ) -> Result<RunOutcome> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| DiyGuideError::RunInProgress)?;

        let _abandon = AbandonGuard(&self.state);

        let run_id = Uuid::new_v4();
        let mut trace = RunTrace::start(run_id);
        info!("🚀 Starting guide run {}", run_id);

        // Holding the run lock means nothing else is in flight, so a state
        // left behind by a dropped run is stale.
        *self.state.write().await = RunState::Idle;
        trace.record(RunState::Idle);

        match self.execute(credentials, &preferences, &mut trace).await {
            Ok((query, research_items, document)) => {
                self.transition(RunState::Done, &mut trace).await?;
                info!(
                    "✅ Guide run {} finished in {}ms",
                    run_id,
                    trace.duration_ms()
                );
                Ok(RunOutcome {
                    run_id,
                    query,
                    research_items,
                    document,
                    trace,
                })
            }
            Err(err) => {
                self.transition(RunState::Failed, &mut trace).await?;
                error!(
                    "❌ Guide run {} failed in {}: {}",
                    run_id,
                    err.stage().map(|s| s.to_string()).unwrap_or_else(|| "pipeline".into()),
                    err
                );
                Err(err)
            }
        }
    }

    /// Fail a trigger whose input was rejected before a run could start,
    /// so the state machine still records `Validating -> Failed`.
    pub async fn reject(&self, err: DiyGuideError) -> DiyGuideError {
        let Ok(_guard) = self.run_lock.try_lock() else {
            return DiyGuideError::RunInProgress;
        };

        let mut trace = RunTrace::start(Uuid::new_v4());
        *self.state.write().await = RunState::Idle;
        for next in [RunState::Validating, RunState::Failed] {
            if let Err(transition_err) = self.transition(next, &mut trace).await {
                return transition_err;
            }
        }
        warn!("Guide run rejected during validation: {}", err);
        err
    }

    async fn execute(
        &self,
        credentials: &Credentials,
        preferences: &ProjectPreferences,
        trace: &mut RunTrace,
    ) -> Result<(String, usize, ProjectGuideDocument)> {
        self.transition(Stage::Validating.run_state(), trace).await?;
        let (reasoning_key, search_key) = credentials.require()?;
        preferences.validate()?;

        self.transition(Stage::Researching.run_state(), trace).await?;
        let research = self
            .research
            .research(search_key, reasoning_key, preferences)
            .await?;
        let query = research.query().to_string();
        let research_items = research.len();

        self.transition(Stage::Synthesizing.run_state(), trace).await?;
        let document = self
            .synthesis
            .synthesize(reasoning_key, preferences, research)
            .await?;

        Ok((query, research_items, document))
    }

    async fn transition(&self, next: RunState, trace: &mut RunTrace) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(DiyGuideError::Internal(format!(
                "illegal run state transition {:?} -> {:?}",
                *state, next
            )));
        }
        debug!("Run state {:?} -> {:?}", *state, next);
        *state = next;
        trace.record(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ApiKey;
    use crate::stub::{StubReasoning, StubSearch, SAMPLE_GUIDE};
    use diyguide_core::{
        CredentialKind, Location, ProjectType, SearchHit, SkillLevel, Timeline, Tool,
    };
    use std::time::Duration;

    fn bookshelf() -> ProjectPreferences {
        ProjectPreferences::builder()
            .project_type(ProjectType::FurnitureBuilding)
            .description("Build a wooden bookshelf")
            .location(Location::LivingRoom)
            .tools([Tool::Drill, Tool::Screwdriver])
            .skill_level(SkillLevel::Beginner)
            .budget("$75")
            .timeline(Timeline::WithinOneWeek)
            .build()
            .unwrap()
    }

    fn credentials() -> Credentials {
        Credentials::new(ApiKey::new("sk-test"), ApiKey::new("serp-test"))
    }

    fn shelf_hits() -> Vec<SearchHit> {
        vec![
            SearchHit::new(1, "Pine bookshelf plans", "Cut list for 1x10 pine", "https://plans.example/pine"),
            SearchHit::new(2, "Wood screws for shelves", "Which screws to use", "https://hardware.example/screws"),
            SearchHit::new(3, "Finishing a bookshelf", "Sanding and stain", "https://finish.example/stain"),
        ]
    }

    fn pipeline(search: Arc<StubSearch>, reasoning: Arc<StubReasoning>) -> GuidePipeline {
        GuidePipeline::new(search, reasoning, PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_missing_reasoning_key_makes_no_calls() {
        let search = Arc::new(StubSearch::with_hits(shelf_hits()));
        let reasoning = Arc::new(StubReasoning::grounded());
        let pipeline = pipeline(search.clone(), reasoning.clone());

        let creds = Credentials::new(None, ApiKey::new("serp-test"));
        let err = pipeline.run(&creds, bookshelf()).await.unwrap_err();

        assert!(matches!(
            err,
            DiyGuideError::Configuration {
                credential: CredentialKind::Reasoning,
                ..
            }
        ));
        assert_eq!(search.calls(), 0);
        assert_eq!(reasoning.calls(), 0);
        assert_eq!(pipeline.state().await, RunState::Failed);
    }

    #[tokio::test]
    async fn test_bookshelf_run() {
        let search = Arc::new(StubSearch::with_hits(shelf_hits()));
        let reasoning = Arc::new(StubReasoning::grounded());
        let pipeline = pipeline(search.clone(), reasoning.clone());

        let outcome = pipeline.run(&credentials(), bookshelf()).await.unwrap();

        assert!(outcome.query.contains("bookshelf"));
        assert!(["drill", "beginner", "$75", "week"]
            .iter()
            .any(|t| outcome.query.contains(t)));
        assert_eq!(outcome.research_items, 3);

        let sections = outcome.document.sections().unwrap();
        assert!(sections
            .materials
            .iter()
            .any(|m| m.contains("Pine bookshelf plans")));
        assert!(sections
            .tools
            .iter()
            .any(|t| t.contains("Wood screws for shelves")));
        assert!(sections.steps.len() >= 2);

        assert_eq!(search.calls(), 1);
        assert_eq!(reasoning.calls(), 2);
        let requests = reasoning.requests();
        assert_eq!(requests[0].model, "gpt-4o");
        assert_eq!(requests[1].model, "o3-mini");

        assert_eq!(
            outcome.trace.states(),
            vec![
                RunState::Idle,
                RunState::Validating,
                RunState::Researching,
                RunState::Synthesizing,
                RunState::Done
            ]
        );
        assert_eq!(pipeline.state().await, RunState::Done);
    }

    #[tokio::test]
    async fn test_identical_runs_are_structurally_identical() {
        let search = Arc::new(StubSearch::with_hits(shelf_hits()));
        let reasoning = Arc::new(StubReasoning::grounded());
        let pipeline = pipeline(search, reasoning);

        let first = pipeline.run(&credentials(), bookshelf()).await.unwrap();
        let second = pipeline.run(&credentials(), bookshelf()).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(
            first.document.sections().unwrap().outline(),
            second.document.sections().unwrap().outline()
        );
        assert_eq!(first.document.content_hash(), second.document.content_hash());
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let search = Arc::new(StubSearch::with_hits(shelf_hits()));
        let reasoning = Arc::new(StubReasoning::grounded().with_delay(Duration::from_millis(200)));
        let pipeline = Arc::new(pipeline(search, reasoning));

        let background = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(&credentials(), bookshelf()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = pipeline.run(&credentials(), bookshelf()).await.unwrap_err();
        assert!(matches!(err, DiyGuideError::RunInProgress));
        assert!(pipeline.state().await.is_active());

        assert!(background.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_rejected_input_fails_validation() {
        let search = Arc::new(StubSearch::with_hits(shelf_hits()));
        let reasoning = Arc::new(StubReasoning::grounded());
        let pipeline = pipeline(search.clone(), reasoning);

        pipeline.run(&credentials(), bookshelf()).await.unwrap();
        assert_eq!(pipeline.state().await, RunState::Done);

        let err = pipeline
            .reject(DiyGuideError::Validation {
                missing: vec!["budget".into()],
                message: "missing budget".into(),
            })
            .await;
        assert!(matches!(err, DiyGuideError::Validation { .. }));
        assert_eq!(pipeline.state().await, RunState::Failed);
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn test_aborted_run_does_not_block_the_next() {
        let search = Arc::new(StubSearch::with_hits(shelf_hits()));
        let reasoning = Arc::new(StubReasoning::grounded().with_delay(Duration::from_millis(100)));
        let pipeline = Arc::new(pipeline(search, reasoning));

        let background = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run(&credentials(), bookshelf()).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        background.abort();
        assert!(background.await.unwrap_err().is_cancelled());
        assert_eq!(pipeline.state().await, RunState::Failed);

        let outcome = pipeline.run(&credentials(), bookshelf()).await.unwrap();
        assert_eq!(outcome.trace.states()[0], RunState::Idle);
        assert_eq!(pipeline.state().await, RunState::Done);
    }

    #[tokio::test]
    async fn test_session_keeps_last_good_document() {
        let search = Arc::new(StubSearch::with_hits(shelf_hits()));
        let reasoning = Arc::new(StubReasoning::scripted(vec![
            Ok(r#"[{"result": 1, "summary": "plans"}]"#.to_string()),
            Ok(SAMPLE_GUIDE.to_string()),
            Ok(r#"[{"result": 2, "summary": "screws"}]"#.to_string()),
            Ok("no structure here".to_string()),
        ]));
        let pipeline = pipeline(search, reasoning);
        let mut session = GuideSession::new(credentials());

        let result = pipeline.run(&session.credentials, bookshelf()).await;
        session.record(&result);
        let good_hash = session.last_document().unwrap().content_hash().to_string();

        let result = pipeline.run(&session.credentials, bookshelf()).await;
        session.record(&result);

        assert!(matches!(
            session.last_error(),
            Some(DiyGuideError::StructureViolation { .. })
        ));
        assert_eq!(session.last_document().unwrap().content_hash(), good_hash);
        assert_eq!(pipeline.state().await, RunState::Failed);

        session.record(&Err(DiyGuideError::RunInProgress));
        assert!(session.last_error().is_some());

        assert!(session.clear_document().is_some());
        assert!(session.last_document().is_none());
    }

    #[tokio::test]
    async fn test_search_failure_fails_in_research() {
        let search = Arc::new(StubSearch::failing(diyguide_core::SearchError::Unauthorized(
            "Invalid API key".into(),
        )));
        let reasoning = Arc::new(StubReasoning::grounded());
        let pipeline = pipeline(search, reasoning.clone());

        let err = pipeline.run(&credentials(), bookshelf()).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Researching));
        assert_eq!(reasoning.calls(), 0);
    }
}
