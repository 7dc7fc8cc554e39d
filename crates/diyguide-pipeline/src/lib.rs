//! # DIY Guide Pipeline
//!
//! Two-stage guide generation: a search-grounded research stage followed by
//! a synthesis stage that writes a structure-checked Markdown guide.

pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod query;
pub mod research;
pub mod synthesis;

#[cfg(any(test, feature = "stub"))]
pub mod stub;

pub use orchestrator::{GuidePipeline, GuideSession, RunOutcome, RunTrace, StageEvent};
pub use provider::{
    ApiKey, CompletionRequest, Credentials, PipelineConfig, ReasoningProvider, SearchProvider,
};
pub use query::QueryFormulator;
pub use research::ResearchStage;
pub use synthesis::SynthesisStage;
