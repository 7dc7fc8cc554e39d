//! # DIY Guide Providers
//!
//! HTTP clients for the two external capabilities the pipeline needs:
//! OpenAI chat completions for reasoning and SerpAPI for web search.

pub mod openai;
pub mod serpapi;

use std::sync::Arc;
use std::time::Duration;

use diyguide_core::{ReasoningError, SearchError};
use diyguide_pipeline::{ReasoningProvider, SearchProvider};
use thiserror::Error;

pub use openai::{OpenAiClient, OPENAI_BASE_URL};
pub use serpapi::{SerpApiClient, SERPAPI_BASE_URL};

/// Endpoints and limits for the provider clients.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_base_url: String,
    pub serpapi_base_url: String,
    pub search_result_count: usize,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_base_url: OPENAI_BASE_URL.to_string(),
            serpapi_base_url: SERPAPI_BASE_URL.to_string(),
            search_result_count: 10,
            timeout: Duration::from_secs(120),
        }
    }
}

/// A client could not be constructed.
#[derive(Error, Debug)]
pub enum ProviderSetupError {
    #[error("search client: {0}")]
    Search(#[from] SearchError),

    #[error("reasoning client: {0}")]
    Reasoning(#[from] ReasoningError),
}

/// Both live providers, ready to hand to a pipeline.
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn SearchProvider>,
    pub reasoning: Arc<dyn ReasoningProvider>,
}

impl Providers {
    pub fn connect(config: &ProviderConfig) -> Result<Self, ProviderSetupError> {
        let search = SerpApiClient::new(
            &config.serpapi_base_url,
            config.search_result_count,
            config.timeout,
        )?;
        let reasoning = OpenAiClient::new(&config.openai_base_url, config.timeout)?;

        Ok(Self {
            search: Arc::new(search),
            reasoning: Arc::new(reasoning),
        })
    }
}
