//! Provider traits, credentials and pipeline configuration.

use std::fmt;

use async_trait::async_trait;
use diyguide_core::{CredentialKind, DiyGuideError, ReasoningError, Result, SearchError, SearchHit};
use serde::{Deserialize, Serialize};

/// Configuration for the guide pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model used to select and summarize search results.
    pub research_model: String,

    /// Model used to write the final guide.
    pub synthesis_model: String,

    /// Maximum number of curated research items.
    pub max_research_items: usize,

    /// Fail the run when the guide breaks the section layout.
    pub strict_structure: bool,

    /// Tell both models today's date.
    pub include_date: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            research_model: "gpt-4o".to_string(),
            synthesis_model: "o3-mini".to_string(),
            max_research_items: diyguide_core::MAX_RESEARCH_ITEMS,
            strict_structure: true,
            include_date: true,
        }
    }
}

/// An opaque provider credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// The raw key, for building provider requests.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Session-scoped credentials handed to each run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub reasoning: Option<ApiKey>,
    pub search: Option<ApiKey>,
}

impl Credentials {
    pub fn new(reasoning: Option<ApiKey>, search: Option<ApiKey>) -> Self {
        Self { reasoning, search }
    }

    /// Both keys, or a configuration error naming the first one missing.
    /// The reasoning key is checked before the search key.
    pub fn require(&self) -> Result<(&ApiKey, &ApiKey)> {
        let reasoning = self
            .reasoning
            .as_ref()
            .ok_or_else(|| DiyGuideError::missing_credential(CredentialKind::Reasoning))?;
        let search = self
            .search
            .as_ref()
            .ok_or_else(|| DiyGuideError::missing_credential(CredentialKind::Search))?;
        Ok((reasoning, search))
    }

    /// Fill any missing key from `fallback`.
    pub fn or(self, fallback: &Credentials) -> Credentials {
        Credentials {
            reasoning: self.reasoning.or_else(|| fallback.reasoning.clone()),
            search: self.search.or_else(|| fallback.search.clone()),
        }
    }
}

/// One call to the reasoning capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    /// Who the model is acting as.
    pub system_role: String,
    /// What the model must do and how to format it.
    pub instructions: String,
    /// The material to work on.
    pub input: String,
}

/// Web-search capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, returning hits in relevance order.
    async fn search(
        &self,
        credential: &ApiKey,
        query: &str,
    ) -> std::result::Result<Vec<SearchHit>, SearchError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Generative reasoning capability.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Produce text for the request.
    async fn complete(
        &self,
        credential: &ApiKey,
        request: &CompletionRequest,
    ) -> std::result::Result<String, ReasoningError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_keys_are_rejected() {
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new(" sk-1 ").unwrap().expose(), "sk-1");
    }

    #[test]
    fn test_key_is_redacted_in_debug() {
        let creds = Credentials::new(ApiKey::new("sk-secret"), None);
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-secret"));
    }

    #[test]
    fn test_reasoning_key_checked_first() {
        let err = Credentials::default().require().unwrap_err();
        match err {
            DiyGuideError::Configuration { credential, .. } => {
                assert_eq!(credential, CredentialKind::Reasoning)
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = Credentials::new(ApiKey::new("sk"), None).require().unwrap_err();
        assert!(matches!(
            err,
            DiyGuideError::Configuration {
                credential: CredentialKind::Search,
                ..
            }
        ));
    }

    #[test]
    fn test_credentials_fallback() {
        let session = Credentials::new(ApiKey::new("session-ai"), ApiKey::new("session-serp"));
        let request = Credentials::new(ApiKey::new("request-ai"), None);
        let merged = request.or(&session);
        assert_eq!(merged.reasoning.unwrap().expose(), "request-ai");
        assert_eq!(merged.search.unwrap().expose(), "session-serp");
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_research_items, 10);
        assert_eq!(config.research_model, "gpt-4o");
        assert_eq!(config.synthesis_model, "o3-mini");
        assert!(config.strict_structure);
    }
}
