//! Error types for the DIY guide pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Stage;

/// Which external credential a configuration error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Key for the generative reasoning capability (OpenAI).
    Reasoning,
    /// Key for the web-search capability (SerpAPI).
    Search,
}

impl CredentialKind {
    /// Human readable provider label.
    pub fn label(&self) -> &'static str {
        match self {
            CredentialKind::Reasoning => "OpenAI API key",
            CredentialKind::Search => "SerpAPI key",
        }
    }
}

/// Main error type for guide generation.
#[derive(Error, Debug, Clone)]
pub enum DiyGuideError {
    /// A credential is missing or blank. Raised before any network call.
    #[error("Configuration error: {message}")]
    Configuration {
        credential: CredentialKind,
        message: String,
    },

    /// Required preference fields are missing or empty.
    #[error("Preference validation failed: {message}")]
    Validation { missing: Vec<String>, message: String },

    /// The search provider failed.
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    /// The search returned nothing usable for the query.
    #[error("No usable search results for query \"{query}\"")]
    NoSearchResults { query: String },

    /// The reasoning capability failed during a pipeline stage.
    #[error("Reasoning failed during {stage}: {source}")]
    Reasoning {
        stage: Stage,
        #[source]
        source: ReasoningError,
    },

    /// The synthesized document does not follow the required section layout.
    #[error("Guide structure violation: {}", problems.join("; "))]
    StructureViolation { problems: Vec<String> },

    /// Another run is already executing.
    #[error("A guide generation run is already in progress")]
    RunInProgress,

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DiyGuideError {
    /// Build a configuration error for a missing credential.
    pub fn missing_credential(credential: CredentialKind) -> Self {
        DiyGuideError::Configuration {
            credential,
            message: format!("Please provide your {}", credential.label()),
        }
    }

    /// Returns true if retrying the same run later may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DiyGuideError::Search(err) => err.is_transient(),
            DiyGuideError::Reasoning { source, .. } => source.kind.is_transient(),
            DiyGuideError::RunInProgress => true,
            _ => false,
        }
    }

    /// Returns the pipeline stage the error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DiyGuideError::Configuration { .. } | DiyGuideError::Validation { .. } => {
                Some(Stage::Validating)
            }
            DiyGuideError::Search(_) | DiyGuideError::NoSearchResults { .. } => {
                Some(Stage::Researching)
            }
            DiyGuideError::Reasoning { stage, .. } => Some(*stage),
            DiyGuideError::StructureViolation { .. } => Some(Stage::Synthesizing),
            _ => None,
        }
    }

    /// Short machine readable kind, used by API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            DiyGuideError::Configuration { .. } => "configuration",
            DiyGuideError::Validation { .. } => "validation",
            DiyGuideError::Search(_) | DiyGuideError::NoSearchResults { .. } => "search_provider",
            DiyGuideError::Reasoning { .. } => "reasoning_provider",
            DiyGuideError::StructureViolation { .. } => "structure_violation",
            DiyGuideError::RunInProgress => "run_in_progress",
            DiyGuideError::Internal(_) => "internal",
        }
    }
}

/// Convenience Result type for guide operations.
pub type Result<T> = std::result::Result<T, DiyGuideError>;

impl From<serde_json::Error> for DiyGuideError {
    fn from(err: serde_json::Error) -> Self {
        DiyGuideError::Internal(format!("serialization: {}", err))
    }
}

/// Failure reported by a web-search provider.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// The provider could not be reached or the connection dropped.
    #[error("connection error: {0}")]
    Connection(String),

    /// The request did not finish in time.
    #[error("request timed out")]
    Timeout,

    /// The provider rejected the credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The provider answered with an error payload or status.
    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SearchError {
    /// Network-level failures that may clear up on their own.
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Connection(_) | SearchError::Timeout => true,
            SearchError::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Category of a reasoning-capability failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningFailureKind {
    /// Invalid or revoked credential.
    Unauthorized,
    /// Quota or rate limit exceeded.
    RateLimited,
    /// The request was rejected as malformed.
    BadRequest,
    /// The call did not complete in time.
    Timeout,
    /// Transport failure before a response arrived.
    Connection,
    /// A response arrived but did not have the expected shape.
    MalformedResponse,
    /// Any other provider-side failure.
    Provider,
}

impl ReasoningFailureKind {
    /// Failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReasoningFailureKind::RateLimited
                | ReasoningFailureKind::Timeout
                | ReasoningFailureKind::Connection
                | ReasoningFailureKind::Provider
        )
    }
}

/// Failure reported by a reasoning provider, before it is tied to a stage.
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct ReasoningError {
    pub kind: ReasoningFailureKind,
    pub message: String,
}

impl ReasoningError {
    /// Create a new reasoning error.
    pub fn new(kind: ReasoningFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Attach the pipeline stage the failure happened in.
    pub fn in_stage(self, stage: Stage) -> DiyGuideError {
        DiyGuideError::Reasoning {
            stage,
            source: self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message() {
        let err = DiyGuideError::missing_credential(CredentialKind::Reasoning);
        assert_eq!(
            err.to_string(),
            "Configuration error: Please provide your OpenAI API key"
        );
        assert_eq!(err.stage(), Some(Stage::Validating));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_reasoning_error_carries_stage() {
        let err = ReasoningError::new(ReasoningFailureKind::RateLimited, "quota exceeded")
            .in_stage(Stage::Synthesizing);
        assert_eq!(err.stage(), Some(Stage::Synthesizing));
        assert_eq!(err.kind(), "reasoning_provider");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_search_and_reasoning_are_distinct() {
        let search: DiyGuideError = SearchError::Timeout.into();
        let reasoning = ReasoningError::new(ReasoningFailureKind::Unauthorized, "bad key")
            .in_stage(Stage::Researching);

        assert_eq!(search.kind(), "search_provider");
        assert_eq!(reasoning.kind(), "reasoning_provider");
        assert!(search.is_recoverable());
        assert!(!reasoning.is_recoverable());
    }

    #[test]
    fn test_structure_violation_lists_problems() {
        let err = DiyGuideError::StructureViolation {
            problems: vec!["missing title".into(), "no steps".into()],
        };
        assert_eq!(
            err.to_string(),
            "Guide structure violation: missing title; no steps"
        );
    }
}
