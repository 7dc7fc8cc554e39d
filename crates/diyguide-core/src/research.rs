//! Search hits and the curated research handed to synthesis.

use serde::{Deserialize, Serialize};

use crate::error::{DiyGuideError, Result};

/// Upper bound on curated research items per run.
pub const MAX_RESEARCH_ITEMS: usize = 10;

/// One organic result returned by the web-search capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based rank assigned by the search provider.
    pub position: usize,
    pub title: String,
    pub snippet: String,
    pub url: String,
}

impl SearchHit {
    pub fn new(
        position: usize,
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            position,
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }
}

/// A curated research entry. Title and link always come from a real
/// [`SearchHit`]; the summary is written by the selection step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchItem {
    pub title: String,
    pub url: String,
    pub summary: String,
}

impl ResearchItem {
    /// Build an item from the hit it was selected from.
    pub fn from_hit(hit: &SearchHit, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        let summary = if summary.trim().is_empty() {
            hit.snippet.clone()
        } else {
            summary.trim().to_string()
        };
        Self {
            title: hit.title.clone(),
            url: hit.url.clone(),
            summary,
        }
    }
}

/// Ordered, bounded grounding material for the synthesis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchResult {
    query: String,
    items: Vec<ResearchItem>,
}

impl ResearchResult {
    /// Create a research result. Items beyond [`MAX_RESEARCH_ITEMS`] are
    /// dropped; an empty list is an error.
    pub fn new(query: impl Into<String>, mut items: Vec<ResearchItem>) -> Result<Self> {
        let query = query.into();
        if items.is_empty() {
            return Err(DiyGuideError::NoSearchResults { query });
        }
        items.truncate(MAX_RESEARCH_ITEMS);
        Ok(Self { query, items })
    }

    /// The search query the items were retrieved with.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn items(&self) -> &[ResearchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render the items as a numbered Markdown list for the synthesis prompt.
    pub fn to_prompt_text(&self) -> String {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. [{}]({}): {}", i + 1, item.title, item.url, item.summary))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
