//! Research stage: one search, then one selection call.

use std::sync::Arc;

use chrono::Utc;
use diyguide_core::{
    DiyGuideError, ProjectPreferences, ReasoningError, ReasoningFailureKind, ResearchItem,
    ResearchResult, Result, SearchHit, Stage,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::prompts;
use crate::provider::{ApiKey, CompletionRequest, PipelineConfig, ReasoningProvider, SearchProvider};
use crate::query::QueryFormulator;

/// One pick returned by the selection call.
#[derive(Debug, Deserialize)]
struct Selection {
    /// 1-based index into the hits shown to the model.
    result: usize,
    #[serde(default)]
    summary: String,
}

/// Turns a profile into curated, search-grounded research.
pub struct ResearchStage {
    search: Arc<dyn SearchProvider>,
    reasoning: Arc<dyn ReasoningProvider>,
    formulator: QueryFormulator,
    config: PipelineConfig,
}

impl ResearchStage {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        reasoning: Arc<dyn ReasoningProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            search,
            reasoning,
            formulator: QueryFormulator::default(),
            config,
        }
    }

    /// Formulate the query without touching any provider.
    pub fn formulate_query(&self, preferences: &ProjectPreferences) -> Result<String> {
        self.formulator.formulate(preferences)
    }

    /// Search for the profile and keep the most relevant hits.
    pub async fn research(
        &self,
        search_key: &ApiKey,
        reasoning_key: &ApiKey,
        preferences: &ProjectPreferences,
    ) -> Result<ResearchResult> {
        let query = self.formulate_query(preferences)?;
        info!("🔎 Searching {} for \"{}\"", self.search.name(), query);

        let hits = self.search.search(search_key, &query).await?;
        if hits.is_empty() {
            return Err(DiyGuideError::NoSearchResults { query });
        }
        debug!("Search returned {} hits", hits.len());

        let persona = prompts::researcher(self.config.max_research_items);
        let today = self.config.include_date.then(|| Utc::now().date_naive());
        let request = CompletionRequest {
            model: self.config.research_model.clone(),
            system_role: persona.system_role(),
            instructions: persona.render_instructions(today),
            input: prompts::research_input(preferences, &query, &hits),
        };

        let response = self
            .reasoning
            .complete(reasoning_key, &request)
            .await
            .map_err(|e| e.in_stage(Stage::Researching))?;

        let items = select_items(&response, &hits, self.config.max_research_items)
            .map_err(|e| e.in_stage(Stage::Researching))?;
        info!("📚 Selected {} of {} search hits", items.len(), hits.len());

        ResearchResult::new(query, items)
    }
}

/// Map the model's picks back onto real hits. Picks that point at no hit, or
/// at a hit already picked, are dropped.
fn select_items(
    response: &str,
    hits: &[SearchHit],
    max_items: usize,
) -> std::result::Result<Vec<ResearchItem>, ReasoningError> {
    let selections = parse_selections(response)?;

    let mut used = Vec::new();
    let mut items = Vec::new();
    for selection in selections {
        let Some(hit) = selection.result.checked_sub(1).and_then(|i| hits.get(i)) else {
            warn!("Dropping selection of unknown search result {}", selection.result);
            continue;
        };
        if used.contains(&selection.result) {
            continue;
        }
        used.push(selection.result);
        items.push(ResearchItem::from_hit(hit, selection.summary));
        if items.len() == max_items {
            break;
        }
    }
    Ok(items)
}

fn parse_selections(response: &str) -> std::result::Result<Vec<Selection>, ReasoningError> {
    let malformed = |detail: String| {
        ReasoningError::new(
            ReasoningFailureKind::MalformedResponse,
            format!("research selection is not a JSON list: {}", detail),
        )
    };

    let start = response.find('[');
    let end = response.rfind(']');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => return Err(malformed("no JSON array found".to_string())),
    };

    serde_json::from_str(json).map_err(|e| malformed(e.to_string()))
}
