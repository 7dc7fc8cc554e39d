//! Synthesis stage: research in, structured guide out.

use std::sync::Arc;

use chrono::Utc;
use diyguide_core::{
    find_bare_urls, ProjectGuideDocument, ProjectPreferences, ResearchResult, Result, Stage,
};
use tracing::{info, warn};

use crate::prompts;
use crate::provider::{ApiKey, CompletionRequest, PipelineConfig, ReasoningProvider};

/// Writes the final guide from curated research.
pub struct SynthesisStage {
    reasoning: Arc<dyn ReasoningProvider>,
    config: PipelineConfig,
}

impl SynthesisStage {
    pub fn new(reasoning: Arc<dyn ReasoningProvider>, config: PipelineConfig) -> Self {
        Self { reasoning, config }
    }

    /// Consume the research and produce the guide. The research is moved in
    /// so a stale result cannot be fed into a second synthesis.
    pub async fn synthesize(
        &self,
        reasoning_key: &ApiKey,
        preferences: &ProjectPreferences,
        research: ResearchResult,
    ) -> Result<ProjectGuideDocument> {
        let persona = prompts::planner();
        let today = self.config.include_date.then(|| Utc::now().date_naive());
        let request = CompletionRequest {
            model: self.config.synthesis_model.clone(),
            system_role: persona.system_role(),
            instructions: persona.render_instructions(today),
            input: prompts::synthesis_input(preferences, &research),
        };

        info!(
            "📝 Writing guide from {} research items with {}",
            research.len(),
            self.reasoning.name()
        );
        let response = self
            .reasoning
            .complete(reasoning_key, &request)
            .await
            .map_err(|e| e.in_stage(Stage::Synthesizing))?;

        let markdown = strip_code_fence(&response);

        let bare = find_bare_urls(markdown);
        if !bare.is_empty() {
            warn!("Guide contains {} bare URLs: {:?}", bare.len(), bare);
        }

        if self.config.strict_structure {
            return ProjectGuideDocument::from_markdown(markdown);
        }

        let document = ProjectGuideDocument::unchecked(markdown);
        if !document.is_well_formed() {
            warn!(
                "Guide breaks the section layout: {}",
                document.structure_problems().join("; ")
            );
        }
        Ok(document)
    }
}

/// Remove a surrounding ``` fence, if the model wrapped its answer in one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{StubReasoning, SAMPLE_GUIDE};
    use diyguide_core::{
        DiyGuideError, Location, ProjectType, ReasoningError, ReasoningFailureKind, ResearchItem,
        SkillLevel, Timeline,
    };

    fn prefs() -> ProjectPreferences {
        ProjectPreferences::builder()
            .project_type(ProjectType::Repairs)
            .description("Patch a hole in drywall")
            .location(Location::Indoors)
            .skill_level(SkillLevel::Beginner)
            .budget("$20")
            .timeline(Timeline::WithinOneDay)
            .build()
            .unwrap()
    }

    fn research() -> ResearchResult {
        ResearchResult::new(
            "drywall patch",
            vec![ResearchItem {
                title: "Drywall repair".into(),
                url: "https://walls.example/patch".into(),
                summary: "Mesh patch walkthrough".into(),
            }],
        )
        .unwrap()
    }

    fn key() -> ApiKey {
        ApiKey::new("test-key").unwrap()
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```markdown\n## T\n```"), "## T");
        assert_eq!(strip_code_fence("```\n## T\n```"), "## T");
        assert_eq!(strip_code_fence("  ## T  "), "## T");
        assert_eq!(strip_code_fence("```oops"), "```oops");
    }

    #[tokio::test]
    async fn test_synthesize_well_formed_guide() {
        let reasoning = Arc::new(StubReasoning::scripted(vec![Ok(format!(
            "```markdown\n{}\n```",
            SAMPLE_GUIDE
        ))]));
        let stage = SynthesisStage::new(reasoning.clone(), PipelineConfig::default());

        let doc = stage.synthesize(&key(), &prefs(), research()).await.unwrap();
        assert!(doc.is_well_formed());
        assert!(!doc.markdown().starts_with("```"));

        let request = &reasoning.requests()[0];
        assert_eq!(request.model, "o3-mini");
        assert!(request.input.contains("Research Results:"));
        assert!(request.instructions.contains("### Safety Tips:"));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_malformed_guide() {
        let reasoning = Arc::new(StubReasoning::scripted(vec![Ok(
            "Sorry, I cannot help with that.".to_string(),
        )]));
        let stage = SynthesisStage::new(reasoning, PipelineConfig::default());

        let err = stage.synthesize(&key(), &prefs(), research()).await.unwrap_err();
        assert!(matches!(err, DiyGuideError::StructureViolation { .. }));
        assert_eq!(err.stage(), Some(Stage::Synthesizing));
    }

    #[tokio::test]
    async fn test_lenient_mode_keeps_malformed_guide() {
        let reasoning = Arc::new(StubReasoning::scripted(vec![Ok(
            "Sorry, I cannot help with that.".to_string(),
        )]));
        let config = PipelineConfig {
            strict_structure: false,
            ..PipelineConfig::default()
        };
        let stage = SynthesisStage::new(reasoning, config);

        let doc = stage.synthesize(&key(), &prefs(), research()).await.unwrap();
        assert!(!doc.is_well_formed());
        assert!(!doc.structure_problems().is_empty());
    }

    #[tokio::test]
    async fn test_reasoning_failure_is_tagged_with_synthesis() {
        let reasoning = Arc::new(StubReasoning::scripted(vec![Err(ReasoningError::new(
            ReasoningFailureKind::RateLimited,
            "slow down",
        ))]));
        let stage = SynthesisStage::new(reasoning, PipelineConfig::default());

        let err = stage.synthesize(&key(), &prefs(), research()).await.unwrap_err();
        assert!(matches!(
            err,
            DiyGuideError::Reasoning {
                stage: Stage::Synthesizing,
                ..
            }
        ));
    }
}
