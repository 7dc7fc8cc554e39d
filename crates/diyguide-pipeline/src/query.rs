//! Search query formulation.

use diyguide_core::{
    DiyGuideError, Location, ProjectPreferences, ProjectType, Result, SkillLevel, Timeline, Tool,
};

/// Longest description prefix, in words, carried into the query.
const MAX_DESCRIPTION_WORDS: usize = 12;

/// Derives one focused search query from a project profile.
#[derive(Debug, Clone)]
pub struct QueryFormulator {
    /// Tools named in the query.
    pub max_tools: usize,
    /// Materials named in the query.
    pub max_materials: usize,
}

impl Default for QueryFormulator {
    fn default() -> Self {
        Self {
            max_tools: 3,
            max_materials: 2,
        }
    }
}

impl QueryFormulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the query. Always a single line containing the description, the
    /// project type term and the skill qualifier, plus tool, material, budget
    /// and timeline constraints when the profile has them.
    pub fn formulate(&self, preferences: &ProjectPreferences) -> Result<String> {
        let description = clean_description(preferences.description());
        if description.is_empty() {
            return Err(DiyGuideError::Validation {
                missing: vec!["description".to_string()],
                message: "A project description is required to build a search query".to_string(),
            });
        }

        let mut parts: Vec<String> = vec![
            skill_qualifier(preferences.skill_level()).to_string(),
            project_type_term(preferences.project_type()).to_string(),
            "DIY".to_string(),
            description,
            "tutorial".to_string(),
        ];

        if preferences.location() == Location::Outdoors {
            parts.push("outdoor".to_string());
        }

        let tools: Vec<String> = preferences
            .available_tools()
            .iter()
            .filter(|t| **t != Tool::Other)
            .take(self.max_tools)
            .map(|t| t.label().to_lowercase())
            .collect();
        if !tools.is_empty() {
            parts.push(format!("with {}", tools.join(" and ")));
        }

        let materials: Vec<String> = preferences
            .material_preferences()
            .iter()
            .filter(|m| !m.eq_ignore_ascii_case("other"))
            .take(self.max_materials)
            .map(|m| m.to_lowercase())
            .collect();
        if !materials.is_empty() {
            parts.push(format!("using {}", materials.join(" and ")));
        }

        let budget = preferences.budget().trim();
        if budget.chars().any(|c| c.is_ascii_digit()) {
            parts.push(format!("under {}", budget));
        }

        match preferences.timeline() {
            Timeline::WithinOneDay => parts.push("in 1 day".to_string()),
            Timeline::WithinOneWeek => parts.push("in 1 week".to_string()),
            Timeline::Flexible => {}
        }

        Ok(collapse_whitespace(&parts.join(" ")))
    }
}

/// Search term that stands for the project type in every query. Each term
/// contains the lowercased vocabulary label.
pub fn project_type_term(project_type: ProjectType) -> &'static str {
    match project_type {
        ProjectType::FurnitureBuilding => "furniture building",
        ProjectType::HomeDecor => "home decor",
        ProjectType::Gardening => "gardening",
        ProjectType::Repairs => "repairs",
        ProjectType::Crafting => "crafting",
        ProjectType::Other => "other project",
    }
}

fn skill_qualifier(level: SkillLevel) -> &'static str {
    match level {
        SkillLevel::Beginner => "beginner-friendly",
        SkillLevel::Intermediate => "intermediate",
        SkillLevel::Advanced => "advanced",
    }
}

fn clean_description(description: &str) -> String {
    description
        .split_whitespace()
        .take(MAX_DESCRIPTION_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '!', '?', ',', ';'])
        .to_lowercase()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use diyguide_core::{InstructionStyle, ToolOpenness};

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

    #[test]
    fn test_bookshelf_query() {
        let query = QueryFormulator::new().formulate(&bookshelf()).unwrap();
        assert_eq!(
            query,
            "beginner-friendly furniture building DIY build a wooden bookshelf tutorial \
             with drill and screwdriver under $75 in 1 week"
        );
        assert!(query.contains("bookshelf"));
    }

    #[test]
    fn test_every_project_type_is_named() {
        for project_type in ProjectType::ALL {
            let prefs = ProjectPreferences::builder()
                .project_type(*project_type)
                .description("Fix   a wobbly\nchair!")
                .location(Location::Other)
                .skill_level(SkillLevel::Advanced)
                .budget("flexible")
                .timeline(Timeline::Flexible)
                .build()
                .unwrap();
            let query = QueryFormulator::new().formulate(&prefs).unwrap();

            assert!(!query.is_empty());
            assert!(query.contains(project_type_term(*project_type)), "{query}");
            assert!(query.contains(&project_type.label().to_lowercase()), "{query}");
            assert!(!query.contains('\n'));
            assert!(query.contains("fix a wobbly chair tutorial"));
            assert!(!query.contains("under"), "budget without amount is skipped");
        }
    }

    #[test]
    fn test_limits_tools_and_materials() {
        let prefs = ProjectPreferences::builder()
            .project_type(ProjectType::Gardening)
            .description("Raised garden bed")
            .location(Location::Outdoors)
            .tools([Tool::Saw, Tool::Drill, Tool::Other, Tool::Hammer, Tool::Sander])
            .open_to_extra_tools(ToolOpenness::No)
            .materials(["Wood", "Other", "Eco-friendly Materials", "Metal"])
            .skill_level(SkillLevel::Intermediate)
            .budget("150 USD")
            .timeline(Timeline::WithinOneDay)
            .instruction_style(InstructionStyle::ConciseSummary)
            .build()
            .unwrap();
        let query = QueryFormulator::new().formulate(&prefs).unwrap();

        assert!(query.contains("outdoor"));
        assert!(query.contains("with saw and drill and hammer"));
        assert!(!query.contains("sander"));
        assert!(query.contains("using wood and eco-friendly materials"));
        assert!(!query.contains("metal"));
        assert!(query.ends_with("under 150 USD in 1 day"));
    }
}
