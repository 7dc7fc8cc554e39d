//! Prompt contracts for the research and synthesis stages.

use chrono::NaiveDate;
use diyguide_core::{GuideSection, ProjectPreferences, ResearchResult, SearchHit};

/// Header that starts the research-selection input.
pub const SEARCH_RESULTS_HEADER: &str = "Search Results:";

/// Header that starts the research block in the synthesis input.
pub const RESEARCH_RESULTS_HEADER: &str = "Research Results:";

/// A named model persona: who it is and what it must do.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: &'static str,
    pub role: &'static str,
    pub description: &'static str,
    pub instructions: Vec<String>,
}

impl Persona {
    /// System role text: persona name, role and description.
    pub fn system_role(&self) -> String {
        format!(
            "You are {}. {}\n\n{}",
            self.name,
            self.role,
            self.description.trim()
        )
    }

    /// Instruction list, one per line, optionally dated.
    pub fn render_instructions(&self, today: Option<NaiveDate>) -> String {
        let mut text = self.instructions.join("\n");
        if let Some(today) = today {
            text.push_str(&format!("\n\nThe current date is {}.", today.format("%Y-%m-%d")));
        }
        text
    }
}

/// Persona that picks and summarizes the most useful search hits.
pub fn researcher(max_items: usize) -> Persona {
    Persona {
        name: "DIY Project Researcher",
        role: "Finds DIY project tutorials, material lists, step-by-step guides, and safety advice \
               based on the user's project preferences.",
        description: "You are a DIY project research expert. Given a detailed user profile \
                      including project type, available tools, materials, budget, and preferences, \
                      and a list of web search results, your job is to pick the resources that \
                      best match the user's DIY goals.",
        instructions: vec![
            "Carefully read the user's DIY project preferences to understand the project type, \
             available tools, material choices, skill level, budget, timeline, and safety considerations."
                .to_string(),
            format!(
                "From the numbered search results, pick the {max_items} most relevant results that provide \
                 clear DIY instructions, material lists, safety tips, or project walk-throughs. \
                 Pick fewer if fewer are relevant."
            ),
            "Prioritize resources that are beginner-friendly (if skill level is beginner) or more \
             advanced (if skill level is intermediate/advanced)."
                .to_string(),
            "Order your picks from most to least relevant.".to_string(),
            "For each pick write a one or two sentence summary of what the resource offers \
             (materials, tools, steps, safety advice)."
                .to_string(),
            "Do not fabricate or invent any information. Only use what is found in the search results."
                .to_string(),
            "Respond with JSON only, no prose, in this exact shape: \
             [{\"result\": <search result number>, \"summary\": \"<summary>\"}]"
                .to_string(),
        ],
    }
}

/// Persona that writes the final guide.
pub fn planner() -> Persona {
    let mut instructions: Vec<String> = [
        "Carefully review the user's project preferences. Pay close attention to:",
        "- **Project Type**: Ensure the guide matches the project goal (e.g., furniture, decor, etc.).",
        "- **Tools Available**: Only suggest techniques using available tools or ones the user is open to acquiring.",
        "- **Materials Preference**: Favor materials aligned with the user's choices if possible.",
        "- **Skill Level**: Match project complexity to user's skill level (e.g., beginner, intermediate, advanced).",
        "- **Budget**: Ensure material and tool suggestions stay within budget where possible.",
        "- **Timeline**: Keep the project steps manageable based on desired completion time.",
        "- **Safety Considerations**: Highlight important safety precautions for tools and materials.",
        "- **Preferred Instruction Style**: Adjust detail level accordingly (simple, detailed, or concise).",
        "",
        "Now analyze the research results carefully.",
        "Extract only project ideas, techniques, materials, and safety tips that are verifiably found in the research links.",
        "Do not fabricate or invent content. Only use what is sourced from the research results.",
        "",
        "Create the DIY Project Guide in the following exact Markdown structure:",
        "",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    instructions.push(guide_template());
    instructions.extend(
        [
            "",
            "Embed hyperlinks inside text where needed (Markdown format: [Example](https://example.com)), \
             but do not paste raw URLs.",
            "Write clean, practical, beginner-friendly or advanced level guides based on user profile.",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    Persona {
        name: "DIY Project Planner",
        role: "Creates a personalized, step-by-step DIY project guide based on user preferences \
               and researched web content.",
        description: "You are a senior DIY project planner responsible for crafting a clear, \
                      actionable, and user-friendly project plan. You are given a structured \
                      summary of the user's DIY project preferences and a set of research results \
                      pointing to trusted DIY tutorials, materials lists, and safety resources. \
                      Study the research results, extract the most relevant and helpful ideas, and \
                      organize them into a practical project guide.",
        instructions,
    }
}

/// The Markdown skeleton every guide must follow.
pub fn guide_template() -> String {
    format!(
        "## [{title}]\n\n\
         ### {materials}:\n- List each material clearly\n\n\
         ### {tools}:\n- List each tool clearly\n\n\
         ### {steps}:\n1. First clear step\n2. Second step\n3. Third step\n...and so on\n\n\
         ### {safety}:\n- List important safety considerations clearly",
        title = GuideSection::Title.heading(),
        materials = GuideSection::MaterialsNeeded.heading(),
        tools = GuideSection::ToolsNeeded.heading(),
        steps = GuideSection::StepByStepInstructions.heading(),
        safety = GuideSection::SafetyTips.heading(),
    )
}

/// Input for the research-selection call.
pub fn research_input(preferences: &ProjectPreferences, query: &str, hits: &[SearchHit]) -> String {
    let listed = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] {}\nURL: {}\nSnippet: {}",
                i + 1,
                hit.title,
                hit.url,
                hit.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "User DIY Project Preferences:\n{}\nSearch Query: {}\n\n{}\n{}",
        preferences.to_profile_text(),
        query,
        SEARCH_RESULTS_HEADER,
        listed
    )
}

/// Input for the synthesis call.
pub fn synthesis_input(preferences: &ProjectPreferences, research: &ResearchResult) -> String {
    format!(
        "User DIY Project Preferences:\n{}\n{}\n{}\n\n\
         Use these details to draft a complete DIY Project Guide following the provided Markdown structure.",
        preferences.to_profile_text(),
        RESEARCH_RESULTS_HEADER,
        research.to_prompt_text()
    )
}
