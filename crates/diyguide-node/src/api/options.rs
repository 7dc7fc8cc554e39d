//! Form vocabularies.

use axum::Json;
use diyguide_core::preferences::{MATERIAL_SUGGESTIONS, SAFETY_SUGGESTIONS};
use diyguide_core::{
    InstructionStyle, Location, ProjectType, SkillLevel, Timeline, Tool, ToolOpenness,
};
use serde::Serialize;

/// Labels accepted by `POST /api/v1/guide`, for rendering the form.
#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub project_types: Vec<&'static str>,
    pub locations: Vec<&'static str>,
    pub tools: Vec<&'static str>,
    pub tool_openness: Vec<&'static str>,
    pub materials: Vec<&'static str>,
    pub skill_levels: Vec<&'static str>,
    pub timelines: Vec<&'static str>,
    pub safety_considerations: Vec<&'static str>,
    pub instruction_styles: Vec<&'static str>,
    pub defaults: FormDefaults,
}

#[derive(Debug, Serialize)]
pub struct FormDefaults {
    pub open_to_extra_tools: &'static str,
    pub instruction_style: &'static str,
}

pub async fn get_options() -> Json<OptionsResponse> {
    Json(OptionsResponse {
        project_types: ProjectType::labels(),
        locations: Location::labels(),
        tools: Tool::labels(),
        tool_openness: ToolOpenness::labels(),
        materials: MATERIAL_SUGGESTIONS.to_vec(),
        skill_levels: SkillLevel::labels(),
        timelines: Timeline::labels(),
        safety_considerations: SAFETY_SUGGESTIONS.to_vec(),
        instruction_styles: InstructionStyle::labels(),
        defaults: FormDefaults {
            open_to_extra_tools: ToolOpenness::default().label(),
            instruction_style: InstructionStyle::default().label(),
        },
    })
}
