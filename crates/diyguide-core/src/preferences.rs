//! Project preferences and builder.
//!
//! [`ProjectPreferences`] is the normalized profile a user fills in before a
//! guide is generated. It is immutable once built and is only obtainable
//! through [`PreferencesBuilder`], which enforces the required fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DiyGuideError, Result};

/// Error returned when a label does not belong to a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} option \"{}\"", self.field, self.value)
    }
}

impl std::error::Error for UnknownOption {}

/// Declares a closed vocabulary whose serialized form is its display label.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $label)] $variant),+
        }

        impl $name {
            /// Every option, in form order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Label shown to the user and used in prompts.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// All labels, in form order.
            pub fn labels() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.label()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| UnknownOption {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

vocabulary! {
    /// Kind of DIY project.
    ProjectType("project type") {
        FurnitureBuilding => "Furniture Building",
        HomeDecor => "Home Decor",
        Gardening => "Gardening",
        Repairs => "Repairs",
        Crafting => "Crafting",
        Other => "Other",
    }
}

vocabulary! {
    /// Where the finished project will be used.
    Location("location") {
        Indoors => "Indoors",
        Outdoors => "Outdoors",
        Garden => "Garden",
        Kitchen => "Kitchen",
        LivingRoom => "Living Room",
        Bedroom => "Bedroom",
        Other => "Other",
    }
}

vocabulary! {
    /// Tools the user may already own.
    Tool("tool") {
        Hammer => "Hammer",
        Screwdriver => "Screwdriver",
        Drill => "Drill",
        Saw => "Saw",
        Sander => "Sander",
        GlueGun => "Glue Gun",
        Wrench => "Wrench",
        MeasuringTape => "Measuring Tape",
        Other => "Other",
    }
}

vocabulary! {
    /// Whether the user would buy or rent tools they lack.
    ToolOpenness("tool openness") {
        Yes => "Yes",
        No => "No",
        Maybe => "Maybe",
    }
}

vocabulary! {
    /// Self-reported DIY experience.
    SkillLevel("skill level") {
        Beginner => "Beginner",
        Intermediate => "Intermediate",
        Advanced => "Advanced",
    }
}

vocabulary! {
    /// Desired completion time.
    Timeline("timeline") {
        WithinOneDay => "Within 1 day",
        WithinOneWeek => "Within 1 week",
        Flexible => "Flexible timeline",
    }
}

vocabulary! {
    /// How detailed the written steps should be.
    InstructionStyle("instruction style") {
        SimpleStepByStep => "Simple step-by-step",
        DetailedWithTips => "Detailed with tips",
        ConciseSummary => "Concise summary",
    }
}

impl Default for ToolOpenness {
    fn default() -> Self {
        ToolOpenness::Yes
    }
}

impl Default for InstructionStyle {
    fn default() -> Self {
        InstructionStyle::SimpleStepByStep
    }
}

/// Material options offered by the form. Materials are open-ended; these are
/// suggestions only.
pub const MATERIAL_SUGGESTIONS: &[&str] = &[
    "Wood",
    "Metal",
    "Plastic",
    "Fabric",
    "Eco-friendly Materials",
    "Other",
];

/// Safety options offered by the form.
pub const SAFETY_SUGGESTIONS: &[&str] = &[
    "Child-safe",
    "Pet-safe",
    "Heavy lifting precautions",
    "Chemical safety",
    "No special considerations",
];

const NOT_SPECIFIED: &str = "Not specified";
const NONE_SPECIFIED: &str = "None specified";

/// A validated DIY project profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectPreferences {
    project_type: ProjectType,
    description: String,
    location: Location,
    available_tools: Vec<Tool>,
    open_to_extra_tools: ToolOpenness,
    material_preferences: Vec<String>,
    skill_level: SkillLevel,
    budget: String,
    timeline: Timeline,
    safety_considerations: Vec<String>,
    instruction_style: InstructionStyle,
}

impl ProjectPreferences {
    /// Create a new builder.
    pub fn builder() -> PreferencesBuilder {
        PreferencesBuilder::new()
    }

    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn available_tools(&self) -> &[Tool] {
        &self.available_tools
    }

    pub fn open_to_extra_tools(&self) -> ToolOpenness {
        self.open_to_extra_tools
    }

    pub fn material_preferences(&self) -> &[String] {
        &self.material_preferences
    }

    pub fn skill_level(&self) -> SkillLevel {
        self.skill_level
    }

    pub fn budget(&self) -> &str {
        &self.budget
    }

    pub fn timeline(&self) -> Timeline {
        self.timeline
    }

    pub fn safety_considerations(&self) -> &[String] {
        &self.safety_considerations
    }

    pub fn instruction_style(&self) -> InstructionStyle {
        self.instruction_style
    }

    /// Re-check the required free-text fields.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.budget.trim().is_empty() {
            missing.push("budget");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(validation_error(missing))
        }
    }

    /// Render the profile as the text block handed to both pipeline stages.
    pub fn to_profile_text(&self) -> String {
        let tools: Vec<&str> = self.available_tools.iter().map(|t| t.label()).collect();

        format!(
            "**Project Overview:**\n\
             - Project Type: {project_type}\n\
             - Description: {description}\n\
             - Location: {location}\n\
             \n\
             **Tools and Skills:**\n\
             - Available Tools: {tools}\n\
             - Open to Extra Tools: {openness}\n\
             - Material Preferences: {materials}\n\
             - Skill Level: {skill}\n\
             \n\
             **Budget and Safety:**\n\
             - Estimated Budget: {budget}\n\
             - Timeline: {timeline}\n\
             - Safety Considerations: {safety}\n\
             - Preferred Instruction Style: {style}\n",
            project_type = self.project_type,
            description = self.description,
            location = self.location,
            tools = join_or(&tools, NOT_SPECIFIED),
            openness = self.open_to_extra_tools,
            materials = join_or(&self.material_preferences, NOT_SPECIFIED),
            skill = self.skill_level,
            budget = self.budget,
            timeline = self.timeline,
            safety = join_or(&self.safety_considerations, NONE_SPECIFIED),
            style = self.instruction_style,
        )
    }
}

fn join_or<S: AsRef<str>>(items: &[S], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", ")
    }
}

fn validation_error(missing: Vec<&str>) -> DiyGuideError {
    let missing: Vec<String> = missing.into_iter().map(String::from).collect();
    DiyGuideError::Validation {
        message: format!("Required fields missing: {}", missing.join(", ")),
        missing,
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Builder for [`ProjectPreferences`].
#[derive(Debug, Default, Clone)]
pub struct PreferencesBuilder {
    project_type: Option<ProjectType>,
    description: Option<String>,
    location: Option<Location>,
    available_tools: Vec<Tool>,
    open_to_extra_tools: Option<ToolOpenness>,
    material_preferences: Vec<String>,
    skill_level: Option<SkillLevel>,
    budget: Option<String>,
    timeline: Option<Timeline>,
    safety_considerations: Vec<String>,
    instruction_style: Option<InstructionStyle>,
}

impl PreferencesBuilder {
    /// Create a new PreferencesBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_type(mut self, project_type: ProjectType) -> Self {
        self.project_type = Some(project_type);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Add an available tool. Duplicates are ignored.
    pub fn tool(mut self, tool: Tool) -> Self {
        push_unique(&mut self.available_tools, tool);
        self
    }

    pub fn tools(self, tools: impl IntoIterator<Item = Tool>) -> Self {
        tools.into_iter().fold(self, |b, t| b.tool(t))
    }

    pub fn open_to_extra_tools(mut self, openness: ToolOpenness) -> Self {
        self.open_to_extra_tools = Some(openness);
        self
    }

    /// Add a preferred material. Blank entries and duplicates are ignored.
    pub fn material(mut self, material: impl Into<String>) -> Self {
        let material = material.into().trim().to_string();
        if !material.is_empty() {
            push_unique(&mut self.material_preferences, material);
        }
        self
    }

    pub fn materials<S: Into<String>>(self, materials: impl IntoIterator<Item = S>) -> Self {
        materials.into_iter().fold(self, |b, m| b.material(m))
    }

    pub fn skill_level(mut self, skill_level: SkillLevel) -> Self {
        self.skill_level = Some(skill_level);
        self
    }

    pub fn budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Some(budget.into());
        self
    }

    pub fn timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    /// Add a safety consideration. Blank entries and duplicates are ignored.
    pub fn safety_consideration(mut self, consideration: impl Into<String>) -> Self {
        let consideration = consideration.into().trim().to_string();
        if !consideration.is_empty() {
            push_unique(&mut self.safety_considerations, consideration);
        }
        self
    }

    pub fn safety_considerations<S: Into<String>>(
        self,
        considerations: impl IntoIterator<Item = S>,
    ) -> Self {
        considerations
            .into_iter()
            .fold(self, |b, c| b.safety_consideration(c))
    }

    pub fn instruction_style(mut self, style: InstructionStyle) -> Self {
        self.instruction_style = Some(style);
        self
    }

    /// Build the preferences, reporting every missing required field.
    pub fn build(self) -> Result<ProjectPreferences> {
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let budget = self
            .budget
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        let mut missing = Vec::new();
        if self.project_type.is_none() {
            missing.push("project_type");
        }
        if description.is_none() {
            missing.push("description");
        }
        if self.location.is_none() {
            missing.push("location");
        }
        if self.skill_level.is_none() {
            missing.push("skill_level");
        }
        if budget.is_none() {
            missing.push("budget");
        }
        if self.timeline.is_none() {
            missing.push("timeline");
        }

        match (
            self.project_type,
            description,
            self.location,
            self.skill_level,
            budget,
            self.timeline,
        ) {
            (
                Some(project_type),
                Some(description),
                Some(location),
                Some(skill_level),
                Some(budget),
                Some(timeline),
            ) => Ok(ProjectPreferences {
                project_type,
                description,
                location,
                available_tools: self.available_tools,
                open_to_extra_tools: self.open_to_extra_tools.unwrap_or_default(),
                material_preferences: self.material_preferences,
                skill_level,
                budget,
                timeline,
                safety_considerations: self.safety_considerations,
                instruction_style: self.instruction_style.unwrap_or_default(),
            }),
            _ => Err(validation_error(missing)),
        }
    }
}
