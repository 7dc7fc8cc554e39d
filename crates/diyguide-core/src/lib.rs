//! # DIY Guide Core
//!
//! Core primitives and types for research-grounded DIY project guides.
//!
//! This crate provides the fundamental building blocks:
//! - [`ProjectPreferences`] - Validated project profile
//! - [`ResearchResult`] - Curated grounding material
//! - [`ProjectGuideDocument`] - Structure-checked final guide
//! - [`DiyGuideError`] - Pipeline error taxonomy

pub mod error;
pub mod guide;
pub mod preferences;
pub mod research;
pub mod types;

// Re-exports for convenience
pub use error::{
    CredentialKind, DiyGuideError, ReasoningError, ReasoningFailureKind, Result, SearchError,
};
pub use guide::{find_bare_urls, GuideSection, GuideSections, ProjectGuideDocument, EXPORT_FILE_NAME};
pub use preferences::{
    InstructionStyle, Location, PreferencesBuilder, ProjectPreferences, ProjectType, SkillLevel,
    Timeline, Tool, ToolOpenness, UnknownOption,
};
pub use research::{ResearchItem, ResearchResult, SearchHit, MAX_RESEARCH_ITEMS};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{DiyGuideError, Result};
    pub use crate::guide::{GuideSections, ProjectGuideDocument};
    pub use crate::preferences::{
        InstructionStyle, Location, ProjectPreferences, ProjectType, SkillLevel, Timeline, Tool,
        ToolOpenness,
    };
    pub use crate::research::{ResearchItem, ResearchResult, SearchHit};
}
