//! The generated project guide and its structure check.
//!
//! A guide is Markdown with a fixed section order:
//! title, Materials Needed, Tools Needed, Step-by-Step Instructions, Safety Tips.
//! [`GuideSections::parse`] checks that layout deterministically so callers
//! never display a malformed guide by accident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{DiyGuideError, Result};

/// File name offered when the guide is downloaded.
pub const EXPORT_FILE_NAME: &str = "diy_project_guide.txt";

/// A required guide section, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideSection {
    Title,
    MaterialsNeeded,
    ToolsNeeded,
    StepByStepInstructions,
    SafetyTips,
}

impl GuideSection {
    /// Sections in the order they must appear.
    pub const ORDER: [GuideSection; 5] = [
        GuideSection::Title,
        GuideSection::MaterialsNeeded,
        GuideSection::ToolsNeeded,
        GuideSection::StepByStepInstructions,
        GuideSection::SafetyTips,
    ];

    /// Heading text used in the Markdown template.
    pub fn heading(&self) -> &'static str {
        match self {
            GuideSection::Title => "Project Title",
            GuideSection::MaterialsNeeded => "Materials Needed",
            GuideSection::ToolsNeeded => "Tools Needed",
            GuideSection::StepByStepInstructions => "Step-by-Step Instructions",
            GuideSection::SafetyTips => "Safety Tips",
        }
    }

    fn is_numbered(&self) -> bool {
        matches!(self, GuideSection::StepByStepInstructions)
    }

    fn from_heading(line: &str) -> Option<GuideSection> {
        let normalized = normalize_heading(line);
        GuideSection::ORDER[1..]
            .iter()
            .copied()
            .find(|s| normalize_heading(s.heading()) == normalized)
    }
}

fn normalize_heading(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim()
        .replace('-', " ")
        .to_ascii_lowercase()
}

/// Parsed content of a well-formed guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideSections {
    pub title: String,
    pub materials: Vec<String>,
    pub tools: Vec<String>,
    pub steps: Vec<String>,
    pub safety_tips: Vec<String>,
}

impl GuideSections {
    /// Parse guide Markdown, returning every structural problem found.
    pub fn parse(markdown: &str) -> std::result::Result<GuideSections, Vec<String>> {
        let mut problems = Vec::new();
        let mut lines = markdown
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .peekable();

        let title = match lines.peek().copied() {
            None => {
                return Err(vec!["guide is empty".to_string()]);
            }
            Some(first) if GuideSection::from_heading(first).is_some() => {
                problems.push("missing title line before the first section".to_string());
                None
            }
            Some(first) => {
                lines.next();
                Some(clean_title(first))
            }
        };

        let mut seen: Vec<GuideSection> = Vec::new();
        let mut current: Option<GuideSection> = None;
        let mut stray_preamble = false;
        let mut materials = Vec::new();
        let mut tools = Vec::new();
        let mut steps = Vec::new();
        let mut safety_tips = Vec::new();

        for line in lines {
            if let Some(section) = GuideSection::from_heading(line) {
                if seen.contains(&section) {
                    problems.push(format!("section \"{}\" appears more than once", section.heading()));
                } else if seen.last().is_some_and(|last| position(*last) > position(section)) {
                    problems.push(format!("section \"{}\" is out of order", section.heading()));
                }
                seen.push(section);
                current = Some(section);
                continue;
            }

            let Some(section) = current else {
                if title.is_some() && !stray_preamble {
                    problems.push(format!("unexpected text after the title: \"{}\"", line));
                    stray_preamble = true;
                }
                continue;
            };
            let item = if section.is_numbered() {
                numbered_item(line)
            } else {
                bullet_item(line)
            };
            if let Some(item) = item {
                match section {
                    GuideSection::MaterialsNeeded => materials.push(item),
                    GuideSection::ToolsNeeded => tools.push(item),
                    GuideSection::StepByStepInstructions => steps.push(item),
                    GuideSection::SafetyTips => safety_tips.push(item),
                    GuideSection::Title => {}
                }
            }
        }

        for section in &GuideSection::ORDER[1..] {
            if !seen.contains(section) {
                problems.push(format!("missing section \"{}\"", section.heading()));
                continue;
            }
            let empty = match section {
                GuideSection::MaterialsNeeded => materials.is_empty(),
                GuideSection::ToolsNeeded => tools.is_empty(),
                GuideSection::StepByStepInstructions => steps.is_empty(),
                GuideSection::SafetyTips => safety_tips.is_empty(),
                GuideSection::Title => false,
            };
            if empty {
                let kind = if section.is_numbered() { "numbered" } else { "bulleted" };
                problems.push(format!(
                    "section \"{}\" has no {} items",
                    section.heading(),
                    kind
                ));
            }
        }

        match title {
            Some(title) if problems.is_empty() => Ok(GuideSections {
                title,
                materials,
                tools,
                steps,
                safety_tips,
            }),
            _ => Err(problems),
        }
    }

    /// Sections present, in order, with their item counts. Two guides with
    /// the same outline are structurally identical.
    pub fn outline(&self) -> Vec<(GuideSection, usize)> {
        vec![
            (GuideSection::Title, 1),
            (GuideSection::MaterialsNeeded, self.materials.len()),
            (GuideSection::ToolsNeeded, self.tools.len()),
            (GuideSection::StepByStepInstructions, self.steps.len()),
            (GuideSection::SafetyTips, self.safety_tips.len()),
        ]
    }
}

fn position(section: GuideSection) -> usize {
    GuideSection::ORDER
        .iter()
        .position(|s| *s == section)
        .unwrap_or(usize::MAX)
}

fn clean_title(line: &str) -> String {
    line.trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .to_string()
}

fn bullet_item(line: &str) -> Option<String> {
    ["- ", "* ", "• "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(|rest| rest.trim().to_string())
        .filter(|rest| !rest.is_empty())
}

fn numbered_item(line: &str) -> Option<String> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().to_string()).filter(|r| !r.is_empty())
}

/// URLs in the text that are not the target of an inline Markdown link.
pub fn find_bare_urls(text: &str) -> Vec<String> {
    let mut bare = Vec::new();
    for (idx, _) in text.match_indices("http") {
        let rest = &text[idx..];
        if !(rest.starts_with("http://") || rest.starts_with("https://")) {
            continue;
        }
        if text[..idx].ends_with("](") {
            continue;
        }
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, ')' | '>' | ']'))
            .unwrap_or(rest.len());
        bare.push(rest[..end].trim_end_matches(['.', ',', ';']).to_string());
    }
    bare
}

/// The final guide of a pipeline run. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectGuideDocument {
    id: Uuid,
    markdown: String,
    sections: Option<GuideSections>,
    structure_problems: Vec<String>,
    generated_at: DateTime<Utc>,
    content_hash: String,
}

impl ProjectGuideDocument {
    /// Create a document, failing if the Markdown breaks the required layout.
    pub fn from_markdown(markdown: impl Into<String>) -> Result<Self> {
        let markdown = markdown.into().trim().to_string();
        let sections = GuideSections::parse(&markdown)
            .map_err(|problems| DiyGuideError::StructureViolation { problems })?;
        Ok(Self::assemble(markdown, Some(sections), Vec::new()))
    }

    /// Create a document without rejecting structural problems. The problems
    /// are kept on the document for the caller to inspect.
    pub fn unchecked(markdown: impl Into<String>) -> Self {
        let markdown = markdown.into().trim().to_string();
        match GuideSections::parse(&markdown) {
            Ok(sections) => Self::assemble(markdown, Some(sections), Vec::new()),
            Err(problems) => Self::assemble(markdown, None, problems),
        }
    }

    fn assemble(
        markdown: String,
        sections: Option<GuideSections>,
        structure_problems: Vec<String>,
    ) -> Self {
        let content_hash = content_hash(&markdown);
        Self {
            id: Uuid::new_v4(),
            markdown,
            sections,
            structure_problems,
            generated_at: Utc::now(),
            content_hash,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Parsed sections, absent when the structure check failed.
    pub fn sections(&self) -> Option<&GuideSections> {
        self.sections.as_ref()
    }

    pub fn structure_problems(&self) -> &[String] {
        &self.structure_problems
    }

    pub fn is_well_formed(&self) -> bool {
        self.sections.is_some()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// SHA-256 of the Markdown, hex encoded.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Title line, if the guide parsed.
    pub fn title(&self) -> Option<&str> {
        self.sections.as_ref().map(|s| s.title.as_str())
    }

    /// Plain-text export body.
    pub fn to_plain_text(&self) -> String {
        let mut text = self.markdown.clone();
        text.push('\n');
        text
    }
}

fn content_hash(markdown: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markdown.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
