//! In-memory providers for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use diyguide_core::{ReasoningError, ReasoningFailureKind, SearchError, SearchHit};

use crate::prompts::{RESEARCH_RESULTS_HEADER, SEARCH_RESULTS_HEADER};
use crate::provider::{ApiKey, CompletionRequest, ReasoningProvider, SearchProvider};

/// A guide that passes the structure check.
pub const SAMPLE_GUIDE: &str = "\
## Simple Drywall Patch

### Materials Needed:
- Self-adhesive mesh patch
- Lightweight spackle

### Tools Needed:
- Putty knife
- Sanding sponge

### Step-by-Step Instructions:
1. Clean the edges of the hole.
2. Apply the mesh patch over the hole.
3. Spread two thin coats of spackle.
4. Sand smooth once dry.

### Safety Tips:
- Wear a dust mask while sanding.";

/// Search provider returning fixed hits.
pub struct StubSearch {
    outcome: Result<Vec<SearchHit>, SearchError>,
    calls: AtomicUsize,
}

impl StubSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            outcome: Ok(hits),
            calls: AtomicUsize::new(0),
        }
    }

    /// `count` generic DIY hits.
    pub fn numbered(count: usize) -> Self {
        Self::with_hits(
            (1..=count)
                .map(|i| {
                    SearchHit::new(
                        i,
                        format!("DIY tutorial {i}"),
                        format!("Step-by-step walkthrough number {i}"),
                        format!("https://diy.example/tutorial-{i}"),
                    )
                })
                .collect(),
        )
    }

    pub fn failing(error: SearchError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of searches performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, _credential: &ApiKey, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    fn name(&self) -> &str {
        "stub-search"
    }
}

enum Mode {
    /// Answer from the request content.
    Grounded,
    /// Replay canned responses in order.
    Scripted(Mutex<VecDeque<Result<String, ReasoningError>>>),
}

/// Reasoning provider that records every request.
pub struct StubReasoning {
    mode: Mode,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubReasoning {
    /// Selects every search hit and writes a guide citing the research.
    pub fn grounded() -> Self {
        Self {
            mode: Mode::Grounded,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn scripted(responses: Vec<Result<String, ReasoningError>>) -> Self {
        Self {
            mode: Mode::Scripted(Mutex::new(responses.into())),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Wait before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningProvider for StubReasoning {
    async fn complete(
        &self,
        _credential: &ApiKey,
        request: &CompletionRequest,
    ) -> Result<String, ReasoningError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.mode {
            Mode::Grounded => grounded_answer(&request.input),
            Mode::Scripted(responses) => responses
                .lock()
                .ok()
                .and_then(|mut r| r.pop_front())
                .unwrap_or_else(|| {
                    Err(ReasoningError::new(
                        ReasoningFailureKind::Provider,
                        "no scripted response left",
                    ))
                }),
        }
    }

    fn name(&self) -> &str {
        "stub-reasoning"
    }
}

fn grounded_answer(input: &str) -> Result<String, ReasoningError> {
    if input.contains(SEARCH_RESULTS_HEADER) {
        return Ok(select_all_hits(input));
    }
    if let Some(idx) = input.find(RESEARCH_RESULTS_HEADER) {
        return Ok(guide_from_research(&input[idx..]));
    }
    Err(ReasoningError::new(
        ReasoningFailureKind::BadRequest,
        "input carries neither search nor research results",
    ))
}

/// Picks every numbered hit (`[n] title`) in the order shown.
fn select_all_hits(input: &str) -> String {
    let picks: Vec<String> = input
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix('[')?;
            let (number, title) = rest.split_once("] ")?;
            let number: usize = number.parse().ok()?;
            Some(format!(
                "{{\"result\": {}, \"summary\": \"Covers {}\"}}",
                number,
                title.replace('"', "'")
            ))
        })
        .collect();
    format!("[{}]", picks.join(", "))
}

/// A guide whose materials and tools cite every research link.
fn guide_from_research(research: &str) -> String {
    let links: Vec<&str> = research
        .lines()
        .filter_map(|line| {
            let start = line.find('[')?;
            let end = line.find(')')?;
            (start < end).then(|| &line[start..=end])
        })
        .collect();

    let mut guide = String::from("## Grounded DIY Project\n\n### Materials Needed:\n");
    for link in &links {
        guide.push_str(&format!("- Materials from {}\n", link));
    }
    if links.is_empty() {
        guide.push_str("- Basic supplies\n");
    }
    guide.push_str("\n### Tools Needed:\n");
    for link in &links {
        guide.push_str(&format!("- Tools listed in {}\n", link));
    }
    if links.is_empty() {
        guide.push_str("- Basic hand tools\n");
    }
    guide.push_str(
        "\n### Step-by-Step Instructions:\n1. Prepare the work area.\n2. Follow the sourced plan.\n\
         3. Inspect the finished work.\n\n\
         ### Safety Tips:\n- Wear safety glasses.\n",
    );
    guide
}

#[cfg(test)]
mod tests {
    use super::*;
    use diyguide_core::GuideSections;

    #[test]
    fn test_sample_guide_is_well_formed() {
        assert!(GuideSections::parse(SAMPLE_GUIDE).is_ok());
    }

    #[test]
    fn test_grounded_guide_cites_research() {
        let input = "Research Results:\n1. [Shelf plans](https://a.example): plans\n\
                     2. [Finishing](https://b.example): finish";
        let guide = grounded_answer(input).unwrap();
        let sections = GuideSections::parse(&guide).unwrap();
        assert_eq!(sections.materials.len(), 2);
        assert!(sections.tools[1].contains("[Finishing](https://b.example)"));
        assert!(guide.contains("[Shelf plans](https://a.example)"));
    }

    #[test]
    fn test_grounded_selection_lists_hits() {
        let input = "Search Results:\n[1] First\nURL: https://a\n\n[2] Second \"quoted\"\nURL: https://b";
        let json = grounded_answer(input).unwrap();
        let picks: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[1]["result"], 2);
    }
}
