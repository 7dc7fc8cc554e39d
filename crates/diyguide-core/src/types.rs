//! Common types used across the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the guide pipeline.
///
/// A run moves `Idle -> Validating -> Researching -> Synthesizing` and ends in
/// `Done` or `Failed`. A new run starts over from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run has started, or the previous run has been reset.
    #[default]
    Idle,
    /// Credentials and preferences are being checked.
    Validating,
    /// Search and result selection are running.
    Researching,
    /// The guide document is being written.
    Synthesizing,
    /// The run produced a document.
    Done,
    /// The run failed; no document was produced.
    Failed,
}

impl RunState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    /// Returns true while a run is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Validating | RunState::Researching | RunState::Synthesizing
        )
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Idle, Validating) => true,
            (Validating, Researching) => true,
            (Researching, Synthesizing) => true,
            (Synthesizing, Done) => true,
            (Validating | Researching | Synthesizing, Failed) => true,
            // A finished run may be restarted.
            (Done | Failed, Idle) => true,
            _ => false,
        }
    }
}

/// The part of the pipeline an event or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Researching,
    Synthesizing,
}

impl Stage {
    /// The run state matching this stage.
    pub fn run_state(&self) -> RunState {
        match self {
            Stage::Validating => RunState::Validating,
            Stage::Researching => RunState::Researching,
            Stage::Synthesizing => RunState::Synthesizing,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validating => write!(f, "validation"),
            Stage::Researching => write!(f, "research"),
            Stage::Synthesizing => write!(f, "synthesis"),
        }
    }
}
