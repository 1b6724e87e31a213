//! The flow state machine: step sequence, accumulated context and a
//! back-navigable history, plus the engine facade the UI layer drives.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

mod engine;

pub use engine::{BackOutcome, FlowEngine, StepActivation, TapOutcome};

/// Mutable, step-spanning flow state.
///
/// Owned exclusively by the state machine; step components read it and
/// mutate it only through the machine's advance / capture paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowContext {
    /// Identifiers forwarded by the previous step's pick, most recent
    /// first. Replaced wholesale on each forward navigation.
    pub collected_identifiers: Vec<String>,
    /// The id picked on the last choice-menu step, if any.
    pub selected_choice_id: Option<String>,
    /// Variables captured from chosen documents, accumulated across steps.
    pub variables: AHashMap<String, String>,
}

impl FlowContext {
    /// The value substituted for tokens no variable resolves: the most
    /// recent collected identifier, else the selected choice.
    pub fn seed_token(&self) -> Option<&str> {
        self.collected_identifiers
            .iter()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .or(self.selected_choice_id.as_deref())
    }
}

/// Where the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    StepActive(usize),
    Terminal,
}

/// The back-navigable position within the step sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub current_step: usize,
    /// Step indices pushed on forward navigation, popped on back.
    pub history: Vec<usize>,
}

/// The rendered projection of one fetched document. Ephemeral; rebuilt on
/// every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Width and height, when the document carries `imageWidth` /
    /// `imageHeight` fields.
    pub image_dimensions: Option<(u32, u32)>,
}
