use serde::Serialize;

use super::{PipelineState, TrackerError};
use crate::scheduler::GateDecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    Single,
    Bulk,
}

impl BatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMode::Single => "single",
            BatchMode::Bulk => "bulk",
        }
    }
}

/// A failure recorded while running a batch.
#[derive(Debug)]
pub struct ItemFailure {
    /// Position of the failing item; `None` for intake and gate failures.
    pub index: Option<usize>,
    pub error: TrackerError,
}

/// Aggregated result of one batch, turned into exactly one response.
#[derive(Debug)]
pub struct BatchOutcome {
    pub mode: BatchMode,
    /// Terminal state of the last processed item.
    pub state: PipelineState,
    /// Logical requests read from the input.
    pub items: usize,
    /// Items counted as logged.
    pub tracked: usize,
    pub failures: Vec<ItemFailure>,
    pub authenticated: bool,
    pub debug: bool,
    /// Buffered diagnostic output.
    pub output: String,
    pub gate: Option<GateDecision>,
}

impl BatchOutcome {
    pub fn new(mode: BatchMode, debug: bool) -> Self {
        Self {
            mode,
            state: PipelineState::default(),
            items: 0,
            tracked: 0,
            failures: Vec::new(),
            authenticated: false,
            debug,
            output: String::new(),
            gate: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failure reported to the caller.
    pub fn first_failure(&self) -> Option<&ItemFailure> {
        self.failures.first()
    }

    /// Diagnostics may be shown to this caller.
    pub fn may_disclose(&self) -> bool {
        self.debug || self.authenticated
    }

    pub(crate) fn record_failure(&mut self, index: Option<usize>, error: TrackerError) {
        self.failures.push(ItemFailure { index, error });
    }
}
