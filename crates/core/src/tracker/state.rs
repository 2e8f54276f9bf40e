use serde::Serialize;

/// Validity state of one logical request.
///
/// Starts at `NothingToNotice`; the first transition away from it is final
/// for the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    NothingToNotice,
    LoggingDisabled,
    EmptyRequest,
    NoscriptRequest,
}

impl PipelineState {
    /// Items in these states are handed to the visit delegate.
    pub fn is_valid(&self) -> bool {
        !matches!(
            self,
            PipelineState::LoggingDisabled | PipelineState::EmptyRequest
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::NothingToNotice => "nothing_to_notice",
            PipelineState::LoggingDisabled => "logging_disabled",
            PipelineState::EmptyRequest => "empty_request",
            PipelineState::NoscriptRequest => "noscript_request",
        }
    }

    /// Move to `next` unless a terminal state was already reached.
    pub fn transition(&mut self, next: PipelineState) {
        if *self == PipelineState::NothingToNotice {
            *self = next;
        }
    }

    /// State for an item given the statistics flag and its parameter count.
    pub fn classify(record_statistics: bool, params_count: usize) -> Self {
        let mut state = PipelineState::default();
        if !record_statistics {
            state.transition(PipelineState::LoggingDisabled);
        } else if params_count == 0 {
            state.transition(PipelineState::EmptyRequest);
        } else if params_count == 1 {
            state.transition(PipelineState::NoscriptRequest);
        }
        state
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
