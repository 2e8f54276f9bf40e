use std::fmt::Write as _;

use tracing::debug;

use super::db::LazyDb;
use super::request::ForcedOverrides;
use crate::scheduler::Access;

/// State owned by one batch and threaded through every stage.
#[derive(Default)]
pub struct TrackerContext {
    pub db: LazyDb,
    overrides: ForcedOverrides,
    pub access: Access,
    debug: bool,
    output: String,
}

impl TrackerContext {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Default::default()
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Set the overrides for the next delegate call.
    pub fn set_overrides(&mut self, overrides: ForcedOverrides) {
        self.overrides = overrides;
    }

    /// Consume the pending overrides, leaving none behind.
    pub fn take_overrides(&mut self) -> ForcedOverrides {
        std::mem::take(&mut self.overrides)
    }

    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    /// Log a diagnostic line, and buffer it for the response in debug mode.
    pub fn print_debug(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!("{}", message);
        if self.debug {
            let _ = writeln!(self.output, "{message}");
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Close the database and hand back the buffered output.
    pub fn into_output(mut self) -> String {
        self.db.close();
        std::mem::take(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_are_consumed_once() {
        let mut ctx = TrackerContext::new(false);
        ctx.set_overrides(ForcedOverrides {
            visitor_id: Some("0123456789abcdef".to_string()),
            ..Default::default()
        });
        assert!(ctx.has_overrides());
        assert!(ctx.take_overrides().visitor_id.is_some());
        assert!(!ctx.has_overrides());
        assert!(ctx.take_overrides().is_empty());
    }

    #[test]
    fn test_debug_output_only_in_debug_mode() {
        let mut quiet = TrackerContext::new(false);
        quiet.print_debug("hidden");
        assert!(quiet.output().is_empty());

        let mut loud = TrackerContext::new(true);
        loud.print_debug("first");
        loud.print_debug("second");
        assert_eq!(loud.into_output(), "first\nsecond\n");
    }
}
