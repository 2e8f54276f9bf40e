//! Prometheus metrics for the tracker pipeline.
//!
//! This module provides metrics for:
//! - Hits by terminal state and tracked items
//! - Item failures by error kind
//! - Bulk authentication refusals
//! - Scheduled-task gate decisions

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Logical requests processed, by terminal state.
pub static HITS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hitgate_hits_total", "Logical requests processed"),
        &["state"], // "nothing_to_notice", "logging_disabled", "empty_request", "noscript_request"
    )
    .unwrap()
});

/// Items that passed validation and were handed to the visit delegate.
pub static TRACKED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "hitgate_tracked_total",
        "Requests counted as successfully logged",
    )
    .unwrap()
});

/// Failures by kind.
pub static FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hitgate_failures_total", "Tracker failures by kind"),
        &["kind"], // "parse", "auth", "db", "processing"
    )
    .unwrap()
});

/// Batches by mode.
pub static BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hitgate_batches_total", "Tracker batches processed"),
        &["mode"], // "single", "bulk"
    )
    .unwrap()
});

// =============================================================================
// Scheduled Task Metrics
// =============================================================================

/// Scheduled-task gate decisions.
pub static SCHEDULED_TASK_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "hitgate_scheduled_task_decisions_total",
            "Scheduled-task gate evaluations by decision",
        ),
        &["decision"], // "disabled", "not_due", "ran", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(HITS_TOTAL.clone()),
        Box::new(TRACKED_TOTAL.clone()),
        Box::new(FAILURES_TOTAL.clone()),
        Box::new(BATCHES_TOTAL.clone()),
        Box::new(SCHEDULED_TASK_DECISIONS.clone()),
    ]
}
