//! Prometheus metrics for story playback and view tracking
//!
//! Collectors register with the default registry so a service can expose them
//! through `prometheus::gather()`.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

/// View appends by outcome (recorded/duplicate/failed)
static VIEWS_RECORDED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "story_views_recorded_total",
        "Story view appends by outcome (recorded/duplicate/failed)",
        &["outcome"]
    )
    .expect("failed to register story_views_recorded_total")
});

/// Playback transitions by kind
static PLAYBACK_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "story_playback_transitions_total",
        "Playback state machine transitions",
        &["transition"]
    )
    .expect("failed to register story_playback_transitions_total")
});

/// Number of times story groups were rebuilt from the source list
static GROUPING_REBUILDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "story_grouping_rebuilds_total",
        "Number of times story groups were recomputed"
    )
    .expect("failed to register story_grouping_rebuilds_total")
});

/// Viewer list requests by outcome (loaded/unavailable/forbidden)
static VIEWER_LISTINGS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "story_viewer_listings_total",
        "Viewer list requests by outcome",
        &["outcome"]
    )
    .expect("failed to register story_viewer_listings_total")
});

pub fn record_view_outcome(outcome: &str) {
    VIEWS_RECORDED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_transition(transition: &str) {
    PLAYBACK_TRANSITIONS_TOTAL
        .with_label_values(&[transition])
        .inc();
}

pub fn record_grouping_rebuild() {
    GROUPING_REBUILDS_TOTAL.inc();
}

pub fn record_viewer_listing(outcome: &str) {
    VIEWER_LISTINGS_TOTAL.with_label_values(&[outcome]).inc();
}
