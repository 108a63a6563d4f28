//! Routing of card records by layout kind.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Layout kind that earns the extra "token" tag.
pub const TOKEN_LAYOUT: &str = "token";

/// Layouts whose faces are tagged and downloaded independently.
static MULTI_FACED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["transform", "double_faced_token", "modal_dfc"]));

/// Layouts that produce no output at all.
static SKIPPED: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "flip",
        "reversible_card",
        "art_series",
        "split",
        "adventure",
    ])
});

/// How a record is handled by the harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Front and back are separate outputs
    MultiFaced,
    /// No output
    Skip,
    /// The record is its own single face
    Single,
}

impl Routing {
    /// Classify a layout kind.
    pub fn classify(layout: &str) -> Self {
        if MULTI_FACED.contains(layout) {
            Routing::MultiFaced
        } else if SKIPPED.contains(layout) {
            Routing::Skip
        } else {
            Routing::Single
        }
    }
}
