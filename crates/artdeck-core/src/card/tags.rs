//! Tag extraction for one card face.
//!
//! Tags are weak supervision for caption training: short lowercase phrases
//! derived from structured fields, followed by phrases cut out of the rules
//! text, with provenance ("named", "from", "by") at the edges.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::layout::TOKEN_LAYOUT;
use super::record::{CardFace, CardRecord};
use crate::error::{PipelineError, PipelineResult};

/// Color code → color name.
static COLOR_NAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("W", "white"),
        ("U", "blue"),
        ("B", "black"),
        ("R", "red"),
        ("G", "green"),
    ])
});

/// Parenthetical and bracketed remarks (reminder text).
///
/// Non-greedy and non-recursive: "(a (b) c)" leaves " c)" behind.
static REMARKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\(\[].*?[\)\]]").expect("remark pattern is a valid regex")
});

/// Characters that end a rules-text phrase.
const STOP_CHARS: [char; 3] = [',', '.', '\n'];

/// Phrases never emitted as tags.
const IGNORED_PHRASES: &[&str] = &["otherwise"];

/// Type-line separator between supertypes and subtypes.
const TYPE_SEPARATOR: &str = "\u{2014}";

/// Record-level fields a face inherits from its parent card.
#[derive(Debug, Clone, Copy)]
pub struct FaceContext<'a> {
    pub rarity: &'a str,
    pub set_name: &'a str,
    pub layout: &'a str,
}

impl<'a> FaceContext<'a> {
    pub fn of(record: &'a CardRecord) -> Self {
        Self {
            rarity: &record.rarity,
            set_name: &record.set_name,
            layout: &record.layout,
        }
    }
}

/// Ordered tags for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: impl Into<String>) {
        self.0.push(tag.into());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Tag-file contents: comma-joined, no trailing newline.
    pub fn to_text(&self) -> String {
        self.0.join(", ")
    }
}

impl From<Vec<String>> for TagList {
    fn from(tags: Vec<String>) -> Self {
        Self(tags)
    }
}

/// Derive the tag list for one face.
///
/// Fails only on a color code outside the W/U/B/R/G table.
pub fn extract_tags(face: &CardFace, ctx: &FaceContext<'_>) -> PipelineResult<TagList> {
    let mut tags = TagList::new();

    tags.push(format!("named {}", face.name.replace(',', "")));
    tags.push(ctx.rarity);

    if ctx.layout == TOKEN_LAYOUT {
        tags.push(TOKEN_LAYOUT);
    }

    for code in &face.colors {
        let name = COLOR_NAMES
            .get(code.as_str())
            .ok_or_else(|| PipelineError::UnknownColor {
                card: face.name.clone(),
                code: code.clone(),
            })?;
        tags.push(*name);
    }

    for entries in [&face.promo_types, &face.keywords].into_iter().flatten() {
        for entry in entries {
            tags.push(entry.to_lowercase());
        }
    }

    for token in face.type_line.split_whitespace() {
        if token != TYPE_SEPARATOR {
            tags.push(token.to_lowercase());
        }
    }

    for phrase in oracle_phrases(&face.oracle_text) {
        if !tags.contains(&phrase) {
            tags.push(phrase);
        }
    }

    tags.push(format!("from {}", ctx.set_name));
    tags.push(format!("by {}", deunicode::deunicode(&face.artist)));

    Ok(tags)
}

/// Split rules text into lowercase phrases, minus reminder text.
///
/// Duplicates within the text are returned as-is; the caller filters
/// against tags already present.
fn oracle_phrases(oracle_text: &str) -> Vec<String> {
    let ascii = deunicode::deunicode(oracle_text);
    let stripped = REMARKS.replace_all(&ascii, "");

    stripped
        .split(STOP_CHARS)
        .map(|phrase| phrase.trim().to_lowercase())
        .filter(|phrase| !phrase.is_empty() && !IGNORED_PHRASES.contains(&phrase.as_str()))
        .collect()
}
