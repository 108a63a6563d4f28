//! Caption records: the merged caption + tag document.
//!
//! The document is a small, fixed YAML shape written line by line:
//!
//! ```text
//! main_prompt: <caption text>
//! tags:
//!   - tag: <tag1>
//!   - tag: <tag2>
//! ```
//!
//! There is no trailing newline. Plain values are written unquoted, which is
//! what downstream training tools already read; a value a YAML reader would
//! misread (a `: ` inside, a leading indicator character, a bare `true`, ...)
//! is written single-quoted. [`CaptionRecord::parse`] reads the same shape
//! back.

use std::path::Path;

use crate::error::{PipelineError, PipelineResult};

const PROMPT_KEY: &str = "main_prompt: ";
const TAGS_KEY: &str = "tags:";
const TAG_ITEM: &str = "  - tag: ";

/// A generated caption with the tags it was merged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionRecord {
    pub main_prompt: String,
    pub tags: Vec<String>,
}

/// Characters that change the meaning of a plain YAML scalar when leading.
const INDICATORS: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

/// Split raw tag-file text on commas, trimming and dropping empties.
///
/// Line breaks inside a tag are folded to single spaces.
pub fn parse_tag_text(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(fold_lines)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Join the trimmed, non-empty lines of `text` with single spaces.
fn fold_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.starts_with(INDICATORS)
        || value.ends_with(':')
        || value.contains(": ")
        || value.contains(" #")
        || matches!(
            value.to_ascii_lowercase().as_str(),
            "~" | "null" | "true" | "false" | "yes" | "no" | "on" | "off"
        )
        || value.parse::<f64>().is_ok()
}

/// Render one scalar, single-quoting it when a plain scalar would misread.
fn scalar(value: &str) -> String {
    if needs_quotes(value) {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

/// Inverse of [`scalar`].
fn unscalar(raw: &str) -> PipelineResult<String> {
    match raw.strip_prefix('\'') {
        Some(rest) => rest
            .strip_suffix('\'')
            .map(|inner| inner.replace("''", "'"))
            .ok_or_else(|| PipelineError::Document(format!("unterminated quote: {raw:?}"))),
        None => Ok(raw.to_string()),
    }
}

impl CaptionRecord {
    /// Merge a caption with the raw contents of a tag file.
    ///
    /// Line breaks inside the caption are folded to spaces so the document
    /// stays one key per line.
    pub fn new(caption: &str, raw_tags: &str) -> Self {
        Self {
            main_prompt: fold_lines(caption),
            tags: parse_tag_text(raw_tags),
        }
    }

    /// Render the document.
    pub fn to_document(&self) -> String {
        let mut doc = format!("{PROMPT_KEY}{}\n{TAGS_KEY}", scalar(&self.main_prompt));
        for tag in &self.tags {
            doc.push('\n');
            doc.push_str(TAG_ITEM);
            doc.push_str(&scalar(tag));
        }
        doc
    }

    /// Parse a document produced by [`CaptionRecord::to_document`].
    pub fn parse(doc: &str) -> PipelineResult<Self> {
        let mut lines = doc.lines();

        let main_prompt = lines
            .next()
            .and_then(|line| {
                line.strip_prefix(PROMPT_KEY)
                    .or_else(|| line.strip_prefix(PROMPT_KEY.trim_end()))
            })
            .ok_or_else(|| PipelineError::Document(format!("expected '{PROMPT_KEY}' line")))
            .and_then(unscalar)?;

        match lines.next() {
            Some(TAGS_KEY) => {}
            other => {
                return Err(PipelineError::Document(format!(
                    "expected '{TAGS_KEY}', found {other:?}"
                )))
            }
        }

        let tags = lines
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                line.strip_prefix(TAG_ITEM)
                    .ok_or_else(|| PipelineError::Document(format!("bad tag line: {line:?}")))
                    .and_then(unscalar)
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self { main_prompt, tags })
    }

    /// Write the document, replacing any existing file.
    pub async fn write(&self, path: &Path) -> PipelineResult<()> {
        tokio::fs::write(path, self.to_document())
            .await
            .map_err(|e| PipelineError::io(path, e))
    }

    /// Read and parse a document from disk.
    pub async fn read(path: &Path) -> PipelineResult<Self> {
        let doc = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        Self::parse(&doc)
    }
}
