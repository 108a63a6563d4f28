//! Card record sources.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use super::record::CardRecord;
use crate::error::{PipelineError, PipelineResult};

/// Anything that can hand the harvester a batch of card records.
pub trait CardSource: Send + Sync {
    /// Short description for logging.
    fn describe(&self) -> String;

    /// Load every record, in source order.
    fn records(&self) -> PipelineResult<Vec<CardRecord>>;
}

/// A bulk-data JSON export on disk (a single array of card objects).
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CardSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn records(&self) -> PipelineResult<Vec<CardRecord>> {
        let file = File::open(&self.path).map_err(|e| PipelineError::Source {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let records: Vec<CardRecord> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::Source {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        tracing::info!("Loaded {} card records from {:?}", records.len(), self.path);
        Ok(records)
    }
}

/// Records already in memory.
pub struct MemorySource {
    records: Vec<CardRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<CardRecord>) -> Self {
        Self { records }
    }
}

impl CardSource for MemorySource {
    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }

    fn records(&self) -> PipelineResult<Vec<CardRecord>> {
        Ok(self.records.clone())
    }
}
