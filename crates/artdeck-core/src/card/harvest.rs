//! The harvesting batch loop.
//!
//! One record at a time: classify, tag each face, write the tag file, then
//! make sure the face's art is on disk. Lookup failures abort the batch;
//! fetch failures and malformed records are logged and skipped.

use std::path::{Path, PathBuf};

use super::download::{art_url, ImageDownloader};
use super::layout::Routing;
use super::record::{CardFace, CardRecord, FaceSide};
use super::source::CardSource;
use super::tags::{extract_tags, FaceContext};
use crate::config::HarvestConfig;
use crate::ensure::Ensured;
use crate::error::{PipelineError, PipelineResult};

/// Extension of tag files.
pub const TAG_EXTENSION: &str = "txt";

/// Options for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Directory receiving images and tag files
    pub output_dir: PathBuf,
    /// Base URL of the image API
    pub api_base: String,
    /// Image version requested from the API
    pub image_version: String,
    /// Fetch art (tags are always written)
    pub download_images: bool,
}

impl HarvestOptions {
    pub fn from_config(config: &HarvestConfig, output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            api_base: config.api_base.clone(),
            image_version: config.image_version.clone(),
            download_images: true,
        }
    }
}

/// Counters for a finished harvest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Records read from the source
    pub records: u64,
    /// Faces tagged
    pub faces: u64,
    /// Tag files created or changed
    pub tags_written: u64,
    /// Images downloaded this run
    pub downloaded: u64,
    /// Images already on disk
    pub skipped_existing: u64,
    /// Records with a skipped layout
    pub skipped_layout: u64,
    /// Images whose fetch failed
    pub failed: u64,
    /// Records missing data their layout needs
    pub malformed: u64,
}

/// One face scheduled for output.
struct FaceJob<'a> {
    stem: String,
    face: &'a CardFace,
    side: Option<FaceSide>,
}

/// Sequential harvester over a card source.
pub struct Harvester {
    source: Box<dyn CardSource>,
    downloader: ImageDownloader,
    options: HarvestOptions,
}

impl Harvester {
    pub fn new(
        source: Box<dyn CardSource>,
        downloader: ImageDownloader,
        options: HarvestOptions,
    ) -> Self {
        Self {
            source,
            downloader,
            options,
        }
    }

    /// Load every record from the source.
    pub fn load(&self) -> PipelineResult<Vec<CardRecord>> {
        tracing::info!("Reading cards from {}", self.source.describe());
        self.source.records()
    }

    /// Load and harvest everything without progress reporting.
    pub async fn run(&self) -> PipelineResult<HarvestStats> {
        let records = self.load()?;
        self.harvest(&records, |_| {}).await
    }

    /// Harvest `records`, calling `on_record` after each one.
    pub async fn harvest<F>(
        &self,
        records: &[CardRecord],
        mut on_record: F,
    ) -> PipelineResult<HarvestStats>
    where
        F: FnMut(&CardRecord),
    {
        tokio::fs::create_dir_all(&self.options.output_dir)
            .await
            .map_err(|e| PipelineError::io(&self.options.output_dir, e))?;

        let mut stats = HarvestStats::default();

        for record in records {
            stats.records += 1;

            match plan_faces(record) {
                Ok(jobs) if jobs.is_empty() => {
                    tracing::debug!("{}\t{} skipped (layout {})", record.face.name, record.id, record.layout);
                    stats.skipped_layout += 1;
                }
                Ok(jobs) => {
                    if jobs.len() > 1 {
                        tracing::info!("{}\t{} is multiface", record.face.name, record.id);
                    }
                    for job in jobs {
                        self.harvest_face(record, &job, &mut stats).await?;
                    }
                }
                Err(e) if e.is_skippable() => {
                    tracing::warn!("{e}");
                    stats.malformed += 1;
                }
                Err(e) => return Err(e),
            }

            on_record(record);
        }

        tracing::info!(
            "Harvested {} faces from {} records ({} downloaded, {} already present, {} failed)",
            stats.faces,
            stats.records,
            stats.downloaded,
            stats.skipped_existing,
            stats.failed
        );
        Ok(stats)
    }

    async fn harvest_face(
        &self,
        record: &CardRecord,
        job: &FaceJob<'_>,
        stats: &mut HarvestStats,
    ) -> PipelineResult<()> {
        tracing::info!(
            "{} {} {} {}",
            job.face.name,
            job.stem,
            record.layout,
            record.scryfall_uri.as_deref().unwrap_or("-")
        );

        let tags = extract_tags(job.face, &FaceContext::of(record))?;
        stats.faces += 1;

        let tag_path = self
            .options
            .output_dir
            .join(format!("{}.{TAG_EXTENSION}", job.stem));
        if write_if_changed(&tag_path, &tags.to_text()).await? {
            stats.tags_written += 1;
        }

        if !self.options.download_images {
            return Ok(());
        }

        let url = art_url(
            &self.options.api_base,
            &self.options.image_version,
            &record.id,
            job.side,
        );
        match self.downloader.download(&url, &job.stem).await {
            Ok(Ensured::Produced(_)) => stats.downloaded += 1,
            Ok(Ensured::Skipped) => stats.skipped_existing += 1,
            Err(e) if e.is_skippable() => {
                tracing::warn!("No image for {}: {e}", job.stem);
                stats.failed += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// Faces a record produces, per its layout. Empty for skipped layouts.
fn plan_faces(record: &CardRecord) -> PipelineResult<Vec<FaceJob<'_>>> {
    match Routing::classify(&record.layout) {
        Routing::Skip => Ok(Vec::new()),
        Routing::Single => Ok(vec![FaceJob {
            stem: record.id.clone(),
            face: &record.face,
            side: None,
        }]),
        Routing::MultiFaced => {
            let faces = record.card_faces.as_deref().unwrap_or_default();
            if faces.len() < 2 {
                return Err(PipelineError::MalformedRecord {
                    id: record.id.clone(),
                    message: format!(
                        "layout '{}' needs two card_faces, found {}",
                        record.layout,
                        faces.len()
                    ),
                });
            }
            Ok([FaceSide::Front, FaceSide::Back]
                .into_iter()
                .map(|side| FaceJob {
                    stem: side.stem(&record.id),
                    face: &faces[side.index()],
                    side: Some(side),
                })
                .collect())
        }
    }
}

/// Write `contents` unless the file already holds exactly that.
///
/// Returns whether anything was written.
async fn write_if_changed(path: &Path, contents: &str) -> PipelineResult<bool> {
    if let Ok(existing) = tokio::fs::read_to_string(path).await {
        if existing == contents {
            return Ok(false);
        }
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    Ok(true)
}
