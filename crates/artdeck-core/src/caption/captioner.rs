//! The captioning batch loop.
//!
//! Images are captioned strictly one after another with a model loaded once
//! up front. An existing caption record means the image is done unless
//! overwrite is requested. A missing tag file stops the run before the model
//! sees the image.

use std::path::Path;
use std::time::{Duration, Instant};

use super::discovery::{Companions, DiscoveredFile};
use super::model::{CaptionModel, CaptionRequest, ImageInput};
use super::record::CaptionRecord;
use crate::config::{CaptionConfig, ModelConfig};
use crate::ensure::{ensure_with, Ensured};
use crate::error::{PipelineError, PipelineResult};

/// Options for a captioning run.
#[derive(Debug, Clone)]
pub struct CaptionOptions {
    /// Generation budget per caption
    pub max_new_tokens: u32,
    /// Regenerate existing caption records
    pub overwrite: bool,
    /// Instruction sent alongside each image
    pub prompt: String,
    /// Extension of tag companions
    pub tag_extension: String,
    /// Extension of caption records
    pub caption_extension: String,
}

impl CaptionOptions {
    pub fn from_config(caption: &CaptionConfig, model: &ModelConfig, overwrite: bool) -> Self {
        Self {
            max_new_tokens: caption.max_new_tokens,
            overwrite,
            prompt: model.prompt.clone(),
            tag_extension: caption.tag_extension.clone(),
            caption_extension: caption.caption_extension.clone(),
        }
    }
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self::from_config(&CaptionConfig::default(), &ModelConfig::default(), false)
    }
}

/// What happened to one image.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionOutcome {
    /// A caption record was written
    Captioned { caption: String, elapsed: Duration },
    /// The caption record already existed
    Skipped,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionStats {
    /// Images visited (captioned + skipped)
    pub files: u64,
    /// Caption records written
    pub captioned: u64,
    /// Images with an existing record
    pub skipped: u64,
    /// Time spent inside the model
    pub inference: Duration,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl CaptionStats {
    /// Average wall-clock seconds per visited file.
    pub fn average_secs_per_file(&self) -> PipelineResult<f64> {
        if self.files == 0 {
            return Err(PipelineError::EmptyBatch);
        }
        Ok(self.elapsed.as_secs_f64() / self.files as f64)
    }
}

/// Sequential captioner around one loaded model.
pub struct Captioner {
    model: Box<dyn CaptionModel>,
    options: CaptionOptions,
}

impl Captioner {
    pub fn new(model: Box<dyn CaptionModel>, options: CaptionOptions) -> Self {
        Self { model, options }
    }

    pub fn model(&self) -> &dyn CaptionModel {
        self.model.as_ref()
    }

    /// Caption every file in order, stopping at the first aborting error.
    pub async fn run(&self, files: &[DiscoveredFile]) -> PipelineResult<CaptionStats> {
        let start = Instant::now();
        let mut stats = CaptionStats::default();

        for file in files {
            stats.files += 1;
            match self.caption_file(&file.path).await? {
                CaptionOutcome::Captioned { elapsed, .. } => {
                    stats.captioned += 1;
                    stats.inference += elapsed;
                }
                CaptionOutcome::Skipped => stats.skipped += 1,
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// Caption one image unless its record already exists.
    pub async fn caption_file(&self, image: &Path) -> PipelineResult<CaptionOutcome> {
        let companions = Companions::for_image(
            image,
            &self.options.tag_extension,
            &self.options.caption_extension,
        );

        let outcome = ensure_with(&companions.caption, self.options.overwrite, || {
            self.generate_record(image, &companions)
        })
        .await?;

        Ok(match outcome {
            Ensured::Produced((caption, elapsed)) => CaptionOutcome::Captioned { caption, elapsed },
            Ensured::Skipped => {
                tracing::info!(
                    "\tSkipping {} because caption already exists.",
                    image.display()
                );
                CaptionOutcome::Skipped
            }
        })
    }

    async fn generate_record(
        &self,
        image: &Path,
        companions: &Companions,
    ) -> PipelineResult<(String, Duration)> {
        if !companions.tags.is_file() {
            return Err(PipelineError::MissingCompanion {
                image: image.to_path_buf(),
                companion: companions.tags.clone(),
            });
        }
        let raw_tags = tokio::fs::read_to_string(&companions.tags)
            .await
            .map_err(|e| PipelineError::io(&companions.tags, e))?;

        let request = CaptionRequest {
            image: ImageInput::load(image).await?,
            prompt: self.options.prompt.clone(),
            max_new_tokens: self.options.max_new_tokens,
        };

        tracing::info!("{}", image.display());
        let start = Instant::now();
        let caption = self.model.generate(&request).await?;
        let elapsed = start.elapsed();

        let full_caption = [caption.as_str(), raw_tags.as_str()].join(", ");
        tracing::info!(
            "Caption generated in {:.2} sec.: {}",
            elapsed.as_secs_f64(),
            full_caption
        );

        CaptionRecord::new(&caption, &raw_tags)
            .write(&companions.caption)
            .await?;
        Ok((caption, elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Returns a fixed caption and counts calls.
    struct MockModel {
        caption: String,
        calls: Arc<AtomicU32>,
        last_budget: Arc<AtomicU32>,
    }

    impl MockModel {
        fn new(caption: &str) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    caption: caption.to_string(),
                    calls: calls.clone(),
                    last_budget: Arc::new(AtomicU32::new(0)),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl CaptionModel for MockModel {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-v1"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, request: &CaptionRequest) -> PipelineResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_budget
                .store(request.max_new_tokens, Ordering::SeqCst);
            Ok(self.caption.clone())
        }
    }

    /// A model that always fails.
    struct BrokenModel;

    #[async_trait]
    impl CaptionModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        fn model(&self) -> &str {
            "broken"
        }

        async fn is_available(&self) -> bool {
            false
        }

        async fn generate(&self, _request: &CaptionRequest) -> PipelineResult<String> {
            Err(PipelineError::Model {
                message: "backend down".to_string(),
                status_code: Some(503),
            })
        }
    }

    fn write_image(path: &Path) {
        image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]))
            .save(path)
            .unwrap();
    }

    fn discovered(path: PathBuf) -> DiscoveredFile {
        DiscoveredFile { path, size: 0 }
    }

    #[tokio::test]
    async fn test_caption_file_writes_merged_record() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("abc.png");
        write_image(&image);
        std::fs::write(dir.path().join("abc.txt"), "named Bolt, common, red").unwrap();
        let (model, calls) = MockModel::new("a lightning bolt");
        let budget = model.last_budget.clone();
        let captioner = Captioner::new(Box::new(model), CaptionOptions::default());

        let outcome = captioner.caption_file(&image).await.unwrap();

        assert!(matches!(outcome, CaptionOutcome::Captioned { ref caption, .. } if caption == "a lightning bolt"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(budget.load(Ordering::SeqCst), 24);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("abc.yaml")).unwrap(),
            "main_prompt: a lightning bolt\ntags:\n  - tag: named Bolt\n  - tag: common\n  - tag: red"
        );
    }

    #[tokio::test]
    async fn test_existing_record_is_skipped_without_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("abc.png");
        write_image(&image);
        std::fs::write(dir.path().join("abc.txt"), "red").unwrap();
        std::fs::write(dir.path().join("abc.yaml"), "main_prompt: old\ntags:").unwrap();
        let (model, calls) = MockModel::new("new");
        let captioner = Captioner::new(Box::new(model), CaptionOptions::default());

        let outcome = captioner.caption_file(&image).await.unwrap();

        assert_eq!(outcome, CaptionOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("abc.yaml")).unwrap(),
            "main_prompt: old\ntags:"
        );
    }

    #[tokio::test]
    async fn test_overwrite_regenerates_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("abc.png");
        write_image(&image);
        std::fs::write(dir.path().join("abc.txt"), "red").unwrap();
        std::fs::write(dir.path().join("abc.yaml"), "main_prompt: old\ntags:").unwrap();
        let (model, calls) = MockModel::new("new");
        let options = CaptionOptions {
            overwrite: true,
            ..CaptionOptions::default()
        };
        let captioner = Captioner::new(Box::new(model), options);

        let outcome = captioner.caption_file(&image).await.unwrap();

        assert!(matches!(outcome, CaptionOutcome::Captioned { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let record = CaptionRecord::read(&dir.path().join("abc.yaml")).await.unwrap();
        assert_eq!(record.main_prompt, "new");
        assert_eq!(record.tags, vec!["red"]);
    }

    #[tokio::test]
    async fn test_missing_tag_file_aborts_before_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("lonely.jpg");
        write_image(&image);
        let (model, calls) = MockModel::new("never");
        let captioner = Captioner::new(Box::new(model), CaptionOptions::default());

        let err = captioner
            .run(&[discovered(image.clone())])
            .await
            .unwrap_err();

        match err {
            PipelineError::MissingCompanion { image: img, companion } => {
                assert_eq!(img, image);
                assert_eq!(companion, dir.path().join("lonely.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("lonely.yaml").exists());
    }

    #[tokio::test]
    async fn test_run_counts_captioned_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for stem in ["a", "b", "c"] {
            write_image(&dir.path().join(format!("{stem}.png")));
            std::fs::write(dir.path().join(format!("{stem}.txt")), "tag").unwrap();
        }
        std::fs::write(dir.path().join("b.yaml"), "main_prompt: done\ntags:").unwrap();
        let (model, calls) = MockModel::new("caption");
        let captioner = Captioner::new(Box::new(model), CaptionOptions::default());
        let files: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|s| discovered(dir.path().join(format!("{s}.png"))))
            .collect();

        let stats = captioner.run(&files).await.unwrap();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.captioned, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(stats.average_secs_per_file().is_ok());
    }

    #[tokio::test]
    async fn test_model_failure_aborts_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("abc.png");
        write_image(&image);
        std::fs::write(dir.path().join("abc.txt"), "red").unwrap();
        let captioner = Captioner::new(Box::new(BrokenModel), CaptionOptions::default());

        let err = captioner.caption_file(&image).await.unwrap_err();

        assert!(matches!(err, PipelineError::Model { .. }));
        assert!(!dir.path().join("abc.yaml").exists());
    }

    #[test]
    fn test_empty_batch_average_is_an_error() {
        let stats = CaptionStats::default();
        assert!(matches!(
            stats.average_secs_per_file(),
            Err(PipelineError::EmptyBatch)
        ));
    }

    #[test]
    fn test_average_over_visited_files() {
        let stats = CaptionStats {
            files: 4,
            elapsed: Duration::from_secs(10),
            ..CaptionStats::default()
        };
        assert!((stats.average_secs_per_file().unwrap() - 2.5).abs() < f64::EPSILON);
    }
}
