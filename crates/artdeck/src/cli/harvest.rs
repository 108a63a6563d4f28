//! The `artdeck harvest` command: card export → tag files + art crops.

use anyhow::Context;
use artdeck_core::card::{
    HarvestOptions, HarvestStats, Harvester, HttpImageFetcher, ImageDownloader, JsonFileSource,
    RequestPacing,
};
use artdeck_core::Config;
use clap::Args;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Arguments for the `harvest` command.
#[derive(Args, Debug, Default)]
pub struct HarvestArgs {
    /// Bulk card export (JSON array); defaults to `harvest.cards_path`
    #[arg(long)]
    pub cards: Option<PathBuf>,

    /// Directory for images and tag files; defaults to `harvest.output_dir`
    #[arg(long = "output-dir", alias = "output_dir")]
    pub output_dir: Option<PathBuf>,

    /// Write tag files only, without downloading art
    #[arg(long = "no-images", alias = "no_images")]
    pub no_images: bool,
}

impl HarvestArgs {
    fn options(&self, config: &Config) -> HarvestOptions {
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| config.harvest_output_dir());
        let mut options = HarvestOptions::from_config(&config.harvest, output_dir);
        options.download_images = !self.no_images;
        options
    }
}

/// Execute the harvest command.
pub async fn execute(args: HarvestArgs, config: Config) -> anyhow::Result<()> {
    let cards = args.cards.clone().unwrap_or_else(|| config.cards_path());
    let options = args.options(&config);

    let fetcher = HttpImageFetcher::new(&config.harvest.user_agent)?;
    let downloader = ImageDownloader::new(
        Box::new(fetcher),
        RequestPacing::from_config(&config.harvest),
        options.output_dir.clone(),
    );
    let harvester = Harvester::new(Box::new(JsonFileSource::new(&cards)), downloader, options);

    let records = harvester
        .load()
        .with_context(|| format!("Cannot read card export {}", cards.display()))?;

    let start = Instant::now();
    let progress = super::create_progress_bar(records.len() as u64);
    let result = harvester
        .harvest(&records, |record| {
            progress.inc(1);
            progress.set_message(record.face.name.clone());
        })
        .await;
    progress.finish_and_clear();

    let stats = result?;
    print_summary(&stats, start.elapsed());
    Ok(())
}

fn print_summary(stats: &HarvestStats, elapsed: Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("           Harvest Summary");
    eprintln!("  ====================================");
    eprintln!("    Records:      {:>8}", stats.records);
    eprintln!("    Faces:        {:>8}", stats.faces);
    eprintln!("    Tag files:    {:>8}", stats.tags_written);
    eprintln!("    Downloaded:   {:>8}", stats.downloaded);
    if stats.skipped_existing > 0 {
        eprintln!("    Present:      {:>8}", stats.skipped_existing);
    }
    if stats.skipped_layout > 0 {
        eprintln!("    Layout skip:  {:>8}", stats.skipped_layout);
    }
    if stats.malformed > 0 {
        eprintln!("    Malformed:    {:>8}", stats.malformed);
    }
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default_to_config() {
        let config = Config::default();
        let options = HarvestArgs::default().options(&config);
        assert_eq!(options.output_dir, PathBuf::from("images"));
        assert!(options.download_images);
        assert_eq!(options.image_version, "art_crop");
    }

    #[test]
    fn test_flags_override_config() {
        let args = HarvestArgs {
            cards: None,
            output_dir: Some(PathBuf::from("/tmp/out")),
            no_images: true,
        };
        let options = args.options(&Config::default());
        assert_eq!(options.output_dir, PathBuf::from("/tmp/out"));
        assert!(!options.download_images);
    }

    #[tokio::test]
    async fn test_missing_export_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = HarvestArgs {
            cards: Some(dir.path().join("missing.json")),
            output_dir: Some(dir.path().join("out")),
            no_images: true,
        };
        let err = execute(args, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[tokio::test]
    async fn test_tags_only_harvest_writes_tag_files() {
        let dir = tempfile::tempdir().unwrap();
        let cards = dir.path().join("cards.json");
        std::fs::write(
            &cards,
            r#"[{"id":"abc","name":"Lightning Bolt","type_line":"Instant",
                "oracle_text":"Lightning Bolt deals 3 damage to any target.",
                "colors":["R"],"artist":"Christopher Rush","layout":"normal",
                "rarity":"common","set_name":"Alpha"}]"#,
        )
        .unwrap();
        let out = dir.path().join("out");
        let args = HarvestArgs {
            cards: Some(cards),
            output_dir: Some(out.clone()),
            no_images: true,
        };

        execute(args, Config::default()).await.unwrap();

        let tags = std::fs::read_to_string(out.join("abc.txt")).unwrap();
        assert!(tags.starts_with("named Lightning Bolt, common, red"));
        assert!(!out.join("abc.jpg").exists());
    }
}
