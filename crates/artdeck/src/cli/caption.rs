//! The `artdeck caption` command: images + tag files → caption records.

use anyhow::Context;
use artdeck_core::caption::{
    CaptionModelFactory, CaptionOptions, CaptionStats, Captioner, DeviceSelection, FileDiscovery,
};
use artdeck_core::Config;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the `caption` command.
///
/// Flags accept both `snake_case` and `kebab-case` spellings.
#[derive(Args, Debug, Default)]
pub struct CaptionArgs {
    /// Image file or directory to caption; defaults to `caption.img_dir`
    #[arg(long = "img_dir", alias = "img-dir")]
    pub img_dir: Option<PathBuf>,

    /// Caption model identifier; defaults to `model.model`
    #[arg(long = "blip_model", alias = "blip-model")]
    pub blip_model: Option<String>,

    /// Run on the CPU even when a GPU is available
    #[arg(long = "force_cpu", alias = "force-cpu")]
    pub force_cpu: bool,

    /// Regenerate captions that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Caption backend; defaults to `model.backend`
    #[arg(long, value_parser = ["ollama", "openai"])]
    pub backend: Option<String>,

    /// Generation budget per caption; defaults to `caption.max_new_tokens`
    #[arg(long = "max-new-tokens", alias = "max_new_tokens")]
    pub max_new_tokens: Option<u32>,
}

impl CaptionArgs {
    /// Fold the flags into the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.img_dir {
            config.caption.img_dir = dir.clone();
        }
        if let Some(model) = &self.blip_model {
            config.model.model = model.clone();
        }
        if let Some(backend) = &self.backend {
            config.model.backend = backend.clone();
        }
        if let Some(tokens) = self.max_new_tokens {
            config.caption.max_new_tokens = tokens;
        }
        config.caption.force_cpu |= self.force_cpu;
    }
}

/// Execute the caption command.
pub async fn execute(args: CaptionArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    if config.caption.max_new_tokens == 0 {
        anyhow::bail!("--max-new-tokens must be at least 1");
    }

    let input = config.caption_input();
    if !input.exists() {
        anyhow::bail!("Image path does not exist: {}", input.display());
    }

    let files = FileDiscovery::new(&config.caption).discover(&input);
    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    tracing::info!(
        "Found {} image(s) in {} ({:.1} MB)",
        files.len(),
        input.display(),
        total_bytes as f64 / 1_000_000.0
    );

    let device = DeviceSelection::detect(config.caption.force_cpu);
    let model = CaptionModelFactory::create(&config.model, device)?;
    tracing::info!("Caption model: {} via {}", model.model(), model.name());
    if !files.is_empty() && !model.is_available().await {
        anyhow::bail!(
            "Caption backend '{}' is unreachable or does not serve model '{}'. \
             Pick an installed model with --blip_model or switch with --backend.",
            model.name(),
            model.model()
        );
    }

    let options = CaptionOptions::from_config(&config.caption, &config.model, args.overwrite);
    let captioner = Captioner::new(model, options);
    let stats = captioner
        .run(&files)
        .await
        .context("Captioning stopped")?;

    print_summary(&stats);
    Ok(())
}

fn print_summary(stats: &CaptionStats) {
    // An empty batch has no average; warn instead of failing the run.
    let average = match stats.average_secs_per_file() {
        Ok(average) => average,
        Err(e) => {
            tracing::warn!("{e}");
            return;
        }
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("           Caption Summary");
    eprintln!("  ====================================");
    eprintln!("    Captioned:    {:>8}", stats.captioned);
    if stats.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", stats.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", stats.files);
    eprintln!("    Duration:     {:>7.1}s", stats.elapsed.as_secs_f64());
    eprintln!("    Inference:    {:>7.1}s", stats.inference.as_secs_f64());
    eprintln!("    Average:      {:>7.2} sec/file", average);
    eprintln!("  ====================================");
}
