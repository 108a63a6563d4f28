//! Artdeck Core - building an image/caption dataset from trading-card art.
//!
//! Two independent batch pipelines share this library:
//!
//! ```text
//! harvest: card export (JSON) → per-face tags (.txt) + art crops (.jpg)
//! caption: images + tag files → caption records (.yaml)
//! ```
//!
//! Both are sequential and resumable: an output that already exists is never
//! produced again, so an interrupted run can simply be started over.
//!
//! # Usage
//!
//! ```rust,ignore
//! use artdeck_core::caption::{CaptionModelFactory, CaptionOptions, Captioner, DeviceSelection, FileDiscovery};
//! use artdeck_core::Config;
//!
//! #[tokio::main]
//! async fn main() -> artdeck_core::Result<()> {
//!     let config = Config::load()?;
//!     let device = DeviceSelection::detect(config.caption.force_cpu);
//!     let model = CaptionModelFactory::create(&config.model, device)?;
//!     let captioner = Captioner::new(
//!         model,
//!         CaptionOptions::from_config(&config.caption, &config.model, false),
//!     );
//!
//!     let files = FileDiscovery::new(&config.caption).discover(&config.caption_input());
//!     let stats = captioner.run(&files).await?;
//!     println!("{} captioned", stats.captioned);
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod card;
pub mod config;
pub mod ensure;
pub mod error;

pub use config::Config;
pub use ensure::{ensure, ensure_with, Ensured};
pub use error::{ArtdeckError, ConfigError, PipelineError, PipelineResult, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.caption.img_dir, std::path::PathBuf::from("output"));
    }
}
