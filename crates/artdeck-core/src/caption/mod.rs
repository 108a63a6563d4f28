//! Captioning: images + tag files → caption records.
//!
//! - **discovery**: find images and their companion paths
//! - **device**: GPU/CPU and precision selection
//! - **model**: caption model trait, request types and factory
//! - **ollama** / **openai**: model backends
//! - **record**: the caption document format
//! - **captioner**: the sequential batch loop

pub mod captioner;
pub mod device;
pub mod discovery;
pub mod model;
pub(crate) mod ollama;
pub(crate) mod openai;
pub mod record;

pub use captioner::{CaptionOptions, CaptionOutcome, CaptionStats, Captioner};
pub use device::{Device, DeviceSelection, Precision};
pub use discovery::{Companions, DiscoveredFile, FileDiscovery};
pub use model::{CaptionModel, CaptionModelFactory, CaptionRequest, ImageInput};
pub use record::{parse_tag_text, CaptionRecord};
