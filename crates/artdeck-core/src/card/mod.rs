//! Card harvesting: bulk export → tags + art crops.
//!
//! - **record**: serde model of the card export
//! - **layout**: routing of a record by its layout kind
//! - **tags**: tag extraction for one card face
//! - **source**: where card records come from
//! - **download**: two-phase art image fetching with pacing
//! - **harvest**: the sequential batch loop

pub mod download;
pub mod harvest;
pub mod layout;
pub mod record;
pub mod source;
pub mod tags;

pub use download::{art_url, HttpImageFetcher, ImageDownloader, ImageFetcher, RequestPacing};
pub use harvest::{HarvestOptions, HarvestStats, Harvester};
pub use layout::Routing;
pub use record::{CardFace, CardRecord, FaceSide};
pub use source::{CardSource, JsonFileSource, MemorySource};
pub use tags::{extract_tags, FaceContext, TagList};
