//! File discovery for finding images to caption.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CaptionConfig;

/// Discovers image files in directories.
pub struct FileDiscovery {
    supported_formats: Vec<String>,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Files that share an image's stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companions {
    /// Tag list written by the harvester
    pub tags: PathBuf,
    /// Caption record written by the captioner
    pub caption: PathBuf,
}

impl Companions {
    /// Derive companion paths by swapping the image's extension.
    pub fn for_image(image: &Path, tag_extension: &str, caption_extension: &str) -> Self {
        Self {
            tags: image.with_extension(tag_extension),
            caption: image.with_extension(caption_extension),
        }
    }
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: &CaptionConfig) -> Self {
        Self {
            supported_formats: config
                .supported_formats
                .iter()
                .map(|f| f.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Discover all supported image files at a path.
    ///
    /// If path is a file, returns it if supported.
    /// If path is a directory, recursively finds all supported files.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            if self.is_supported(path) {
                if let Ok(meta) = std::fs::metadata(path) {
                    return vec![DiscoveredFile {
                        path: path.to_path_buf(),
                        size: meta.len(),
                    }];
                }
            }
            return vec![];
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            if entry_path.is_file() && self.is_supported(entry_path) {
                if let Ok(meta) = entry.metadata() {
                    files.push(DiscoveredFile {
                        path: entry_path.to_path_buf(),
                        size: meta.len(),
                    });
                }
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.supported_formats.iter().any(|fmt| *fmt == ext_lower)
            })
            .unwrap_or(false)
    }
}
