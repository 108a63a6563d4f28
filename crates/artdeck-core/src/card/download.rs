//! Art image fetching.
//!
//! The image API answers an art request with a redirect to the actual file,
//! so every download is two requests: resolve the final location, then fetch
//! its bytes. A fixed pause precedes each request to stay under the API's
//! rate limit. An image already on disk is never requested again.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::record::FaceSide;
use crate::config::HarvestConfig;
use crate::ensure::{ensure, Ensured};
use crate::error::{PipelineError, PipelineResult};

/// Extension of downloaded art files.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Build the art request URL for a card (or one face of it).
pub fn art_url(api_base: &str, image_version: &str, id: &str, side: Option<FaceSide>) -> String {
    let mut url = format!(
        "{}/cards/{id}?format=image&version={image_version}",
        api_base.trim_end_matches('/')
    );
    if let Some(side) = side {
        url.push_str("&face=");
        url.push_str(side.as_str());
    }
    url
}

/// Pauses inserted before each phase of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPacing {
    pub before_resolve: Duration,
    pub before_fetch: Duration,
}

impl RequestPacing {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            before_resolve: Duration::from_millis(config.resolve_delay_ms),
            before_fetch: Duration::from_millis(config.fetch_delay_ms),
        }
    }

    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            before_resolve: Duration::ZERO,
            before_fetch: Duration::ZERO,
        }
    }

    async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RequestPacing {
    fn default() -> Self {
        Self::from_config(&HarvestConfig::default())
    }
}

/// Two-phase image retrieval.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Phase one: follow an API URL to the final image location.
    async fn resolve(&self, url: &str) -> PipelineResult<String>;

    /// Phase two: download the bytes at a resolved location.
    ///
    /// Anything but HTTP 200 is a [`PipelineError::Fetch`].
    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>>;
}

/// reqwest-backed fetcher.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(user_agent: &str) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| PipelineError::Fetch {
                url: String::new(),
                status_code: None,
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> PipelineError {
    PipelineError::Fetch {
        url: url.to_string(),
        status_code: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn resolve(&self, url: &str) -> PipelineResult<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        // A failed lookup still yields a URL; the fetch phase reports the status.
        Ok(resp.url().to_string())
    }

    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(PipelineError::Fetch {
                url: url.to_string(),
                status_code: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }

        let mut bytes = Vec::with_capacity(resp.content_length().unwrap_or(0) as usize);
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(url, e))?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

/// Downloads art into an output directory, once per stem.
pub struct ImageDownloader {
    fetcher: Box<dyn ImageFetcher>,
    pacing: RequestPacing,
    output_dir: PathBuf,
}

impl ImageDownloader {
    pub fn new(
        fetcher: Box<dyn ImageFetcher>,
        pacing: RequestPacing,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            pacing,
            output_dir: output_dir.into(),
        }
    }

    /// Where the image for `stem` lives.
    pub fn image_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.{IMAGE_EXTENSION}"))
    }

    /// Make sure `<output_dir>/<stem>.jpg` exists, downloading it if not.
    ///
    /// Returns the number of bytes written, or `Skipped` when the file was
    /// already present. No file is written on a failed fetch.
    pub async fn download(&self, url: &str, stem: &str) -> PipelineResult<Ensured<u64>> {
        let path = self.image_path(stem);
        let outcome = ensure(&path, || self.fetch_to(url, &path)).await?;

        match &outcome {
            Ensured::Skipped => tracing::info!("Already downloaded {:?}", path),
            Ensured::Produced(bytes) => {
                tracing::debug!("Downloaded {:?} ({} bytes)", path, bytes)
            }
        }
        Ok(outcome)
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> PipelineResult<u64> {
        RequestPacing::pause(self.pacing.before_resolve).await;
        let resolved = self.fetcher.resolve(url).await?;

        RequestPacing::pause(self.pacing.before_fetch).await;
        let bytes = self.fetcher.fetch(&resolved).await?;

        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        Ok(bytes.len() as u64)
    }
}
