//! Idempotent output steps keyed on file presence.
//!
//! Both pipelines treat an existing output file as proof of completion: no
//! content or freshness check, no atomic rename. Re-running a batch therefore
//! only does the work whose output is missing.

use std::future::Future;
use std::path::Path;

/// Outcome of an [`ensure`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured<T> {
    /// The output already existed; the producer was not invoked.
    Skipped,
    /// The producer ran and returned this value.
    Produced(T),
}

impl<T> Ensured<T> {
    /// True when the producer did not run.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Ensured::Skipped)
    }
}

/// Run `producer` only if nothing exists at `output`.
pub async fn ensure<F, Fut, T, E>(output: &Path, producer: F) -> Result<Ensured<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    ensure_with(output, false, producer).await
}

/// Like [`ensure`], but `overwrite` forces the producer to run regardless.
pub async fn ensure_with<F, Fut, T, E>(
    output: &Path,
    overwrite: bool,
    producer: F,
) -> Result<Ensured<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if !overwrite && output.exists() {
        tracing::debug!("Output exists, skipping: {:?}", output);
        return Ok(Ensured::Skipped);
    }
    producer().await.map(Ensured::Produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_produces_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");

        let result: Result<_, std::io::Error> = ensure(&path, || async {
            tokio::fs::write(&path, "hello").await?;
            Ok::<_, std::io::Error>(5usize)
        })
        .await;

        assert_eq!(result.unwrap(), Ensured::Produced(5));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_skips_existing_without_calling_producer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "original").unwrap();
        let calls = AtomicU32::new(0);

        let result: Result<Ensured<()>, std::io::Error> = ensure(&path, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(result.unwrap().is_skipped());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_overwrite_runs_producer_anyway() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "original").unwrap();

        let result: Result<_, std::io::Error> = ensure_with(&path, true, || async {
            tokio::fs::write(&path, "regenerated").await?;
            Ok::<_, std::io::Error>(())
        })
        .await;

        assert_eq!(result.unwrap(), Ensured::Produced(()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "regenerated");
    }

    #[tokio::test]
    async fn test_producer_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.txt");

        let result: Result<Ensured<()>, String> =
            ensure(&path, || async { Err("boom".to_string()) }).await;

        assert_eq!(result.unwrap_err(), "boom");
        assert!(!path.exists());
    }
}
