use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use crate::lang::Language;
use crate::message::ErrorRecord;

/// Comment blocks found in one file, keyed by 1-based start line.
pub type BlockMap = BTreeMap<usize, Vec<u8>>;

/// Result of running an extractor over one file.
///
/// `blocks` may be partial when `errors` is non-empty; whatever was produced
/// is still emitted.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub blocks: BlockMap,
    pub errors: Vec<ErrorRecord>,
}

/// Splits decoded file content into comment blocks.
///
/// Implementations are pure and synchronous; the pipeline runs them on the
/// blocking pool.
pub trait BlockExtractor: Send + Sync {
    /// Extracts every comment block of `data` according to `language`'s rules.
    fn extract(&self, path: &Path, data: &[u8], language: &Language) -> ExtractOutcome;
}

/// Destination of non-fatal errors raised while the pipeline runs.
///
/// Called concurrently from many file workers; must never block
/// indefinitely.
pub trait ErrorSink: Send + Sync {
    fn report(&self, record: ErrorRecord);
}

impl<F> ErrorSink for F
where
    F: Fn(ErrorRecord) + Send + Sync,
{
    fn report(&self, record: ErrorRecord) {
        self(record)
    }
}

/// Source of raw file bytes.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Reads the complete content of `path`.
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

#[async_trait]
impl SourceReader for FsReader {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}
