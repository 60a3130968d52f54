use crate::harvest::Options;
use crate::locale::{Message, MessageKey};
use crate::message::{Cause, ErrorRecord};
use crate::model::Block;
use crate::traits::{BlockExtractor, ErrorSink, ExtractOutcome, SourceReader};
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, instrument};

/// Processes single files: read, decode, extract, emit.
///
/// One executor is shared by every file worker of a pipeline run. The
/// semaphore bounds how many files are in flight at once; a worker keeps its
/// permit until its last block is accepted by the stream.
pub struct HarvesterExecutor {
    semaphore: Arc<Semaphore>,
    extractor: Arc<dyn BlockExtractor>,
    reader: Arc<dyn SourceReader>,
    sink: Arc<dyn ErrorSink>,
    tx: mpsc::Sender<Block>,
}

impl HarvesterExecutor {
    pub fn new(
        concurrency_limit: usize,
        extractor: Arc<dyn BlockExtractor>,
        reader: Arc<dyn SourceReader>,
        sink: Arc<dyn ErrorSink>,
        tx: mpsc::Sender<Block>,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(
                concurrency_limit.clamp(1, Semaphore::MAX_PERMITS),
            )),
            extractor,
            reader,
            sink,
            tx,
        }
    }

    /// Runs one file to completion. Every failure goes to the error sink;
    /// nothing is returned.
    ///
    /// Must not spawn concurrent sub-work of its own: the only task it waits
    /// on is the blocking decode/extract step, which it awaits immediately.
    #[instrument(skip(self, options, path), fields(path = %path.display()))]
    pub async fn execute(&self, options: Arc<Options>, path: PathBuf) {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                self.report(&path, Cause::Join(format!("Semaphore error: {}", e)));
                return;
            }
        };

        debug!("Starting file");

        let raw = match self.reader.read(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                self.report(&path, e);
                return;
            }
        };

        let extractor = Arc::clone(&self.extractor);
        let task_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let data = decode(&task_path, &raw, options.encoding)?;
            let outcome = extractor.extract(&task_path, &data, &options.language);
            Ok::<ExtractOutcome, ErrorRecord>(outcome)
        })
        .await;

        let outcome = match outcome {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(record)) => {
                self.sink.report(record);
                return;
            }
            Err(e) => {
                self.report(&path, Cause::Join(e.to_string()));
                return;
            }
        };

        for mut record in outcome.errors {
            if record.file.is_empty() {
                record.file = path.display().to_string();
            }
            self.sink.report(record);
        }

        let total = outcome.blocks.len();
        let mut emitted = 0;
        for (line, data) in outcome.blocks {
            let block = Block {
                file: path.clone(),
                line,
                data,
            };
            if self.tx.send(block).await.is_err() {
                debug!("Block stream dropped by consumer");
                break;
            }
            emitted += 1;
        }

        debug!(blocks = emitted, found = total, "Finished file");
    }

    pub(crate) fn report(&self, path: &Path, cause: impl Into<Cause>) {
        self.sink
            .report(ErrorRecord::runtime(path.display().to_string(), cause));
    }
}

/// Converts `raw` to UTF-8 when a non-default encoding is set. A byte order
/// mark overrides the declared encoding.
fn decode<'a>(
    path: &Path,
    raw: &'a [u8],
    encoding: Option<&'static Encoding>,
) -> Result<Cow<'a, [u8]>, ErrorRecord> {
    let Some(declared) = encoding else {
        return Ok(Cow::Borrowed(raw));
    };

    let (encoding, body) = match Encoding::for_bom(raw) {
        Some((bom, len)) => (bom, &raw[len..]),
        None => (declared, raw),
    };

    match encoding.decode_without_bom_handling_and_without_replacement(body) {
        Some(Cow::Borrowed(text)) => Ok(Cow::Borrowed(text.as_bytes())),
        Some(Cow::Owned(text)) => Ok(Cow::Owned(text.into_bytes())),
        None => Err(ErrorRecord::runtime(
            path.display().to_string(),
            Message::new(MessageKey::DecodeFailed).with_arg(encoding.name()),
        )),
    }
}
