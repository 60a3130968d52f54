//! Concurrent multi-source extraction pipeline.
//!
//! This module provides the [`ExtractPipeline`] coordinator that turns a list
//! of [`InputSpec`]s into a single stream of [`Block`]s:
//! - Synchronous validation of every input before any work starts
//! - One file worker per resolved file, run as `tokio` tasks
//! - A bounded output channel providing backpressure to the workers
//! - Cooperative cancellation via [`CancelToken`]
//! - Runtime failures diverted to an [`ErrorSink`], never into the stream

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::executor::HarvesterExecutor;
use crate::harvest::cancel::CancelToken;
use crate::harvest::options::Options;
use crate::lang::{CommentLexer, LanguageRegistry};
use crate::locale::MessageKey;
use crate::message::{Cause, ErrorRecord, ValidationError};
use crate::model::{Block, InputSpec, PipelineConfig};
use crate::traits::{BlockExtractor, ErrorSink, FsReader, SourceReader};

// ============================================================================
// Block Stream
// ============================================================================

/// Receiving end of a pipeline run.
///
/// Blocks from different files interleave in any order. The stream ends
/// (`recv` returns `None`) only after every dispatched file worker has
/// finished, so no error attributable to the run is reported after that.
#[derive(Debug)]
pub struct BlockStream {
    rx: mpsc::Receiver<Block>,
}

impl BlockStream {
    /// Receives the next block, or `None` once the pipeline has completed.
    pub async fn recv(&mut self) -> Option<Block> {
        self.rx.recv().await
    }

    /// Drains the stream to exhaustion.
    pub async fn collect(mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Some(block) = self.rx.recv().await {
            blocks.push(block);
        }
        blocks
    }

    /// Returns the underlying channel receiver.
    pub fn into_inner(self) -> mpsc::Receiver<Block> {
        self.rx
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Extraction pipeline with pluggable extractor, reader and language set.
///
/// # Example
///
/// ```ignore
/// use block_harvester::{CancelToken, ExtractPipeline, Handler, InputSpec};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handler = Handler::default();
///     let inputs = [InputSpec::new("go").with_path("./src").with_recursive(true)];
///
///     let stream = ExtractPipeline::new()
///         .with_capacity(1000)
///         .start_all(CancelToken::new(), Arc::new(handler.clone()), &inputs)?;
///
///     for block in stream.collect().await {
///         println!("{}:{}", block.file.display(), block.line);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ExtractPipeline {
    extractor: Arc<dyn BlockExtractor>,
    reader: Arc<dyn SourceReader>,
    languages: Arc<LanguageRegistry>,
    config: PipelineConfig,
}

impl ExtractPipeline {
    /// Creates a pipeline using [`CommentLexer`], the local filesystem and the
    /// builtin languages.
    ///
    /// Default configuration:
    /// - Channel capacity: 500 blocks
    /// - Concurrent files: 64
    pub fn new() -> Self {
        Self {
            extractor: Arc::new(CommentLexer),
            reader: Arc::new(FsReader),
            languages: Arc::new(LanguageRegistry::builtin()),
            config: PipelineConfig::default(),
        }
    }

    /// Replaces all tunables at once.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how many blocks the stream buffers before workers wait.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Sets how many files may be processed at the same time.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.config.max_concurrent_files = limit;
        self
    }

    pub fn with_extractor(mut self, extractor: impl BlockExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_reader(mut self, reader: impl SourceReader + 'static) -> Self {
        self.reader = Arc::new(reader);
        self
    }

    pub fn with_languages(mut self, languages: LanguageRegistry) -> Self {
        self.languages = Arc::new(languages);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validates `inputs` and starts extracting.
    ///
    /// A `None` element stands for a missing specification. Validation stops
    /// at the first invalid element; its field is qualified as
    /// `inputs[<index>].<field>`. On success the stream is returned at once
    /// and all further work happens on a spawned driver task.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `inputs` is empty, an element is
    /// missing, or an element fails [`Options::build`]. No work is started
    /// in that case.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn start(
        &self,
        cancel: CancelToken,
        sink: Arc<dyn ErrorSink>,
        inputs: &[Option<InputSpec>],
    ) -> Result<BlockStream, ValidationError> {
        let groups = self.validate(inputs)?;
        let capacity = self.config.channel_capacity.clamp(1, Semaphore::MAX_PERMITS);
        let (tx, rx) = mpsc::channel(capacity);

        let executor = Arc::new(HarvesterExecutor::new(
            self.config.max_concurrent_files,
            Arc::clone(&self.extractor),
            Arc::clone(&self.reader),
            sink,
            tx,
        ));

        info!(groups = groups.len(), "Starting extraction");
        tokio::spawn(drive(groups, executor, cancel));

        Ok(BlockStream { rx })
    }

    /// Same as [`start`](Self::start) for inputs known to be present.
    pub fn start_all(
        &self,
        cancel: CancelToken,
        sink: Arc<dyn ErrorSink>,
        inputs: &[InputSpec],
    ) -> Result<BlockStream, ValidationError> {
        let inputs: Vec<Option<InputSpec>> = inputs.iter().cloned().map(Some).collect();
        self.start(cancel, sink, &inputs)
    }

    fn validate(&self, inputs: &[Option<InputSpec>]) -> Result<Vec<Options>, ValidationError> {
        if inputs.is_empty() {
            return Err(ErrorRecord::validation("inputs", MessageKey::Required));
        }

        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let field = format!("inputs[{}]", index);
                let spec = input
                    .as_ref()
                    .ok_or_else(|| ErrorRecord::validation(field.clone(), MessageKey::Required))?;
                Options::build(spec, &self.languages).map_err(|e| e.with_field_prefix(&field))
            })
            .collect()
    }
}

impl Default for ExtractPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Starts a run with the default [`ExtractPipeline`].
///
/// See [`ExtractPipeline::start`] for the validation rules.
pub fn extract(
    cancel: CancelToken,
    sink: Arc<dyn ErrorSink>,
    inputs: &[Option<InputSpec>],
) -> Result<BlockStream, ValidationError> {
    ExtractPipeline::new().start(cancel, sink, inputs)
}

/// Dispatches one worker per file, group by group, then waits for all of
/// them. The stream closes when the last executor handle is dropped, which
/// happens only after every worker has been joined.
async fn drive(groups: Vec<Options>, executor: Arc<HarvesterExecutor>, cancel: CancelToken) {
    let mut workers: Vec<(PathBuf, JoinHandle<()>)> = Vec::new();

    'groups: for (index, options) in groups.into_iter().enumerate() {
        if cancel.is_cancelled() {
            debug!(group = index, "Cancelled before group dispatch");
            break;
        }

        debug!(group = index, files = options.paths.len(), "Dispatching group");
        let options = Arc::new(options);

        for path in options.paths.iter() {
            if cancel.is_cancelled() {
                debug!(group = index, "Cancelled during dispatch");
                break 'groups;
            }

            let executor = Arc::clone(&executor);
            let options = Arc::clone(&options);
            let task_path = path.clone();
            let handle = tokio::spawn(async move { executor.execute(options, task_path).await });
            workers.push((path.clone(), handle));
        }
    }

    let dispatched = workers.len();
    for (path, handle) in workers {
        if let Err(e) = handle.await {
            error!(path = %path.display(), error = %e, "File worker failed");
            executor.report(&path, Cause::Join(e.to_string()));
        }
    }

    info!(workers = dispatched, "Extraction finished");
}

// ============================================================================
// Tests
// ============================================================================
