//! Fan-out of the per-frame transform over a fixed-size worker pool.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult, RenderError};
use crate::frame::FrameId;

/// Half the logical CPUs, at least one; the rest is left for the encoder.
pub fn default_worker_count() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// Stops dispatch of frames that have not started yet. Frames already being
/// rendered run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ParallelPipeline {
    pool: ThreadPool,
    workers: usize,
    cancel: CancelToken,
}

impl ParallelPipeline {
    pub fn new(workers: usize) -> PipelineResult<Self> {
        if workers == 0 {
            return Err(PipelineError::InvalidConfig("worker count must be at least 1".into()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("asciivid-worker-{}", i))
            .build()?;
        Ok(Self { pool, workers, cancel: CancelToken::new() })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` once per id and block until every frame is done.
    ///
    /// `on_complete(completed, total)` is called after each successful frame.
    /// The first failure stops dispatch of remaining frames and is returned
    /// tagged with its ordinal; no frame is skipped silently.
    pub fn run<W, P>(&self, ids: &[FrameId], work: W, on_complete: P) -> PipelineResult<usize>
    where
        W: Fn(FrameId) -> Result<(), RenderError> + Send + Sync,
        P: Fn(usize, usize) + Send + Sync,
    {
        let total = ids.len();
        let completed = AtomicUsize::new(0);
        debug!(frames = total, workers = self.workers, "dispatching frames");

        self.pool.install(|| {
            ids.par_iter().try_for_each(|&id| -> PipelineResult<()> {
                if self.cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                work(id).map_err(|e| PipelineError::render(id.ordinal(), e))?;
                let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_complete(current, total);
                Ok(())
            })
        })?;

        Ok(completed.into_inner())
    }
}
