//! Background job execution for training and inference.

use crate::config::ModelsConfig;
use crate::lifecycle::panic_message;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, error};
use verdict_abstraction::{ModelError, ModelResult};

/// Unit of work run off the caller's thread.
pub type JobWork<T> = Box<dyn FnOnce() -> ModelResult<T> + Send + 'static>;

/// Invoked with the job's outcome before its handle resolves.
pub type DoneCallback<T> = Box<dyn FnOnce(&ModelResult<T>) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Training,
    Inference,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Training => f.write_str("training"),
            Self::Inference => f.write_str("inference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub job_id: String,
    pub kind: JobKind,
    /// Run on an accelerated (GPU) worker rather than a regular one.
    pub use_accelerated: bool,
}

impl JobSpec {
    pub fn new(job_id: impl Into<String>, kind: JobKind, use_accelerated: bool) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            use_accelerated,
        }
    }
}

/// Executes jobs off the caller's thread.
///
/// Runners know nothing about models or markers: they run the work, invoke
/// `on_done` with the outcome and resolve the returned handle.
pub trait JobRunner: Send + Sync + 'static {
    fn submit<T: Send + 'static>(
        &self,
        spec: JobSpec,
        work: JobWork<T>,
        on_done: Option<DoneCallback<T>>,
    ) -> JobHandle<T>;
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct JobHandle<T> {
    job_id: String,
    receiver: oneshot::Receiver<ModelResult<T>>,
}

/// Sending half of a [`JobHandle`], held by the runner.
#[derive(Debug)]
pub struct JobCompletion<T> {
    sender: oneshot::Sender<ModelResult<T>>,
}

impl<T> JobHandle<T> {
    pub fn channel(job_id: impl Into<String>) -> (JobCompletion<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        let handle = Self {
            job_id: job_id.into(),
            receiver,
        };
        (JobCompletion { sender }, handle)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub async fn wait(self) -> ModelResult<T> {
        let job_id = self.job_id;
        self.receiver.await.unwrap_or_else(|_| Err(dropped(&job_id)))
    }

    /// Blocks the current thread until the job completes.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_wait(self) -> ModelResult<T> {
        let job_id = self.job_id;
        self.receiver.blocking_recv().unwrap_or_else(|_| Err(dropped(&job_id)))
    }
}

impl<T> JobCompletion<T> {
    pub fn complete(self, result: ModelResult<T>) {
        // The caller may have dropped its handle; the outcome is then discarded.
        let _ = self.sender.send(result);
    }
}

fn dropped(job_id: &str) -> ModelError {
    ModelError::Job(format!("job {job_id} was dropped before completing"))
}

/// Runs jobs on tokio's blocking pool, with separate concurrency limits for
/// regular and accelerated workers.
#[derive(Debug, Clone)]
pub struct TokioJobRunner {
    runtime: Handle,
    cpu_slots: Arc<Semaphore>,
    gpu_slots: Arc<Semaphore>,
}

impl TokioJobRunner {
    #[must_use]
    pub fn new(runtime: Handle, cpu_workers: usize, gpu_workers: usize) -> Self {
        Self {
            runtime,
            cpu_slots: Arc::new(Semaphore::new(cpu_workers.max(1))),
            gpu_slots: Arc::new(Semaphore::new(gpu_workers.max(1))),
        }
    }

    #[must_use]
    pub fn from_config(runtime: Handle, config: &ModelsConfig) -> Self {
        Self::new(runtime, config.cpu_workers, config.gpu_workers)
    }

    /// Runner bound to the runtime of the calling context.
    pub fn current(config: &ModelsConfig) -> ModelResult<Self> {
        let runtime = Handle::try_current().map_err(|e| ModelError::Job(e.to_string()))?;
        Ok(Self::from_config(runtime, config))
    }
}

impl JobRunner for TokioJobRunner {
    fn submit<T: Send + 'static>(
        &self,
        spec: JobSpec,
        work: JobWork<T>,
        on_done: Option<DoneCallback<T>>,
    ) -> JobHandle<T> {
        let (completion, handle) = JobHandle::channel(spec.job_id.clone());
        let slots =
            Arc::clone(if spec.use_accelerated { &self.gpu_slots } else { &self.cpu_slots });

        debug!(
            job_id = %spec.job_id,
            kind = %spec.kind,
            accelerated = spec.use_accelerated,
            "Job submitted"
        );

        self.runtime.spawn(async move {
            // The semaphores are never closed, so acquiring only waits.
            let _permit = slots.acquire_owned().await.ok();

            let job_id = spec.job_id.clone();
            let outcome =
                tokio::task::spawn_blocking(move || run_job(&job_id, work, on_done)).await;
            let result = outcome.unwrap_or_else(|e| {
                Err(ModelError::Job(format!("job {} did not run: {e}", spec.job_id)))
            });

            debug!(job_id = %spec.job_id, kind = %spec.kind, ok = result.is_ok(), "Job finished");
            completion.complete(result);
        });

        handle
    }
}

/// Runs `work` and then `on_done` on the calling (blocking) thread.
///
/// A panic in `work` becomes the job's error. A panic in `on_done` is logged
/// and never replaces the job's outcome.
fn run_job<T>(
    job_id: &str,
    work: JobWork<T>,
    on_done: Option<DoneCallback<T>>,
) -> ModelResult<T> {
    let result = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        Err(ModelError::Job(format!(
            "job {job_id} panicked: {}",
            panic_message(payload.as_ref())
        )))
    });

    if let Some(on_done) = on_done {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| on_done(&result))) {
            error!(
                job_id = %job_id,
                panic = %panic_message(payload.as_ref()),
                "Job completion callback panicked"
            );
        }
    }
    result
}
