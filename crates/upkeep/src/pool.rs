use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::debug;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::error::UpdaterError;

/// Execution context shared by all updater operations.
///
/// Either owns a dedicated multi-thread runtime or borrows an existing one
/// through its [`Handle`]. Blocking work is routed to the runtime's blocking
/// pool, which grows on demand.
pub struct WorkerPool {
    handle: Handle,
    tracker: TaskTracker,
    runtime: Option<Runtime>,
}

impl WorkerPool {
    /// Start a dedicated runtime. `worker_threads` defaults to the number of
    /// CPU cores.
    ///
    /// # Errors
    /// Returns an error if the runtime cannot be started.
    pub fn new(worker_threads: Option<usize>) -> std::io::Result<Self> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all().thread_name("upkeep-worker");
        if let Some(threads) = worker_threads {
            builder.worker_threads(threads.max(1));
        }
        let runtime = builder.build()?;

        Ok(Self {
            handle: runtime.handle().clone(),
            tracker: TaskTracker::new(),
            runtime: Some(runtime),
        })
    }

    /// Run tasks on an existing runtime.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
            runtime: None,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    #[must_use]
    pub fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    pub(crate) fn spawn<T, F>(&self, operation: &'static str, future: F) -> UpdateTask<T>
    where
        F: Future<Output = Result<T, UpdaterError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.tracker.is_closed() {
            debug!("Rejecting {operation}: worker pool is closed");
            return UpdateTask::rejected(operation);
        }
        UpdateTask {
            operation,
            state: TaskState::Running(self.tracker.spawn_on(future, &self.handle)),
        }
    }

    /// Stop accepting new tasks. Tasks already submitted keep running.
    pub fn close(&self) {
        self.tracker.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Number of submitted tasks that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Resolves once the pool is closed and every submitted task has finished.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Block the calling thread until `future` completes.
    ///
    /// # Panics
    /// Panics when called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // A blocking shutdown would panic inside an async context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

enum TaskState<T> {
    Running(JoinHandle<Result<T, UpdaterError>>),
    Rejected,
    Done,
}

/// Handle to an operation running on a [`WorkerPool`].
#[must_use = "tasks run regardless, but their result is only observable by awaiting the handle"]
pub struct UpdateTask<T> {
    operation: &'static str,
    state: TaskState<T>,
}

impl<T> UpdateTask<T> {
    fn rejected(operation: &'static str) -> Self {
        Self {
            operation,
            state: TaskState::Rejected,
        }
    }

    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl<T> Future for UpdateTask<T> {
    type Output = Result<T, UpdaterError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let output = match &mut this.state {
            TaskState::Running(handle) => match Pin::new(handle).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(result)) => result,
                Poll::Ready(Err(error)) => Err(UpdaterError::task(this.operation, error)),
            },
            TaskState::Rejected => Err(UpdaterError::PoolClosed),
            TaskState::Done => panic!("UpdateTask polled after completion"),
        };
        this.state = TaskState::Done;
        Poll::Ready(output)
    }
}
