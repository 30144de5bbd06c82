use crate::core::error::ProcessError;
use crate::core::sync_impl::dispatcher::{RunOptions, Runtime};
use crate::core::telemetry::{ProcessState, TraceEntry};
use crate::core::value::{CallArgs, Outputs};
use crate::core::workfunction::WorkFunction;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use uuid::Uuid;

const PENDING: u8 = 0;
const STARTED: u8 = 1;
const CANCELLED: u8 = 2;

/// Handle to an invocation dispatched onto tokio's blocking pool.
///
/// The handle is a [`Future`] resolving to the invocation's result, so it can be
/// awaited or polled directly. Outside of async code, use [`wait`](ProcessHandle::wait).
#[derive(Debug)]
pub struct ProcessHandle<T> {
    join: JoinHandle<Result<T, ProcessError>>,
    state: Arc<AtomicU8>,
}

impl<T> ProcessHandle<T> {
    /// Cancels the invocation if its body has not started yet.
    ///
    /// Returns `true` when the invocation will never run; it then resolves to
    /// [`ProcessError::Cancelled`] without having been registered. Once started,
    /// cancellation is advisory and this returns `false`.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !cancelled {
            log::debug!("Cancellation requested after the process started; ignoring");
        }
        cancelled
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    pub fn has_started(&self) -> bool {
        self.state.load(Ordering::Acquire) == STARTED
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Blocks the calling thread until the invocation completes.
    ///
    /// Must not be called from within an async task.
    pub fn wait(self) -> Result<T, ProcessError> {
        futures::executor::block_on(self)
    }
}

impl<T> Future for ProcessHandle<T> {
    type Output = Result<T, ProcessError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.join).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(ProcessError::Cancelled)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(ProcessError::ExecutionFailure(Box::new(e)))),
        }
    }
}

impl Runtime {
    /// Dispatches `function` without blocking the caller.
    ///
    /// Requires a tokio runtime; the invocation runs on its blocking pool, using
    /// that worker thread's process stack.
    pub fn dispatch_async(
        &self,
        function: &WorkFunction,
        args: CallArgs,
        options: RunOptions,
    ) -> Result<ProcessHandle<Outputs>, ProcessError> {
        self.spawn(function, args, move |runtime, function, args| {
            runtime.run(function, args, options)
        })
    }

    /// Like [`dispatch_async`](Runtime::dispatch_async), resolving to the outputs
    /// paired with the producing process id.
    pub fn dispatch_async_returning_id(
        &self,
        function: &WorkFunction,
        args: CallArgs,
        options: RunOptions,
    ) -> Result<ProcessHandle<(Outputs, Uuid)>, ProcessError> {
        self.spawn(function, args, move |runtime, function, args| {
            runtime.run_returning_id(function, args, options)
        })
    }

    fn spawn<T, F>(
        &self,
        function: &WorkFunction,
        args: CallArgs,
        invoke: F,
    ) -> Result<ProcessHandle<T>, ProcessError>
    where
        T: Send + 'static,
        F: FnOnce(&Runtime, &WorkFunction, CallArgs) -> Result<T, ProcessError> + Send + 'static,
    {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| ProcessError::NoAsyncRuntime)?;
        let state = Arc::new(AtomicU8::new(PENDING));

        let task_state = Arc::clone(&state);
        let runtime = self.clone();
        let function = function.clone();
        let join = handle.spawn_blocking(move || {
            if task_state
                .compare_exchange(PENDING, STARTED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                log::debug!("{} was cancelled before it started", function.identity());
                // No process id was ever allocated.
                runtime.record(TraceEntry::new(
                    Uuid::nil(),
                    function.identity().to_string(),
                    ProcessState::Cancelled,
                ));
                return Err(ProcessError::Cancelled);
            }
            invoke(&runtime, &function, args)
        });

        Ok(ProcessHandle { join, state })
    }
}
