//! Cancellable execution of request pipelines.
//!
//! A [`Supervisor`] runs each operation as its own task, bounded by an
//! optional timeout and by the supervisor's [`CancellationToken`]. Every run
//! gets a [`CancellableUnit`] that owns the operation task and the timer task
//! and cancels both when either one finishes first, when the parent token is
//! cancelled, or when the unit is dropped.

use std::future::Future;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use courier_core::{CancelReason, WorkerError};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs operations under a timeout and an external cancellation signal.
///
/// Cancelling the supervisor's token cancels every operation it is running.
/// A timeout only cancels the operation it belongs to.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    cancellation: CancellationToken,
}

impl Supervisor {
    /// A supervisor with its own cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A supervisor tied to an existing token, typically owned by the caller.
    #[must_use]
    pub const fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// The token observed by every operation of this supervisor.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel all running operations.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Run `operation`, cancelling it after `timeout` if one is given.
    ///
    /// Both the operation task and the timer task are stopped before this
    /// returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, or
    /// [`WorkerError::Cancelled`] with [`CancelReason::Timeout`] when the
    /// timeout elapsed first, or [`CancelReason::External`] when the
    /// supervisor's token was cancelled.
    ///
    /// # Panics
    ///
    /// A panic inside `operation` is resumed on the caller.
    pub async fn run<T, F>(&self, operation: F, timeout: Option<Duration>) -> Result<T, WorkerError>
    where
        F: Future<Output = Result<T, WorkerError>> + Send + 'static,
        T: Send + 'static,
    {
        let unit = CancellableUnit::new(self.cancellation.child_token());

        let token = unit.token().clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => None,
                outcome = operation => Some(outcome),
            }
        });
        unit.register_operation(handle.abort_handle());

        if let Some(after) = timeout {
            unit.register_timer(after);
        }

        let joined = handle.await;
        unit.shutdown().await;

        match joined {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                let reason = unit.reason();
                debug!(%reason, "operation cancelled");
                Err(WorkerError::Cancelled(reason))
            }
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(_) => Err(WorkerError::Cancelled(unit.reason())),
        }
    }
}

#[derive(Debug, Default)]
struct UnitTasks {
    operation: Option<AbortHandle>,
    timer: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
}

/// Coordination record for one operation and its timer.
///
/// Whoever finishes first cancels the other. Dropping the unit cancels
/// everything it registered.
#[derive(Debug)]
pub struct CancellableUnit {
    token: CancellationToken,
    timed_out: Arc<AtomicBool>,
    tasks: Mutex<UnitTasks>,
}

impl CancellableUnit {
    /// A unit whose tasks observe `token`.
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            timed_out: Arc::new(AtomicBool::new(false)),
            tasks: Mutex::new(UnitTasks::default()),
        }
    }

    /// The token cancelled when the unit is torn down.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Register the task running the operation.
    pub fn register_operation(&self, operation: AbortHandle) {
        if let Some(previous) = self.tasks().operation.replace(operation) {
            previous.abort();
        }
    }

    /// Start a timer that cancels the unit after `after`.
    pub fn register_timer(&self, after: Duration) {
        let token = self.token.clone();
        let timed_out = Arc::clone(&self.timed_out);
        let timer = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(after) => {
                    timed_out.store(true, Ordering::SeqCst);
                    debug!(timeout_ms = after.as_millis(), "timeout elapsed, cancelling operation");
                    token.cancel();
                }
            }
        });

        let mut tasks = self.tasks();
        tasks.timeout = Some(after);
        if let Some(previous) = tasks.timer.replace(timer) {
            previous.abort();
        }
    }

    /// Whether the timer fired.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    /// Why the unit was cancelled.
    #[must_use]
    pub fn reason(&self) -> CancelReason {
        let timeout = self.tasks().timeout;
        match timeout {
            Some(after) if self.timed_out() => CancelReason::Timeout(after),
            _ => CancelReason::External,
        }
    }

    /// Cancel the token and abort every registered task.
    pub fn cancel_all(&self) {
        self.token.cancel();
        let tasks = self.tasks();
        if let Some(operation) = &tasks.operation {
            operation.abort();
        }
        if let Some(timer) = &tasks.timer {
            timer.abort();
        }
    }

    /// Cancel everything and wait for the timer task to stop.
    pub async fn shutdown(&self) {
        self.cancel_all();
        let timer = self.tasks().timer.take();
        if let Some(timer) = timer {
            // the timer is aborted; its join result carries nothing
            let _ = timer.await;
        }
    }

    fn tasks(&self) -> MutexGuard<'_, UnitTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CancellableUnit {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use bytes::Bytes;
    use tokio::time::sleep;

    use super::*;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn slow_operation(
        duration: Duration,
        dropped: &Arc<AtomicBool>,
    ) -> impl Future<Output = Result<u32, WorkerError>> + Send + 'static {
        let flag = DropFlag(Arc::clone(dropped));
        async move {
            let _flag = flag;
            sleep(duration).await;
            Ok(42)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_before_timeout() {
        let supervisor = Supervisor::new();
        let dropped = Arc::new(AtomicBool::new(false));

        let result = supervisor
            .run(
                slow_operation(Duration::from_millis(10), &dropped),
                Some(Duration::from_secs(1)),
            )
            .await;

        let_assert!(Ok(42) = result);
        check!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn without_timeout_waits_for_completion() {
        let supervisor = Supervisor::new();
        let dropped = Arc::new(AtomicBool::new(false));

        let result = supervisor
            .run(slow_operation(Duration::from_secs(3600), &dropped), None)
            .await;

        let_assert!(Ok(42) = result);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_operation() {
        let supervisor = Supervisor::new();
        let dropped = Arc::new(AtomicBool::new(false));

        let result = supervisor
            .run(
                slow_operation(Duration::from_secs(10), &dropped),
                Some(Duration::from_millis(100)),
            )
            .await;

        let_assert!(Err(WorkerError::Cancelled(CancelReason::Timeout(after))) = result);
        check!(after == Duration::from_millis(100));
        check!(dropped.load(Ordering::SeqCst));
        check!(!supervisor.cancellation_token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn supervisor_is_reusable_after_timeout() {
        let supervisor = Supervisor::new();
        let dropped = Arc::new(AtomicBool::new(false));

        let first = supervisor
            .run(
                slow_operation(Duration::from_secs(10), &dropped),
                Some(Duration::from_millis(5)),
            )
            .await;
        check!(first.is_err());

        let second = supervisor
            .run(slow_operation(Duration::from_millis(1), &dropped), None)
            .await;
        let_assert!(Ok(42) = second);
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancellation() {
        let token = CancellationToken::new();
        let supervisor = Supervisor::with_cancellation(token.clone());
        let dropped = Arc::new(AtomicBool::new(false));

        let canceller = async {
            sleep(Duration::from_millis(50)).await;
            token.cancel();
        };
        let run = supervisor.run(
            slow_operation(Duration::from_secs(10), &dropped),
            Some(Duration::from_secs(5)),
        );
        let (result, ()) = tokio::join!(run, canceller);

        let_assert!(Err(WorkerError::Cancelled(CancelReason::External)) = result);
        check!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_never_runs() {
        let supervisor = Supervisor::new();
        supervisor.cancel();

        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let result = supervisor
            .run(
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                },
                None,
            )
            .await;

        let_assert!(Err(WorkerError::Cancelled(CancelReason::External)) = result);
        check!(!started.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn operation_error_passes_through() {
        let supervisor = Supervisor::new();

        let result: Result<(), _> = supervisor
            .run(
                async { Err(WorkerError::status_code(503, Bytes::from_static(b"busy"))) },
                Some(Duration::from_secs(1)),
            )
            .await;

        let_assert!(Err(err) = result);
        check!(err.status() == Some(503));
    }

    async fn explode() -> Result<(), WorkerError> {
        panic!("boom")
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "boom")]
    async fn operation_panic_is_resumed() {
        let supervisor = Supervisor::new();
        let _ = supervisor.run(explode(), None).await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_run_stops_the_operation() {
        let supervisor = Supervisor::new();
        let dropped = Arc::new(AtomicBool::new(false));

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            supervisor.run(slow_operation(Duration::from_secs(10), &dropped), None),
        )
        .await;
        check!(outcome.is_err());

        for _ in 0..10 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::task::yield_now().await;
        }
        check!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_timer() {
        let unit = CancellableUnit::new(CancellationToken::new());
        unit.register_timer(Duration::from_millis(100));

        unit.shutdown().await;
        sleep(Duration::from_secs(1)).await;

        check!(!unit.timed_out());
        check!(unit.reason() == CancelReason::External);
        check!(unit.token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_cancels_the_unit() {
        let unit = CancellableUnit::new(CancellationToken::new());
        unit.register_timer(Duration::from_millis(100));

        unit.token().cancelled().await;

        check!(unit.timed_out());
        check!(unit.reason() == CancelReason::Timeout(Duration::from_millis(100)));
    }
}
