//! DispatchPool - bounded worker pool with a bounded backlog queue
//!
//! Submission never waits. A task either starts a new worker, lands in the
//! backlog queue, or is handed back to the caller as a [`Rejection`].

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{BrokerConnection, DropCause, PoolConfig};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::error::DispatcherError;
use crate::metrics::{MetricsSnapshot, PoolMetrics};
use crate::task::{Delivery, PublishTask};

/// A submission the pool refused, with the task handed back
pub struct Rejection<C> {
    pub task: PublishTask<C>,
    pub cause: DropCause,
}

impl<C> fmt::Debug for Rejection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejection")
            .field("task", &self.task)
            .field("cause", &self.cause)
            .finish()
    }
}

/// State shared between the pool handle and its workers
struct PoolShared {
    name: String,
    config: PoolConfig,
    /// Live workers, including reserved slots whose task is not yet spawned
    workers: AtomicUsize,
    next_worker_id: AtomicU64,
    worker_exited: Notify,
    metrics: PoolMetrics,
}

impl PoolShared {
    fn new(name: String, config: PoolConfig) -> Self {
        Self {
            name,
            config,
            workers: AtomicUsize::new(0),
            next_worker_id: AtomicU64::new(0),
            worker_exited: Notify::new(),
            metrics: PoolMetrics::new(),
        }
    }

    /// Reserve a worker slot if fewer than `limit` are live
    ///
    /// Returns the live count including the new slot.
    fn try_reserve(&self, limit: usize) -> Option<usize> {
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Give up a slot only while the pool stays at or above `min_workers`
    fn try_retire(&self) -> bool {
        let min = self.config.min_workers;
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > min).then(|| n - 1)
            })
            .is_ok()
    }

    /// Retire an idle worker unless work arrived while it was giving up
    ///
    /// A submitter that enqueued just before the retirement may have seen
    /// this worker still live and started none. Returns `false` when the
    /// worker must keep serving the queue.
    fn retire_idle<T>(&self, rx: &Receiver<T>) -> bool {
        if !self.try_retire() {
            return false;
        }
        if !rx.is_empty() && self.try_reserve(1).is_some() {
            return false;
        }
        self.worker_exited.notify_waiters();
        true
    }

    fn release(&self) {
        self.workers.fetch_sub(1, Ordering::AcqRel);
        self.worker_exited.notify_waiters();
    }

    fn live(&self) -> usize {
        self.workers.load(Ordering::Acquire)
    }
}

/// Bounded worker pool executing [`PublishTask`]s
pub struct DispatchPool<C> {
    shared: Arc<PoolShared>,
    tx: Sender<PublishTask<C>>,
    rx: Receiver<PublishTask<C>>,
    runtime: Handle,
}

impl<C> fmt::Debug for DispatchPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPool")
            .field("name", &self.shared.name)
            .field("config", &self.shared.config)
            .field("workers", &self.shared.live())
            .field("backlog", &self.rx.len())
            .finish()
    }
}

impl<C: BrokerConnection> DispatchPool<C> {
    /// Create a pool on the current tokio runtime
    ///
    /// No worker is started until the first submission.
    ///
    /// # Errors
    /// Returns `NoRuntime` when called outside a tokio runtime
    pub fn new(name: impl Into<String>, config: PoolConfig) -> Result<Self, DispatcherError> {
        let name = name.into();
        let runtime =
            Handle::try_current().map_err(|_| DispatcherError::NoRuntime { pool: name.clone() })?;
        let (tx, rx) = async_channel::bounded(config.backlog_capacity);

        info!(
            pool = %name,
            min_workers = config.min_workers,
            max_workers = config.max_workers,
            keep_alive_ms = config.keep_alive_ms,
            backlog_capacity = config.backlog_capacity,
            "Dispatch pool created"
        );

        Ok(Self {
            shared: Arc::new(PoolShared::new(name, config)),
            tx,
            rx,
            runtime,
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Current number of live workers
    pub fn live_workers(&self) -> usize {
        self.shared.live()
    }

    /// Tasks waiting in the backlog queue
    pub fn backlog_len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared
            .metrics
            .snapshot(self.backlog_len(), self.live_workers())
    }

    /// Submit a task without waiting
    ///
    /// 1. below `min_workers`: start a worker running this task first
    /// 2. else enqueue; start a worker if none is alive
    /// 3. queue full and below `max_workers`: start a worker with this task
    /// 4. else reject with `BacklogFull`
    ///
    /// # Errors
    /// Returns the task with its [`DropCause`] when it was not accepted
    pub fn submit(&self, task: PublishTask<C>) -> Result<(), Rejection<C>> {
        let shared = &self.shared;
        shared.metrics.inc_submitted();

        if self.tx.is_closed() {
            return Err(self.reject(task, DropCause::PoolClosed));
        }

        if let Some(live) = shared.try_reserve(shared.config.min_workers) {
            self.spawn_worker(Some(task), live);
            return Ok(());
        }

        match self.tx.try_send(task) {
            Ok(()) => {
                shared.metrics.inc_enqueued();
                // min_workers may be 0, or every core worker may have exited
                if shared.live() == 0 {
                    if let Some(live) = shared.try_reserve(1) {
                        self.spawn_worker(None, live);
                    }
                }
                Ok(())
            }
            Err(TrySendError::Full(task)) => match shared.try_reserve(shared.config.max_workers) {
                Some(live) => {
                    self.spawn_worker(Some(task), live);
                    Ok(())
                }
                None => Err(self.reject(task, DropCause::BacklogFull)),
            },
            Err(TrySendError::Closed(task)) => Err(self.reject(task, DropCause::PoolClosed)),
        }
    }

    /// Close the backlog queue and wait for every worker to exit
    ///
    /// Tasks already accepted still run. Later submissions are rejected with
    /// `PoolClosed`.
    #[instrument(name = "dispatch_pool_shutdown", skip(self), fields(pool = %self.shared.name))]
    pub async fn shutdown(&self) {
        self.tx.close();

        loop {
            let exited = self.shared.worker_exited.notified();
            if self.shared.live() == 0 {
                if self.rx.is_empty() {
                    break;
                }
                // Accepted tasks with nobody left to run them
                if let Some(live) = self.shared.try_reserve(1) {
                    self.spawn_worker(None, live);
                }
                continue;
            }
            exited.await;
        }

        let snapshot = self.metrics();
        info!(
            delivered = snapshot.delivered,
            failed = snapshot.failed,
            dropped = snapshot.dropped,
            "Dispatch pool shut down"
        );
    }

    fn reject(&self, task: PublishTask<C>, cause: DropCause) -> Rejection<C> {
        self.shared.metrics.inc_dropped();
        Rejection { task, cause }
    }

    fn spawn_worker(&self, first_task: Option<PublishTask<C>>, live: usize) {
        let shared = Arc::clone(&self.shared);
        shared.metrics.record_worker_started(live);
        let worker_id = shared.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let span = tracing::debug_span!("dispatch_worker", pool = %shared.name, worker = worker_id);

        self.runtime
            .spawn(worker_loop(shared, self.rx.clone(), first_task).instrument(span));
    }
}

/// Worker body: run the first task, then drain the queue until closed or idle
async fn worker_loop<C: BrokerConnection>(
    shared: Arc<PoolShared>,
    rx: Receiver<PublishTask<C>>,
    first_task: Option<PublishTask<C>>,
) {
    debug!("Worker started");

    if let Some(task) = first_task {
        execute(&shared, task).await;
    }

    let keep_alive = shared.config.keep_alive();
    loop {
        let next = if shared.live() > shared.config.min_workers {
            match tokio::time::timeout(keep_alive, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    if shared.retire_idle(&rx) {
                        debug!("Idle past keep-alive, worker retired");
                        return;
                    }
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match next {
            Ok(task) => execute(&shared, task).await,
            Err(_) => break,
        }
    }

    shared.release();
    debug!("Queue closed, worker stopped");
}

/// Run a task in its own tokio task so a panicking client cannot take the
/// worker down with it
async fn execute<C: BrokerConnection>(shared: &PoolShared, task: PublishTask<C>) {
    let context = Arc::clone(task.context());
    let destination = task.request().destination.clone();

    match tokio::spawn(task.run()).await {
        Ok(Delivery::Delivered) => shared.metrics.inc_delivered(),
        Ok(Delivery::Failed) => shared.metrics.inc_failed(),
        Err(join_error) => {
            shared.metrics.inc_failed();
            if join_error.is_panic() {
                warn!(destination = %destination, "Broker client panicked during send");
            } else {
                error!(destination = %destination, error = %join_error, "Send task aborted");
            }
            context.report_failure(&destination, format!("send task aborted: {join_error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MemoryClient, MemoryConnection};
    use crate::task::AdapterContext;
    use contracts::{BrokerClient, ClientProperties, DiagnosticsSink, PublishRequest};
    use observability::RecordingDiagnostics;
    use std::time::{Duration, Instant};

    struct Fixture {
        client: MemoryClient,
        diagnostics: Arc<RecordingDiagnostics>,
        context: Arc<AdapterContext<MemoryConnection>>,
    }

    async fn fixture(client: MemoryClient) -> Fixture {
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let context = Arc::new(AdapterContext::new(
            "orders",
            "acme",
            Arc::clone(&diagnostics) as Arc<dyn DiagnosticsSink>,
        ));
        let connection = client
            .open(&ClientProperties::with_address("memory"))
            .await
            .unwrap();
        context.connection().install(connection);
        Fixture {
            client,
            diagnostics,
            context,
        }
    }

    impl Fixture {
        fn task(&self, destination: &str) -> PublishTask<MemoryConnection> {
            let request = PublishRequest::new(destination, destination.to_string()).unwrap();
            PublishTask::new(request, Arc::clone(&self.context))
        }
    }

    fn config(min: usize, max: usize, backlog: usize) -> PoolConfig {
        PoolConfig {
            min_workers: min,
            max_workers: max,
            keep_alive_ms: 20_000,
            backlog_capacity: backlog,
        }
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let result = DispatchPool::<MemoryConnection>::new("orphan", PoolConfig::default());
        assert!(matches!(result, Err(DispatcherError::NoRuntime { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tasks_delivered() {
        let fx = fixture(MemoryClient::new()).await;
        let pool = DispatchPool::new("test", config(2, 4, 16)).unwrap();

        for i in 0..10 {
            pool.submit(fx.task(&format!("topic-{i}"))).unwrap();
        }
        pool.shutdown().await;

        assert_eq!(fx.client.sent_count(), 10);
        let snapshot = pool.metrics();
        assert_eq!(snapshot.delivered, 10);
        assert_eq!(snapshot.live_workers, 0);
        assert!(snapshot.peak_workers <= 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_backlog_full_rejects_next_submission() {
        const K: usize = 4;
        let fx = fixture(MemoryClient::new().gated()).await;
        let pool = DispatchPool::new("test", config(1, 1, K)).unwrap();

        // Occupies the only worker
        pool.submit(fx.task("blocker")).unwrap();
        for i in 0..K {
            assert!(pool.submit(fx.task(&format!("queued-{i}"))).is_ok());
        }

        let rejection = pool.submit(fx.task("overflow")).unwrap_err();
        assert_eq!(rejection.cause, DropCause::BacklogFull);
        assert_eq!(rejection.task.request().destination, "overflow");
        assert_eq!(pool.backlog_len(), K);

        fx.client.release(K + 1);
        pool.shutdown().await;
        assert_eq!(fx.client.sent_count(), K + 1);
        assert_eq!(pool.metrics().dropped, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_grows_to_max_before_rejecting() {
        let fx = fixture(MemoryClient::new().gated()).await;
        let pool = DispatchPool::new("test", config(1, 3, 1)).unwrap();

        // core worker, queued, then two surplus workers
        for i in 0..4 {
            pool.submit(fx.task(&format!("t{i}"))).unwrap();
        }
        assert_eq!(pool.live_workers(), 3);

        // every worker busy, queue refilled by nobody
        fx.client.wait_started(3).await;
        assert!(pool.submit(fx.task("t4")).is_err());

        fx.client.release(4);
        pool.shutdown().await;
        assert_eq!(pool.metrics().peak_workers, 3);
        assert_eq!(fx.client.sent_count(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_latency_bounded_when_full() {
        let fx = fixture(MemoryClient::new().gated()).await;
        let pool = DispatchPool::new("test", config(1, 1, 2)).unwrap();
        for i in 0..3 {
            pool.submit(fx.task(&format!("fill-{i}"))).unwrap();
        }

        for _ in 0..1_000 {
            let started = Instant::now();
            let result = pool.submit(fx.task("late"));
            assert!(started.elapsed() < Duration::from_millis(50));
            assert!(result.is_err());
        }

        fx.client.release(3);
        pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_idle_surplus_workers_retire() {
        let fx = fixture(MemoryClient::new()).await;
        let pool = DispatchPool::new(
            "test",
            PoolConfig {
                min_workers: 1,
                max_workers: 4,
                keep_alive_ms: 20,
                backlog_capacity: 1,
            },
        )
        .unwrap();

        let gated = fixture(MemoryClient::new().gated()).await;
        for i in 0..5 {
            pool.submit(gated.task(&format!("burst-{i}"))).unwrap();
        }
        assert_eq!(pool.live_workers(), 4);
        gated.client.release(5);

        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.live_workers() > 1 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(pool.live_workers(), 1);

        // The core worker still serves new work
        pool.submit(fx.task("after")).unwrap();
        pool.shutdown().await;
        assert_eq!(fx.client.sent_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zero_min_workers_still_runs_queued_task() {
        let fx = fixture(MemoryClient::new()).await;
        let pool = DispatchPool::new("test", config(0, 2, 4)).unwrap();

        pool.submit(fx.task("only")).unwrap();
        pool.shutdown().await;

        assert_eq!(fx.client.sent_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_client_does_not_kill_worker() {
        let fx = fixture(MemoryClient::new().panic_on("boom")).await;
        let pool = DispatchPool::new("test", config(1, 1, 8)).unwrap();

        pool.submit(fx.task("boom")).unwrap();
        pool.submit(fx.task("fine")).unwrap();
        pool.shutdown().await;

        assert_eq!(fx.client.sent_count(), 1);
        let failures = fx.diagnostics.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].destination, "boom");
        assert_eq!(pool.metrics().failed, 1);
    }

    #[test]
    fn test_idle_worker_keeps_serving_late_arrival() {
        let shared = PoolShared::new("test".to_string(), config(0, 2, 4));
        let (tx, rx) = async_channel::bounded::<u32>(4);

        // Last worker times out while a submitter enqueues, having seen it live
        assert_eq!(shared.try_reserve(1), Some(1));
        tx.try_send(7).unwrap();

        assert!(!shared.retire_idle(&rx));
        assert_eq!(shared.live(), 1);

        assert_eq!(rx.try_recv().unwrap(), 7);
        assert!(shared.retire_idle(&rx));
        assert_eq!(shared.live(), 0);
    }

    #[test]
    fn test_core_worker_never_retires() {
        let shared = PoolShared::new("test".to_string(), config(1, 2, 4));
        let (_tx, rx) = async_channel::bounded::<u32>(4);

        assert_eq!(shared.try_reserve(1), Some(1));
        assert!(!shared.retire_idle(&rx));
        assert_eq!(shared.live(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_drains_backlog_left_without_workers() {
        let fx = fixture(MemoryClient::new()).await;
        let pool = DispatchPool::new("test", config(0, 2, 4)).unwrap();

        // As if the last worker retired right after this task was queued
        pool.tx.try_send(fx.task("stranded")).unwrap();
        assert_eq!(pool.live_workers(), 0);

        tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
            .await
            .unwrap();
        assert_eq!(fx.client.sent_count(), 1);
        assert_eq!(pool.backlog_len(), 0);
    }

    #[tokio::test]
    async fn test_debug_shows_pool_state() {
        let pool = DispatchPool::<MemoryConnection>::new("orders", config(1, 2, 4)).unwrap();
        let rendered = format!("{pool:?}");
        assert!(rendered.contains("\"orders\""), "got: {rendered}");
        assert!(rendered.contains("workers: 0"), "got: {rendered}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_after_shutdown_rejected() {
        let fx = fixture(MemoryClient::new()).await;
        let pool = DispatchPool::new("test", config(1, 1, 1)).unwrap();
        pool.shutdown().await;

        let rejection = pool.submit(fx.task("late")).unwrap_err();
        assert_eq!(rejection.cause, DropCause::PoolClosed);
        assert!(pool.is_closed());
    }
}
