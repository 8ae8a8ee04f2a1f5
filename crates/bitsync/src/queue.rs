//! Named, independently configured work queues.
//!
//! Every remote resource class (repositories, commits, statuses, refs) and the
//! per-repository job dispatcher gets its own [`Queue`]. Call sites that ask
//! the [`QueueRegistry`] for the same name share one concurrency and rate
//! budget, no matter where in the code they run.
//!
//! A queue bounds two things:
//! - how many tasks are in flight at once (a tokio [`Semaphore`]);
//! - optionally, how many tasks may start per interval (a governor GCRA
//!   limiter allowing bursts of `interval_cap` and refilling over `interval`).

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use thiserror::Error;
use tokio::sync::Semaphore;

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Well-known queue names.
pub mod names {
    pub const PROCESS_REPOSITORY: &str = "process-repository";
    pub const REPOSITORIES: &str = "repositories";
    pub const COMMITS: &str = "commits";
    pub const STATUSES: &str = "statuses";
    pub const REFS: &str = "refs";
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Queue {0} was closed")]
    Closed(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Admission policy for a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueOptions {
    /// Maximum tasks in flight. `None` means unbounded.
    pub concurrency: Option<usize>,
    /// Maximum tasks started per `interval`.
    pub interval_cap: Option<u32>,
    /// Length of the rate window. Only used together with `interval_cap`.
    pub interval: Option<Duration>,
}

impl QueueOptions {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: Some(concurrency),
            ..Self::default()
        }
    }

    pub fn interval_cap(mut self, cap: u32, interval: Duration) -> Self {
        self.interval_cap = Some(cap);
        self.interval = Some(interval);
        self
    }

    fn permits(&self) -> usize {
        match self.concurrency {
            Some(0) | None => Semaphore::MAX_PERMITS,
            Some(n) => n.min(Semaphore::MAX_PERMITS),
        }
    }

    fn quota(&self) -> Option<Quota> {
        let cap = NonZeroU32::new(self.interval_cap?)?;
        let interval = self.interval?;
        let period = interval.checked_div(cap.get())?;
        Quota::with_period(period).map(|q| q.allow_burst(cap))
    }
}

struct QueueInner {
    name: String,
    options: QueueOptions,
    permits: Semaphore,
    limiter: Option<GovernorRateLimiter>,
    /// Tasks waiting for admission.
    size: AtomicUsize,
    /// Tasks currently running.
    pending: AtomicUsize,
    cap_warned: AtomicBool,
}

/// Counts a task in `size` or `pending` for as long as it lives, so a caller
/// dropped mid-wait or mid-task is still subtracted.
struct Tally<'a>(&'a AtomicUsize);

impl<'a> Tally<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for Tally<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A handle to a named queue. Clones share the same budget.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .field("size", &self.size())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Queue {
    fn new(name: &str, options: QueueOptions) -> Self {
        let limiter = options.quota().map(RateLimiter::direct);
        Self {
            inner: Arc::new(QueueInner {
                name: name.to_string(),
                permits: Semaphore::new(options.permits()),
                limiter,
                options,
                size: AtomicUsize::new(0),
                pending: AtomicUsize::new(0),
                cap_warned: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn options(&self) -> &QueueOptions {
        &self.inner.options
    }

    /// Number of tasks waiting to be admitted.
    pub fn size(&self) -> usize {
        self.inner.size.load(Ordering::Relaxed)
    }

    /// Number of tasks currently running.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Relaxed)
    }

    /// Run `task` once the queue admits it and return its output.
    ///
    /// The caller is suspended until a concurrency slot is free and, if an
    /// interval cap is configured, until the rate window allows another start.
    ///
    /// # Errors
    /// [`QueueError::Closed`] if the queue is closed before the task is
    /// admitted.
    pub async fn add<F, T>(&self, task: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let inner = &self.inner;
        let waiting = Tally::enter(&inner.size);
        tracing::debug!(
            queue = %inner.name,
            size = self.size(),
            pending = self.pending(),
            "Queued"
        );

        let _permit = inner
            .permits
            .acquire()
            .await
            .map_err(|_| QueueError::Closed(inner.name.clone()))?;
        self.wait_for_interval().await;
        drop(waiting);

        let running = Tally::enter(&inner.pending);
        let output = task.await;
        drop(running);

        tracing::debug!(
            queue = %inner.name,
            size = self.size(),
            pending = self.pending(),
            "Resolved"
        );
        Ok(output)
    }

    /// Stop admitting tasks. Tasks already running finish; waiting and later
    /// tasks fail with [`QueueError::Closed`].
    pub fn close(&self) {
        if !self.inner.permits.is_closed() {
            tracing::debug!(queue = %self.inner.name, waiting = self.size(), "Closing queue");
            self.inner.permits.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.permits.is_closed()
    }

    async fn wait_for_interval(&self) {
        let Some(limiter) = &self.inner.limiter else {
            return;
        };

        match limiter.check() {
            Ok(()) => {
                self.inner.cap_warned.store(false, Ordering::Relaxed);
            }
            Err(not_until) => {
                if !self.inner.cap_warned.swap(true, Ordering::Relaxed) {
                    let wait = not_until.wait_time_from(DefaultClock::default().now());
                    tracing::warn!(
                        queue = %self.inner.name,
                        wait_ms = wait.as_millis() as u64,
                        "Interval cap reached, waiting for the next window"
                    );
                }
                limiter.until_ready().await;
            }
        }
    }
}

/// Registry of named queues.
///
/// The first `get_queue` call for a name creates the queue with its options;
/// later calls return the same queue and ignore their options.
#[derive(Default)]
pub struct QueueRegistry {
    queues: Mutex<HashMap<String, Queue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry. Created on first use, never torn down.
    pub fn global() -> &'static QueueRegistry {
        static REGISTRY: OnceLock<QueueRegistry> = OnceLock::new();
        REGISTRY.get_or_init(QueueRegistry::new)
    }

    pub fn get_queue(&self, name: &str, options: QueueOptions) -> Result<Queue> {
        if name.trim().is_empty() {
            return Err(QueueError::InvalidArgument(
                "queue name is required".to_string(),
            ));
        }

        let mut queues = match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let queue = queues
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(queue = %name, ?options, "Creating queue");
                Queue::new(name, options)
            })
            .clone();
        Ok(queue)
    }

    /// Close the queue registered under `name`. Returns whether it exists.
    pub fn close(&self, name: &str) -> bool {
        let queues = match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match queues.get(name) {
            Some(queue) => {
                queue.close();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        match self.queues.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn get_queue_rejects_empty_name() {
        let registry = QueueRegistry::new();
        let err = registry
            .get_queue("", QueueOptions::default())
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidArgument(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn get_queue_is_idempotent_and_first_options_win() {
        let registry = QueueRegistry::new();
        let first = registry
            .get_queue("commits", QueueOptions::with_concurrency(5))
            .unwrap();
        let second = registry
            .get_queue("commits", QueueOptions::with_concurrency(50))
            .unwrap();

        assert!(Arc::ptr_eq(&first.inner, &second.inner));
        assert_eq!(second.options().concurrency, Some(5));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_names_get_different_queues() {
        let registry = QueueRegistry::new();
        let a = registry.get_queue("a", QueueOptions::default()).unwrap();
        let b = registry.get_queue("b", QueueOptions::default()).unwrap();
        assert!(!Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn global_registry_is_shared() {
        let a = QueueRegistry::global()
            .get_queue("global-test-queue", QueueOptions::with_concurrency(1))
            .unwrap();
        let b = QueueRegistry::global()
            .get_queue("global-test-queue", QueueOptions::with_concurrency(9))
            .unwrap();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn quota_requires_cap_and_interval() {
        assert!(QueueOptions::default().quota().is_none());
        assert!(
            QueueOptions::with_concurrency(1)
                .interval_cap(0, Duration::from_secs(1))
                .quota()
                .is_none()
        );
        assert!(
            QueueOptions::with_concurrency(1)
                .interval_cap(10, Duration::from_secs(1))
                .quota()
                .is_some()
        );
    }

    #[tokio::test]
    async fn add_returns_task_output() {
        let queue = Queue::new("t", QueueOptions::with_concurrency(1));
        let out = queue.add(async { 41 + 1 }).await.unwrap();
        assert_eq!(out, 42);
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn concurrency_bounds_in_flight_tasks() {
        let queue = Queue::new("bounded", QueueOptions::with_concurrency(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                queue
                    .add(async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropped_callers_leave_no_counts_behind() {
        let queue = Queue::new("dropped", QueueOptions::with_concurrency(1));
        let mut running = Box::pin(queue.add(std::future::pending::<()>()));
        let mut waiting = Box::pin(queue.add(async {}));

        tokio::select! {
            biased;
            _ = &mut running => unreachable!("task never completes"),
            _ = &mut waiting => unreachable!("no permit is free"),
            () = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.pending(), 1);

        drop(running);
        drop(waiting);
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn closing_rejects_waiting_tasks_and_lets_running_ones_finish() {
        let registry = QueueRegistry::new();
        let queue = registry
            .get_queue(names::PROCESS_REPOSITORY, QueueOptions::with_concurrency(1))
            .unwrap();
        let (release, hold) = tokio::sync::oneshot::channel::<()>();

        let running = tokio::spawn({
            let queue = queue.clone();
            async move { queue.add(async { hold.await.is_ok() }).await }
        });
        while queue.pending() == 0 {
            tokio::task::yield_now().await;
        }
        let waiting = tokio::spawn({
            let queue = queue.clone();
            async move { queue.add(async {}).await }
        });
        while queue.size() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(registry.close(names::PROCESS_REPOSITORY));
        assert!(!registry.close("unknown"));
        assert!(queue.is_closed());

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, QueueError::Closed(name) if name == names::PROCESS_REPOSITORY));
        assert!(matches!(
            queue.add(async {}).await,
            Err(QueueError::Closed(_))
        ));

        release.send(()).unwrap();
        assert!(running.await.unwrap().unwrap());
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn interval_cap_delays_tasks_beyond_the_burst() {
        let queue = Queue::new(
            "capped",
            QueueOptions::default().interval_cap(2, Duration::from_millis(200)),
        );

        let start = Instant::now();
        queue.add(async {}).await.unwrap();
        queue.add(async {}).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));

        queue.add(async {}).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
