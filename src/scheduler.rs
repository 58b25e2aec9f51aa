use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::time::Instant;

use crate::fingerprint::HtmlResult;
use crate::strategy::DelayStrategy;

/// Future returned by a dispatcher callback. Boxed because the scheduler is
/// generic over whatever work a `Harvester` wants to run per due task.
pub type DispatchFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One entry in the time-ordered queue. Carries the URL's owning strategy
/// (not a reference to shared state): a URL's strategy travels with its
/// task and is handed back to exactly one fetch at a time, which is why no
/// lock around strategy state is needed anywhere in this crate.
pub struct PendingTask {
    pub fire_time: Instant,
    pub priority: i32,
    pub sequence: u64,
    pub url: String,
    pub strategy: Box<dyn DelayStrategy>,
    /// Last (timestamp, fingerprint) observed for this URL, kept purely for
    /// the structured log line's "delay/similarity since prior" fields —
    /// independent of whatever history the strategy itself retains.
    pub last_observation: Option<(f64, HtmlResult)>,
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
            && self.priority == other.priority
            && self.sequence == other.sequence
    }
}
impl Eq for PendingTask {}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fire_time
            .cmp(&other.fire_time)
            .then(self.priority.cmp(&other.priority))
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Absolute-time priority queue plus a semaphore-gated worker pool bounding
/// concurrent fetches. `run` is the dispatcher loop: it wakes on whichever
/// comes first, the next
/// fire time or a newly enqueued task, pops everything due, and spawns each
/// onto the pool.
pub struct Scheduler {
    heap: Mutex<BinaryHeap<Reverse<PendingTask>>>,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    sequence: AtomicU64,
}

impl Scheduler {
    pub fn new(worker_count: usize) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            semaphore: Arc::new(Semaphore::new(worker_count.max(1))),
            sequence: AtomicU64::new(0),
        }
    }

    /// Enqueues `(fire_time, priority, url)`, safe for concurrent callers —
    /// re-enqueue happens from inside a spawned fetch task, same as every
    /// other caller of this method.
    pub async fn enter_abs(
        &self,
        fire_time: Instant,
        priority: i32,
        url: String,
        strategy: Box<dyn DelayStrategy>,
        last_observation: Option<(f64, HtmlResult)>,
    ) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        {
            let mut heap = self.heap.lock().await;
            heap.push(Reverse(PendingTask {
                fire_time,
                priority,
                sequence,
                url,
                strategy,
                last_observation,
            }));
        }
        self.notify.notify_one();
    }

    async fn pop_due(&self) -> (Vec<PendingTask>, Option<Instant>) {
        let mut heap = self.heap.lock().await;
        let now = Instant::now();
        let mut due = Vec::new();
        while let Some(Reverse(top)) = heap.peek() {
            if top.fire_time <= now {
                if let Some(Reverse(task)) = heap.pop() {
                    due.push(task);
                }
            } else {
                break;
            }
        }
        let next_wake = heap.peek().map(|Reverse(t)| t.fire_time);
        (due, next_wake)
    }

    /// Drives the queue forever. `dispatch` is invoked once per due task,
    /// with an `Arc<Scheduler>` it can use to re-enqueue the URL's next
    /// visit once the fetch completes.
    pub async fn run<F>(self: Arc<Self>, dispatch: F)
    where
        F: Fn(PendingTask, Arc<Scheduler>) -> DispatchFuture + Send + Sync + 'static,
    {
        let dispatch = Arc::new(dispatch);
        loop {
            let (due, next_wake) = self.pop_due().await;

            for task in due {
                let semaphore = self.semaphore.clone();
                let dispatch = dispatch.clone();
                let scheduler = Arc::clone(&self);
                tokio::spawn(async move {
                    let permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return,
                    };
                    dispatch(task, scheduler).await;
                    drop(permit);
                });
            }

            match next_wake {
                Some(fire_time) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(fire_time) => {}
                        _ = self.notify.notified() => {}
                    }
                }
                None => {
                    self.notify.notified().await;
                }
            }
        }
    }
}
