//! Rate-limited model request queue
//!
//! **[REC-QUEUE-010]** Every model call goes through this gateway so bursts
//! of concurrent pipeline runs cannot exceed the provider's rate limit.
//!
//! Dequeue order is strict priority (lower = more urgent), FIFO within
//! equal priority. On a provider rate-limit signal the queue enters a
//! cooldown: dequeuing pauses until the computed resume time (the
//! provider's retry hint, or exponential backoff when no hint is given);
//! already-in-flight tasks are not canceled. Failed tasks are retried up
//! to a fixed attempt budget with backoff; exhausting the budget surfaces
//! a typed error to the caller.
//!
//! Task lifecycle: pending → in-flight → success | retryable-failure
//! (pending again after backoff) | terminal-failure.
//!
//! Queue state lives behind a non-async mutex that is never held across a
//! suspension point; completion ordering is independent of dequeue order.

use crate::providers::{backoff_delay, ModelProvider, ModelRequest, ModelResponse, ProviderError};
use roam_common::Tunables;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};
use tokio::time::{sleep_until, Duration, Instant};

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum concurrently in-flight model calls
    pub max_in_flight: usize,
    /// Attempt budget per task (first try + retries)
    pub max_attempts: u32,
    /// Base delay for retry/cooldown backoff
    pub backoff_base_ms: u64,
    /// Backoff ceiling
    pub backoff_cap_ms: u64,
    /// Per-attempt timeout for one model call
    pub task_timeout: Duration,
}

impl QueueConfig {
    pub fn from_tunables(tunables: &Tunables) -> Self {
        Self {
            max_in_flight: tunables.queue_max_in_flight.max(1),
            max_attempts: tunables.queue_max_attempts.max(1),
            backoff_base_ms: tunables.queue_backoff_base_ms,
            backoff_cap_ms: tunables.queue_backoff_cap_ms,
            task_timeout: Duration::from_secs(tunables.model_task_timeout_secs),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from_tunables(&Tunables::default())
    }
}

/// Queue health snapshot (for health checks, not control flow)
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStatus {
    pub queued: usize,
    pub in_flight: usize,
    pub cooling_down: bool,
}

/// A queued model task; owned exclusively by the queue until completion
struct QueuedTask {
    priority: u8,
    seq: u64,
    request: ModelRequest,
    attempts_left: u32,
    respond_to: oneshot::Sender<Result<ModelResponse, ProviderError>>,
}

// Max-heap: "greater" = more urgent = lower priority value, then lower seq
impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

struct QueueInner {
    heap: BinaryHeap<QueuedTask>,
    /// Tasks waiting out a retry backoff: (eligible-at, task)
    delayed: Vec<(Instant, QueuedTask)>,
    cooldown_until: Option<Instant>,
    consecutive_rate_limits: u32,
    next_seq: u64,
}

struct QueueShared {
    inner: Mutex<QueueInner>,
    in_flight: AtomicUsize,
    notify: Notify,
    config: QueueConfig,
    provider: Arc<dyn ModelProvider>,
}

/// Priority queue + cooldown gate around all model calls
pub struct RequestQueue {
    shared: Arc<QueueShared>,
    worker: tokio::task::JoinHandle<()>,
}

impl RequestQueue {
    pub fn new(provider: Arc<dyn ModelProvider>, config: QueueConfig) -> Self {
        let shared = Arc::new(QueueShared {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                delayed: Vec::new(),
                cooldown_until: None,
                consecutive_rate_limits: 0,
                next_seq: 0,
            }),
            in_flight: AtomicUsize::new(0),
            notify: Notify::new(),
            config,
            provider,
        });

        let worker = tokio::spawn(worker_loop(shared.clone()));

        Self { shared, worker }
    }

    /// Enqueue a model call and await its outcome
    ///
    /// Lower priority values dequeue first; equal priorities are FIFO.
    pub async fn submit(
        &self,
        priority: u8,
        request: ModelRequest,
    ) -> Result<ModelResponse, ProviderError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.shared.inner.lock().expect("queue mutex poisoned");
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.heap.push(QueuedTask {
                priority,
                seq,
                request,
                attempts_left: self.shared.config.max_attempts,
                respond_to: tx,
            });
        }
        self.shared.notify.notify_one();

        rx.await.unwrap_or_else(|_| {
            Err(ProviderError::Network(
                "request queue shut down".to_string(),
            ))
        })
    }

    /// Snapshot of queue health
    pub fn status(&self) -> QueueStatus {
        let inner = self.shared.inner.lock().expect("queue mutex poisoned");
        QueueStatus {
            queued: inner.heap.len() + inner.delayed.len(),
            in_flight: self.shared.in_flight.load(Ordering::SeqCst),
            cooling_down: inner
                .cooldown_until
                .map(|t| t > Instant::now())
                .unwrap_or(false),
        }
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

enum Step {
    Dispatch(QueuedTask),
    WaitUntil(Instant),
    WaitNotify,
}

async fn worker_loop(shared: Arc<QueueShared>) {
    loop {
        let step = next_step(&shared);
        match step {
            Step::Dispatch(task) => {
                shared.in_flight.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(run_task(shared.clone(), task));
            }
            Step::WaitUntil(deadline) => {
                tokio::select! {
                    _ = shared.notify.notified() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            Step::WaitNotify => {
                shared.notify.notified().await;
            }
        }
    }
}

fn next_step(shared: &QueueShared) -> Step {
    let mut inner = shared.inner.lock().expect("queue mutex poisoned");
    let now = Instant::now();

    // Promote delayed tasks whose backoff has elapsed
    let mut i = 0;
    while i < inner.delayed.len() {
        if inner.delayed[i].0 <= now {
            let (_, task) = inner.delayed.swap_remove(i);
            inner.heap.push(task);
        } else {
            i += 1;
        }
    }

    if let Some(cooldown) = inner.cooldown_until {
        if cooldown <= now {
            inner.cooldown_until = None;
        } else {
            // Cooldown pauses the next dequeue only; in-flight tasks run on
            return Step::WaitUntil(cooldown);
        }
    }

    if shared.in_flight.load(Ordering::SeqCst) >= shared.config.max_in_flight {
        return Step::WaitNotify;
    }

    if let Some(task) = inner.heap.pop() {
        return Step::Dispatch(task);
    }

    if let Some(next_due) = inner.delayed.iter().map(|(due, _)| *due).min() {
        return Step::WaitUntil(next_due);
    }

    Step::WaitNotify
}

async fn run_task(shared: Arc<QueueShared>, mut task: QueuedTask) {
    let outcome = match tokio::time::timeout(
        shared.config.task_timeout,
        shared.provider.complete(&task.request),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    };

    shared.in_flight.fetch_sub(1, Ordering::SeqCst);

    match outcome {
        Ok(response) => {
            {
                let mut inner = shared.inner.lock().expect("queue mutex poisoned");
                inner.consecutive_rate_limits = 0;
            }
            let _ = task.respond_to.send(Ok(response));
        }
        Err(err) => {
            if let ProviderError::RateLimited { retry_after } = &err {
                let mut inner = shared.inner.lock().expect("queue mutex poisoned");
                let pause = retry_after.unwrap_or_else(|| {
                    backoff_delay(
                        shared.config.backoff_base_ms,
                        shared.config.backoff_cap_ms,
                        inner.consecutive_rate_limits,
                    )
                });
                inner.consecutive_rate_limits += 1;
                let resume = Instant::now() + pause;
                // Extend an existing cooldown, never shorten it
                inner.cooldown_until = Some(match inner.cooldown_until {
                    Some(current) if current > resume => current,
                    _ => resume,
                });
                tracing::warn!(
                    purpose = task.request.purpose,
                    pause_ms = pause.as_millis() as u64,
                    "Model provider rate limited, entering cooldown"
                );
            }

            task.attempts_left = task.attempts_left.saturating_sub(1);

            if err.is_retryable() && task.attempts_left > 0 {
                let attempts_used = shared.config.max_attempts - task.attempts_left;
                let delay = backoff_delay(
                    shared.config.backoff_base_ms,
                    shared.config.backoff_cap_ms,
                    attempts_used.saturating_sub(1),
                );
                tracing::debug!(
                    purpose = task.request.purpose,
                    attempts_left = task.attempts_left,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying model task after backoff"
                );
                let mut inner = shared.inner.lock().expect("queue mutex poisoned");
                inner.delayed.push((Instant::now() + delay, task));
            } else {
                tracing::warn!(
                    purpose = task.request.purpose,
                    error = %err,
                    "Model task failed terminally"
                );
                let _ = task.respond_to.send(Err(err));
            }
        }
    }

    shared.notify.notify_one();
}
