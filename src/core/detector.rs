//! Change Detector: debounced "new email opened" events
//!
//! Every mutation batch re-arms a quiet-period timer; extraction runs only
//! once the page has been silent for the whole period. An extraction whose
//! identity equals the last emitted one is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::core::dom::{MutationWatcher, PageDocument};
use crate::core::extractor::EmailExtractor;
use crate::types::{ActivationState, EmailIdentity, EmailSnapshot, SkipReason};

/// Counters for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectorStats {
    /// Batches that re-armed the timer
    pub batches: u64,
    /// Batches dropped because detection was off
    pub ignored_batches: u64,
    /// Times the timer expired and extraction ran
    pub extraction_attempts: u64,
    /// Snapshots emitted
    pub emitted: u64,
    /// Attempts that ended in a skip
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct DetectorShared {
    last_seen: Option<EmailIdentity>,
    stats: DetectorStats,
}

/// Everything the watch task needs to run an attempt
#[derive(Clone)]
struct AttemptContext {
    doc: PageDocument,
    extractor: EmailExtractor,
    activation: watch::Receiver<ActivationState>,
    events: mpsc::UnboundedSender<EmailSnapshot>,
    shared: Arc<Mutex<DetectorShared>>,
}

impl AttemptContext {
    fn lock(&self) -> MutexGuard<'_, DetectorShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enabled(&self) -> bool {
        self.activation.borrow().is_on()
    }

    /// Extract, dedup, emit
    fn attempt(&self) {
        let outcome = {
            let mut shared = self.lock();
            shared.stats.extraction_attempts += 1;

            let result = if self.enabled() {
                self.extractor.extract(&self.doc)
            } else {
                Err(SkipReason::X001_DETECTION_DISABLED)
            };

            match result {
                Ok(snapshot) => {
                    let identity = snapshot.identity();
                    if shared.last_seen.as_ref() == Some(&identity) {
                        shared.stats.skipped += 1;
                        Err((SkipReason::X003_DUPLICATE, Some(identity)))
                    } else {
                        shared.last_seen = Some(identity.clone());
                        shared.stats.emitted += 1;
                        Ok((snapshot, identity))
                    }
                }
                Err(reason) => {
                    shared.stats.skipped += 1;
                    Err((reason, None))
                }
            }
        };

        match outcome {
            Ok((snapshot, identity)) => {
                info!(email = %identity.fingerprint(), "new email detected");
                if self.events.send(snapshot).is_err() {
                    debug!("no listener for detected email");
                }
            }
            Err((reason, identity)) => {
                debug!(
                    reason = reason.code(),
                    email = %identity.map(|i| i.fingerprint()).unwrap_or_default(),
                    "extraction skipped"
                );
            }
        }
    }
}

/// Watches one page and emits each distinct open email once
pub struct ChangeDetector {
    ctx: AttemptContext,
    debounce: Duration,
    task: Option<JoinHandle<()>>,
}

impl ChangeDetector {
    /// Detector over `doc`. `activation` is a read-only mirror; snapshots go to `events`.
    pub fn new(
        doc: PageDocument,
        activation: watch::Receiver<ActivationState>,
        events: mpsc::UnboundedSender<EmailSnapshot>,
        debounce: Duration,
    ) -> Self {
        Self {
            ctx: AttemptContext {
                doc,
                extractor: EmailExtractor::new(),
                activation,
                events,
                shared: Arc::new(Mutex::new(DetectorShared::default())),
            },
            debounce,
            task: None,
        }
    }

    /// Attach the watcher. No-op while one is active.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let watcher = self.ctx.doc.observe();
        let ctx = self.ctx.clone();
        let debounce = self.debounce;
        self.task = Some(tokio::spawn(watch_loop(watcher, ctx, debounce)));
        debug!(debounce_ms = debounce.as_millis() as u64, "change detector started");
    }

    /// Detach the watcher and drop any pending timer. Safe when not running.
    ///
    /// Forgets the last seen email so re-activation shows the open email again.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("change detector stopped");
        }
        self.ctx.lock().last_seen = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stats(&self) -> DetectorStats {
        self.ctx.lock().stats
    }

    pub fn last_seen(&self) -> Option<EmailIdentity> {
        self.ctx.lock().last_seen.clone()
    }
}

impl Drop for ChangeDetector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn watch_loop(mut watcher: MutationWatcher, ctx: AttemptContext, debounce: Duration) {
    let mut deadline: Option<Instant> = None;
    loop {
        tokio::select! {
            batch = watcher.next_batch() => {
                let Some(batch) = batch else { break };
                if !ctx.enabled() {
                    ctx.lock().stats.ignored_batches += 1;
                    continue;
                }
                ctx.lock().stats.batches += 1;
                if deadline.is_none() {
                    debug!(records = batch.len(), "mutation burst started");
                }
                deadline = Some(Instant::now() + debounce);
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                ctx.attempt();
            }
        }
    }
}
