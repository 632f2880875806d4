// src/poller.rs

use crate::api::PanelApi;
use crate::sync::SyncRequest;
use crate::view::SharedView;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The one live progress loop, if any.
struct Running {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner<A> {
    api: Arc<A>,
    view: SharedView,
    slot: Mutex<Option<Running>>,
    next_generation: AtomicU64,
    live_loops: AtomicUsize,
    interval: Duration,
    settle_delay: Duration,
    requests: mpsc::UnboundedSender<SyncRequest>,
    shutdown: CancellationToken,
}

/// Fast progress polling while a download is in flight.
///
/// The loop stops itself on a terminal progress state or on the first
/// failed fetch. It never restarts on its own; that decision belongs to the
/// status sync's activity rule.
pub struct ProgressPoller<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for ProgressPoller<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Keeps `live_loops` honest however a loop task ends.
struct LiveGuard<A>(Arc<Inner<A>>);

impl<A> Drop for LiveGuard<A> {
    fn drop(&mut self) {
        self.0.live_loops.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<A: PanelApi> ProgressPoller<A> {
    pub fn new(
        api: Arc<A>,
        view: SharedView,
        interval: Duration,
        settle_delay: Duration,
        requests: mpsc::UnboundedSender<SyncRequest>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                view,
                slot: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                live_loops: AtomicUsize::new(0),
                interval,
                settle_delay,
                requests,
                shutdown,
            }),
        }
    }

    /// Starts polling. A loop that is already running is cancelled before
    /// the new one is armed, and has fully exited when this returns.
    pub async fn start(&self) {
        let previous = {
            let mut slot = self.inner.slot.lock().await;
            let previous = slot.take();
            if let Some(old) = &previous {
                old.token.cancel();
            }

            let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
            let token = self.inner.shutdown.child_token();

            self.inner.live_loops.fetch_add(1, Ordering::SeqCst);
            let guard = LiveGuard(Arc::clone(&self.inner));
            let handle = tokio::spawn(Self::run(
                Arc::clone(&self.inner),
                generation,
                token.clone(),
                guard,
            ));

            *slot = Some(Running {
                generation,
                token,
                handle,
            });
            debug!(generation, "progress poller armed");
            previous
        };

        if let Some(old) = previous {
            debug!(generation = old.generation, "progress poller replaced");
            let _ = old.handle.await;
        }
    }

    /// Stops polling. No-op when idle.
    pub async fn stop(&self) {
        let running = {
            let mut slot = self.inner.slot.lock().await;
            let running = slot.take();
            if let Some(r) = &running {
                r.token.cancel();
            }
            running
        };

        if let Some(r) = running {
            let _ = r.handle.await;
            info!(generation = r.generation, "progress poller stopped");
        }
    }

    pub async fn is_active(&self) -> bool {
        self.inner.slot.lock().await.is_some()
    }

    /// Number of loop tasks currently alive. At most one whenever no
    /// `start` is mid-replacement; `start` only returns once the loop it
    /// replaced has exited.
    pub fn live_loops(&self) -> usize {
        self.inner.live_loops.load(Ordering::SeqCst)
    }

    async fn run(
        inner: Arc<Inner<A>>,
        generation: u64,
        token: CancellationToken,
        _guard: LiveGuard<A>,
    ) {
        let period = inner.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = inner.api.fetch_progress() => result,
            };

            match result {
                Ok(snapshot) => {
                    inner.view.send_modify(|view| view.apply_progress(&snapshot));

                    if snapshot.is_terminal() {
                        info!(
                            generation,
                            percent = snapshot.percent,
                            status = %snapshot.status,
                            "download reached a terminal state"
                        );
                        if inner.release(generation).await {
                            inner.schedule_refresh();
                        }
                        break;
                    }
                }
                Err(e) => {
                    warn!(generation, "progress fetch failed, stopping poller: {}", e);
                    inner.release(generation).await;
                    break;
                }
            }
        }
    }
}

impl<A> Inner<A> {
    /// Clears the slot if it still belongs to `generation`.
    async fn release(&self, generation: u64) -> bool {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(r) if r.generation == generation => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Asks the status sync for one refresh once the service has settled.
    fn schedule_refresh(&self) {
        let delay = self.settle_delay;
        let requests = self.requests.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if requests.send(SyncRequest::RefreshStatus).is_err() {
                        debug!("status sync is gone, dropping refresh request");
                    }
                }
            }
        });
    }
}
