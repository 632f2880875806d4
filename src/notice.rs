// src/notice.rs

use crate::models::{Notice, Severity};
use crate::settings::Timings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where the single notice slot is in its show/hide lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticePhase {
    Hidden,
    Entering,
    Visible,
    Exiting,
}

/// One observable phase change of the notice slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeTransition {
    pub phase: NoticePhase,
    /// The notice occupying the slot, `None` once hidden.
    pub notice: Option<Notice>,
}

struct Slot {
    phase: NoticePhase,
    notice: Option<Notice>,
    /// Bumped on every entry so delayed tasks can tell whose notice they belong to.
    generation: u64,
}

struct Inner {
    slot: Mutex<Slot>,
    auto_hide: Mutex<Option<CancellationToken>>,
    enter: Duration,
    exit: Duration,
    settle: Duration,
    dwell: Duration,
    events: broadcast::Sender<NoticeTransition>,
    /// Latest transition, readable without waiting on a running chain.
    state: watch::Sender<NoticeTransition>,
    shutdown: CancellationToken,
}

/// Presents operator notices one at a time.
///
/// The slot mutex is held across a whole exit/enter chain, so concurrent
/// `show` calls queue up behind each other and a new notice never starts
/// entering before the previous one has finished exiting.
#[derive(Clone)]
pub struct NoticeQueue {
    inner: Arc<Inner>,
}

impl NoticeQueue {
    pub fn new(timings: &Timings, shutdown: CancellationToken) -> Self {
        let (events, _) = broadcast::channel(64);
        let (state, _) = watch::channel(NoticeTransition {
            phase: NoticePhase::Hidden,
            notice: None,
        });
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot {
                    phase: NoticePhase::Hidden,
                    notice: None,
                    generation: 0,
                }),
                auto_hide: Mutex::new(None),
                enter: timings.notice_enter,
                exit: timings.notice_exit,
                settle: timings.notice_settle,
                dwell: timings.notice_dwell,
                events,
                state,
                shutdown,
            }),
        }
    }

    /// Receives every phase change from now on, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<NoticeTransition> {
        self.inner.events.subscribe()
    }

    /// Watches the slot's latest transition.
    pub fn watch(&self) -> watch::Receiver<NoticeTransition> {
        self.inner.state.subscribe()
    }

    pub fn phase(&self) -> NoticePhase {
        self.inner.state.borrow().phase
    }

    /// The notice currently occupying the slot, if any.
    pub fn current(&self) -> Option<Notice> {
        self.inner.state.borrow().notice.clone()
    }

    /// Shows a notice, first retiring whatever is on screen.
    ///
    /// Returns once the new notice has started entering.
    pub async fn show(&self, text: impl Into<String>, severity: Severity) {
        let notice = Notice::new(text, severity);

        if let Some(token) = self.inner.auto_hide.lock().await.take() {
            token.cancel();
        }

        let mut slot = self.inner.slot.lock().await;
        if slot.phase != NoticePhase::Hidden {
            self.exit_locked(&mut slot).await;
            tokio::time::sleep(self.inner.settle).await;
        }
        self.enter_locked(&mut slot, notice).await;
    }

    /// Hides the visible notice. Completes immediately if nothing is shown.
    pub async fn hide(&self) {
        let mut slot = self.inner.slot.lock().await;
        self.exit_locked(&mut slot).await;
    }

    async fn enter_locked(&self, slot: &mut Slot, notice: Notice) {
        slot.generation += 1;
        slot.phase = NoticePhase::Entering;
        slot.notice = Some(notice);
        self.emit(slot);

        let generation = slot.generation;

        let queue = self.clone();
        let shutdown = self.inner.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(queue.inner.enter) => queue.finish_enter(generation).await,
            }
        });

        let token = self.inner.shutdown.child_token();
        if let Some(stale) = self.inner.auto_hide.lock().await.replace(token.clone()) {
            stale.cancel();
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(queue.inner.dwell) => queue.auto_hide(generation, token).await,
            }
        });
    }

    async fn finish_enter(&self, generation: u64) {
        let mut slot = self.inner.slot.lock().await;
        if slot.generation == generation && slot.phase == NoticePhase::Entering {
            slot.phase = NoticePhase::Visible;
            self.emit(&slot);
        }
    }

    async fn auto_hide(&self, generation: u64, token: CancellationToken) {
        let mut slot = self.inner.slot.lock().await;
        if token.is_cancelled() || slot.generation != generation {
            return;
        }
        self.exit_locked(&mut slot).await;
    }

    async fn exit_locked(&self, slot: &mut Slot) {
        if slot.phase == NoticePhase::Hidden {
            return;
        }
        if slot.phase != NoticePhase::Exiting {
            slot.phase = NoticePhase::Exiting;
            self.emit(slot);
        }

        tokio::time::sleep(self.inner.exit).await;

        slot.phase = NoticePhase::Hidden;
        slot.notice = None;
        self.emit(slot);
    }

    fn emit(&self, slot: &Slot) {
        debug!(phase = ?slot.phase, notice = ?slot.notice, "notice transition");
        let transition = NoticeTransition {
            phase: slot.phase,
            notice: slot.notice.clone(),
        };
        self.inner.state.send_replace(transition.clone());
        // Nobody listening is fine.
        let _ = self.inner.events.send(transition);
    }
}
