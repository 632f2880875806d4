// src/sync.rs

use crate::api::{ApiError, PanelApi};
use crate::models::TaskStatus;
use crate::poller::ProgressPoller;
use crate::view::SharedView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Work other components can hand to the status sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    /// Re-read the status and repaint the status area only.
    RefreshStatus,
}

/// Slow, always-on status synchronization.
///
/// Owns the activity rule: it is the only place that decides whether the
/// progress poller should be running.
pub struct StatusSync<A> {
    api: Arc<A>,
    view: SharedView,
    poller: ProgressPoller<A>,
    initial_delay: Duration,
    status_interval: Duration,
}

impl<A: PanelApi> StatusSync<A> {
    pub fn new(
        api: Arc<A>,
        view: SharedView,
        poller: ProgressPoller<A>,
        initial_delay: Duration,
        status_interval: Duration,
    ) -> Self {
        Self {
            api,
            view,
            poller,
            initial_delay,
            status_interval,
        }
    }

    /// Full load: repaints config controls and status, then applies the
    /// activity rule. On failure nothing is repainted.
    pub async fn initial_load(&self) -> Result<(), ApiError> {
        let snapshot = self.api.fetch_status().await?;
        self.view.send_modify(|view| view.apply_full(&snapshot));
        self.apply_activity_rule(&snapshot.task_status).await;
        Ok(())
    }

    /// Status-only refresh: config in the payload is not rendered.
    pub async fn refresh_status(&self) -> Result<(), ApiError> {
        let snapshot = self.api.fetch_status().await?;
        self.view.send_modify(|view| view.apply_status(&snapshot));
        self.apply_activity_rule(&snapshot.task_status).await;
        Ok(())
    }

    /// Starts the poller for an active task, stops it otherwise.
    pub async fn apply_activity_rule(&self, status: &TaskStatus) {
        let active = self.poller.is_active().await;
        if status.is_downloading() {
            if !active {
                info!("task is downloading, starting progress poller");
                self.poller.start().await;
            }
        } else if active {
            info!(status = %status, "task no longer downloading, stopping progress poller");
            self.poller.stop().await;
        }
    }

    /// Drives the initial load, the periodic refresh, and refresh requests
    /// until `shutdown` fires.
    pub async fn run(
        self,
        mut requests: mpsc::UnboundedReceiver<SyncRequest>,
        shutdown: CancellationToken,
    ) {
        let initial = tokio::time::sleep(self.initial_delay);
        tokio::pin!(initial);
        let mut initial_done = false;

        let period = self.status_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("status sync running");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = &mut initial, if !initial_done => {
                    initial_done = true;
                    if let Err(e) = self.initial_load().await {
                        warn!("initial status load failed, will retry on next refresh: {}", e);
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_status().await {
                        warn!("status refresh failed, will retry: {}", e);
                    }
                }
                Some(request) = requests.recv() => match request {
                    SyncRequest::RefreshStatus => {
                        if let Err(e) = self.refresh_status().await {
                            warn!("requested status refresh failed: {}", e);
                        }
                    }
                },
            }
        }

        self.poller.stop().await;
        debug!("status sync stopped");
    }
}
