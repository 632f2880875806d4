// src/dispatch.rs

use crate::api::{Action, ApiError, PanelApi};
use crate::models::{ConfigUpdate, Severity, StatusSnapshot};
use crate::notice::NoticeQueue;
use crate::poller::ProgressPoller;
use crate::view::SharedView;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs operator-triggered writes against the service and reports the
/// outcome through the view and the notice queue. Writes are never retried.
pub struct Dispatcher<A> {
    api: Arc<A>,
    view: SharedView,
    poller: ProgressPoller<A>,
    notices: NoticeQueue,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            view: Arc::clone(&self.view),
            poller: self.poller.clone(),
            notices: self.notices.clone(),
        }
    }
}

impl<A: PanelApi> Dispatcher<A> {
    pub fn new(
        api: Arc<A>,
        view: SharedView,
        poller: ProgressPoller<A>,
        notices: NoticeQueue,
    ) -> Self {
        Self {
            api,
            view,
            poller,
            notices,
        }
    }

    /// Starts a download now. On success the progress poller is started
    /// right away rather than waiting for the next status refresh.
    pub async fn start_download(&self) -> Result<StatusSnapshot, ApiError> {
        self.dispatch(Action::StartDownload).await
    }

    pub async fn stop_download(&self) -> Result<StatusSnapshot, ApiError> {
        self.dispatch(Action::StopDownload).await
    }

    pub async fn clean_cache(&self) -> Result<StatusSnapshot, ApiError> {
        self.dispatch(Action::CleanCache).await
    }

    pub async fn toggle_task(&self) -> Result<StatusSnapshot, ApiError> {
        self.dispatch(Action::ToggleTask).await
    }

    pub async fn toggle_limit(&self) -> Result<StatusSnapshot, ApiError> {
        self.dispatch(Action::ToggleLimit).await
    }

    /// Saves the scheduler configuration. The answer is rendered in full,
    /// config controls included.
    pub async fn save_config(&self, update: &ConfigUpdate) -> Result<StatusSnapshot, ApiError> {
        match self.api.save_config(update).await {
            Ok(snapshot) => {
                self.view.send_modify(|view| view.apply_full(&snapshot));
                info!("configuration saved");
                self.notices.show("Configuration saved", Severity::Success).await;
                Ok(snapshot)
            }
            Err(e) => {
                warn!("saving configuration failed: {}", e);
                self.notices
                    .show("Failed to save configuration", Severity::Error)
                    .await;
                Err(e)
            }
        }
    }

    async fn dispatch(&self, action: Action) -> Result<StatusSnapshot, ApiError> {
        match self.api.post_action(action).await {
            Ok(snapshot) => {
                // Toggle answers carry the flipped flags; the status area owns
                // both toggle buttons, so a status repaint is enough.
                self.view.send_modify(|view| view.apply_status(&snapshot));
                if action == Action::StartDownload {
                    self.poller.start().await;
                }

                info!(%action, "action succeeded");
                let (text, severity) = success_notice(action, &snapshot);
                self.notices.show(text, severity).await;
                Ok(snapshot)
            }
            Err(e) => {
                warn!(%action, "action failed: {}", e);
                // The service may have changed state before failing a start.
                if action == Action::StartDownload {
                    if let Some(snapshot) = e.snapshot() {
                        self.view.send_modify(|view| view.apply_status(snapshot));
                    }
                }
                self.notices.show(failure_text(action), Severity::Error).await;
                Err(e)
            }
        }
    }
}

fn success_notice(action: Action, snapshot: &StatusSnapshot) -> (&'static str, Severity) {
    match action {
        Action::StartDownload => ("Download task started", Severity::Success),
        Action::StopDownload => ("Stop signal sent", Severity::Warning),
        Action::CleanCache => ("Cache cleanup started", Severity::Success),
        Action::ToggleTask if snapshot.task_enabled => {
            ("Automatic task enabled", Severity::Success)
        }
        Action::ToggleTask => ("Automatic task paused", Severity::Success),
        Action::ToggleLimit if snapshot.config.daily_limit_enabled => {
            ("Daily limit enabled", Severity::Success)
        }
        Action::ToggleLimit => ("Daily limit disabled", Severity::Success),
    }
}

fn failure_text(action: Action) -> &'static str {
    match action {
        Action::StartDownload => "Failed to start download",
        Action::StopDownload => "Failed to stop download",
        Action::CleanCache => "Failed to clean cache",
        Action::ToggleTask => "Failed to toggle automatic task",
        Action::ToggleLimit => "Failed to toggle daily limit",
    }
}
