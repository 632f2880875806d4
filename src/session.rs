// src/session.rs

use crate::api::{ApiError, HttpPanelApi, PanelApi};
use crate::dispatch::Dispatcher;
use crate::notice::NoticeQueue;
use crate::poller::ProgressPoller;
use crate::settings::{Settings, Timings};
use crate::sync::{StatusSync, SyncRequest};
use crate::view::{shared_view, SharedView, ViewState};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("status sync task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One panel session: the view, its notice slot, both polling loops, and
/// the action dispatcher, all torn down together.
pub struct Session<A> {
    view: SharedView,
    notices: NoticeQueue,
    poller: ProgressPoller<A>,
    dispatcher: Dispatcher<A>,
    requests: mpsc::UnboundedSender<SyncRequest>,
    pending_sync: Option<(StatusSync<A>, mpsc::UnboundedReceiver<SyncRequest>)>,
    sync_handle: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl Session<HttpPanelApi> {
    /// Builds a session talking to the service at `settings.base_url`.
    pub fn connect(settings: &Settings) -> Result<Self, SessionError> {
        let api = HttpPanelApi::new(settings)?;
        Ok(Self::new(Arc::new(api), &settings.timings))
    }
}

impl<A: PanelApi> Session<A> {
    /// Wires up all components. Nothing polls until [`Session::start`].
    pub fn new(api: Arc<A>, timings: &Timings) -> Self {
        let shutdown = CancellationToken::new();
        let view = shared_view();
        let (requests, requests_rx) = mpsc::unbounded_channel();

        let notices = NoticeQueue::new(timings, shutdown.clone());
        let poller = ProgressPoller::new(
            Arc::clone(&api),
            Arc::clone(&view),
            timings.progress_interval,
            timings.settle_delay,
            requests.clone(),
            shutdown.clone(),
        );
        let sync = StatusSync::new(
            Arc::clone(&api),
            Arc::clone(&view),
            poller.clone(),
            timings.initial_delay,
            timings.status_interval,
        );
        let dispatcher = Dispatcher::new(api, Arc::clone(&view), poller.clone(), notices.clone());

        Self {
            view,
            notices,
            poller,
            dispatcher,
            requests,
            pending_sync: Some((sync, requests_rx)),
            sync_handle: None,
            shutdown,
        }
    }

    /// Starts the status sync loop: initial load after its delay, then
    /// periodic refreshes. Calling it again has no effect.
    pub fn start(&mut self) {
        if let Some((sync, requests_rx)) = self.pending_sync.take() {
            info!("panel session started");
            let shutdown = self.shutdown.clone();
            self.sync_handle = Some(tokio::spawn(sync.run(requests_rx, shutdown)));
        }
    }

    /// Asks the running status sync for a status-only refresh.
    pub fn request_refresh(&self) {
        let _ = self.requests.send(SyncRequest::RefreshStatus);
    }

    pub fn dispatcher(&self) -> &Dispatcher<A> {
        &self.dispatcher
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn poller(&self) -> &ProgressPoller<A> {
        &self.poller
    }

    /// Subscribes to view changes.
    pub fn watch_view(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// A copy of the current view.
    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    /// Cancels every loop and pending timer and waits for the sync loop.
    pub async fn shutdown(mut self) -> Result<(), SessionError> {
        self.shutdown.cancel();
        if let Some(handle) = self.sync_handle.take() {
            handle.await?;
        }
        self.poller.stop().await;
        info!("panel session closed");
        Ok(())
    }
}

impl<A> Drop for Session<A> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
