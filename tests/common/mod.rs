//! Shared in-memory stand-in for the cycler service.

#![allow(dead_code)]

use async_trait::async_trait;
use cycler_panel::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// What every write operation answers with.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Ok(StatusSnapshot),
    Reject(Option<StatusSnapshot>),
}

/// One scripted answer to a progress fetch.
enum ProgressReply {
    Snapshot(ProgressSnapshot),
    /// A raw response body, decoded the way the HTTP client decodes it.
    Body(String),
    Fail,
}

pub struct FakeApi {
    status: Mutex<Option<StatusSnapshot>>,
    progress: Mutex<VecDeque<ProgressReply>>,
    write: Mutex<WriteOutcome>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(Some(StatusSnapshot::default())),
            progress: Mutex::new(VecDeque::new()),
            write: Mutex::new(WriteOutcome::Ok(StatusSnapshot::default())),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Answer status reads with `snapshot` from now on.
    pub fn set_status(&self, snapshot: StatusSnapshot) {
        *self.status.lock().expect("status mutex") = Some(snapshot);
    }

    /// Fail every status read from now on.
    pub fn fail_status(&self) {
        *self.status.lock().expect("status mutex") = None;
    }

    /// Queue one progress answer; `None` is a failed fetch. Once the queue
    /// runs dry the download reports itself as still running.
    pub fn push_progress(&self, progress: Option<ProgressSnapshot>) {
        let reply = match progress {
            Some(snapshot) => ProgressReply::Snapshot(snapshot),
            None => ProgressReply::Fail,
        };
        self.progress.lock().expect("progress mutex").push_back(reply);
    }

    /// Queue one progress answer as the JSON body the service would send.
    pub fn push_progress_body(&self, body: &str) {
        self.progress
            .lock()
            .expect("progress mutex")
            .push_back(ProgressReply::Body(body.to_string()));
    }

    pub fn set_write(&self, outcome: WriteOutcome) {
        *self.write.lock().expect("write mutex") = outcome;
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .expect("calls mutex")
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, name: &'static str) {
        *self.calls.lock().expect("calls mutex").entry(name).or_insert(0) += 1;
    }

    fn write_result(&self) -> Result<StatusSnapshot, ApiError> {
        match self.write.lock().expect("write mutex").clone() {
            WriteOutcome::Ok(snapshot) => Ok(snapshot),
            WriteOutcome::Reject(snapshot) => Err(ApiError::Rejected {
                status: 500,
                message: Some("rejected by fake".into()),
                snapshot: snapshot.map(Box::new),
            }),
        }
    }
}

fn unavailable() -> ApiError {
    ApiError::Rejected {
        status: 503,
        message: Some("unavailable".into()),
        snapshot: None,
    }
}

pub fn running(percent: u32) -> ProgressSnapshot {
    ProgressSnapshot {
        percent,
        speed: 512,
        size: 2048,
        status: "downloading".into(),
    }
}

#[async_trait]
impl PanelApi for FakeApi {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ApiError> {
        self.record("status");
        self.status.lock().expect("status mutex").clone().ok_or_else(unavailable)
    }

    async fn fetch_progress(&self) -> Result<ProgressSnapshot, ApiError> {
        self.record("progress");
        match self.progress.lock().expect("progress mutex").pop_front() {
            Some(ProgressReply::Snapshot(progress)) => Ok(progress),
            Some(ProgressReply::Body(body)) => Ok(serde_json::from_str(&body)?),
            Some(ProgressReply::Fail) => Err(unavailable()),
            None => Ok(running(50)),
        }
    }

    async fn post_action(&self, action: Action) -> Result<StatusSnapshot, ApiError> {
        self.record(action.path());
        self.write_result()
    }

    async fn save_config(&self, _update: &ConfigUpdate) -> Result<StatusSnapshot, ApiError> {
        self.record("/api/set");
        self.write_result()
    }
}
