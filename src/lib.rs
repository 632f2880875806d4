pub mod api;
pub mod dispatch;
pub mod models;
pub mod notice;
pub mod poller;
pub mod session;
pub mod settings;
pub mod sync;
pub mod view;

/// Convenient type alias exposing common structs.
pub mod prelude {
    pub use crate::api::{Action, ApiError, HttpPanelApi, PanelApi};
    pub use crate::dispatch::Dispatcher;
    pub use crate::models::{
        ConfigUpdate, Notice, PlanType, ProgressSnapshot, Severity, StatusSnapshot, TaskStatus,
    };
    pub use crate::notice::{NoticePhase, NoticeQueue, NoticeTransition};
    pub use crate::poller::ProgressPoller;
    pub use crate::session::{Session, SessionError};
    pub use crate::settings::{Settings, Timings};
    pub use crate::sync::{StatusSync, SyncRequest};
    pub use crate::view::{Tone, ViewState};
}
