// src/settings.rs

use std::time::Duration;

/// Cadences and delays that drive the session's timers.
#[derive(Debug, Clone)]
pub struct Timings {
    /// Delay between session start and the first full load.
    pub initial_delay: Duration,
    /// Cadence of the status-only refresh.
    pub status_interval: Duration,
    /// Cadence of the progress loop while a task is active.
    pub progress_interval: Duration,
    /// Wait after a terminal progress state before re-reading the status.
    pub settle_delay: Duration,
    pub notice_enter: Duration,
    pub notice_exit: Duration,
    /// Gap between one notice's exit and the next one's entry.
    pub notice_settle: Duration,
    /// How long a notice stays up before hiding itself.
    pub notice_dwell: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            status_interval: Duration::from_secs(5),
            progress_interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(1500),
            notice_enter: Duration::from_millis(300),
            notice_exit: Duration::from_millis(300),
            notice_settle: Duration::from_millis(100),
            notice_dwell: Duration::from_millis(4000),
        }
    }
}

/// Everything needed to open a panel session against a service.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub timings: Timings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            timings: Timings::default(),
        }
    }
}
