// src/models.rs

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How the remote scheduler plans its automatic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlanType {
    /// Run every `interval_minutes`.
    #[default]
    Interval,
    /// Run once a day at `hour:minute`.
    Daily,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Interval => "interval",
            PlanType::Daily => "daily",
        }
    }
}

impl From<String> for PlanType {
    fn from(value: String) -> Self {
        // Anything that is not explicitly "daily" is an interval plan.
        if value.trim().eq_ignore_ascii_case("daily") {
            PlanType::Daily
        } else {
            PlanType::Interval
        }
    }
}

impl From<PlanType> for String {
    fn from(value: PlanType) -> Self {
        value.as_str().to_string()
    }
}

/// The coarse state of the remote download task.
///
/// The service reports this as a free string. Known labels are accepted in
/// both English and the service's native form; anything else is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Idle,
    Downloading,
    Failed,
    Other(String),
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Other(String::new())
    }
}

impl TaskStatus {
    pub fn label(&self) -> &str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(label) => label,
        }
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self, TaskStatus::Downloading)
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.trim() {
            "idle" | "空闲" => TaskStatus::Idle,
            "downloading" | "下载中" => TaskStatus::Downloading,
            "failed" | "失败" => TaskStatus::Failed,
            _ => TaskStatus::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reads an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Scheduler configuration as echoed by the service.
///
/// Every field is optional on the wire so that a partial payload degrades
/// to the renderer's defaults instead of failing the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub url: Option<String>,
    pub plan_type: Option<PlanType>,
    pub interval_minutes: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub speed_kb: Option<u64>,
    pub dir: Option<String>,
    pub limit_mb: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub daily_limit_enabled: bool,
}

/// Download counters and the outcome of the last run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub daily_downloaded_mb: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub monthly_downloaded_mb: u64,
    /// Timestamp of the last finished download, formatted by the service.
    pub last_download: Option<String>,
    pub last_file: Option<String>,
    pub message: Option<String>,
}

/// The authoritative state of the service at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub config: ConfigSnapshot,
    #[serde(deserialize_with = "null_as_default")]
    pub stats: StatsSnapshot,
    #[serde(deserialize_with = "null_as_default")]
    pub task_enabled: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub task_status: TaskStatus,
}

/// Where an in-flight download stands, derived from the free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Running,
    Complete,
    Failed,
    Stopped,
    Idle,
}

impl ProgressPhase {
    /// Classifies a progress status text. Failure wins over completion,
    /// completion over a stop, mirroring the order the service's labels
    /// are checked in.
    pub fn classify(status: &str) -> Self {
        let lower = status.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["failed", "error", "失败", "错误"]) {
            ProgressPhase::Failed
        } else if has(&["complete", "完成"]) {
            ProgressPhase::Complete
        } else if has(&["stopped", "停止"]) {
            ProgressPhase::Stopped
        } else if matches!(lower.trim(), "idle" | "空闲") {
            ProgressPhase::Idle
        } else {
            ProgressPhase::Running
        }
    }
}

/// Status labels that end a progress polling session.
pub const TERMINAL_PROGRESS_LABELS: &[&str] = &[
    "download-complete",
    "download-failed",
    "manually-stopped",
    "idle",
    "下载完成",
    "下载失败",
    "已手动停止",
    "空闲",
];

/// Ephemeral progress of the download currently in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSnapshot {
    /// 0..=100, not guaranteed to be monotonic.
    #[serde(deserialize_with = "null_as_default")]
    pub percent: u32,
    /// KB/s
    #[serde(deserialize_with = "null_as_default")]
    pub speed: u64,
    /// KB
    #[serde(deserialize_with = "null_as_default")]
    pub size: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

impl ProgressSnapshot {
    pub fn phase(&self) -> ProgressPhase {
        ProgressPhase::classify(&self.status)
    }

    /// True once this snapshot should end the progress loop.
    pub fn is_terminal(&self) -> bool {
        self.percent >= 100 || TERMINAL_PROGRESS_LABELS.contains(&self.status.trim())
    }
}

/// Severity of an operator notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub text: String,
    pub severity: Severity,
}

impl Notice {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }
}

/// Form payload sent when the operator saves the scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigUpdate {
    pub url: String,
    pub plan_type: PlanType,
    pub interval_minutes: u32,
    pub hour: u32,
    pub minute: u32,
    /// Sent as `speed`, the name the service reads it under.
    #[serde(rename = "speed")]
    pub speed_kb: u64,
    pub dir: String,
    pub limit_mb: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_status_payload() {
        let raw = r#"{
            "config": {
                "url": "http://mirror/file.bin",
                "plan_type": "daily",
                "interval_minutes": 30,
                "hour": 3,
                "minute": 30,
                "speed_kb": 512,
                "dir": "tmp",
                "limit_mb": 1024,
                "task_enabled": true,
                "daily_limit_enabled": false
            },
            "stats": {
                "last_download": "2024-05-01 03:30:00",
                "last_file": "tmp/file_1714534200",
                "message": "ok",
                "daily_downloaded_mb": 12,
                "monthly_downloaded_mb": 340
            },
            "task_enabled": true,
            "task_status": "空闲"
        }"#;

        let snap: StatusSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.config.plan_type, Some(PlanType::Daily));
        assert_eq!(snap.config.hour, Some(3));
        assert_eq!(snap.config.speed_kb, Some(512));
        assert_eq!(snap.stats.monthly_downloaded_mb, 340);
        assert_eq!(snap.task_status, TaskStatus::Idle);
        assert!(snap.task_enabled);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let snap: StatusSnapshot =
            serde_json::from_str(r#"{"task_status":"downloading"}"#).unwrap();
        assert_eq!(snap.config, ConfigSnapshot::default());
        assert!(snap.task_status.is_downloading());
        assert!(!snap.task_enabled);

        let empty: StatusSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.task_status.label(), "");
    }

    #[test]
    fn nulls_read_as_missing_fields() {
        let snap: StatusSnapshot = serde_json::from_str(
            r#"{
                "config": null,
                "stats": {"daily_downloaded_mb": null, "monthly_downloaded_mb": 7},
                "task_enabled": null,
                "task_status": null
            }"#,
        )
        .unwrap();
        assert_eq!(snap.config, ConfigSnapshot::default());
        assert_eq!(snap.stats.daily_downloaded_mb, 0);
        assert_eq!(snap.stats.monthly_downloaded_mb, 7);
        assert!(!snap.task_enabled);
        assert_eq!(snap.task_status, TaskStatus::default());

        let stats: StatusSnapshot =
            serde_json::from_str(r#"{"stats": null, "config": {"daily_limit_enabled": null}}"#)
                .unwrap();
        assert_eq!(stats.stats, StatsSnapshot::default());
        assert!(!stats.config.daily_limit_enabled);

        let progress: ProgressSnapshot = serde_json::from_str(
            r#"{"percent": 42, "speed": null, "size": null, "status": null}"#,
        )
        .unwrap();
        assert_eq!(progress.percent, 42);
        assert_eq!(progress.speed, 0);
        assert_eq!(progress.size, 0);
        assert_eq!(progress.status, "");
        assert!(!progress.is_terminal());
    }

    #[test]
    fn unknown_labels_are_kept_verbatim() {
        let status = TaskStatus::from("paused-by-operator".to_string());
        assert_eq!(status, TaskStatus::Other("paused-by-operator".into()));
        assert_eq!(PlanType::from("weekly".to_string()), PlanType::Interval);
    }

    #[test]
    fn classifies_progress_text() {
        assert_eq!(ProgressPhase::classify("download-failed"), ProgressPhase::Failed);
        assert_eq!(ProgressPhase::classify("下载失败: timeout"), ProgressPhase::Failed);
        assert_eq!(ProgressPhase::classify("network error"), ProgressPhase::Failed);
        assert_eq!(ProgressPhase::classify("download-complete"), ProgressPhase::Complete);
        assert_eq!(ProgressPhase::classify("manually-stopped"), ProgressPhase::Stopped);
        assert_eq!(ProgressPhase::classify("idle"), ProgressPhase::Idle);
        assert_eq!(ProgressPhase::classify("downloading"), ProgressPhase::Running);
    }

    #[test]
    fn terminal_detection() {
        let mut p = ProgressSnapshot {
            percent: 42,
            status: "downloading".into(),
            ..Default::default()
        };
        assert!(!p.is_terminal());

        p.status = "manually-stopped".into();
        assert!(p.is_terminal());

        p.status = "downloading".into();
        p.percent = 100;
        assert!(p.is_terminal());

        // A failure with detail is colored as failed but is not a terminal label.
        let detailed = ProgressSnapshot {
            percent: 10,
            status: "下载失败: EOF".into(),
            ..Default::default()
        };
        assert_eq!(detailed.phase(), ProgressPhase::Failed);
        assert!(!detailed.is_terminal());
    }

    #[test]
    fn config_update_uses_service_field_names() {
        let update = ConfigUpdate {
            url: "http://x".into(),
            plan_type: PlanType::Daily,
            interval_minutes: 60,
            hour: 3,
            minute: 0,
            speed_kb: 100,
            dir: "tmp".into(),
            limit_mb: 1024,
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["plan_type"], "daily");
        assert_eq!(value["speed"], 100);
        assert!(value.get("speed_kb").is_none());
    }
}
