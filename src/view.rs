// src/view.rs

//! Pure projections from service snapshots into the panel's view state.
//!
//! The view is split the same way the panel is: a config form that only a
//! full snapshot may overwrite, a status panel that every snapshot repaints,
//! and a progress panel fed by the progress loop. None of these functions
//! perform I/O, and applying the same snapshot twice yields the same state.

use crate::models::{
    ConfigUpdate, PlanType, ProgressPhase, ProgressSnapshot, StatusSnapshot, TaskStatus,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

const PLACEHOLDER: &str = "-";

/// Visual emphasis of a label, button, or bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Plain,
    Primary,
    Success,
    Danger,
    Warning,
    Secondary,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Plain => "plain",
            Tone::Primary => "primary",
            Tone::Success => "success",
            Tone::Danger => "danger",
            Tone::Warning => "warning",
            Tone::Secondary => "secondary",
        }
    }

    /// Tone of the task status label. Only the three known states are styled.
    pub fn for_task_status(status: &TaskStatus) -> Self {
        match status {
            TaskStatus::Downloading => Tone::Primary,
            TaskStatus::Failed => Tone::Danger,
            TaskStatus::Idle => Tone::Success,
            TaskStatus::Other(_) => Tone::Plain,
        }
    }

    /// Tone of the progress bar for a given phase.
    pub fn for_progress(phase: ProgressPhase) -> Self {
        match phase {
            ProgressPhase::Failed => Tone::Danger,
            ProgressPhase::Complete => Tone::Success,
            ProgressPhase::Stopped => Tone::Warning,
            ProgressPhase::Running | ProgressPhase::Idle => Tone::Plain,
        }
    }

    fn for_flag(enabled: bool) -> Self {
        if enabled {
            Tone::Success
        } else {
            Tone::Danger
        }
    }
}

/// A piece of text and how it is emphasised.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Label {
    pub text: String,
    pub tone: Tone,
}

impl Label {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn flag(enabled: bool) -> Self {
        Self::new(if enabled { "enabled" } else { "disabled" }, Tone::for_flag(enabled))
    }
}

/// The editable scheduler configuration controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigForm {
    pub url: String,
    pub plan_type: PlanType,
    pub interval_minutes: u32,
    pub hour: u32,
    pub minute: u32,
    pub speed_kb: u64,
    pub dir: String,
    pub limit_mb: u64,
    pub interval_visible: bool,
    pub daily_visible: bool,
}

impl Default for ConfigForm {
    fn default() -> Self {
        Self::project(&StatusSnapshot::default())
    }
}

impl ConfigForm {
    pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;
    pub const DEFAULT_LIMIT_MB: u64 = 100;

    pub fn project(snapshot: &StatusSnapshot) -> Self {
        let c = &snapshot.config;
        let mut form = Self {
            url: c.url.clone().unwrap_or_default(),
            plan_type: c.plan_type.unwrap_or_default(),
            interval_minutes: c.interval_minutes.unwrap_or(Self::DEFAULT_INTERVAL_MINUTES),
            hour: c.hour.unwrap_or(0),
            minute: c.minute.unwrap_or(0),
            speed_kb: c.speed_kb.unwrap_or(0),
            dir: c.dir.clone().unwrap_or_default(),
            limit_mb: c.limit_mb.unwrap_or(Self::DEFAULT_LIMIT_MB),
            interval_visible: true,
            daily_visible: false,
        };
        form.select_plan_type(form.plan_type);
        form
    }

    /// Switches the plan selector and re-derives which controls are shown.
    pub fn select_plan_type(&mut self, plan_type: PlanType) {
        self.plan_type = plan_type;
        self.daily_visible = plan_type == PlanType::Daily;
        self.interval_visible = !self.daily_visible;
    }

    /// The payload a save of the current form would send.
    pub fn to_update(&self) -> ConfigUpdate {
        ConfigUpdate {
            url: self.url.clone(),
            plan_type: self.plan_type,
            interval_minutes: self.interval_minutes,
            hour: self.hour,
            minute: self.minute,
            speed_kb: self.speed_kb,
            dir: self.dir.clone(),
            limit_mb: self.limit_mb,
        }
    }
}

/// Read-only status area, including both toggle buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusPanel {
    pub task_status: Label,
    pub task_enabled: Label,
    pub schedule: String,
    pub dir: String,
    pub limit_enabled: Label,
    pub limit: String,
    pub today: String,
    pub month: String,
    pub last_download: String,
    pub last_file: String,
    pub message: String,
    pub task_button: Label,
    pub limit_button: Label,
}

impl StatusPanel {
    pub fn project(snapshot: &StatusSnapshot) -> Self {
        let c = &snapshot.config;
        let s = &snapshot.stats;

        let status_text = match snapshot.task_status.label() {
            "" => PLACEHOLDER,
            label => label,
        };

        Self {
            task_status: Label::new(status_text, Tone::for_task_status(&snapshot.task_status)),
            task_enabled: Label::flag(snapshot.task_enabled),
            schedule: schedule_text(snapshot),
            dir: or_placeholder(c.dir.as_deref()),
            limit_enabled: Label::flag(c.daily_limit_enabled),
            limit: format!("{} MB", c.limit_mb.unwrap_or(0)),
            today: format!("{} MB", s.daily_downloaded_mb),
            month: format!("{} MB", s.monthly_downloaded_mb),
            last_download: or_placeholder(s.last_download.as_deref()),
            last_file: or_placeholder(s.last_file.as_deref()),
            message: or_placeholder(s.message.as_deref()),
            task_button: task_button(snapshot.task_enabled),
            limit_button: limit_button(c.daily_limit_enabled),
        }
    }
}

fn or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Human-readable description of the configured plan.
pub fn schedule_text(snapshot: &StatusSnapshot) -> String {
    let c = &snapshot.config;
    match c.plan_type.unwrap_or_default() {
        PlanType::Daily => format!(
            "every day at {:02}:{:02}",
            c.hour.unwrap_or(0),
            c.minute.unwrap_or(0)
        ),
        PlanType::Interval => format!(
            "every {} minutes",
            c.interval_minutes.unwrap_or(ConfigForm::DEFAULT_INTERVAL_MINUTES)
        ),
    }
}

fn task_button(enabled: bool) -> Label {
    if enabled {
        Label::new("Pause automatic task", Tone::Danger)
    } else {
        Label::new("Enable automatic task", Tone::Success)
    }
}

fn limit_button(enabled: bool) -> Label {
    if enabled {
        Label::new("Disable daily limit", Tone::Secondary)
    } else {
        Label::new("Enable daily limit", Tone::Warning)
    }
}

/// Progress readout of the download in flight.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressPanel {
    pub percent: String,
    pub speed: String,
    pub size: String,
    /// Fill width of the bar, in percent.
    pub bar_width: u32,
    pub bar_tone: Tone,
}

impl ProgressPanel {
    pub fn project(snapshot: &ProgressSnapshot) -> Self {
        Self {
            percent: format!("{}%", snapshot.percent),
            speed: format!("{} KB/s", snapshot.speed),
            size: format_size_kb(snapshot.size),
            bar_width: snapshot.percent,
            bar_tone: Tone::for_progress(snapshot.phase()),
        }
    }
}

/// Formats a size given in KB: KB below one MB, MB with one decimal above.
pub fn format_size_kb(size_kb: u64) -> String {
    match size_kb {
        0 => PLACEHOLDER.to_string(),
        kb if kb < 1024 => format!("{} KB", kb),
        kb => format!("{:.1} MB", kb as f64 / 1024.0),
    }
}

/// Everything the panel shows, minus the notice slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub form: ConfigForm,
    pub status: StatusPanel,
    pub progress: ProgressPanel,
}

impl ViewState {
    /// Repaints config controls and the status area.
    pub fn apply_full(&mut self, snapshot: &StatusSnapshot) {
        self.form = ConfigForm::project(snapshot);
        self.apply_status(snapshot);
    }

    /// Repaints the status area only; config controls keep their values.
    pub fn apply_status(&mut self, snapshot: &StatusSnapshot) {
        self.status = StatusPanel::project(snapshot);
    }

    pub fn apply_progress(&mut self, snapshot: &ProgressSnapshot) {
        self.progress = ProgressPanel::project(snapshot);
    }
}

/// The session's view, shared by every component that repaints it.
/// Subscribers are woken on each projection.
pub type SharedView = Arc<watch::Sender<ViewState>>;

pub fn shared_view() -> SharedView {
    let (tx, _) = watch::channel(ViewState::default());
    Arc::new(tx)
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.status;
        writeln!(
            f,
            "status    {} [{}]",
            s.task_status.text,
            s.task_status.tone.as_str()
        )?;
        writeln!(f, "task      {} ({})", s.task_enabled.text, s.schedule)?;
        writeln!(
            f,
            "limit     {} {} (today {}, month {})",
            s.limit_enabled.text, s.limit, s.today, s.month
        )?;
        writeln!(f, "dir       {}", s.dir)?;
        writeln!(f, "last      {} {}", s.last_download, s.last_file)?;
        writeln!(f, "message   {}", s.message)?;

        let p = &self.progress;
        if !p.percent.is_empty() {
            writeln!(
                f,
                "progress  {} {} {} [{}]",
                p.percent,
                p.speed,
                p.size,
                p.bar_tone.as_str()
            )?;
        }
        Ok(())
    }
}
