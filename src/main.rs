// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cycler_panel::prelude::*;
use cycler_panel::view::ConfigForm;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cycler-panel")]
#[command(about = "Operator panel for the cycler download scheduler")]
#[command(propagate_version = true, version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the cycler service
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout: u64,

    /// Log debug output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the service: status every few seconds, progress while downloading
    Watch {
        /// Seconds between status refreshes
        #[arg(long, default_value_t = 5)]
        status_interval: u64,
        /// Seconds between progress polls while a download runs
        #[arg(long, default_value_t = 1)]
        progress_interval: u64,
    },
    /// Start a download now
    Download,
    /// Stop the running download
    Stop,
    /// Clean the download cache
    Clean,
    /// Enable or pause the automatic task
    ToggleTask,
    /// Enable or disable the daily download limit
    ToggleLimit,
    /// Save the scheduler configuration; unset flags keep their current value
    Set(SetArgs),
}

#[derive(clap::Args)]
struct SetArgs {
    #[arg(long)]
    url: Option<String>,
    #[arg(long, value_enum)]
    plan: Option<PlanArg>,
    /// Minutes between runs of an interval plan
    #[arg(long)]
    interval: Option<u32>,
    #[arg(long)]
    hour: Option<u32>,
    #[arg(long)]
    minute: Option<u32>,
    /// Speed limit in KB/s, 0 for unlimited
    #[arg(long)]
    speed: Option<u64>,
    #[arg(long)]
    dir: Option<String>,
    /// Daily limit in MB
    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanArg {
    Interval,
    Daily,
}

impl From<PlanArg> for PlanType {
    fn from(value: PlanArg) -> Self {
        match value {
            PlanArg::Interval => PlanType::Interval,
            PlanArg::Daily => PlanType::Daily,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut settings = Settings {
        base_url: cli.base_url,
        request_timeout: Duration::from_secs(cli.timeout),
        ..Default::default()
    };

    match cli.command {
        Command::Watch {
            status_interval,
            progress_interval,
        } => {
            settings.timings.status_interval = Duration::from_secs(status_interval.max(1));
            settings.timings.progress_interval = Duration::from_secs(progress_interval.max(1));
            watch(&settings).await
        }
        Command::Download => one_shot(&settings, Action::StartDownload).await,
        Command::Stop => one_shot(&settings, Action::StopDownload).await,
        Command::Clean => one_shot(&settings, Action::CleanCache).await,
        Command::ToggleTask => one_shot(&settings, Action::ToggleTask).await,
        Command::ToggleLimit => one_shot(&settings, Action::ToggleLimit).await,
        Command::Set(args) => set_config(&settings, args).await,
    }
}

async fn one_shot(settings: &Settings, action: Action) -> Result<()> {
    let session = Session::connect(settings)?;
    let dispatcher = session.dispatcher();
    let result = match action {
        Action::StartDownload => dispatcher.start_download().await,
        Action::StopDownload => dispatcher.stop_download().await,
        Action::CleanCache => dispatcher.clean_cache().await,
        Action::ToggleTask => dispatcher.toggle_task().await,
        Action::ToggleLimit => dispatcher.toggle_limit().await,
    };
    report(&session);
    session.shutdown().await?;
    result
        .map(|_| ())
        .with_context(|| format!("{} was rejected by the service", action))
}

async fn set_config(settings: &Settings, args: SetArgs) -> Result<()> {
    let api = HttpPanelApi::new(settings)?;
    let current = api
        .fetch_status()
        .await
        .context("could not read the current configuration")?;

    let mut form = ConfigForm::project(&current);
    if let Some(url) = args.url {
        form.url = url;
    }
    if let Some(plan) = args.plan {
        form.select_plan_type(plan.into());
    }
    if let Some(interval) = args.interval {
        form.interval_minutes = interval;
    }
    if let Some(hour) = args.hour {
        form.hour = hour;
    }
    if let Some(minute) = args.minute {
        form.minute = minute;
    }
    if let Some(speed) = args.speed {
        form.speed_kb = speed;
    }
    if let Some(dir) = args.dir {
        form.dir = dir;
    }
    if let Some(limit) = args.limit {
        form.limit_mb = limit;
    }

    let session = Session::connect(settings)?;
    let result = session.dispatcher().save_config(&form.to_update()).await;
    report(&session);
    session.shutdown().await?;
    result.map(|_| ()).context("service rejected the configuration")
}

fn report(session: &Session<HttpPanelApi>) {
    if let Some(notice) = session.notices().current() {
        println!("[{:?}] {}", notice.severity, notice.text);
    }
    print!("{}", session.view());
}

async fn watch(settings: &Settings) -> Result<()> {
    let session = Session::connect(settings)?;
    follow(session, tokio::signal::ctrl_c()).await
}

/// Prints every repaint and every new notice until `stop` completes.
async fn follow<A: PanelApi, F: Future>(mut session: Session<A>, stop: F) -> Result<()> {
    let mut view_rx = session.watch_view();
    let mut notice_rx = session.notices().subscribe();
    session.start();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                println!("{}", view);
            }
            transition = notice_rx.recv() => match transition {
                Ok(t) if t.phase == NoticePhase::Entering => {
                    if let Some(notice) = t.notice {
                        println!("[{:?}] {}", notice.severity, notice.text);
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.shutdown().await?;
    Ok(())
}
