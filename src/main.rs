//! # Salah & Tea Desktop Host
//!
//! This binary plays the part of the watch host on a desktop: it loads the
//! schedule resource, keeps the persistent store and the wakeup registry in JSON
//! files between runs, and drives the app's run loop. Each invocation is one
//! "launch" of the watch app.
//!
//! Usage:
//!   salah-tea [--stdout] [--config PATH] [--select ROW] [--cancel] [--watch] [--frame PATH]

// Test modules
#[cfg(test)]
mod tests;

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use salah_tea_lib::app::{AppController, Screen};
use salah_tea_lib::config::Config;
use salah_tea_lib::renderer::{draw_ascii, draw_screen, FrameBuffer, ScreenView};
use salah_tea_lib::schedule::ScheduleTable;
use salah_tea_lib::store::{JsonFileStore, PersistentStore};
use salah_tea_lib::wakeup::SimulatedWakeups;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Accepted for compatibility; terminal output is always on
    pub stdout: bool,
    pub config: Option<PathBuf>,
    /// Menu row to select after launch
    pub select: Option<usize>,
    pub cancel: bool,
    /// Keep running and tick the countdown until it ends
    pub watch: bool,
    /// Write the final screen as a PBM image
    pub frame: Option<PathBuf>,
}

impl Options {
    pub fn parse<I>(args: I) -> anyhow::Result<Options>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Options::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--stdout" => options.stdout = true,
                "--cancel" => options.cancel = true,
                "--watch" => options.watch = true,
                "--config" => options.config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--frame" => options.frame = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--select" => {
                    let row = value(&mut args, &arg)?;
                    options.select = Some(
                        row.parse()
                            .with_context(|| format!("--select expects a row number, got {row:?}"))?,
                    );
                }
                other => bail!("unknown argument {other:?}"),
            }
        }
        Ok(options)
    }
}

fn value<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{flag} requires a value"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Tick the countdown once per period until it fires or the user leaves.
///
/// Ctrl-C acts as the back button: the alarm stays scheduled.
async fn watch<S>(
    app: &mut AppController<S, SimulatedWakeups>,
    period: Duration,
) -> anyhow::Result<()>
where
    S: PersistentStore,
{
    // First tick completes immediately
    let mut interval = tokio::time::interval(period);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now();
                for event in app.registry_mut().fire_due(now) {
                    app.on_wakeup_fired(event);
                }
                if app.screen() != Screen::Countdown {
                    return Ok(());
                }
                if let Some(remaining) = app.tick(now) {
                    println!("{remaining} seconds");
                }
            }
            result = &mut ctrl_c => {
                result.context("listening for Ctrl-C")?;
                app.back();
                return Ok(());
            }
        }
    }
}

/// Tick the countdown on a single-threaded runtime until it ends.
fn run_watch<S>(
    app: &mut AppController<S, SimulatedWakeups>,
    tick_millis: u64,
) -> anyhow::Result<()>
where
    S: PersistentStore,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()?;
    runtime.block_on(watch(app, Duration::from_millis(tick_millis)))
}

/// One launch of the app: apply the requested intents, persist the host
/// state and render the final screen.
pub fn run(options: &Options) -> anyhow::Result<()> {
    let config = match &options.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    let table = ScheduleTable::load(&config.schedule.table_path).with_context(|| {
        format!(
            "loading schedule table {}",
            config.schedule.table_path.display()
        )
    })?;
    let store = JsonFileStore::open(&config.storage.store_path);
    let mut wakeups = SimulatedWakeups::load(&config.storage.wakeups_path)
        .context("loading wakeup registry")?;
    wakeups.boot(Utc::now());

    let mut app = AppController::launch(
        table,
        config.teas.clone(),
        store,
        wakeups,
        Local::now().naive_local(),
    )
    .context("resolving today's schedule")?;

    if let Some(row) = options.select {
        if let Err(err) = app.select_row(row, Utc::now()) {
            warn!(row, %err, "tea not scheduled");
        }
    }
    if options.cancel {
        app.cancel_countdown();
    }

    let watched = if options.watch && app.screen() == Screen::Countdown {
        run_watch(&mut app, config.countdown.tick_millis)
    } else {
        app.tick(Utc::now());
        Ok(())
    };

    // The store is already on disk; the registry has to follow before any output
    app.registry()
        .save(&config.storage.wakeups_path)
        .context("saving wakeup registry")?;
    watched?;

    if app.take_haptic() {
        info!("vibrating: double pulse");
    }

    let view = ScreenView::capture(&app);
    draw_ascii(&view);

    if let Some(path) = &options.frame {
        let mut frame = FrameBuffer::watch();
        draw_screen(&view, &mut frame).unwrap_or_else(|never| match never {});
        fs::write(path, frame.to_pbm())
            .with_context(|| format!("writing frame {}", path.display()))?;
    }
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    init_tracing();
    let options = Options::parse(env::args().skip(1))?;
    run(&options)
}
