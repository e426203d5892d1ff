use clap::Parser;
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

use kpiboard::{
    cli::{Cli, OutputFormat},
    config::DashboardConfig,
    core::{
        format_count, FilterCoordinator, LogNotifier, MockMetricsSource, Notifier,
        RefreshCompletion, RefreshTrigger, SystemClock, ToastBoard, Tone, KPI_TILES,
    },
    export::KpiExporter,
    ui::{restore_terminal, setup_terminal, DashboardApp},
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let config = cli.load_config()?;
    tracing::info!(
        latency_ms = config.refresh.simulated_latency_ms,
        auto_refresh_secs = config.refresh.auto_refresh_secs,
        "Starting kpiboard"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.output {
        OutputFormat::Tui => run_tui_mode(&cli, config, &runtime)?,
        OutputFormat::Json | OutputFormat::Text => runtime.block_on(run_headless_mode(&cli, config))?,
    }

    Ok(())
}

fn build_coordinator(
    config: &DashboardConfig,
    notifier: Arc<dyn Notifier>,
) -> (FilterCoordinator, UnboundedReceiver<RefreshCompletion>) {
    let source = MockMetricsSource::new(config.refresh.simulated_latency())
        .with_failure_rate(config.refresh.failure_rate);
    let (refresher, completions) = RefreshTrigger::new(Arc::new(source));
    let coordinator = FilterCoordinator::new(refresher, notifier, Arc::new(SystemClock), config);
    (coordinator, completions)
}

/// Apply `--preset` or `--from/--to` to the `--target` filter
fn apply_startup_filters(cli: &Cli, coordinator: &mut FilterCoordinator) -> Result<()> {
    if let Some(preset) = cli.preset {
        coordinator.on_preset_activated(preset)?;
        coordinator.on_target_chosen(cli.target)?;
    } else if let Some(range) = cli.range() {
        coordinator.on_range_picked(cli.target, range)?;
    }
    Ok(())
}

fn run_tui_mode(cli: &Cli, config: DashboardConfig, runtime: &tokio::runtime::Runtime) -> Result<()> {
    // Refreshes are spawned onto the runtime from the UI thread
    let _guard = runtime.enter();

    let toasts = ToastBoard::new(config.notifications.max_visible);
    let (mut coordinator, completions) = build_coordinator(&config, Arc::new(toasts.clone()));
    apply_startup_filters(cli, &mut coordinator)?;

    // Setup terminal
    let mut terminal = setup_terminal()?;

    // Create and run the dashboard
    let app = DashboardApp::new(coordinator, completions, toasts, config);
    let res = app.run(&mut terminal);

    // Restore terminal
    if let Err(err) = restore_terminal(&mut terminal) {
        eprintln!("Failed to restore terminal: {}", err);
    }

    if let Err(err) = res {
        eprintln!("Application error: {}", err);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_headless_mode(cli: &Cli, config: DashboardConfig) -> Result<()> {
    let (mut coordinator, mut completions) = build_coordinator(&config, Arc::new(LogNotifier));
    apply_startup_filters(cli, &mut coordinator)?;
    if coordinator.latest_refresh_stamp() == 0 {
        coordinator.manual_refresh();
    }

    if !wait_for_latest(&mut coordinator, &mut completions).await? {
        let reason = coordinator
            .metrics_view()
            .last_error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Metrics refresh failed: {}", reason);
    }
    print_dashboard(cli, &coordinator)?;

    if !cli.watch {
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let interval = config
        .refresh
        .auto_refresh_interval()
        .unwrap_or(Duration::from_secs(30));

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        while running.load(Ordering::SeqCst) && started.elapsed() < interval {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        coordinator.scheduled_refresh();
        if wait_for_latest(&mut coordinator, &mut completions).await? {
            print_dashboard(cli, &coordinator)?;
        }
    }

    Ok(())
}

/// Feed completions to the coordinator until the latest request finishes.
/// Returns whether its metrics were applied.
async fn wait_for_latest(
    coordinator: &mut FilterCoordinator,
    completions: &mut UnboundedReceiver<RefreshCompletion>,
) -> Result<bool> {
    let latest = coordinator.latest_refresh_stamp();
    while let Some(completion) = completions.recv().await {
        let stamp = completion.stamp;
        let applied = coordinator.on_refresh_complete(completion);
        if stamp == latest {
            return Ok(applied);
        }
    }
    bail!("Refresh channel closed")
}

fn print_dashboard(cli: &Cli, coordinator: &FilterCoordinator) -> Result<()> {
    let metrics = coordinator.metrics_view().metrics;

    if cli.output == OutputFormat::Json {
        println!("{}", KpiExporter::snapshot_json(coordinator.filters(), metrics.as_ref())?);
        return Ok(());
    }

    let chips = coordinator.active_filters();
    if chips.is_empty() {
        println!("Filters: none");
    } else {
        for chip in &chips {
            println!("Filter: {}: {}", chip.label, chip.range_text);
        }
    }
    println!("---");

    let Some(metrics) = metrics else {
        println!("No data");
        return Ok(());
    };

    for tile in KPI_TILES.iter() {
        let value = format_count(tile.value(&metrics));
        if cli.no_color {
            println!("{:<34} {:>8}", tile.title, value);
        } else {
            let color = match tile.tone(&metrics) {
                Tone::Default => "\x1b[0m",
                Tone::Success => "\x1b[32m", // Green
                Tone::Warning => "\x1b[33m", // Yellow
                Tone::Error => "\x1b[31m",   // Red
                Tone::Info => "\x1b[34m",    // Blue
            };
            println!("{:<34} {}{:>8}\x1b[0m", tile.title, color, value);
        }
    }
    println!();

    Ok(())
}
