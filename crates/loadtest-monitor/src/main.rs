mod bootstrap;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use loadtest_core::formatting::format_clock;
use loadtest_core::settings::Settings;
use loadtest_core::time_utils::local_now;
use loadtest_data::export::{full_file_name, summary_file_name};
use loadtest_data::reader::ParseMode;
use loadtest_runtime::{LoadTestMonitor, MonitorEvent, MonitorSnapshot, RefreshScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Load-test monitor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        primary = %settings.primary_file.display(),
        summary = %settings.summary_file.display(),
        test_id = %settings.test_id,
        mode = %settings.mode,
        "configuration"
    );

    let parse_mode = if settings.strict {
        ParseMode::Strict
    } else {
        ParseMode::Tolerant
    };
    let monitor = Arc::new(LoadTestMonitor::from_files(
        &settings.primary_file,
        &settings.summary_file,
        parse_mode,
    ));

    match settings.mode.as_str() {
        "watch" => watch(monitor, &settings).await,
        "once" => {
            let snapshot = refresh_blocking(Arc::clone(&monitor)).await?;
            println!("{}", render_snapshot(&format_clock(&local_now()), &snapshot, settings.json)?);
            Ok(())
        }
        "export" => {
            refresh_blocking(Arc::clone(&monitor)).await?;
            for path in write_exports(&monitor, &settings.test_id, &settings.export_dir)? {
                println!("{}", path.display());
            }
            Ok(())
        }
        unknown => anyhow::bail!("Unknown mode: {unknown}"),
    }
}

// ── Modes ──────────────────────────────────────────────────────────────────────

/// Run the scheduler until Ctrl+C, printing each refresh.
async fn watch(monitor: Arc<LoadTestMonitor>, settings: &Settings) -> Result<()> {
    tracing::info!(
        refresh_secs = settings.refresh_interval,
        clock_secs = settings.clock_interval,
        "starting refresh scheduler"
    );

    let (mut rx, handle) =
        RefreshScheduler::new(monitor, settings.refresh_period(), settings.clock_period()).start();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut clock = format_clock(&local_now());
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(MonitorEvent::Clock(now)) => clock = now,
                Some(MonitorEvent::Snapshot(snapshot)) => {
                    println!("{}", render_snapshot(&clock, &snapshot, settings.json)?);
                }
                Some(MonitorEvent::Unavailable(reason)) => {
                    tracing::warn!(%reason, "no data to display");
                }
                None => break,
            },
            _ = &mut shutdown => {
                tracing::info!("Ctrl+C received; stopping scheduler");
                break;
            }
        }
    }

    handle.abort();
    Ok(())
}

/// Refresh both stores off the async workers and build one snapshot.
async fn refresh_blocking(monitor: Arc<LoadTestMonitor>) -> Result<MonitorSnapshot> {
    let snapshot = tokio::task::spawn_blocking(move || {
        for failure in monitor.refresh_all() {
            tracing::error!(error = %failure, "refresh failed");
        }
        monitor.snapshot()
    })
    .await??;
    Ok(snapshot)
}

// ── Output ─────────────────────────────────────────────────────────────────────

/// One printable line (or JSON document) for a snapshot.
fn render_snapshot(clock: &str, snapshot: &MonitorSnapshot, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(snapshot)?);
    }
    let latest = snapshot.latest_summary.as_deref().unwrap_or("no readings yet");
    Ok(format!(
        "[{clock}] {latest} ({} summary stages)",
        snapshot.summary_table.as_ref().map_or(0, Vec::len)
    ))
}

/// Write both export tables into `dir`, returning the written paths.
///
/// Both tables are attempted even if the first fails.
fn write_exports(monitor: &LoadTestMonitor, test_id: &str, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating export directory {}", dir.display()))?;

    let tables = [
        (summary_file_name(test_id), monitor.export_summary_table()),
        (full_file_name(test_id), monitor.export_full_table()),
    ];

    let mut written = Vec::new();
    let mut failed = 0;
    for (name, table) in tables {
        let path = dir.join(&name);
        match table {
            Ok(bytes) => {
                std::fs::write(&path, bytes)
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), "export written");
                written.push(path);
            }
            Err(e) => {
                tracing::error!(table = %name, error = %e, "export failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of 2 export tables could not be written");
    }
    Ok(written)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
