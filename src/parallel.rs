use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use chat_text_export::{Severity, export_snapshot};
use chrono::Utc;
use crossbeam_channel::bounded;
use eyre::{Context, Result, eyre};
use tracing::{error, info, warn};

use crate::utils::{ExportConfig, ProcessResult, read_snapshot, write_export};

pub fn execute(config: ExportConfig) -> Result<()> {
    if config.stdout {
        let [path] = config.snapshots.as_slice() else {
            return Err(eyre!("--stdout takes exactly one snapshot"));
        };
        export_file(path, &config)?;
        return Ok(());
    }

    fs::create_dir_all(&config.target_dir).wrap_err("Failed to create target dir")?;
    run_pool(&config)
}

// ── Worker pool ───────────────────────────────────────────────────────────────

fn run_pool(config: &ExportConfig) -> Result<()> {
    let (tx, rx) = bounded::<&Path>(64);
    let count_created = AtomicUsize::new(0);
    let count_empty = AtomicUsize::new(0);
    let count_errors = AtomicUsize::new(0);
    let n_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(8)
        .min(config.snapshots.len())
        .max(1);

    std::thread::scope(|s| {
        for _ in 0..n_workers {
            let rx = rx.clone();
            let (count_created, count_empty, count_errors) =
                (&count_created, &count_empty, &count_errors);

            s.spawn(move || {
                while let Ok(path) = rx.recv() {
                    match export_file(path, config) {
                        Ok(ProcessResult::Created(_) | ProcessResult::Printed) => {
                            count_created.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(ProcessResult::Empty) => {
                            count_empty.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            count_errors.fetch_add(1, Ordering::Relaxed);
                            error!("Error [{}]: {:#}", path.display(), e);
                        }
                    }
                }
            });
        }

        drop(rx);

        for path in &config.snapshots {
            if tx.send(path.as_path()).is_err() {
                break;
            }
        }

        drop(tx);
    });

    let created = count_created.load(Ordering::Relaxed);
    let empty = count_empty.load(Ordering::Relaxed);
    let errors = count_errors.load(Ordering::Relaxed);

    if !config.quiet {
        eprintln!(
            "Done. {} exported, {} without messages. Errors: {}",
            created, empty, errors
        );
    }

    if errors > 0 && created == 0 && empty == 0 {
        return Err(eyre!("Every snapshot failed to export"));
    }
    Ok(())
}

// ── Shared processing ─────────────────────────────────────────────────────────

fn export_file(path: &Path, config: &ExportConfig) -> Result<ProcessResult> {
    let snapshot = read_snapshot(path)?;
    let profile = config.resolve_profile(&snapshot.location)?;
    let export = export_snapshot(&snapshot, &profile, Utc::now())
        .wrap_err_with(|| format!("Profile {:?} is not usable", profile.name))?;

    for diagnostic in &export.diagnostics {
        if diagnostic.severity >= Severity::Warning {
            warn!("[{}] {}: {}", path.display(), diagnostic.severity, diagnostic.message);
        }
    }

    if export.turns.is_empty() {
        warn!("[{}] No chat messages were found", path.display());
        return Ok(ProcessResult::Empty);
    }

    if config.stdout {
        print!("{}", export.text);
        return Ok(ProcessResult::Printed);
    }

    let written = write_export(&config.target_dir, &export.file_name, &export.text)?;
    info!(
        "[{}] {} turns -> {}",
        path.display(),
        export.turns.len(),
        written.display()
    );
    Ok(ProcessResult::Created(written))
}
