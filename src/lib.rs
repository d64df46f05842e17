// src/lib.rs

pub mod cli;
pub mod control;
pub mod errors;
pub mod logging;
pub mod restart;
pub mod signals;
pub mod watch;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::control::SupervisordClient;
use crate::restart::{CoordinatorOptions, RestartCoordinator, RestartTarget};
use crate::watch::{ChangeFilter, FilterOptions, WatcherConfig};

/// Events sent into the runtime loop from the watcher, coordinator tasks,
/// and the signal handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A filesystem change passed the filter.
    ChangeDetected,
    /// An unrecoverable mid-run failure; the process must exit non-zero.
    Fatal(String),
    /// A termination signal arrived.
    ShutdownRequested,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - argument validation
/// - the change filter + file watcher
/// - the supervisord client (from the child environment)
/// - the restart coordinator
/// - signal handling
pub async fn run(args: CliArgs) -> Result<()> {
    cli::validate_args(&args)?;

    if args.is_disabled() {
        info!("functionality disabled, waiting for termination signal");
        signals::wait_for_shutdown_signal().await?;
        info!("terminating");
        return Ok(());
    }

    let filter = ChangeFilter::new(&filter_options(&args))?;
    let control = SupervisordClient::from_env()?;

    // Runtime event channel.
    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher_handle = watch::spawn_watcher(
        WatcherConfig {
            root: args.path.clone(),
            recursive: !args.no_recursion,
            watch_directories: args.directories,
        },
        filter,
        rt_tx.clone(),
    )?;
    info!("watching {}", args.path.display());

    // SIGINT/SIGTERM → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = signals::wait_for_shutdown_signal().await {
                eprintln!("failed to listen for termination signals: {err}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let coordinator = Arc::new(RestartCoordinator::new(
        Arc::new(control),
        CoordinatorOptions {
            target: restart_target(&args),
            reload_before_restart: args.reload,
            ..CoordinatorOptions::default()
        },
    ));

    // Main loop: one coordinator task per change signal; the coordinator's
    // gates turn the resulting stampede into serial restart cycles.
    while let Some(event) = rt_rx.recv().await {
        match event {
            RuntimeEvent::ChangeDetected => {
                debug!("change detected, dispatching to coordinator");
                let coordinator = Arc::clone(&coordinator);
                let tx = rt_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = coordinator.on_change_signal().await {
                        let _ = tx.send(RuntimeEvent::Fatal(format!("{err:#}"))).await;
                    }
                });
            }
            RuntimeEvent::Fatal(msg) => return Err(anyhow!(msg)),
            RuntimeEvent::ShutdownRequested => {
                info!("terminating");
                break;
            }
        }
    }

    Ok(())
}

/// Map the CLI monitoring flags onto filter options.
fn filter_options(args: &CliArgs) -> FilterOptions {
    let use_regex = !args.recognize_regex.is_empty() || !args.ignore_regex.is_empty();
    if use_regex {
        FilterOptions {
            recognize: args.recognize_regex.clone(),
            ignore: args.ignore_regex.clone(),
            use_regex: true,
            ignore_hidden: !args.hidden_files,
            case_sensitive: !args.case_insensitive,
        }
    } else {
        FilterOptions {
            recognize: args.recognize.clone(),
            ignore: args.ignore.clone(),
            use_regex: false,
            ignore_hidden: !args.hidden_files,
            case_sensitive: !args.case_insensitive,
        }
    }
}

/// Map the CLI program flags onto the restart selection rule.
///
/// Validation has already established that exactly one form is present.
fn restart_target(args: &CliArgs) -> RestartTarget {
    if args.any {
        RestartTarget::Any
    } else if !args.programs.is_empty() {
        RestartTarget::Programs(args.programs.iter().cloned().collect::<HashSet<_>>())
    } else {
        RestartTarget::Groups(args.groups.iter().cloned().collect::<HashSet<_>>())
    }
}
