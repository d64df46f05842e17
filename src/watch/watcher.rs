// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::watch::patterns::ChangeFilter;
use crate::RuntimeEvent;

/// Watcher behaviour derived from the CLI flags.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory to watch.
    pub root: PathBuf,
    /// Watch subdirectories too.
    pub recursive: bool,
    /// Let directory events through instead of dropping them.
    pub watch_directories: bool,
}

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes the configured directory and
/// sends `RuntimeEvent::ChangeDetected` for every event path that passes the
/// change filter.
///
/// The restart logic never needs to know *what* changed, so matched paths
/// are reduced to bare change signals here.
pub fn spawn_watcher(
    config: WatcherConfig,
    filter: ChangeFilter,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // We can't log via tracing here easily, so fallback to stderr.
                        eprintln!("watchsup: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("watchsup: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )?;

    let mode = if config.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher
        .watch(&config.root, mode)
        .with_context(|| format!("watching directory {:?}", config.root))?;

    info!("file watcher started on {:?}", config.root);

    // Async task that consumes notify events and forwards change signals to
    // the runtime.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!("received notify event: {:?}", event);

            for path in &event.paths {
                if !config.watch_directories && path.is_dir() {
                    continue;
                }

                let text = path_str(path);
                if filter.matches(&text) {
                    debug!(path = %text, "change recognized");
                    if runtime_tx.send(RuntimeEvent::ChangeDetected).await.is_err() {
                        // Runtime channel closed; no point keeping the
                        // watcher loop alive.
                        return;
                    }
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Render a path as a forward-slash string for pattern matching.
fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
