// src/restart/reconcile.rs

use std::collections::HashSet;

use tracing::{info, warn};

use crate::control::{ControlError, ProcessControl};

/// Bring the supervisor's process groups in line with its on-disk
/// configuration.
///
/// Asks the supervisor to reload its configuration, then applies the
/// reported group sets strictly in the order removed → changed → added: a
/// group reported as removed must be fully torn down before any re-add logic
/// for a same-named group can run.
///
/// Returns the union of added and changed group names. Those groups now
/// exist with fresh definitions and must not be restarted again in the same
/// cycle.
///
/// Only a failure of the reload call itself is returned as an error — with
/// the reload result unknown there is no safe way to continue. Per-group
/// problems are logged and skipped.
pub async fn reconcile_groups(
    control: &dyn ProcessControl,
) -> Result<HashSet<String>, ControlError> {
    let reloaded = control.reload_config().await?;

    for gname in &reloaded.removed {
        let results = match control.stop_group(gname).await {
            Ok(results) => results,
            Err(err) => {
                warn!(group = %gname, error = %err, "failed to stop removed process group");
                continue;
            }
        };
        info!("stopped {gname}");

        if results.iter().any(|res| res.failed()) {
            warn!("{gname}: has problems; not removing");
            continue;
        }

        match control.remove_group(gname).await {
            Ok(()) => info!("removed process group {gname}"),
            Err(err) => warn!(group = %gname, error = %err, "failed to remove process group"),
        }
    }

    for gname in &reloaded.changed {
        if let Err(err) = control.stop_group(gname).await {
            warn!(group = %gname, error = %err, "failed to stop changed process group");
            continue;
        }
        info!("stopped {gname}");

        if let Err(err) = control.remove_group(gname).await {
            warn!(group = %gname, error = %err, "failed to remove changed process group");
            continue;
        }
        // Re-adding forces the supervisor to pick up the new settings.
        if let Err(err) = control.add_group(gname).await {
            warn!(group = %gname, error = %err, "failed to re-add changed process group");
            continue;
        }
        info!("updated process group {gname}");
    }

    for gname in &reloaded.added {
        if let Err(err) = control.add_group(gname).await {
            warn!(group = %gname, error = %err, "failed to add process group");
            continue;
        }
        info!("added process group {gname}");
    }

    Ok(reloaded
        .added
        .iter()
        .chain(reloaded.changed.iter())
        .cloned()
        .collect())
}
