// src/restart/sequencer.rs

use std::collections::HashSet;
use std::time::Duration;

use tokio::time;
use tracing::{debug, info, warn};

use crate::control::{ProcessControl, ProcessDescriptor, ProcessState};

/// Which supervised processes a restart cycle applies to.
///
/// Fixed at process start from the CLI; exactly one of the three forms is
/// configured.
#[derive(Debug, Clone)]
pub enum RestartTarget {
    /// Restart any child of the supervisor.
    Any,
    /// Restart processes with one of these names.
    Programs(HashSet<String>),
    /// Restart members of one of these groups.
    Groups(HashSet<String>),
}

impl RestartTarget {
    /// Does the selection rule cover this process?
    pub fn selects(&self, proc: &ProcessDescriptor) -> bool {
        match self {
            RestartTarget::Any => true,
            RestartTarget::Programs(names) => names.contains(&proc.name),
            RestartTarget::Groups(groups) => groups.contains(&proc.group),
        }
    }
}

/// Stop and restart the selected targets, tolerating per-process failures.
///
/// A process is a restart candidate iff it is STARTING or RUNNING, the
/// target rule selects it, its group was not just reconciled (those groups
/// start fresh on add), and it is not the coordinator itself.
///
/// All stop requests are issued before any start request. The start phase
/// then polls the remaining targets: whichever reaches STOPPED first is
/// started first, so start order across targets is not defined. A stop or
/// start fault drops that one target from the cycle with a warning; nothing
/// here is fatal.
pub async fn restart_programs(
    control: &dyn ProcessControl,
    target: &RestartTarget,
    reconciled_groups: &HashSet<String>,
    own_pid: i32,
    poll_interval: Duration,
) {
    info!("restarting programs");

    let procs = match control.list_all_processes().await {
        Ok(procs) => procs,
        Err(err) => {
            warn!(error = %err, "failed to list processes, skipping restart");
            return;
        }
    };

    let candidates: Vec<String> = procs
        .iter()
        .filter(|proc| requires_restart(target, reconciled_groups, own_pid, proc))
        .map(ProcessDescriptor::qualified_name)
        .collect();
    debug!(count = candidates.len(), "selected restart targets");

    // Stop phase: issue a non-waiting stop for every candidate. A fault
    // (e.g. the process stopped on its own in the meantime) drops the target.
    let mut pending: Vec<String> = Vec::with_capacity(candidates.len());
    for name in candidates {
        match control.stop_process(&name, false).await {
            Ok(()) => pending.push(name),
            Err(err) => warn!(process = %name, error = %err, "failed to stop process"),
        }
    }

    // Start phase: poll until every pending target has been observed STOPPED
    // and been issued a start. A target whose start faults is abandoned, not
    // retried.
    while !pending.is_empty() {
        let mut still_pending = Vec::with_capacity(pending.len());

        for name in pending {
            let proc = match control.get_process(&name).await {
                Ok(proc) => proc,
                Err(err) => {
                    warn!(process = %name, error = %err, "failed to query process, abandoning");
                    continue;
                }
            };

            if proc.state != ProcessState::Stopped {
                still_pending.push(name);
                continue;
            }

            match control.start_process(&name, false).await {
                Ok(()) => debug!(process = %name, "restarted"),
                Err(err) => warn!(process = %name, error = %err, "failed to start process"),
            }
        }

        pending = still_pending;
        if pending.is_empty() {
            break;
        }
        time::sleep(poll_interval).await;
    }
}

/// Candidate predicate for one process descriptor.
fn requires_restart(
    target: &RestartTarget,
    reconciled_groups: &HashSet<String>,
    own_pid: i32,
    proc: &ProcessDescriptor,
) -> bool {
    proc.state.is_restartable()
        && target.selects(proc)
        && !reconciled_groups.contains(&proc.group)
        && proc.pid != own_pid
}
