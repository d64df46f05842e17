// src/restart/coordinator.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, info};

use crate::control::ProcessControl;
use crate::restart::reconcile::reconcile_groups;
use crate::restart::sequencer::{restart_programs, RestartTarget};

/// Coordinator behaviour fixed at startup.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Which processes a cycle restarts.
    pub target: RestartTarget,
    /// Run the group reconciliation step at the start of every cycle.
    pub reload_before_restart: bool,
    /// Our own pid, so a cycle never restarts the coordinator itself.
    pub own_pid: i32,
    /// How long an admitted signal waits before its cycle starts, absorbing
    /// the rest of the burst.
    pub debounce: Duration,
    /// Interval between status polls while waiting for targets to stop.
    pub poll_interval: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            target: RestartTarget::Any,
            reload_before_restart: false,
            own_pid: std::process::id() as i32,
            debounce: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Serializes concurrent change signals into restart cycles.
///
/// Two gates guard the cycle pipeline:
///
/// - the *admission* gate is try-acquired without blocking; whoever holds it
///   is responsible for starting the next cycle, and everyone who fails the
///   acquire is a burst duplicate that can simply return
/// - the *execution* gate is held for a full cycle, so cycles run strictly
///   one after another
///
/// Admission is released as soon as execution is acquired. A change signal
/// arriving while a cycle executes can therefore claim admission and becomes
/// the seed of exactly one follow-up cycle; it is never lost and never
/// multiplied.
pub struct RestartCoordinator {
    control: Arc<dyn ProcessControl>,
    options: CoordinatorOptions,
    admission: Mutex<()>,
    execution: Mutex<()>,
}

impl RestartCoordinator {
    pub fn new(control: Arc<dyn ProcessControl>, options: CoordinatorOptions) -> Self {
        Self {
            control,
            options,
            admission: Mutex::new(()),
            execution: Mutex::new(()),
        }
    }

    /// Handle one change signal. Called from a fresh task per notification,
    /// so invocations race freely.
    ///
    /// An error return is fatal to the whole process: it means the
    /// configuration reload itself failed and the set of groups to reconcile
    /// is unknown. Everything else is contained inside the cycle.
    pub async fn on_change_signal(&self) -> Result<()> {
        let Ok(admission) = self.admission.try_lock() else {
            debug!("change signal absorbed by pending restart cycle");
            return Ok(());
        };

        info!("detected change, commencing restart of programs");
        time::sleep(self.options.debounce).await;

        let _execution = self.execution.lock().await;
        drop(admission);

        let reconciled = if self.options.reload_before_restart {
            info!("running supervisord update");
            reconcile_groups(self.control.as_ref())
                .await
                .context("failed to reload config")?
        } else {
            HashSet::new()
        };

        restart_programs(
            self.control.as_ref(),
            &self.options.target,
            &reconciled,
            self.options.own_pid,
            self.options.poll_interval,
        )
        .await;

        Ok(())
    }
}
