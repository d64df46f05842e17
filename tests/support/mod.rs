#![allow(dead_code)]

//! Shared test double for the process-control interface.
//!
//! `MockControl` keeps an in-memory process table, records every call in
//! order, and can be scripted to fault individual operations so tests can
//! exercise the partial-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use watchsup::control::{
    ControlError, GroupStopResult, ProcessControl, ProcessDescriptor, ProcessState,
    ReloadedGroups, FAULT_FAILED,
};

/// supervisord's `Faults.SUCCESS` status code.
pub const FAULT_SUCCESS: i32 = 80;

/// One recorded control-client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListAll,
    Get(String),
    Stop(String, bool),
    Start(String, bool),
    Reload,
    StopGroup(String),
    AddGroup(String),
    RemoveGroup(String),
}

#[derive(Default)]
struct State {
    procs: Vec<ProcessDescriptor>,
    calls: Vec<Call>,
    /// Remaining polls that still observe STOPPING, per stopped process.
    stop_countdowns: HashMap<String, u32>,
}

pub struct MockControl {
    state: Mutex<State>,
    /// `None` makes `reload_config` fault.
    reload: Option<ReloadedGroups>,
    stop_faults: HashSet<String>,
    start_faults: HashSet<String>,
    /// Groups whose `stop_group` rows include a FAILED member.
    failing_stop_groups: HashSet<String>,
    polls_before_stop: u32,
    list_delay: Duration,
}

impl MockControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            reload: None,
            stop_faults: HashSet::new(),
            start_faults: HashSet::new(),
            failing_stop_groups: HashSet::new(),
            polls_before_stop: 0,
            list_delay: Duration::ZERO,
        }
    }

    pub fn with_process(self, name: &str, group: &str, state: ProcessState, pid: i32) -> Self {
        self.state.lock().unwrap().procs.push(ProcessDescriptor {
            name: name.to_string(),
            group: group.to_string(),
            state,
            pid,
        });
        self
    }

    pub fn with_reload(self, added: &[&str], changed: &[&str], removed: &[&str]) -> Self {
        let to_vec = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            reload: Some(ReloadedGroups {
                added: to_vec(added),
                changed: to_vec(changed),
                removed: to_vec(removed),
            }),
            ..self
        }
    }

    pub fn with_stop_fault(mut self, id: &str) -> Self {
        self.stop_faults.insert(id.to_string());
        self
    }

    pub fn with_start_fault(mut self, id: &str) -> Self {
        self.start_faults.insert(id.to_string());
        self
    }

    pub fn with_failing_stop_group(mut self, group: &str) -> Self {
        self.failing_stop_groups.insert(group.to_string());
        self
    }

    pub fn with_polls_before_stop(mut self, polls: u32) -> Self {
        self.polls_before_stop = polls;
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Everything recorded so far, in call order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn fault(msg: &str) -> ControlError {
        ControlError::Fault(msg.to_string())
    }
}

#[async_trait]
impl ProcessControl for MockControl {
    async fn list_all_processes(&self) -> Result<Vec<ProcessDescriptor>, ControlError> {
        self.record(Call::ListAll);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        Ok(self.state.lock().unwrap().procs.clone())
    }

    async fn get_process(&self, id: &str) -> Result<ProcessDescriptor, ControlError> {
        self.record(Call::Get(id.to_string()));

        let mut state = self.state.lock().unwrap();
        let remaining = state.stop_countdowns.get(id).copied();
        match remaining {
            Some(0) => {
                state.stop_countdowns.remove(id);
                set_state(&mut state, id, ProcessState::Stopped);
            }
            Some(n) => {
                state.stop_countdowns.insert(id.to_string(), n - 1);
            }
            None => {}
        }

        state
            .procs
            .iter()
            .find(|p| p.qualified_name() == id)
            .cloned()
            .ok_or_else(|| Self::fault("BAD_NAME"))
    }

    async fn stop_process(&self, id: &str, wait: bool) -> Result<(), ControlError> {
        self.record(Call::Stop(id.to_string(), wait));
        if self.stop_faults.contains(id) {
            return Err(Self::fault("NOT_RUNNING"));
        }

        let mut state = self.state.lock().unwrap();
        state
            .stop_countdowns
            .insert(id.to_string(), self.polls_before_stop);
        set_state(&mut state, id, ProcessState::Stopping);
        Ok(())
    }

    async fn start_process(&self, id: &str, wait: bool) -> Result<(), ControlError> {
        self.record(Call::Start(id.to_string(), wait));
        if self.start_faults.contains(id) {
            return Err(Self::fault("ALREADY_STARTED"));
        }

        set_state(&mut self.state.lock().unwrap(), id, ProcessState::Running);
        Ok(())
    }

    async fn reload_config(&self) -> Result<ReloadedGroups, ControlError> {
        self.record(Call::Reload);
        self.reload
            .clone()
            .ok_or_else(|| Self::fault("SHUTDOWN_STATE"))
    }

    async fn stop_group(&self, group: &str) -> Result<Vec<GroupStopResult>, ControlError> {
        self.record(Call::StopGroup(group.to_string()));

        let state = self.state.lock().unwrap();
        let mut results: Vec<GroupStopResult> = state
            .procs
            .iter()
            .filter(|p| p.group == group)
            .map(|p| GroupStopResult {
                name: p.name.clone(),
                status: FAULT_SUCCESS,
                description: "OK".to_string(),
            })
            .collect();
        drop(state);

        if self.failing_stop_groups.contains(group) {
            results.push(GroupStopResult {
                name: format!("{group}-member"),
                status: FAULT_FAILED,
                description: "FAILED".to_string(),
            });
        }
        Ok(results)
    }

    async fn add_group(&self, group: &str) -> Result<(), ControlError> {
        self.record(Call::AddGroup(group.to_string()));
        Ok(())
    }

    async fn remove_group(&self, group: &str) -> Result<(), ControlError> {
        self.record(Call::RemoveGroup(group.to_string()));
        Ok(())
    }
}

fn set_state(state: &mut State, id: &str, new_state: ProcessState) {
    if let Some(proc) = state.procs.iter_mut().find(|p| p.qualified_name() == id) {
        proc.state = new_state;
    }
}
