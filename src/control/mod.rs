// src/control/mod.rs

//! Process-control client layer.
//!
//! This module is responsible for:
//! - The [`ProcessControl`] trait: the request/response surface the restart
//!   logic drives (list/query/stop/start processes, reload config,
//!   add/remove process groups).
//! - Transient data carried across that boundary ([`ProcessDescriptor`],
//!   [`ReloadedGroups`], [`GroupStopResult`]).
//! - [`SupervisordClient`], the XML-RPC implementation against supervisord.
//!
//! The client is stateless; every call is an independent round trip and
//! process info is fetched fresh on each query, never cached.

pub mod supervisord;

use async_trait::async_trait;
use thiserror::Error;

pub use supervisord::SupervisordClient;

/// Error from a process-control call.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The server answered, but with an application-level fault.
    #[error("{0}")]
    Fault(String),

    /// The request never produced an answer (connection, HTTP, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with something we could not decode.
    #[error("malformed response: {0}")]
    Protocol(String),
}

/// Process state as reported by supervisord's `statename` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    Unknown,
}

impl ProcessState {
    /// Parse a supervisord `statename` string. Unrecognized names map to
    /// `Unknown` rather than failing the whole query.
    pub fn from_statename(name: &str) -> Self {
        match name {
            "STOPPED" => ProcessState::Stopped,
            "STARTING" => ProcessState::Starting,
            "RUNNING" => ProcessState::Running,
            "BACKOFF" => ProcessState::Backoff,
            "STOPPING" => ProcessState::Stopping,
            "EXITED" => ProcessState::Exited,
            "FATAL" => ProcessState::Fatal,
            _ => ProcessState::Unknown,
        }
    }

    /// A process only needs a restart while it is starting up or running.
    pub fn is_restartable(self) -> bool {
        matches!(self, ProcessState::Starting | ProcessState::Running)
    }
}

/// A snapshot of one supervised process.
#[derive(Debug, Clone)]
pub struct ProcessDescriptor {
    pub name: String,
    pub group: String,
    pub state: ProcessState,
    pub pid: i32,
}

impl ProcessDescriptor {
    /// The `group:name` identifier supervisord expects for stop/start calls.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }
}

/// Group names reported by a configuration reload.
#[derive(Debug, Clone, Default)]
pub struct ReloadedGroups {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

/// supervisord's `Faults.FAILED` status code.
pub const FAULT_FAILED: i32 = 30;

/// Per-process result row of a group stop.
#[derive(Debug, Clone)]
pub struct GroupStopResult {
    pub name: String,
    pub status: i32,
    pub description: String,
}

impl GroupStopResult {
    pub fn failed(&self) -> bool {
        self.status == FAULT_FAILED
    }
}

/// Request/response interface to the process supervisor.
///
/// Implementations must be safe to call from concurrent tasks; the restart
/// logic relies on each call being a synchronous round trip (the returned
/// future resolves only once the server has answered).
#[async_trait]
pub trait ProcessControl: Send + Sync {
    async fn list_all_processes(&self) -> Result<Vec<ProcessDescriptor>, ControlError>;

    async fn get_process(&self, id: &str) -> Result<ProcessDescriptor, ControlError>;

    async fn stop_process(&self, id: &str, wait: bool) -> Result<(), ControlError>;

    async fn start_process(&self, id: &str, wait: bool) -> Result<(), ControlError>;

    async fn reload_config(&self) -> Result<ReloadedGroups, ControlError>;

    async fn stop_group(&self, group: &str) -> Result<Vec<GroupStopResult>, ControlError>;

    async fn add_group(&self, group: &str) -> Result<(), ControlError>;

    async fn remove_group(&self, group: &str) -> Result<(), ControlError>;
}
