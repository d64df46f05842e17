// src/control/supervisord.rs

//! XML-RPC client for supervisord's `supervisor` namespace.
//!
//! supervisord exposes its control API to child processes through the
//! `SUPERVISOR_SERVER_URL` environment variable. The `xmlrpc` crate's
//! transport is blocking, so every call is pushed onto the blocking thread
//! pool via `tokio::task::spawn_blocking`.

use std::env;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::task;
use xmlrpc::{Request, Value};

use super::{
    ControlError, GroupStopResult, ProcessControl, ProcessDescriptor, ProcessState,
    ReloadedGroups,
};

/// Environment variable supervisord sets for its child processes.
pub const SERVER_URL_ENV: &str = "SUPERVISOR_SERVER_URL";

const USERNAME_ENV: &str = "SUPERVISOR_USERNAME";
const PASSWORD_ENV: &str = "SUPERVISOR_PASSWORD";

/// XML-RPC client against one supervisord instance.
#[derive(Debug, Clone)]
pub struct SupervisordClient {
    url: String,
}

impl SupervisordClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Build a client from the supervisord child environment.
    ///
    /// Requires `SUPERVISOR_SERVER_URL` with an http or https scheme;
    /// `SUPERVISOR_USERNAME` / `SUPERVISOR_PASSWORD` are folded into the URL
    /// as userinfo when present.
    pub fn from_env() -> Result<Self> {
        let url = env::var(SERVER_URL_ENV)
            .with_context(|| format!("missing environment variable {SERVER_URL_ENV}"))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!(
                "unsupported {SERVER_URL_ENV} scheme in {url:?} \
                 (only http and https are supported)"
            );
        }

        let url = match env::var(USERNAME_ENV) {
            Ok(user) if !user.is_empty() => {
                let pass = env::var(PASSWORD_ENV).unwrap_or_default();
                with_userinfo(&url, &user, &pass)
            }
            _ => url,
        };

        Ok(Self::new(url))
    }

    /// Run one XML-RPC call on the blocking pool.
    async fn call(&self, method: &'static str, args: Vec<Value>) -> Result<Value, ControlError> {
        let url = self.url.clone();
        let response = task::spawn_blocking(move || {
            let mut request = Request::new(method);
            for arg in args {
                request = request.arg(arg);
            }
            request.call_url(url.as_str())
        })
        .await
        .map_err(|err| ControlError::Transport(err.to_string()))?;

        response.map_err(|err| match err.fault() {
            Some(fault) => ControlError::Fault(fault.fault_string.clone()),
            None => ControlError::Transport(err.to_string()),
        })
    }
}

#[async_trait]
impl ProcessControl for SupervisordClient {
    async fn list_all_processes(&self) -> Result<Vec<ProcessDescriptor>, ControlError> {
        let value = self.call("supervisor.getAllProcessInfo", vec![]).await?;
        let entries = value
            .as_array()
            .ok_or_else(|| protocol("getAllProcessInfo did not return an array"))?;
        entries.iter().map(decode_process).collect()
    }

    async fn get_process(&self, id: &str) -> Result<ProcessDescriptor, ControlError> {
        let value = self
            .call("supervisor.getProcessInfo", vec![string(id)])
            .await?;
        decode_process(&value)
    }

    async fn stop_process(&self, id: &str, wait: bool) -> Result<(), ControlError> {
        self.call(
            "supervisor.stopProcess",
            vec![string(id), Value::Bool(wait)],
        )
        .await?;
        Ok(())
    }

    async fn start_process(&self, id: &str, wait: bool) -> Result<(), ControlError> {
        self.call(
            "supervisor.startProcess",
            vec![string(id), Value::Bool(wait)],
        )
        .await?;
        Ok(())
    }

    async fn reload_config(&self) -> Result<ReloadedGroups, ControlError> {
        let value = self.call("supervisor.reloadConfig", vec![]).await?;

        // reloadConfig answers [[added, changed, removed]], each a list of
        // group names.
        let sets = value
            .as_array()
            .and_then(|outer| outer.first())
            .and_then(Value::as_array)
            .ok_or_else(|| protocol("reloadConfig result has unexpected shape"))?;

        Ok(ReloadedGroups {
            added: string_array(sets.first(), "added")?,
            changed: string_array(sets.get(1), "changed")?,
            removed: string_array(sets.get(2), "removed")?,
        })
    }

    async fn stop_group(&self, group: &str) -> Result<Vec<GroupStopResult>, ControlError> {
        let value = self
            .call("supervisor.stopProcessGroup", vec![string(group)])
            .await?;
        let entries = value
            .as_array()
            .ok_or_else(|| protocol("stopProcessGroup did not return an array"))?;
        entries.iter().map(decode_group_stop_result).collect()
    }

    async fn add_group(&self, group: &str) -> Result<(), ControlError> {
        self.call("supervisor.addProcessGroup", vec![string(group)])
            .await?;
        Ok(())
    }

    async fn remove_group(&self, group: &str) -> Result<(), ControlError> {
        self.call("supervisor.removeProcessGroup", vec![string(group)])
            .await?;
        Ok(())
    }
}

fn protocol(msg: impl Into<String>) -> ControlError {
    ControlError::Protocol(msg.into())
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn decode_process(value: &Value) -> Result<ProcessDescriptor, ControlError> {
    let statename = str_field(value, "statename")?;
    Ok(ProcessDescriptor {
        name: str_field(value, "name")?,
        group: str_field(value, "group")?,
        state: ProcessState::from_statename(&statename),
        pid: int_field(value, "pid")?,
    })
}

fn decode_group_stop_result(value: &Value) -> Result<GroupStopResult, ControlError> {
    Ok(GroupStopResult {
        name: str_field(value, "name")?,
        status: int_field(value, "status")?,
        description: str_field(value, "description")?,
    })
}

fn str_field(value: &Value, key: &str) -> Result<String, ControlError> {
    value
        .as_struct()
        .and_then(|fields| fields.get(key))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| protocol(format!("missing string field `{key}`")))
}

fn int_field(value: &Value, key: &str) -> Result<i32, ControlError> {
    value
        .as_struct()
        .and_then(|fields| fields.get(key))
        .and_then(Value::as_i32)
        .ok_or_else(|| protocol(format!("missing integer field `{key}`")))
}

fn string_array(value: Option<&Value>, what: &str) -> Result<Vec<String>, ControlError> {
    let entries = value
        .and_then(Value::as_array)
        .ok_or_else(|| protocol(format!("reloadConfig `{what}` set is not an array")))?;
    entries
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| protocol(format!("reloadConfig `{what}` entry is not a string")))
        })
        .collect()
}

/// Insert `user:pass@` userinfo into an http(s) URL.
fn with_userinfo(url: &str, user: &str, pass: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://{user}:{pass}@{rest}"),
        None => url.to_string(),
    }
}
