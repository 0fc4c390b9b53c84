//! Plugins running as child processes
//!
//! The child speaks newline-delimited JSON on stdin/stdout:
//!
//! ```text
//! -> {"id":1,"method":"init","params":null}
//! <- {"id":1,"result":null}
//! -> {"id":2,"method":"process_entity","params":{"action":"PLUGIN-ENTITY-LOCK","entity":{...}}}
//! <- {"id":2,"result":{"entity":{...}}}
//! <- {"id":3,"error":"directory unavailable"}
//! ```
//!
//! Replies whose `id` does not match the outstanding request (answers to a
//! request that already timed out) are discarded. Anything the child writes
//! to stderr is inherited.

use crate::plugin::{Plugin, PluginOpts, PluginResult};
use arbor_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: JsonValue,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    error: Option<String>,
}

struct Connection {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<Reply>,
}

/// A plugin behind a child process
pub struct ProcessPlugin {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    next_id: AtomicU64,
    conn: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for ProcessPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessPlugin")
            .field("name", &self.name)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Find `command` on `PATH` unless it already names a path
fn resolve_program(plugin: &str, command: &str) -> Result<PathBuf> {
    if Path::new(command).components().count() > 1 {
        return Ok(PathBuf::from(command));
    }
    which::which(command)
        .map_err(|e| Error::plugin(plugin, format!("command '{command}' not found: {e}")))
}

impl ProcessPlugin {
    /// Describe a process plugin; nothing is spawned until [`Plugin::init`]
    pub fn new(
        name: impl Into<String>,
        command: &str,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        let program = resolve_program(&name, command)?;
        Ok(Self {
            name,
            program,
            args,
            timeout,
            next_id: AtomicU64::new(1),
            conn: Mutex::new(None),
        })
    }

    fn spawn(&self) -> Result<Connection> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                Error::plugin(
                    &self.name,
                    format!("failed to start {}: {e}", self.program.display()),
                )
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(Error::plugin(&self.name, "child pipes unavailable"));
        };

        let (tx, replies) = mpsc::channel();
        let name = self.name.clone();
        thread::Builder::new()
            .name(format!("plugin-{}-reader", self.name))
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Reply>(&line) {
                        Ok(reply) => {
                            if tx.send(reply).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(plugin = %name, error = %e, "Malformed plugin reply");
                        }
                    }
                }
                tracing::debug!(plugin = %name, "Plugin output closed");
            })?;

        tracing::debug!(
            plugin = %self.name,
            program = %self.program.display(),
            pid = child.id(),
            "Started plugin process"
        );
        Ok(Connection {
            child,
            stdin,
            replies,
        })
    }

    fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue> {
        let mut guard = self.conn.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| Error::plugin(&self.name, "plugin is not running"))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&Request { id, method, params })
            .map_err(|e| Error::plugin(&self.name, format!("failed to encode request: {e}")))?;
        line.push('\n');
        conn.stdin
            .write_all(line.as_bytes())
            .and_then(|()| conn.stdin.flush())
            .map_err(|e| Error::plugin(&self.name, format!("failed to send request: {e}")))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reply = match conn.replies.recv_timeout(remaining) {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::PluginTimeout {
                        plugin: self.name.clone(),
                        after: self.timeout,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::plugin(&self.name, "plugin process exited"));
                }
            };

            if reply.id != id {
                tracing::debug!(
                    plugin = %self.name,
                    stale = reply.id,
                    expected = id,
                    "Discarding stale reply"
                );
                continue;
            }
            if let Some(message) = reply.error {
                return Err(Error::plugin(&self.name, message));
            }
            return Ok(reply.result.unwrap_or(JsonValue::Null));
        }
    }

    fn process(&self, method: &str, opts: &PluginOpts) -> Result<PluginResult> {
        let params = serde_json::to_value(opts)
            .map_err(|e| Error::plugin(&self.name, format!("failed to encode options: {e}")))?;
        let value = self.call(method, params)?;
        if value.is_null() {
            return Ok(PluginResult::default());
        }
        serde_json::from_value(value)
            .map_err(|e| Error::plugin(&self.name, format!("malformed result: {e}")))
    }

    fn stop(&self, conn: Connection) {
        let Connection {
            mut child, stdin, ..
        } = conn;
        drop(stdin);
        if let Err(e) = child.kill() {
            tracing::trace!(plugin = %self.name, error = %e, "Plugin already exited");
        }
        let _ = child.wait();
    }
}

impl Plugin for ProcessPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self) -> Result<()> {
        {
            let mut guard = self.conn.lock();
            if guard.is_some() {
                return Ok(());
            }
            *guard = Some(self.spawn()?);
        }

        if let Err(e) = self.call("init", JsonValue::Null) {
            if let Some(conn) = self.conn.lock().take() {
                self.stop(conn);
            }
            return Err(e);
        }
        Ok(())
    }

    fn shutdown(&self) {
        if self.conn.lock().is_none() {
            return;
        }
        if let Err(e) = self.call("shutdown", JsonValue::Null) {
            tracing::debug!(plugin = %self.name, error = %e, "Plugin shutdown request failed");
        }
        if let Some(conn) = self.conn.lock().take() {
            self.stop(conn);
        }
    }

    fn process_entity(&self, opts: &PluginOpts) -> Result<PluginResult> {
        self.process("process_entity", opts)
    }

    fn process_group(&self, opts: &PluginOpts) -> Result<PluginResult> {
        self.process("process_group", opts)
    }
}

impl Drop for ProcessPlugin {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take() {
            self.stop(conn);
        }
    }
}
