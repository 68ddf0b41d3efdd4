//! Child-process variant of the stdio transport (§4.D, §6): spawns a
//! subcommand with a sanitized environment by default and owns its
//! lifetime, destroying it on [`Transport::close`].

use crate::transport::StdioTransport;
use async_trait::async_trait;
use cormcp_protocol::jsonrpc::Message;
use cormcp_transport::{InboundEvent, Transport, TransportError};
use std::collections::HashMap;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

/// Environment-variable whitelist applied to a spawned child by default (§6).
#[cfg(unix)]
const ENV_WHITELIST: &[&str] = &["HOME", "PATH", "USER", "SHELL", "TERM", "LOGNAME"];

#[cfg(windows)]
const ENV_WHITELIST: &[&str] = &[
    "APPDATA",
    "HOMEDRIVE",
    "HOMEPATH",
    "LOCALAPPDATA",
    "PATH",
    "PROCESSOR_ARCHITECTURE",
    "SYSTEMDRIVE",
    "SYSTEMROOT",
    "TEMP",
    "USERNAME",
    "USERPROFILE",
];

/// Configuration for spawning a child-process transport.
#[derive(Debug, Clone, Default)]
pub struct StdioProcessConfig {
    /// Skip environment sanitization entirely and inherit this process's
    /// full environment. Defaults to `false`.
    pub inherit_env: bool,
    /// Extra variables to set on the child regardless of the whitelist.
    pub extra_env: HashMap<String, String>,
}

/// Build the sanitized environment for a spawned child: the platform
/// whitelist of §6, skipping any value that begins with `()` (a function
/// export smuggled through an environment variable), merged with
/// `extra_env`.
pub fn sanitized_environment(config: &StdioProcessConfig) -> HashMap<String, String> {
    let mut env = HashMap::new();
    for key in ENV_WHITELIST {
        if let Ok(value) = std::env::var(key) {
            if !value.starts_with("()") {
                env.insert((*key).to_string(), value);
            }
        }
    }
    env.extend(config.extra_env.clone());
    env
}

/// A stdio transport backed by a spawned child process; the process is
/// killed when the transport is closed or dropped.
pub struct ChildProcessTransport {
    inner: StdioTransport<ChildStdout, ChildStdin>,
    child: Child,
}

impl ChildProcessTransport {
    /// Spawn `program` with `args`, wiring its stdin/stdout as the
    /// transport's byte stream. Applies [`sanitized_environment`] unless
    /// `config.inherit_env` is set.
    pub fn spawn(
        program: &str,
        args: &[String],
        config: &StdioProcessConfig,
    ) -> Result<Self, TransportError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit());

        if !config.inherit_env {
            command.env_clear();
            command.envs(sanitized_environment(config));
        } else {
            command.envs(config.extra_env.clone());
        }

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        Ok(Self {
            inner: StdioTransport::new(stdout, stdin),
            child,
        })
    }
}

#[async_trait]
impl Transport for ChildProcessTransport {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<InboundEvent>, TransportError> {
        self.inner.start().await
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        self.inner.send(message).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close().await?;
        let _ = self.child.start_kill();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_skips_shell_function_exports() {
        std::env::set_var("PATH", "()  { :; }; echo vulnerable");
        let mut config = StdioProcessConfig::default();
        config.extra_env.insert("FOO".into(), "bar".into());
        let env = sanitized_environment(&config);
        assert!(!env.contains_key("PATH"));
        assert_eq!(env.get("FOO"), Some(&"bar".to_string()));
    }

    #[test]
    fn whitelist_passes_through_ordinary_values() {
        std::env::set_var("HOME", "/home/tester");
        let config = StdioProcessConfig::default();
        let env = sanitized_environment(&config);
        assert_eq!(env.get("HOME"), Some(&"/home/tester".to_string()));
    }
}
