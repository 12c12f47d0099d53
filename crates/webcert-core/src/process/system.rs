use std::{process::Stdio, time::Duration};

use log::{debug, info};
use tokio::process::Command;

use crate::{config::Config, error::CertError};

use super::{CommandOutput, CommandRunner, CommandSpec};

/// Runs commands as real child processes, killing them once the timeout elapses
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// A runner honouring the configured `command_timeout`
    pub fn from_config(config: &Config) -> Self {
        Self::new(Duration::from_secs(config.command_timeout))
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CertError> {
        info!("Running: {command}");

        let mut child = Command::new(&command.program);
        child
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, child.output()).await {
            Ok(result) => result.map_err(|e| CertError::Process {
                message: format!("Failed to run `{command}`: {e}"),
                stderr: String::new(),
            })?,
            Err(_) => {
                return Err(CertError::Process {
                    message: format!(
                        "`{command}` did not finish within {}s and has been stopped",
                        self.timeout.as_secs_f64()
                    ),
                    stderr: String::new(),
                });
            }
        };

        let output = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        info!("Exited: {:?}", output.code);
        debug!("STDOUT: {}", output.stdout);
        debug!("STDERR: {}", output.stderr);

        Ok(output)
    }
}
