//! Control over the web server that serves the certificate

use log::info;

use crate::{
    config::Config,
    error::CertError,
    process::{CommandRunner, CommandSpec},
};

/// Runs the configured status/restart shell commands of the web server
pub struct ServiceControl<'a, R: CommandRunner> {
    runner: &'a R,
    status_command: Option<String>,
    restart_command: Option<String>,
}

impl<'a, R: CommandRunner> ServiceControl<'a, R> {
    pub fn new(
        runner: &'a R,
        status_command: Option<String>,
        restart_command: Option<String>,
    ) -> Self {
        Self {
            runner,
            status_command: status_command.filter(|cmd| !cmd.trim().is_empty()),
            restart_command: restart_command.filter(|cmd| !cmd.trim().is_empty()),
        }
    }

    pub fn from_config(runner: &'a R, config: &Config) -> Self {
        Self::new(
            runner,
            config.status_command.clone(),
            config.restart_command.clone(),
        )
    }

    /// Whether the status command reports the web server as running.
    ///
    /// An unset status command counts as not running.
    pub async fn is_running(&self) -> Result<bool, CertError> {
        let Some(status_command) = &self.status_command else {
            info!("Command \"status_command\" not set");
            return Ok(false);
        };

        let output = self.runner.run(&CommandSpec::shell(status_command)).await?;
        Ok(output.success())
    }

    /// Restarts the web server so it picks up the current links
    pub async fn restart(&self) -> Result<(), CertError> {
        let Some(restart_command) = &self.restart_command else {
            info!("Command \"restart_command\" not set");
            return Err(CertError::Process {
                message: "The web server can not be restarted as `restart_command` has not been set"
                    .to_string(),
                stderr: String::new(),
            });
        };

        let output = self.runner.run(&CommandSpec::shell(restart_command)).await?;
        if !output.success() {
            return Err(CertError::Process {
                message: format!("The web server failed to restart (exit status {:?})", output.code),
                stderr: output.stderr,
            });
        }

        Ok(())
    }
}
