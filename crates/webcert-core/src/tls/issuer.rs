// Certificate issuance through an external ACME client

use std::path::{Path, PathBuf};

use log::info;

use crate::{
    config::{Config, Domain},
    error::CertError,
    process::{CommandRunner, CommandSpec},
};

/// Obtains certificates from a public certificate authority by running the ACME client.
///
/// The client writes `privkey.pem` and `fullchain.pem` under `<live dir>/<domain>/`; the
/// `--config-dir` handed to it is the parent of the configured live directory.
pub struct CertbotIssuer<'a, R: CommandRunner> {
    runner: &'a R,
    certbot_bin: String,
    config_dir: Option<PathBuf>,
}

impl<'a, R: CommandRunner> CertbotIssuer<'a, R> {
    pub fn new(runner: &'a R, certbot_bin: impl Into<String>, live_dir: &Path) -> Self {
        Self {
            runner,
            certbot_bin: certbot_bin.into(),
            config_dir: live_dir.parent().map(Path::to_path_buf),
        }
    }

    pub fn from_config(runner: &'a R, config: &Config) -> Self {
        Self::new(runner, &config.certbot_bin, &config.letsencrypt_live_dir)
    }

    /// The command line used to request a certificate
    pub fn command(&self, domain: &Domain, email: &str, plugin_flags: &[String]) -> CommandSpec {
        let mut command = CommandSpec::new(&self.certbot_bin).args([
            "certonly",
            "--non-interactive",
            "--agree-tos",
            "--keep-until-expiring",
        ]);

        if let Some(config_dir) = &self.config_dir {
            command = command
                .arg("--config-dir")
                .arg(config_dir.to_string_lossy());
        }

        command
            .arg("--email")
            .arg(email)
            .arg("--domain")
            .arg(domain.as_str())
            .args(plugin_flags.iter().cloned())
    }

    /// Requests (or renews) the certificate, surfacing the client's stderr on failure
    pub async fn issue(
        &self,
        domain: &Domain,
        email: &str,
        plugin_flags: &[String],
    ) -> Result<(), CertError> {
        let command = self.command(domain, email, plugin_flags);
        info!("Requesting a Let's Encrypt certificate for {domain}");

        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(CertError::Process {
                message: format!("Failed to generate the Let's Encrypt certificate for {domain}"),
                stderr: output.stderr,
            });
        }

        info!("Certificate issued for {domain}");
        Ok(())
    }
}
