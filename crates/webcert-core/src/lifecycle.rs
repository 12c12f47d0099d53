//! The operator-facing commands, orchestrated over the components.
//!
//! Every command starts by reloading the configuration from disk and resolves the certificate
//! type again, since other invocations (such as the renewal job) may have changed it.

use std::path::Path;

use log::{info, warn};

use crate::{
    activation::{Activation, link_certificates},
    config::{
        CertificateMaterial, CertificateType, Config, ConfigStore, Domain, LETS_ENCRYPT_TOKEN,
        SELF_SIGNED_TOKEN, resolve_cert_type,
    },
    error::CertError,
    process::{CommandRunner, CommandSpec},
    renewal::RenewalScheduler,
    service::ServiceControl,
    tls::{CertbotIssuer, SelfSignedBuilder, store_material, validate_material},
};

/// What a successful command reports back to the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// The summary line, printed on stdout
    pub message: String,

    /// Notices and follow-up hints, printed on stderr
    pub notices: Vec<String>,
}

impl Outcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            notices: Vec::new(),
        }
    }

    fn notice(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }
}

/// Flags of `cert-gen`; `None` leaves the stored value alone and an empty string clears it
#[derive(Debug, Clone, Default)]
pub struct CertGenOptions {
    pub cert_type: Option<String>,
    pub domain: Option<String>,
    pub email: Option<String>,
    pub config_only: bool,
}

pub struct Lifecycle<R: CommandRunner> {
    store: ConfigStore,
    runner: R,
}

impl<R: CommandRunner> Lifecycle<R> {
    pub fn new(store: ConfigStore, runner: R) -> Self {
        Self { store, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Updates the configuration, then generates (or requests) the certificate and makes it the
    /// active one. The web server is restarted when HTTPS is enabled.
    pub async fn cert_gen(&self, options: CertGenOptions) -> Result<Outcome, CertError> {
        let mut config = self.store.load()?;
        let mut outcome = Outcome::default();

        apply_options(&mut config, &options, &mut outcome)?;
        let resolution = resolve_cert_type(&self.store, &mut config)?;
        if resolution.corrected {
            outcome.notice(format!(
                "Unrecognized certificate type, reverted to {SELF_SIGNED_TOKEN}"
            ));
        }
        let cert_type = resolution.cert_type;

        // Checked before the domain is defaulted, so no command runs for a bad invocation
        if cert_type == CertificateType::ExternallyIssued && config.email().is_none() {
            return Err(CertError::Precondition(
                "Let's Encrypt certificates require an email address!\nPlease provide the following flag: --email EMAIL"
                    .to_string(),
            ));
        }

        if config.domain.as_deref().is_none_or(str::is_empty) {
            let domain = self.default_domain().await?;
            warn!("Reverting to the default domain: {domain}");
            outcome.notice(format!("Reverting to the default domain: {domain}"));
            config.domain = Some(domain.name);
        }

        self.store.save_local(&config)?;
        if options.config_only {
            outcome.message = "The configuration has been updated".to_string();
            return Ok(outcome);
        }

        let domain = config.domain()?;
        let material = match cert_type {
            CertificateType::SelfSigned => self.generate_self_signed(&config, &domain)?,
            CertificateType::ExternallyIssued => self.request_certificate(&config, &domain).await?,
        };

        link_certificates(&material, &config.active_material())?;
        self.restart_if_enabled(
            &config,
            "Certificate generated.",
            "The certificate has been generated but the web server failed to restart!",
            outcome,
        )
        .await
    }

    /// Makes operator-supplied material the active certificate
    pub async fn cert_install(&self, key: &Path, fullchain: &Path) -> Result<Outcome, CertError> {
        let mut config = self.store.load()?;
        let material = validate_material(key, fullchain)?;

        config.cert_type = LETS_ENCRYPT_TOKEN.to_string();
        self.store.save_local(&config)?;
        link_certificates(&material, &config.active_material())?;

        let activation = Activation::new(&config.https_enable_paths, &config.program_name);
        let service = ServiceControl::from_config(&self.runner, &config);
        if activation.is_enabled()? && !service.is_running().await? {
            info!("The web server is not running, skipping the restart");
            let mut outcome = Outcome::new("Certificate installed.");
            outcome.notice("The web server is not running and has not been restarted");
            return Ok(outcome);
        }

        self.restart_if_enabled(
            &config,
            "Certificate installed.",
            "Failed to restart the web server with the new certificate!",
            Outcome::default(),
        )
        .await
    }

    /// Installs (or with `disable`, removes) the scheduled renewal script
    pub async fn cron_renewal(&self, disable: bool) -> Result<Outcome, CertError> {
        let mut config = self.store.load()?;
        let scheduler = RenewalScheduler::from_config(&config, self.store.root());

        let message = if disable {
            scheduler.disable()?
        } else {
            let cert_type = resolve_cert_type(&self.store, &mut config)?.cert_type;
            scheduler.enable(cert_type)?
        };

        Ok(Outcome::new(message))
    }

    pub async fn enable_https(&self) -> Result<Outcome, CertError> {
        let config = self.store.load()?;
        let activation = Activation::new(&config.https_enable_paths, &config.program_name);
        activation.enable(&config.active_material())?;

        ServiceControl::from_config(&self.runner, &config)
            .restart()
            .await
            .map_err(|e| {
                with_caveat(
                    &format!(
                        "HTTPS has been enabled but the web server failed to restart!\nHTTPS may be disabled again with: {} disable-https",
                        config.program_name
                    ),
                    e,
                )
            })?;

        Ok(Outcome::new("HTTPS has been enabled"))
    }

    pub async fn disable_https(&self) -> Result<Outcome, CertError> {
        let config = self.store.load()?;
        let activation = Activation::new(&config.https_enable_paths, &config.program_name);
        activation.disable()?;

        ServiceControl::from_config(&self.runner, &config)
            .restart()
            .await
            .map_err(|e| {
                with_caveat(
                    "HTTPS has been disabled but the web server failed to restart!",
                    e,
                )
            })?;

        Ok(Outcome::new("HTTPS has been disabled"))
    }

    async fn default_domain(&self) -> Result<Domain, CertError> {
        let output = self
            .runner
            .run(&CommandSpec::new("hostname").arg("--fqdn"))
            .await?;

        if !output.success() {
            return Err(CertError::Process {
                message: "Failed to determine the default domain".to_string(),
                stderr: output.stderr,
            });
        }

        let hostname = output.stdout.trim();
        if hostname.is_empty() {
            return Err(CertError::Precondition(
                "The domain has not been set and the host has no fully qualified name!\nPlease provide the following flag: --domain DOMAIN"
                    .to_string(),
            ));
        }

        Domain::try_from(hostname)
    }

    fn generate_self_signed(
        &self,
        config: &Config,
        domain: &Domain,
    ) -> Result<CertificateMaterial, CertError> {
        let certificate = SelfSignedBuilder::new(domain.as_str(), config.email()).build()?;
        let material = config.selfsigned_material();
        store_material(
            &material,
            certificate.fullchain_pem().as_bytes(),
            certificate.private_key_pem().as_bytes(),
        )?;

        Ok(material)
    }

    async fn request_certificate(
        &self,
        config: &Config,
        domain: &Domain,
    ) -> Result<CertificateMaterial, CertError> {
        let service = ServiceControl::from_config(&self.runner, config);
        if !service.is_running().await? {
            return Err(CertError::Precondition(
                "The web server must be running to complete the Let's Encrypt domain validation!\nPlease start the web server and try again"
                    .to_string(),
            ));
        }

        // The email has been checked by the caller
        let email = config.email().unwrap_or_default();
        CertbotIssuer::from_config(&self.runner, config)
            .issue(domain, email, &config.plugin_flags())
            .await?;

        let material = config.letsencrypt_material()?;
        if !material.exists() {
            return Err(CertError::Internal(format!(
                "The ACME client succeeded but the certificate is missing:\n{}\n{}",
                material.key.display(),
                material.fullchain.display()
            )));
        }

        Ok(material)
    }

    /// Restarts the web server when HTTPS is enabled, otherwise tells the operator how to
    /// enable it
    async fn restart_if_enabled(
        &self,
        config: &Config,
        message: &str,
        caveat: &str,
        mut outcome: Outcome,
    ) -> Result<Outcome, CertError> {
        let activation = Activation::new(&config.https_enable_paths, &config.program_name);
        if activation.is_enabled()? {
            ServiceControl::from_config(&self.runner, config)
                .restart()
                .await
                .map_err(|e| with_caveat(caveat, e))?;
        } else {
            outcome.notice(format!(
                "You can now enable the HTTPS server with: {} enable-https",
                config.program_name
            ));
        }

        outcome.message = message.to_string();
        Ok(outcome)
    }
}

/// Applies the `cert-gen` flags to the loaded configuration
fn apply_options(
    config: &mut Config,
    options: &CertGenOptions,
    outcome: &mut Outcome,
) -> Result<(), CertError> {
    if let Some(cert_type) = options.cert_type.as_deref() {
        let cert_type: CertificateType = cert_type.parse()?;
        config.cert_type = cert_type.token().to_string();
    }

    match options.email.as_deref() {
        Some("") => {
            outcome.notice("Clearing the email setting...");
            config.email = None;
        }
        Some(email) => config.email = Some(email.to_string()),
        None => {}
    }

    match options.domain.as_deref() {
        Some("") => {
            outcome.notice("Clearing the domain setting...");
            config.domain = None;
        }
        Some(domain) => config.domain = Some(Domain::try_from(domain)?.name),
        None => {}
    }

    Ok(())
}

/// Prefixes an external process failure with what has already been done
fn with_caveat(caveat: &str, error: CertError) -> CertError {
    match error {
        CertError::Process { message, stderr } => CertError::Process {
            message: format!("{caveat}\n{message}"),
            stderr,
        },
        other => other,
    }
}
