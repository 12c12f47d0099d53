use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CertError;

use super::{CertificateMaterial, Domain, LETS_ENCRYPT_TOKEN, LogLevel};

/// The configuration options available
///
/// Relative paths are resolved against the installation root by [`Config::resolve_paths`].
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// The name used for this tool in remediation hints (default: "webcert")
    #[serde(default = "Config::default_program_name")]
    pub program_name: String,

    /// The raw certificate type, see [`crate::config::resolve_cert_type`] (default: "lets-encrypt")
    #[serde(
        default = "Config::default_cert_type",
        deserialize_with = "scalar_to_string"
    )]
    pub cert_type: String,

    /// The email address registered with the certificate authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// The domain the certificate is issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Where self-signed material is generated (default: "etc/www/self_signed")
    #[serde(default = "Config::default_selfsigned_dir")]
    pub selfsigned_dir: PathBuf,

    /// The active full chain link read by the web server (default: "etc/www/ssl/fullchain.pem")
    #[serde(default = "Config::default_ssl_fullchain")]
    pub ssl_fullchain: PathBuf,

    /// The active private key link read by the web server (default: "etc/www/ssl/privkey.pem")
    #[serde(default = "Config::default_ssl_privkey")]
    pub ssl_privkey: PathBuf,

    /// The ACME client's `live` directory, keyed by domain (default: "etc/letsencrypt/live")
    #[serde(default = "Config::default_letsencrypt_live_dir")]
    pub letsencrypt_live_dir: PathBuf,

    /// The ACME client executable (default: "/usr/local/bin/certbot")
    #[serde(default = "Config::default_certbot_bin")]
    pub certbot_bin: String,

    /// Extra flags handed to the ACME client, whitespace separated (default: "--nginx")
    #[serde(default = "Config::default_certbot_plugin_flags")]
    pub certbot_plugin_flags: String,

    /// Where the renewal script is installed (default: "etc/cron/weekly/cert-renewal")
    #[serde(default = "Config::default_cron_path")]
    pub cron_path: PathBuf,

    /// The body of the renewal script, a built-in script is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_script: Option<String>,

    /// Paths linked to their `.disabled` counterpart while HTTPS is enabled
    #[serde(default)]
    pub https_enable_paths: Vec<PathBuf>,

    /// Shell command reporting whether the web server is running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_command: Option<String>,

    /// Shell command restarting the web server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<String>,

    /// Seconds an external command may run before it is killed (default: 300)
    #[serde(default = "Config::default_command_timeout")]
    pub command_timeout: u64,

    /// Log file, logs go to stderr when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// The log level to use (default: "warn")
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            program_name: Config::default_program_name(),
            cert_type: Config::default_cert_type(),
            email: None,
            domain: None,
            selfsigned_dir: Config::default_selfsigned_dir(),
            ssl_fullchain: Config::default_ssl_fullchain(),
            ssl_privkey: Config::default_ssl_privkey(),
            letsencrypt_live_dir: Config::default_letsencrypt_live_dir(),
            certbot_bin: Config::default_certbot_bin(),
            certbot_plugin_flags: Config::default_certbot_plugin_flags(),
            cron_path: Config::default_cron_path(),
            cron_script: None,
            https_enable_paths: Vec::new(),
            status_command: None,
            restart_command: None,
            command_timeout: Config::default_command_timeout(),
            log_path: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    pub fn default_program_name() -> String {
        "webcert".to_string()
    }

    pub fn default_cert_type() -> String {
        LETS_ENCRYPT_TOKEN.to_string()
    }

    pub fn default_selfsigned_dir() -> PathBuf {
        PathBuf::from("etc/www/self_signed")
    }

    pub fn default_ssl_fullchain() -> PathBuf {
        PathBuf::from("etc/www/ssl/fullchain.pem")
    }

    pub fn default_ssl_privkey() -> PathBuf {
        PathBuf::from("etc/www/ssl/privkey.pem")
    }

    pub fn default_letsencrypt_live_dir() -> PathBuf {
        PathBuf::from("etc/letsencrypt/live")
    }

    pub fn default_certbot_bin() -> String {
        "/usr/local/bin/certbot".to_string()
    }

    pub fn default_certbot_plugin_flags() -> String {
        "--nginx".to_string()
    }

    pub fn default_cron_path() -> PathBuf {
        PathBuf::from("etc/cron/weekly/cert-renewal")
    }

    pub fn default_command_timeout() -> u64 {
        300
    }
}

impl Config {
    /// Makes every relative path absolute by joining it onto `root`
    pub fn resolve_paths(&mut self, root: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        };

        resolve(&mut self.selfsigned_dir);
        resolve(&mut self.ssl_fullchain);
        resolve(&mut self.ssl_privkey);
        resolve(&mut self.letsencrypt_live_dir);
        resolve(&mut self.cron_path);
        for path in self.https_enable_paths.iter_mut() {
            resolve(path);
        }
        if let Some(log_path) = self.log_path.as_mut() {
            resolve(log_path);
        }
    }

    /// Checks the values that can not be fixed up later
    pub fn validate(&self) -> Result<(), CertError> {
        let required_paths = [
            ("selfsigned_dir", &self.selfsigned_dir),
            ("ssl_fullchain", &self.ssl_fullchain),
            ("ssl_privkey", &self.ssl_privkey),
            ("letsencrypt_live_dir", &self.letsencrypt_live_dir),
            ("cron_path", &self.cron_path),
        ];
        for (field, path) in required_paths {
            if path.as_os_str().is_empty() {
                return Err(CertError::ConfigError {
                    field: field.to_string(),
                    message: "The path can not be empty".to_string(),
                });
            }
        }

        if self.ssl_fullchain == self.ssl_privkey {
            return Err(CertError::ConfigError {
                field: "ssl_privkey".to_string(),
                message: "The private key and full chain links must be different paths"
                    .to_string(),
            });
        }

        if self
            .https_enable_paths
            .iter()
            .any(|path| path.as_os_str().is_empty())
        {
            return Err(CertError::ConfigError {
                field: "https_enable_paths".to_string(),
                message: "The paths can not be empty".to_string(),
            });
        }

        if self.certbot_bin.trim().is_empty() {
            return Err(CertError::ConfigError {
                field: "certbot_bin".to_string(),
                message: "The ACME client executable must be set".to_string(),
            });
        }

        if self.command_timeout == 0 {
            return Err(CertError::ConfigError {
                field: "command_timeout".to_string(),
                message: "The timeout must be at least one second".to_string(),
            });
        }

        Ok(())
    }

    /// The links the web server reads the certificate from
    pub fn active_material(&self) -> CertificateMaterial {
        CertificateMaterial::new(&self.ssl_privkey, &self.ssl_fullchain)
    }

    /// Material generated by the self-signed builder
    pub fn selfsigned_material(&self) -> CertificateMaterial {
        CertificateMaterial::in_dir(&self.selfsigned_dir)
    }

    /// Material written by the ACME client for the configured domain
    pub fn letsencrypt_material(&self) -> Result<CertificateMaterial, CertError> {
        let domain = self.domain()?;
        Ok(CertificateMaterial::in_dir(
            self.letsencrypt_live_dir.join(domain.as_str()),
        ))
    }

    /// The configured domain, validated
    pub fn domain(&self) -> Result<Domain, CertError> {
        match self.domain.as_deref() {
            Some(domain) if !domain.is_empty() => Domain::try_from(domain),
            _ => Err(CertError::Precondition(format!(
                "The domain has not been set!\nPlease provide the following flag: --domain DOMAIN\nFor example: {} cert-gen --domain example.com",
                self.program_name
            ))),
        }
    }

    /// The configured email, when present and non-empty
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| !email.is_empty())
    }

    /// The ACME client flags split into arguments
    pub fn plugin_flags(&self) -> Vec<String> {
        self.certbot_plugin_flags
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// The body written to the renewal script.
    ///
    /// The built-in script passes `root` along, as the scheduler runs it from an unrelated
    /// working directory.
    pub fn renewal_script(&self, root: &Path) -> String {
        match self.cron_script.as_deref() {
            Some(script) if !script.trim().is_empty() => script.to_string(),
            _ => format!(
                "#!/bin/sh\n# Renews the certificate, the ACME client skips certificates that are not due\nexec {} --root {} cert-gen\n",
                self.program_name,
                shell_quote(&root.to_string_lossy())
            ),
        }
    }
}

/// Single-quotes `value` for `/bin/sh`
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Accepts any scalar for loosely typed fields, e.g. `cert_type = true` becomes `"true"`
fn scalar_to_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;
    Ok(match value {
        toml::Value::String(value) => value,
        other => other.to_string(),
    })
}
