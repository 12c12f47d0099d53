use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use webcert::{
    CertGenOptions, Lifecycle, Outcome,
    config::{ConfigStore, LogLevel},
    process::system::SystemRunner,
};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a new certificate (or request one from Let's Encrypt) and make it active
    CertGen {
        /// The certificate source: lets-encrypt or self-signed
        #[arg(long, value_name = "TYPE")]
        cert_type: Option<String>,

        /// The domain the certificate is issued for, an empty value clears it
        #[arg(long, value_name = "DOMAIN")]
        domain: Option<String>,

        /// The contact email given to Let's Encrypt, an empty value clears it
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,

        /// Only update the configuration
        #[arg(long)]
        config_only: bool,
    },

    /// Make a certificate obtained elsewhere the active one
    CertInstall {
        /// Path to the private key PEM file
        #[arg(long, value_name = "PATH")]
        key: PathBuf,

        /// Path to the full chain PEM file
        #[arg(long, value_name = "PATH")]
        fullchain: PathBuf,
    },

    /// Schedule automatic renewal of the Let's Encrypt certificate
    CronRenewal {
        /// Remove the scheduled renewal instead
        #[arg(long)]
        disable: bool,
    },

    /// Enable the HTTPS server
    EnableHttps,

    /// Disable the HTTPS server
    DisableHttps,
}

#[derive(Parser, Debug)]
#[command(name = "webcert", version, about, long_about = None)]
pub struct Cli {
    /// The installation root that relative configuration paths are resolved against
    #[arg(long, env = "WEBCERT_ROOT", default_value = ".", global = true)]
    root: PathBuf,

    /// The log level for the application, overrides `log_level` from the configuration
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,

    #[arg(skip)]
    log_file: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn new() -> Self {
        let mut cli = Cli::parse();
        cli.init_logger();
        cli
    }

    /// Whether log output goes to a file rather than stderr
    pub fn logs_to_file(&self) -> bool {
        self.log_file.is_some()
    }

    fn init_logger(&mut self) {
        // A broken configuration is reported by the command itself
        let config = ConfigStore::new(&self.root).load().ok();

        // NOTE: the CLI argument always wins over the configuration file
        let level = self
            .log_level
            .clone()
            .or_else(|| config.as_ref().map(|config| config.log_level.clone()))
            .unwrap_or_default()
            .to_log_level_filter();

        let mut builder = env_logger::Builder::new();
        builder.filter_level(level);

        if let Some(path) = config.and_then(|config| config.log_path) {
            match open_log_file(&path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                    self.log_file = Some(path);
                }
                Err(e) => eprintln!("Failed to open the log file {}: {e}", path.display()),
            }
        }

        builder.init();
    }

    pub async fn execute(&self) -> Result<(), CliError> {
        let root = std::path::absolute(&self.root).map_err(|source| CliError::Root {
            path: self.root.clone(),
            source,
        })?;

        let store = ConfigStore::new(root);
        let runner = SystemRunner::from_config(&store.load()?);
        let lifecycle = Lifecycle::new(store, runner);

        let outcome = match &self.command {
            Commands::CertGen {
                cert_type,
                domain,
                email,
                config_only,
            } => {
                lifecycle
                    .cert_gen(CertGenOptions {
                        cert_type: cert_type.clone(),
                        domain: domain.clone(),
                        email: email.clone(),
                        config_only: *config_only,
                    })
                    .await?
            }
            Commands::CertInstall { key, fullchain } => {
                lifecycle.cert_install(key, fullchain).await?
            }
            Commands::CronRenewal { disable } => lifecycle.cron_renewal(*disable).await?,
            Commands::EnableHttps => lifecycle.enable_https().await?,
            Commands::DisableHttps => lifecycle.disable_https().await?,
        };

        report(&outcome);
        Ok(())
    }
}

fn report(outcome: &Outcome) {
    for notice in &outcome.notices {
        eprintln!("{notice}");
    }

    if !outcome.message.is_empty() {
        println!("{}", outcome.message);
    }
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    OpenOptions::new().create(true).append(true).open(path)
}
