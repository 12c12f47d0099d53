// Scheduled certificate renewal through a cron script

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind as IoErrorKind, Write},
    path::{Path, PathBuf},
};

use log::info;

use crate::{
    config::{CertificateType, Config, temp_sibling},
    error::CertError,
};

/// Mode of the renewal script: executable by everyone, writable by the owner
pub const SCRIPT_MODE: u32 = 0o755;

/// Installs or removes the script the system scheduler runs to renew certificates.
///
/// The presence of the script at `cron_path` is the only state; nothing else is recorded.
pub struct RenewalScheduler {
    cron_path: PathBuf,
    script: String,
    program_name: String,
}

impl RenewalScheduler {
    pub fn new(
        cron_path: impl Into<PathBuf>,
        script: impl Into<String>,
        program_name: impl Into<String>,
    ) -> Self {
        Self {
            cron_path: cron_path.into(),
            script: script.into(),
            program_name: program_name.into(),
        }
    }

    /// A scheduler for the installation at `root`
    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self::new(
            &config.cron_path,
            config.renewal_script(root),
            &config.program_name,
        )
    }

    pub fn cron_path(&self) -> &Path {
        &self.cron_path
    }

    pub fn is_enabled(&self) -> bool {
        // A dangling symlink still occupies the path
        fs::symlink_metadata(&self.cron_path).is_ok()
    }

    pub fn enable(&self, cert_type: CertificateType) -> Result<&'static str, CertError> {
        if cert_type.is_self_signed() {
            return Err(CertError::Input(
                "Automatic renewal is not supported for self-signed certificates!".to_string(),
            ));
        }

        if self.is_enabled() {
            return Err(CertError::Input(format!(
                "Automatic renewal is already enabled!\nIt can be disabled with: {} cron-renewal --disable",
                self.program_name
            )));
        }

        write_script(&self.cron_path, self.script.as_bytes())?;
        info!("Installed renewal script: {}", self.cron_path.display());

        Ok("Automatic renewal has been enabled")
    }

    pub fn disable(&self) -> Result<&'static str, CertError> {
        match fs::remove_file(&self.cron_path) {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(CertError::Input(
                    "Automatic renewal is already disabled!".to_string(),
                ));
            }
            Err(e) => return Err(CertError::io(&self.cron_path, e)),
        }

        info!("Removed renewal script: {}", self.cron_path.display());
        Ok("Automatic renewal has been disabled")
    }
}

fn write_script(path: &Path, contents: &[u8]) -> Result<(), CertError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| CertError::io(parent, e))?;

    let temp = temp_sibling(path);
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(SCRIPT_MODE);
    }

    let written = options
        .open(&temp)
        .and_then(|mut file| file.write_all(contents).and_then(|_| file.sync_all()));
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(CertError::io(&temp, e));
    }

    // The creation mode is masked by the umask
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp, fs::Permissions::from_mode(SCRIPT_MODE))
            .map_err(|e| CertError::io(&temp, e))?;
    }

    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        CertError::io(path, e)
    })
}
