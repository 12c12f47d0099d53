//! HTTPS activation through symlinks.
//!
//! Each path in `https_enable_paths` has a parked counterpart with a `.disabled` suffix (for
//! example a web server config fragment). HTTPS is enabled when every path is a symlink to its
//! counterpart and disabled when none of the paths exist. Anything in between is reported as
//! [`ActivationState::Mixed`] and never produced here.
//!
//! The active certificate is a second pair of symlinks (`ssl_privkey`, `ssl_fullchain`) that
//! [`link_certificates`] points at freshly generated material.

use std::{
    fs,
    io::ErrorKind as IoErrorKind,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    config::{CertificateMaterial, temp_sibling},
    error::CertError,
};

/// Suffix of the parked counterpart of an activation path
pub const DISABLED_SUFFIX: &str = ".disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Enabled,
    Disabled,
    /// Some but not all activation paths are linked
    Mixed,
}

/// What currently sits at an activation or certificate link path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Linked,
    Missing,
    /// A regular file or directory where a symlink is expected
    Foreign,
}

/// `<path>.disabled`
pub fn disabled_path(path: &Path) -> PathBuf {
    let mut disabled = path.as_os_str().to_owned();
    disabled.push(DISABLED_SUFFIX);
    PathBuf::from(disabled)
}

/// Looks at `path` without following it
pub fn link_status(path: &Path) -> Result<LinkStatus, CertError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => Ok(LinkStatus::Linked),
        Ok(_) => Ok(LinkStatus::Foreign),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(LinkStatus::Missing),
        Err(e) => Err(CertError::io(path, e)),
    }
}

fn ensure_not_foreign(path: &Path, action: &str) -> Result<(), CertError> {
    if link_status(path)? == LinkStatus::Foreign {
        return Err(CertError::Internal(format!(
            "Cowardly refusing to {action} as the following file is not linked correctly:\n{}",
            path.display()
        )));
    }
    Ok(())
}

/// Atomically points `link` at `target`: a temporary symlink is renamed over the old one, so
/// `link` is never missing. A regular file at `link` is left alone and reported.
pub fn replace_symlink(target: &Path, link: &Path) -> Result<(), CertError> {
    ensure_not_foreign(link, "replace the link")?;

    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent).map_err(|e| CertError::io(parent, e))?;
    }

    let temp = temp_sibling(link);
    // Left behind by an interrupted run of this process id
    if link_status(&temp)? != LinkStatus::Missing {
        fs::remove_file(&temp).map_err(|e| CertError::io(&temp, e))?;
    }

    symlink(target, &temp).map_err(|e| CertError::io(&temp, e))?;
    fs::rename(&temp, link).map_err(|e| {
        let _ = fs::remove_file(&temp);
        CertError::io(link, e)
    })?;

    debug!("Linked {} -> {}", link.display(), target.display());
    Ok(())
}

/// Inspects the activation paths; a foreign file among them is an internal error
pub fn inspect(paths: &[PathBuf]) -> Result<ActivationState, CertError> {
    let mut linked = 0;
    for path in paths {
        ensure_not_foreign(path, "inspect HTTPS")?;
        if link_status(path)? == LinkStatus::Linked {
            linked += 1;
        }
    }

    Ok(if linked == 0 {
        ActivationState::Disabled
    } else if linked == paths.len() {
        ActivationState::Enabled
    } else {
        ActivationState::Mixed
    })
}

/// Points the active certificate links at `material`.
///
/// Idempotent and independent of the activation state.
pub fn link_certificates(
    material: &CertificateMaterial,
    active: &CertificateMaterial,
) -> Result<(), CertError> {
    // Check both before touching either
    ensure_not_foreign(&active.key, "link the certificate")?;
    ensure_not_foreign(&active.fullchain, "link the certificate")?;

    let previous_key = fs::read_link(&active.key).ok();
    replace_symlink(&material.key, &active.key)?;
    if let Err(e) = replace_symlink(&material.fullchain, &active.fullchain) {
        // Never leave the key and chain links pointing at different certificates
        let restored = match &previous_key {
            Some(target) => replace_symlink(target, &active.key),
            None => fs::remove_file(&active.key).map_err(|e| CertError::io(&active.key, e)),
        };
        if let Err(restore) = restored {
            warn!("Failed to restore {}: {restore}", active.key.display());
        }
        return Err(e);
    }

    info!(
        "Linked the active certificate to {} and {}",
        material.key.display(),
        material.fullchain.display()
    );
    Ok(())
}

/// The enable/disable transitions over a set of activation paths
pub struct Activation<'a> {
    paths: &'a [PathBuf],
    program_name: &'a str,
}

impl<'a> Activation<'a> {
    pub fn new(paths: &'a [PathBuf], program_name: &'a str) -> Self {
        Self {
            paths,
            program_name,
        }
    }

    /// Reads the current state from disk
    pub fn state(&self) -> Result<ActivationState, CertError> {
        inspect(self.paths)
    }

    pub fn is_enabled(&self) -> Result<bool, CertError> {
        Ok(self.state()? == ActivationState::Enabled)
    }

    fn ensure_configured(&self) -> Result<(), CertError> {
        if self.paths.is_empty() {
            return Err(CertError::Internal(
                "No `https_enable_paths` have been configured, HTTPS can not be toggled!\nPlease contact your system administrator for further assistance."
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Links every activation path to its parked counterpart.
    ///
    /// `active` are the certificate links the web server reads; both must resolve to files.
    pub fn enable(&self, active: &CertificateMaterial) -> Result<(), CertError> {
        self.ensure_configured()?;

        if !active.exists() {
            return Err(CertError::Precondition(format!(
                "In order to enable HTTPS a set of SSL certificates need to be generated.\nPlease run the following to generate the certificates with Let's Encrypt:\n{} cert-gen --cert-type lets-encrypt --domain DOMAIN --email EMAIL",
                self.program_name
            )));
        }

        match self.state()? {
            ActivationState::Disabled => {}
            ActivationState::Enabled => {
                return Err(CertError::Precondition(
                    "The HTTPS server is already enabled".to_string(),
                ));
            }
            ActivationState::Mixed => return Err(self.mixed_error()),
        }

        for path in self.paths {
            let disabled = disabled_path(path);
            if !disabled.exists() {
                return Err(CertError::Internal(format!(
                    "Cowardly refusing to enable HTTPS as the following file is missing:\n{}",
                    disabled.display()
                )));
            }
        }

        let mut linked: Vec<&PathBuf> = Vec::new();
        for path in self.paths {
            if let Err(e) = replace_symlink(&disabled_path(path), path) {
                self.undo_enable(&linked);
                return Err(e);
            }
            linked.push(path);
        }

        info!("Linked {} HTTPS path(s)", linked.len());
        Ok(())
    }

    /// Removes the links created by [`Activation::enable`]; the parked files are untouched
    pub fn disable(&self) -> Result<(), CertError> {
        self.ensure_configured()?;

        match self.state()? {
            ActivationState::Enabled => {}
            ActivationState::Disabled => {
                return Err(CertError::Precondition(
                    "The HTTPS server is already disabled".to_string(),
                ));
            }
            ActivationState::Mixed => return Err(self.mixed_error()),
        }

        let mut removed: Vec<(&PathBuf, PathBuf)> = Vec::new();
        for path in self.paths {
            let target = fs::read_link(path).map_err(|e| CertError::io(path, e));
            let result = target.and_then(|target| {
                fs::remove_file(path).map_err(|e| CertError::io(path, e))?;
                Ok(target)
            });

            match result {
                Ok(target) => removed.push((path, target)),
                Err(e) => {
                    self.undo_disable(&removed);
                    return Err(e);
                }
            }
        }

        info!("Unlinked {} HTTPS path(s)", removed.len());
        Ok(())
    }

    fn mixed_error(&self) -> CertError {
        CertError::Internal(format!(
            "The HTTPS paths are in an inconsistent state, some are linked and some are not:\n{}",
            self.paths
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        ))
    }

    fn undo_enable(&self, linked: &[&PathBuf]) {
        for path in linked {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to roll back the link at {}: {e}", path.display());
            }
        }
    }

    fn undo_disable(&self, removed: &[(&PathBuf, PathBuf)]) {
        for (path, target) in removed {
            if let Err(e) = symlink(target, path) {
                warn!("Failed to restore the link at {}: {e}", path.display());
            }
        }
    }
}
