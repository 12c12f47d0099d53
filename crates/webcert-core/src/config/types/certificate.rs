use std::path::{Path, PathBuf};

/// File name of the private key inside a material directory
pub const PRIVKEY_FILE: &str = "privkey.pem";

/// File name of the full chain inside a material directory
pub const FULLCHAIN_FILE: &str = "fullchain.pem";

/// A private key and the full chain that goes with it.
///
/// # Example
/// ```
/// use webcert::config::CertificateMaterial;
///
/// let material = CertificateMaterial::in_dir("/opt/www/self_signed");
/// assert!(material.key.ends_with("privkey.pem"));
/// assert!(material.fullchain.ends_with("fullchain.pem"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateMaterial {
    /// Path to the private key PEM file
    pub key: PathBuf,
    /// Path to the full chain PEM file
    pub fullchain: PathBuf,
}

impl CertificateMaterial {
    /// Creates a new pair from explicit paths.
    pub fn new(key: impl Into<PathBuf>, fullchain: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            fullchain: fullchain.into(),
        }
    }

    /// The conventional `privkey.pem` / `fullchain.pem` pair inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(PRIVKEY_FILE), dir.join(FULLCHAIN_FILE))
    }

    /// Whether both files exist (symlinks are followed).
    pub fn exists(&self) -> bool {
        self.key.is_file() && self.fullchain.is_file()
    }
}
