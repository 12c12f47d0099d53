use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use toml::{Table, Value};

use crate::error::CertError;

use super::{Config, toml::Toml, toml::table_to_config};

/// The core configuration file, relative to the root
pub const CORE_CONFIG_FILE: &str = "etc/webcert.toml";

/// The local override file, relative to the root
pub const LOCAL_CONFIG_FILE: &str = "etc/webcert.local.toml";

/// Reads and writes the configuration files of an installation.
///
/// Nothing is cached: every call to [`ConfigStore::load`] goes back to disk, since other
/// invocations (or scripts) may rewrite the files at any time.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
    core_path: PathBuf,
    local_path: PathBuf,
}

impl ConfigStore {
    /// A store using the default file locations under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            core_path: root.join(CORE_CONFIG_FILE),
            local_path: root.join(LOCAL_CONFIG_FILE),
            root,
        }
    }

    /// A store with explicit file locations
    pub fn with_paths(
        root: impl Into<PathBuf>,
        core_path: impl Into<PathBuf>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            core_path: core_path.into(),
            local_path: local_path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn core_path(&self) -> &Path {
        &self.core_path
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Reloads the configuration; values from the local file win over the core file
    pub fn load(&self) -> Result<Config, CertError> {
        let mut table = read_table(&self.core_path)?.unwrap_or_default();
        if let Some(local) = read_table(&self.local_path)? {
            table.extend(local);
        }

        let mut config = table_to_config(table)?;
        config.validate()?;
        config.resolve_paths(&self.root);

        Ok(config)
    }

    /// Persists the operator-provided values (`cert_type`, `email`, `domain`) to the local file.
    ///
    /// The domain is left out when it matches the core file, so later edits to the core file
    /// still take effect. A cleared value that the core file sets is stored as an empty string,
    /// which masks the core value.
    pub fn save_local(&self, config: &Config) -> Result<(), CertError> {
        let core = read_table(&self.core_path)?.unwrap_or_default();
        let mut local = read_table(&self.local_path)?.unwrap_or_default();

        local.insert(
            "cert_type".to_string(),
            Value::String(config.cert_type.clone()),
        );
        set_or_clear(&mut local, &core, "email", config.email.as_deref());
        set_or_clear(&mut local, &core, "domain", config.domain.as_deref());

        let core_domain = core.get("domain").and_then(Value::as_str);
        if core_domain.is_some() && core_domain == config.domain.as_deref() {
            local.remove("domain");
        }

        let document = Toml::to_format_string(&local)?;
        write_atomic(&self.local_path, document.as_bytes())?;
        info!("Saved local configuration: {}", self.local_path.display());

        Ok(())
    }
}

fn set_or_clear(local: &mut Table, core: &Table, key: &str, value: Option<&str>) {
    match value {
        Some(value) if !value.is_empty() => {
            local.insert(key.to_string(), Value::String(value.to_string()));
        }
        _ if core.contains_key(key) => {
            local.insert(key.to_string(), Value::String(String::new()));
        }
        _ => {
            local.remove(key);
        }
    }
}

fn read_table(path: &Path) -> Result<Option<Table>, CertError> {
    if !path.exists() {
        debug!("Missing config: {}", path.display());
        return Ok(None);
    }

    let input = fs::read_to_string(path).map_err(|e| CertError::io(path, e))?;
    let table = Toml::new(&input)
        .parse_table()
        .map_err(|e| CertError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    debug!("Loaded config: {}", path.display());

    Ok(Some(table))
}

/// Writes `contents` next to `path` and renames it into place
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CertError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| CertError::io(parent, e))?;

    let temp = temp_sibling(path);
    fs::write(&temp, contents).map_err(|e| CertError::io(&temp, e))?;
    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        CertError::io(path, e)
    })?;

    Ok(())
}

/// A hidden, process-specific path in the same directory as `path`
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
