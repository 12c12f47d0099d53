#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use webcert::config::{Config, ConfigStore};

pub const RESTART: &str = "systemctl restart nginx";
pub const STATUS: &str = "systemctl is-active nginx";

const BASE_CONFIG: &str = r#"
certbot_bin = "certbot"
status_command = "systemctl is-active nginx"
restart_command = "systemctl restart nginx"
https_enable_paths = ["etc/nginx/https.conf", "etc/nginx/redirect.conf"]
"#;

/// A scratch installation root with a core config and two parked HTTPS fragments
pub struct Installation {
    pub temp_dir: TempDir,
    pub store: ConfigStore,
}

impl Installation {
    pub fn new() -> Self {
        Self::with_config("")
    }

    pub fn with_config(extra: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path());

        fs::create_dir_all(temp_dir.path().join("etc/nginx")).unwrap();
        fs::write(store.core_path(), format!("{BASE_CONFIG}{extra}\n")).unwrap();
        for fragment in ["https.conf", "redirect.conf"] {
            fs::write(
                temp_dir.path().join("etc/nginx").join(format!("{fragment}.disabled")),
                "listen 443 ssl;\n",
            )
            .unwrap();
        }

        Self { temp_dir, store }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    pub fn config(&self) -> Config {
        self.store.load().unwrap()
    }

    /// Links the HTTPS fragments without going through the lifecycle
    pub fn link_fragments(&self) {
        for path in self.config().https_enable_paths {
            let mut disabled = path.clone().into_os_string();
            disabled.push(".disabled");
            symlink(PathBuf::from(disabled), path).unwrap();
        }
    }

    /// Writes a key and chain as if a certificate had been generated before
    pub fn write_material(&self, dir: &str) -> (PathBuf, PathBuf) {
        let dir = self.path(dir);
        fs::create_dir_all(&dir).unwrap();
        let key = dir.join("privkey.pem");
        let fullchain = dir.join("fullchain.pem");
        fs::write(&key, "key").unwrap();
        fs::write(&fullchain, "chain").unwrap();
        (key, fullchain)
    }
}

/// Every entry of `dir` with its link target, sorted by name
pub fn snapshot(dir: &Path) -> Vec<(String, Option<PathBuf>)> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().to_string_lossy().to_string(),
                fs::read_link(entry.path()).ok(),
            )
        })
        .collect();
    entries.sort();
    entries
}
