// Certificate material persistence

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use log::info;

use crate::{
    config::{CertificateMaterial, temp_sibling},
    error::CertError,
};

/// Mode of the private key file: owner read/write only
pub const PRIVATE_KEY_MODE: u32 = 0o600;

/// Mode of the full chain file: world readable
pub const FULLCHAIN_MODE: u32 = 0o644;

/// Save a key and full chain to their material paths (atomic write)
pub fn store_material(
    material: &CertificateMaterial,
    fullchain_pem: &[u8],
    key_pem: &[u8],
) -> Result<(), CertError> {
    write_with_mode(&material.fullchain, fullchain_pem, FULLCHAIN_MODE)?;
    write_with_mode(&material.key, key_pem, PRIVATE_KEY_MODE)?;

    info!(
        "Stored certificate material: {} and {}",
        material.key.display(),
        material.fullchain.display()
    );

    return Ok(());
}

fn write_with_mode(path: &Path, contents: &[u8], mode: u32) -> Result<(), CertError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| CertError::io(parent, e))?;

    let temp = temp_sibling(path);
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    // The mode applies from creation, so the key is never readable by others
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        log::warn!(
            "File permissions not restricted on this platform. Please manually restrict access to: {}",
            path.display()
        );
    }

    let written = options
        .open(&temp)
        .and_then(|mut file| file.write_all(contents).and_then(|_| file.sync_all()));
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(CertError::io(&temp, e));
    }

    // A leftover temp file from a crashed run keeps its old mode, so set it explicitly
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&temp, fs::Permissions::from_mode(mode))
            .map_err(|e| CertError::io(&temp, e))?;
    }

    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        CertError::io(path, e)
    })?;

    Ok(())
}
