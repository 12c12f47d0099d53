// Validation of operator-supplied certificate material

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};

use crate::{config::CertificateMaterial, error::CertError};

/// Resolve a certificate/key path to an absolute, symlink-free path of an existing file.
///
/// Installed material is linked by absolute path, so a relative path given on the command
/// line must not end up inside a link.
fn validate_cert_path(path: &Path, file_type: &str) -> Result<PathBuf, CertError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| CertError::Input(format!("Cannot access {file_type} `{}`: {e}", path.display())))?;

    if !canonical.is_file() {
        return Err(CertError::Input(format!(
            "The {file_type} path `{}` is not a file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Load certificate chain from a PEM file, which must hold at least one certificate
pub fn load_certificate_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>, CertError> {
    let safe_path = validate_cert_path(path, "certificate")?;

    let file = File::open(&safe_path).map_err(|e| CertError::InvalidCertificateFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);
    let chain = certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CertError::InvalidCertificateFile {
            path: path.display().to_string(),
            message: format!("Failed to parse certificate: {e}"),
        })?;

    if chain.is_empty() {
        return Err(CertError::InvalidCertificateFile {
            path: path.display().to_string(),
            message: "No certificate found in file".to_string(),
        });
    }

    return Ok(chain);
}

/// Load private key from a PEM file (supports RSA and ECDSA)
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, CertError> {
    let safe_path = validate_cert_path(path, "private key")?;

    let file = File::open(&safe_path).map_err(|e| CertError::InvalidPrivateKeyFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);
    let key = private_key(&mut reader)
        .map_err(|e| CertError::InvalidPrivateKeyFile {
            path: path.display().to_string(),
            message: format!("Failed to parse private key: {e}"),
        })?
        .ok_or_else(|| CertError::InvalidPrivateKeyFile {
            path: path.display().to_string(),
            message: "No private key found in file".to_string(),
        })?;

    return Ok(key);
}

/// Checks that a key and full chain can be served, returning their absolute paths
pub fn validate_material(key: &Path, fullchain: &Path) -> Result<CertificateMaterial, CertError> {
    load_certificate_chain(fullchain)?;
    let private_key = load_private_key(key)?;

    rustls::crypto::aws_lc_rs::sign::any_supported_type(&private_key).map_err(|e| {
        CertError::InvalidPrivateKeyFile {
            path: key.display().to_string(),
            message: format!("Unsupported private key: {e}"),
        }
    })?;

    Ok(CertificateMaterial::new(
        validate_cert_path(key, "private key")?,
        validate_cert_path(fullchain, "certificate")?,
    ))
}
