use std::{fmt::Display, path::PathBuf};

use thiserror::Error;

/// The broad category of a failure, used to label errors for the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A bad value was supplied by the user; nothing was changed
    Input,
    /// The current state does not allow the requested operation; nothing was changed
    Precondition,
    /// The on-disk state is not what this tool would have produced
    Internal,
    /// A subprocess failed, timed out or could not be started
    ExternalProcess,
    /// Anything else (I/O, configuration, crypto)
    General,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Input => "input error",
            ErrorKind::Precondition => "precondition error",
            ErrorKind::Internal => "internal error",
            ErrorKind::ExternalProcess => "external process error",
            ErrorKind::General => "error",
        };
        write!(f, "{label}")
    }
}

#[derive(Error, Debug)]
pub enum CertError {
    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Internal(String),

    #[error("{}", format_process_error(.message, .stderr))]
    Process { message: String, stderr: String },

    #[error("Error in `{field}`: {message}")]
    ConfigError { field: String, message: String },

    #[error("Failed to parse configuration `{path}`: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("I/O error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid certificate file `{path}`: {message}")]
    InvalidCertificateFile { path: String, message: String },

    #[error("Invalid private key file `{path}`: {message}")]
    InvalidPrivateKeyFile { path: String, message: String },

    #[error("Failed to build the certificate: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
}

fn format_process_error(message: &str, stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        message.to_string()
    } else {
        format!("{message}\n{stderr}")
    }
}

impl CertError {
    /// Returns the category of the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CertError::Input(_)
            | CertError::InvalidCertificateFile { .. }
            | CertError::InvalidPrivateKeyFile { .. } => ErrorKind::Input,
            CertError::Precondition(_) => ErrorKind::Precondition,
            CertError::Internal(_) => ErrorKind::Internal,
            CertError::Process { .. } => ErrorKind::ExternalProcess,
            CertError::ConfigError { .. }
            | CertError::ParseError { .. }
            | CertError::Io { .. }
            | CertError::Crypto(_) => ErrorKind::General,
        }
    }

    /// Wraps an I/O error together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CertError::Io {
            path: path.into(),
            source,
        }
    }
}
