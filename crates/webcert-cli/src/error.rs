use std::path::PathBuf;

use thiserror::Error;
use webcert::{CertError, ErrorKind};

#[derive(Error, Debug)]
pub(crate) enum CliError {
    #[error("Failed to resolve the root directory `{path}`: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Cert(#[from] CertError),
}

impl CliError {
    /// The label printed in front of the message
    pub fn kind(&self) -> ErrorKind {
        match self {
            CliError::Root { .. } => ErrorKind::General,
            CliError::Cert(e) => e.kind(),
        }
    }
}
