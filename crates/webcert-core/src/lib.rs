//! Lifecycle management of the TLS certificate served by a local web server: choosing the
//! certificate source, generating or requesting the certificate, switching HTTPS on and off
//! through symlinks and restarting the server so it picks the changes up.

pub mod activation;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod process;
pub mod renewal;
pub mod service;
pub mod tls;

pub use error::{CertError, ErrorKind};
pub use lifecycle::{CertGenOptions, Lifecycle, Outcome};
