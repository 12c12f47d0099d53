mod cert_type;
mod certificate;
mod config;
mod domain;
mod log_level;

pub use cert_type::*;
pub use certificate::*;
pub use config::*;
pub use domain::*;
pub use log_level::*;
