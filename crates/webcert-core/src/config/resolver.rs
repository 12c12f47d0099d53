use log::warn;

use crate::error::CertError;

use super::{CertificateType, Config, ConfigStore, SELF_SIGNED_TOKEN};

/// The outcome of resolving the configured certificate type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub cert_type: CertificateType,

    /// Set when the stored value was unrecognised and has been rewritten to self-signed
    pub corrected: bool,
}

/// Resolves `config.cert_type` into a [`CertificateType`].
///
/// An unrecognised value is reported, replaced by the self-signed token and persisted to the
/// local configuration. The result must not be kept around: call this again (on a freshly
/// loaded config) whenever the type is needed.
pub fn resolve_cert_type(
    store: &ConfigStore,
    config: &mut Config,
) -> Result<Resolution, CertError> {
    if let Some(cert_type) = CertificateType::parse(&config.cert_type) {
        return Ok(Resolution {
            cert_type,
            corrected: false,
        });
    }

    warn!(
        "Unrecognized certificate type: {:?}. Falling back to {SELF_SIGNED_TOKEN}, your mileage may vary.",
        config.cert_type
    );
    config.cert_type = SELF_SIGNED_TOKEN.to_string();
    store.save_local(config)?;

    Ok(Resolution {
        cert_type: CertificateType::SelfSigned,
        corrected: true,
    })
}
