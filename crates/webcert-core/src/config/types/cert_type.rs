use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::CertError;

/// The token persisted for self-signed certificates
pub const SELF_SIGNED_TOKEN: &str = "self-signed";

/// The token persisted for externally-issued (Let's Encrypt) certificates
pub const LETS_ENCRYPT_TOKEN: &str = "lets-encrypt";

// Canonicalised spellings accepted for each certificate source
const SELF_SIGNED_SYNONYMS: &[&str] = &["selfsigned"];
const EXTERNALLY_ISSUED_SYNONYMS: &[&str] = &["letsencrypt", "externallyissued"];

/// The source of the certificate served over HTTPS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateType {
    /// Generated locally and signed by its own key
    SelfSigned,

    /// Issued by a public certificate authority through the ACME client
    ExternallyIssued,
}

impl CertificateType {
    /// Matches a loosely formatted value against the known spellings.
    ///
    /// Case and separators are ignored, so `lets-encrypt`, `LETS_ENCRYPT`, `letsEncrypt` and
    /// `:lets_encrypt` all resolve to the same type.
    pub fn parse(raw: &str) -> Option<CertificateType> {
        let canonical = canonicalize(raw);

        if SELF_SIGNED_SYNONYMS.contains(&canonical.as_str()) {
            Some(CertificateType::SelfSigned)
        } else if EXTERNALLY_ISSUED_SYNONYMS.contains(&canonical.as_str()) {
            Some(CertificateType::ExternallyIssued)
        } else {
            None
        }
    }

    /// The token written to the configuration for this type
    pub fn token(&self) -> &'static str {
        match self {
            CertificateType::SelfSigned => SELF_SIGNED_TOKEN,
            CertificateType::ExternallyIssued => LETS_ENCRYPT_TOKEN,
        }
    }

    pub fn is_self_signed(&self) -> bool {
        matches!(self, CertificateType::SelfSigned)
    }
}

impl std::str::FromStr for CertificateType {
    type Err = CertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CertificateType::parse(s).ok_or_else(|| {
            CertError::Input(format!(
                "Unrecognized certificate type: {s}\nPlease select either: {LETS_ENCRYPT_TOKEN} or {SELF_SIGNED_TOKEN}"
            ))
        })
    }
}

impl Display for CertificateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Lower-cases the value and drops everything that is not a letter or a digit
pub fn canonicalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
