// Self-signed certificate generation

use chrono::Utc;
use log::debug;
use openssl::{
    asn1::Asn1Time,
    bn::{BigNum, MsbOption},
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    rsa::Rsa,
    x509::{
        X509, X509Builder, X509Name, X509NameBuilder,
        extension::{AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectKeyIdentifier},
    },
};

use crate::error::CertError;

/// RSA modulus length of generated keys
pub const RSA_KEY_BITS: u32 = 2048;

/// Ten years, counting a quarter day per year for leap years and truncated to whole days
pub const VALIDITY_DAYS: i64 = (10 * 36525) / 100;

/// Serial numbers stay below 2^159 so they fit in 20 DER bytes as a positive integer
const SERIAL_BITS: i32 = 159;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Builds a ten year, self-signed certificate for a domain.
///
/// # Example
/// ```no_run
/// use webcert::tls::SelfSignedBuilder;
///
/// let generated = SelfSignedBuilder::new("example.org", None).build().unwrap();
/// assert!(generated.certificate_pem().starts_with("-----BEGIN CERTIFICATE-----"));
/// ```
#[derive(Debug, Clone)]
pub struct SelfSignedBuilder {
    domain: String,
    email: Option<String>,
}

/// A freshly generated certificate and the key it was signed with
pub struct SelfSignedCertificate {
    certificate: X509,
    key: PKey<Private>,
    certificate_pem: String,
    private_key_pem: String,
}

impl SelfSignedBuilder {
    pub fn new(domain: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            domain: domain.into(),
            email: email.filter(|email| !email.is_empty()).map(str::to_string),
        }
    }

    /// The subject (and issuer) in `/CN=.../emailAddress=...` notation
    pub fn subject(&self) -> String {
        match &self.email {
            Some(email) => format!("/CN={}/emailAddress={email}", self.domain),
            None => format!("/CN={}", self.domain),
        }
    }

    fn name(&self) -> Result<X509Name, CertError> {
        let mut name = X509NameBuilder::new()?;
        name.append_entry_by_nid(Nid::COMMONNAME, &self.domain)?;
        if let Some(email) = &self.email {
            name.append_entry_by_nid(Nid::PKCS9_EMAILADDRESS, email)?;
        }
        Ok(name.build())
    }

    /// Generates a new key pair and signs a certificate with it
    pub fn build(&self) -> Result<SelfSignedCertificate, CertError> {
        debug!("Generating a self-signed certificate for {}", self.subject());

        let key = PKey::from_rsa(Rsa::generate(RSA_KEY_BITS)?)?;
        let name = self.name()?;

        let now = Utc::now().timestamp();
        let not_before = Asn1Time::from_unix(now)?;
        let not_after = Asn1Time::from_unix(now + VALIDITY_DAYS * SECONDS_PER_DAY)?;

        let mut serial = BigNum::new()?;
        serial.rand(SERIAL_BITS, MsbOption::MAYBE_ZERO, false)?;
        if serial.num_bits() == 0 {
            serial.add_word(1)?;
        }
        let serial = serial.to_asn1_integer()?;

        let mut builder = X509Builder::new()?;
        // Zero-based, so this is X.509v3
        builder.set_version(2)?;
        builder.set_serial_number(&serial)?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;
        builder.set_not_before(&not_before)?;
        builder.set_not_after(&not_after)?;
        builder.set_pubkey(&key)?;

        builder.append_extension(BasicConstraints::new().ca().build()?)?;
        let subject_key_id =
            SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
        builder.append_extension(subject_key_id)?;
        let authority_key_id = AuthorityKeyIdentifier::new()
            .keyid(true)
            .issuer(true)
            .build(&builder.x509v3_context(None, None))?;
        builder.append_extension(authority_key_id)?;
        builder.append_extension(
            KeyUsage::new()
                .digital_signature()
                .key_cert_sign()
                .crl_sign()
                .build()?,
        )?;

        builder.sign(&key, MessageDigest::sha256())?;
        let certificate = builder.build();

        let certificate_pem = String::from_utf8_lossy(&certificate.to_pem()?).into_owned();
        let private_key_pem =
            String::from_utf8_lossy(&key.private_key_to_pem_pkcs8()?).into_owned();

        Ok(SelfSignedCertificate {
            certificate,
            key,
            certificate_pem,
            private_key_pem,
        })
    }
}

impl SelfSignedCertificate {
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    pub fn key(&self) -> &PKey<Private> {
        &self.key
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// The chain served by the web server; for a self-signed certificate it is the certificate
    pub fn fullchain_pem(&self) -> &str {
        &self.certificate_pem
    }
}

impl std::fmt::Debug for SelfSignedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSignedCertificate")
            .field("certificate_pem", &self.certificate_pem)
            .finish_non_exhaustive()
    }
}
