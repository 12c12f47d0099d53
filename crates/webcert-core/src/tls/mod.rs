// Certificate material: generation, issuance, storage and validation

pub mod issuer;
pub mod manual;
pub mod self_signed;
pub mod storage;

pub use issuer::CertbotIssuer;
pub use manual::validate_material;
pub use self_signed::{SelfSignedBuilder, SelfSignedCertificate, VALIDITY_DAYS};
pub use storage::store_material;
