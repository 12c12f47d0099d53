use std::fmt::Display;

use url::Url;

use crate::error::CertError;

/// A bare host name a certificate is issued for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain {
    /// The normalised (lower-case, punycode) host name
    pub name: String,
}

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl TryFrom<&str> for Domain {
    type Error = CertError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CertError::Input("The domain can not be empty".to_string()));
        }

        let url = Url::parse(&format!("http://{value}")).map_err(|e| {
            CertError::Input(format!("Failed to parse domain name '{value}': {e}"))
        })?;

        // Anything beyond a bare host would leak into file paths keyed by the domain
        if url.port().is_some()
            || url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
            || !url.username().is_empty()
        {
            return Err(CertError::Input(format!(
                "Invalid domain name '{value}': expected a bare host name"
            )));
        }

        let name = url
            .host_str()
            .ok_or_else(|| {
                CertError::Input(format!("Invalid domain name '{value}': no host found"))
            })?
            .to_string();

        Ok(Domain { name })
    }
}

impl TryFrom<String> for Domain {
    type Error = CertError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Domain::try_from(value.as_str())
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
