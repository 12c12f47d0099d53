use toml::Table;

use crate::error::CertError;

use super::Config;

/// A TOML configuration document
#[derive(Default)]
pub struct Toml<'a> {
    input: &'a str,
}

impl<'a> Toml<'a> {
    pub fn new(input: &'a str) -> Self {
        Toml { input }
    }

    /// Parse the document into a raw table, keeping keys this version does not know about
    pub fn parse_table(&self) -> Result<Table, CertError> {
        toml::from_str::<Table>(self.input).map_err(|e| CertError::ConfigError {
            field: "root".to_string(),
            message: format!("Failed to parse TOML configuration: {e}"),
        })
    }

    /// Parse the document into a fully typed config
    pub fn parse(&self) -> Result<Config, CertError> {
        table_to_config(self.parse_table()?)
    }

    /// Convert a table to its string representation
    pub fn to_format_string(table: &Table) -> Result<String, CertError> {
        toml::to_string(table).map_err(|e| CertError::ConfigError {
            field: "root".to_string(),
            message: format!("Failed to convert config to TOML string: {e}"),
        })
    }
}

impl<'a> From<&'a str> for Toml<'a> {
    fn from(input: &'a str) -> Self {
        Toml::new(input)
    }
}

/// Deserialises a (possibly merged) table into the typed config
pub fn table_to_config(table: Table) -> Result<Config, CertError> {
    toml::Value::Table(table)
        .try_into::<Config>()
        .map_err(|e| CertError::ConfigError {
            field: "root".to_string(),
            message: format!("Invalid configuration: {e}"),
        })
}
