pub mod toml;

mod resolver;
mod store;
mod types;

pub use resolver::*;
pub use store::{CORE_CONFIG_FILE, ConfigStore, LOCAL_CONFIG_FILE};
pub use types::*;

pub(crate) use store::temp_sibling;
