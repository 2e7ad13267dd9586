mod config_source;
mod error;
mod reconciliation_config;
mod sync_config;
mod sync_option;

pub use config_source::{ConfigSource, MapSource};
pub use error::ConfigError;
pub use reconciliation_config::ReconciliationConfig;
pub use sync_config::SyncConfig;
pub use sync_option::SyncOption;
