use thiserror::Error;

/// Errors that can occur while resolving or updating configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No option is registered under the given key
    #[error("No configuration option is registered under key '{key}'")]
    UnknownOption { key: String },

    /// The value is not acceptable for the option
    #[error("Invalid value {value} for option '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: f64,
        reason: &'static str,
    },
}
