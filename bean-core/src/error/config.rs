//! Configuration-related error types.

use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
///
/// ```
/// use bean_core::error::ConfigError;
///
/// let error = ConfigError::invalid_value("tick_secs", "must be positive");
/// assert!(error.to_string().contains("tick_secs"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field parsed but holds an unusable value.
    #[error("[Config] Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `strategy.spread`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The file could not be read.
    #[error("[Config] Cannot read '{path}': {reason}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// The file extension names no supported format.
    #[error("[Config] Unsupported config file '{path}', expected .yaml, .yml, .toml or .json")]
    UnsupportedExtension {
        /// File path.
        path: String,
    },

    /// The content does not parse as, or render to, the chosen format.
    #[error("[Config] Malformed {format} in '{origin}': {reason}")]
    Malformed {
        /// Format name (`yaml`, `toml`, `json`).
        format: &'static str,
        /// File path, or a placeholder for in-memory content.
        origin: String,
        /// Parser message.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_display() {
        let error = ConfigError::invalid_value("pairs", "at least one pair is required");
        let msg = error.to_string();
        assert!(msg.contains("pairs"));
        assert!(msg.contains("at least one pair"));
    }

    #[test]
    fn test_malformed_display() {
        let error = ConfigError::Malformed {
            format: "yaml",
            origin: "backtest.yaml".to_string(),
            reason: "unexpected end of stream".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "[Config] Malformed yaml in 'backtest.yaml': unexpected end of stream"
        );
    }
}
