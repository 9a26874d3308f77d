//! Rich diagnostic error types for ammie.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives; [`AmmieError`] wraps them at the engine boundary.
//!
//! Ontology refusals and evolution failures are *outcomes*, not errors: they
//! are reported through [`crate::engine::TurnOutcome`].

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::paths::PathError;
use crate::settings::SettingsError;

/// Top-level error type.
#[derive(Debug, Error, Diagnostic)]
pub enum AmmieError {
    /// Loading or reloading configuration failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// A learned entry could not be written. Distinct from a failed
    /// evolution consultation, which is recovered locally.
    #[error("failed to persist the learned vocabulary")]
    #[diagnostic(
        code(ammie::persistence),
        help(
            "The new symbol was not saved and has been discarded from memory. \
             Check that the vocabulary directory is writable, then repeat the input."
        )
    )]
    Persistence {
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

/// Convenience alias for functions returning ammie results.
pub type AmmieResult<T> = std::result::Result<T, AmmieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_ammie_error() {
        let err = ConfigError::Missing {
            document: "symbols.json",
            path: "/tmp/x/symbols.json".into(),
        };
        let ammie: AmmieError = err.into();
        assert!(matches!(ammie, AmmieError::Config(ConfigError::Missing { .. })));
    }

    #[test]
    fn persistence_error_keeps_source() {
        let err = AmmieError::Persistence {
            source: ConfigError::Serialize {
                message: "boom".into(),
            },
        };
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("boom"));
    }
}
