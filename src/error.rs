//! Error types raised by step bindings.
//!
//! Every variant is fatal to the scenario that raised it. Nothing here is
//! retried or downgraded to a warning.

use thiserror::Error;

/// A specialized `Result` type for step operations.
pub type StepResult<T = ()> = Result<T, StepError>;

/// Failure of a single step.
#[derive(Debug, Error)]
pub enum StepError {
    /// A step that needs the serial port ran before `the serial port "..."`.
    #[error("No serial port has been set for this scenario")]
    PortNotSet,

    /// An assertion ran before the connect call stored a response.
    #[error("No connect response has been received in this scenario")]
    NoResponse,

    /// The service could not be reached.
    #[error("Request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    /// The response body was not a JSON object.
    #[error("Response from '{url}' is not a JSON object: {message}")]
    Decode { url: String, message: String },

    /// The response did not carry the asserted field.
    #[error("Response has no field '{field}'")]
    MissingField { field: String },

    /// The stringified field value differs from the step text.
    #[error("Field '{field}': expected \"{expected}\", got \"{actual}\"")]
    Mismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// No binding matches the step text.
    #[error("No step binding matches: {0}")]
    UnknownStep(String),

    /// A step needing the service ran in a world built without a client.
    #[error("No service client is configured for this scenario")]
    ClientNotConfigured,

    /// The configured base URL cannot address the service.
    #[error("Invalid service base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
}

impl StepError {
    pub(crate) fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// True for failures of an equality check rather than of the plumbing.
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::Mismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_both_sides() {
        let err = StepError::Mismatch {
            field: "Connected".into(),
            expected: "True".into(),
            actual: "False".into(),
        };
        assert_eq!(
            err.to_string(),
            "Field 'Connected': expected \"True\", got \"False\""
        );
        assert!(err.is_assertion());
    }

    #[test]
    fn transport_is_not_an_assertion() {
        let err = StepError::transport("http://localhost:8081/rosco/connect", "refused");
        assert!(!err.is_assertion());
        assert!(err.to_string().contains("refused"));
    }
}
