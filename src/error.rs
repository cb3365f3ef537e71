//! Error types for rule induction.

use thiserror::Error;

/// Result type alias for borroso operations.
pub type Result<T> = std::result::Result<T, BorrosoError>;

/// Errors surfaced by training and configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BorrosoError {
    /// The training data violates a capability of the learner.
    #[error("capability violated: {0}")]
    Capability(String),

    /// An option could not be parsed or is unknown.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A description-length computation produced NaN or an infinity.
    /// This indicates a programming invariant was broken, never bad input.
    #[error("description length {context} is NaN or infinite")]
    DescriptionLength {
        /// Which DL quantity degenerated.
        context: String,
    },
}

impl BorrosoError {
    pub(crate) fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    pub(crate) fn dl(context: impl Into<String>) -> Self {
        Self::DescriptionLength {
            context: context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BorrosoError::capability("class attribute must be nominal");
        assert_eq!(
            err.to_string(),
            "capability violated: class attribute must be nominal"
        );

        let err = BorrosoError::dl("defDL");
        assert_eq!(err.to_string(), "description length defDL is NaN or infinite");
    }
}
