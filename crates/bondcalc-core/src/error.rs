use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BondCalcError {
    #[error("Invalid input ({field}): {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Domain error: {0}")]
    DomainError(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BondCalcError {
    /// Shorthand for the `InvalidInput` variant.
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        BondCalcError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BondCalcError {
    fn from(e: serde_json::Error) -> Self {
        BondCalcError::SerializationError(e.to_string())
    }
}
