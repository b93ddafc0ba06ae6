pub mod cashflows;
pub mod error;
pub mod present_value;
pub mod stress;
pub mod types;
pub mod yields;

#[cfg(feature = "callable")]
pub mod callable;

#[cfg(feature = "valuation")]
pub mod valuation;

pub use error::BondCalcError;
pub use types::*;

/// Standard result type for all bond calculations
pub type BondCalcResult<T> = Result<T, BondCalcError>;
