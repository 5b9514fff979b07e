//! Error taxonomy for the loan engine

use thiserror::Error;

use crate::book::StoreError;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid payment frequency: {value}")]
    InvalidFrequency { value: String },

    #[error("invalid variable-rate update frequency: {value}")]
    InvalidUpdateFrequency { value: String },

    #[error("unsupported amortization method: {value}")]
    UnsupportedMethod { value: String },

    #[error("invalid rate type: {value}")]
    InvalidRateType { value: String },

    #[error("invalid loan terms: {message}")]
    InvalidTerms { message: String },

    #[error("schedule date out of range: {start} + {months} months")]
    DateOutOfRange { start: chrono::NaiveDate, months: u32 },

    #[error("no TAEG root in (0, 1): f(0) = {f_low:.6}, f(1) = {f_high:.6}")]
    NoRootFound { f_low: f64, f_high: f64 },

    #[error("payment {payment:.2} does not cover periodic interest {interest:.2}")]
    NonAmortizing { payment: f64, interest: f64 },

    #[error("target term must be positive, got {years} years")]
    NonPositiveTarget { years: f64 },

    #[error("consolidation requires at least 2 loans, got {count}")]
    InsufficientLoans { count: usize },

    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("loan not found: {id}")]
    LoanNotFound { id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LoanError>;

impl LoanError {
    pub(crate) fn invalid_terms(message: impl Into<String>) -> Self {
        LoanError::InvalidTerms { message: message.into() }
    }

    pub(crate) fn invalid_parameter(name: &'static str, value: impl ToString) -> Self {
        LoanError::InvalidParameter { name, value: value.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoanError::InsufficientLoans { count: 1 };
        assert_eq!(err.to_string(), "consolidation requires at least 2 loans, got 1");

        let err = LoanError::invalid_parameter("recovery_rate", 1.5);
        assert!(err.to_string().contains("recovery_rate"));
        assert!(err.to_string().contains("1.5"));
    }
}
