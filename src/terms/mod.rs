//! Loan terms and loan-book loading

mod data;
pub mod loader;

pub use data::{AmortizationMethod, LoanSpec, PaymentFrequency, RateType, Tenor, UpdateFrequency, MAX_TERM_YEARS};
pub use loader::{load_loan_specs, load_loan_specs_from_reader};
