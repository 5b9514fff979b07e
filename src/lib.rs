//! Loan Engine - amortization, cost and pricing analytics for consumer loans
//!
//! This library provides:
//! - French (level payment) and Italian (level principal) amortization schedules
//! - Fixed and variable rate resolution across payment frequencies
//! - TAEG (effective annual cost) including upfront costs and periodic expenses
//! - Early payoff and accelerated repayment analysis
//! - Multi-loan consolidation
//! - Default-adjusted Monte Carlo pricing over rate/life/default grids
//! - A loan book with optional persistence

pub mod amortization;
pub mod book;
pub mod consolidation;
pub mod error;
pub mod loan;
pub mod payoff;
pub mod pricing;
pub mod rates;
pub mod taeg;
pub mod terms;

// Re-export commonly used types
pub use amortization::{AmortizationRow, Schedule, ScheduleSummary, ScheduleTotals};
pub use book::{InMemoryStore, LoanBook, LoanStore, StoreError};
pub use consolidation::{consolidate, ConsolidatedLoanSpec};
pub use error::{LoanError, Result};
pub use loan::{Loan, LoanId, LoanSummary, TaegState};
pub use payoff::{EarlyPayoff, PayoffTerms};
pub use pricing::{PricingParams, ScenarioTable};
pub use rates::{StaticRateSource, VariableRateSource};
pub use taeg::TaegResult;
pub use terms::{AmortizationMethod, LoanSpec, PaymentFrequency, RateType, Tenor, UpdateFrequency};
