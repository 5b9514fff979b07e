//! Amortization schedule construction (French and Italian conventions)

mod engine;
mod schedule;

pub use engine::{build_schedule, level_payment, period_date, round2};
pub use schedule::{AmortizationRow, Schedule, ScheduleSummary, ScheduleTotals};
