//! Amortization schedule output structures

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::engine::round2;

/// One period of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    /// Period number (1-indexed)
    pub period: u32,
    pub date: NaiveDate,
    pub opening_balance: f64,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub closing_balance: f64,
}

/// Unrounded sums accumulated while the schedule is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTotals {
    pub paid: f64,
    pub interest: f64,
    pub principal: f64,
}

impl ScheduleTotals {
    pub(crate) fn add(&mut self, interest: f64, principal: f64) {
        self.paid += interest + principal;
        self.interest += interest;
        self.principal += principal;
    }
}

/// Complete, fully materialized amortization schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub rows: Vec<AmortizationRow>,
    pub totals: ScheduleTotals,
}

impl Schedule {
    pub fn new(rows: Vec<AmortizationRow>, totals: ScheduleTotals) -> Self {
        Self { rows, totals }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Payment amounts in schedule order
    pub fn payments(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.payment).collect()
    }

    pub fn first_payment(&self) -> f64 {
        self.rows.first().map(|r| r.payment).unwrap_or(0.0)
    }

    pub fn payoff_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Totals rounded to cents from the unrounded sums, so that
    /// total_paid = total_interest + total_principal to within a cent
    pub fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            periods: self.rows.len() as u32,
            total_paid: round2(self.totals.paid),
            total_interest: round2(self.totals.interest),
            total_principal: round2(self.totals.principal),
            final_balance: self.rows.last().map(|r| r.closing_balance).unwrap_or(0.0),
        }
    }
}

/// Totals over a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub periods: u32,
    pub total_paid: f64,
    pub total_interest: f64,
    pub total_principal: f64,
    pub final_balance: f64,
}
