//! Multi-loan consolidation by principal-weighted averaging
//!
//! Each input is first restated at the target payment frequency (rate by
//! compounding equivalence, payment over the rescaled period count, TAEG
//! solved when missing), then rate, term, payment and TAEG are averaged with
//! principal weights.

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use crate::amortization::level_payment;
use crate::error::{LoanError, Result};
use crate::loan::Loan;
use crate::rates::{convert_periodic_rate, period_count};
use crate::taeg::TaegResult;
use crate::terms::{AmortizationMethod, LoanSpec, PaymentFrequency};

/// Terms of the synthetic loan replacing a set of consolidated loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedLoanSpec {
    pub principal: f64,

    /// Weighted per-period rate at the target frequency
    pub average_periodic_rate: f64,

    /// Nominal annual rate: average periodic rate × periods per year
    pub annual_rate: f64,

    pub average_term_years: f64,

    /// Average term rounded to whole years (at least one)
    pub term_years: u32,

    /// Weighted per-period payment at the target frequency
    pub average_payment: f64,

    pub taeg: TaegResult,

    pub method: AmortizationMethod,

    pub frequency: PaymentFrequency,

    /// Latest start date among the inputs
    pub start_date: NaiveDate,
}

impl ConsolidatedLoanSpec {
    pub fn to_loan_spec(&self) -> LoanSpec {
        LoanSpec::fixed(
            self.principal,
            self.annual_rate,
            self.term_years,
            self.method,
            self.frequency,
            self.start_date,
        )
    }
}

/// One input loan restated at the target frequency
struct Restated {
    principal: f64,
    rate: f64,
    term_years: f64,
    payment: f64,
    taeg_periodic: f64,
}

fn restate(loan: &Loan, target: PaymentFrequency) -> Result<Restated> {
    let source = loan.spec().frequency;
    let rate = convert_periodic_rate(loan.per_period_rate(), source, target);
    let periods = period_count(loan.spec().term_years, target)?;
    let taeg = loan.taeg_or_solve()?;

    Ok(Restated {
        principal: loan.principal(),
        rate,
        term_years: loan.spec().term_years as f64,
        payment: level_payment(loan.principal(), rate, periods),
        taeg_periodic: convert_periodic_rate(taeg.periodic_rate(), source, target),
    })
}

/// Method carrying the largest total principal; ties go to the method seen first
fn dominant_method(loans: &[&Loan]) -> AmortizationMethod {
    let mut totals: Vec<(AmortizationMethod, f64)> = Vec::new();
    for loan in loans {
        match totals.iter_mut().find(|(m, _)| *m == loan.spec().method) {
            Some((_, total)) => *total += loan.principal(),
            None => totals.push((loan.spec().method, loan.principal())),
        }
    }

    let mut best = totals[0];
    for &(method, total) in &totals[1..] {
        if total > best.1 {
            best = (method, total);
        }
    }
    best.0
}

/// Merge two or more loans into one synthetic loan specification
pub fn consolidate<'a>(
    loans: impl IntoIterator<Item = &'a Loan>,
    target_frequency: PaymentFrequency,
) -> Result<ConsolidatedLoanSpec> {
    let loans: Vec<&Loan> = loans.into_iter().collect();
    if loans.len() < 2 {
        return Err(LoanError::InsufficientLoans { count: loans.len() });
    }

    let restated = loans
        .iter()
        .map(|loan| restate(loan, target_frequency))
        .collect::<Result<Vec<_>>>()?;

    let total: f64 = restated.iter().map(|r| r.principal).sum();
    let weighted = |f: fn(&Restated) -> f64| restated.iter().map(|r| f(r) * r.principal).sum::<f64>() / total;

    let average_periodic_rate = weighted(|r| r.rate);
    let average_term_years = weighted(|r| r.term_years);
    let average_payment = weighted(|r| r.payment);
    let average_taeg = weighted(|r| r.taeg_periodic);

    let start_date = loans
        .iter()
        .map(|l| l.spec().start_date)
        .max()
        .unwrap_or_default();

    let consolidated = ConsolidatedLoanSpec {
        principal: total,
        average_periodic_rate,
        annual_rate: average_periodic_rate * target_frequency.periods_per_year() as f64,
        average_term_years,
        term_years: (average_term_years.round() as u32).max(1),
        average_payment,
        taeg: TaegResult::from_periodic(average_taeg, target_frequency),
        method: dominant_method(&loans),
        frequency: target_frequency,
        start_date,
    };

    info!(
        "consolidated {} loans: principal {:.2}, rate {:.4}%, term {} years, {}",
        loans.len(),
        consolidated.principal,
        consolidated.annual_rate * 100.0,
        consolidated.term_years,
        consolidated.method
    );

    Ok(consolidated)
}
