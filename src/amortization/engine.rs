//! Schedule construction under the French and Italian conventions

use chrono::{Months, NaiveDate};
use log::debug;

use super::schedule::{AmortizationRow, Schedule, ScheduleTotals};
use crate::error::{LoanError, Result};
use crate::terms::{AmortizationMethod, PaymentFrequency};

/// Round to cents, normalizing -0.00 to 0.00
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

/// Level annuity payment: P·r / (1 − (1+r)^−n), or P/n at a zero rate
pub fn level_payment(principal: f64, rate: f64, periods: u32) -> f64 {
    if periods == 0 {
        return principal;
    }
    if rate.abs() < 1e-12 {
        return principal / periods as f64;
    }
    principal * rate / (1.0 - (1.0 + rate).powi(-(periods as i32)))
}

/// Date of the `index`-th period (0-indexed) counted from `start`
pub fn period_date(start: NaiveDate, frequency: PaymentFrequency, index: u32) -> Result<NaiveDate> {
    let months = index
        .checked_mul(frequency.months_per_period())
        .ok_or(LoanError::DateOutOfRange { start, months: u32::MAX })?;
    start
        .checked_add_months(Months::new(months))
        .ok_or(LoanError::DateOutOfRange { start, months })
}

/// Build the full amortization schedule.
///
/// Values are rounded to cents on output only; the running balance is
/// carried unrounded.
pub fn build_schedule(
    principal: f64,
    per_period_rate: f64,
    period_count: u32,
    method: AmortizationMethod,
    start_date: NaiveDate,
    frequency: PaymentFrequency,
) -> Result<Schedule> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(LoanError::invalid_terms(format!("principal must be positive, got {}", principal)));
    }
    if period_count == 0 {
        return Err(LoanError::invalid_terms("period count must be positive"));
    }
    if !per_period_rate.is_finite() || per_period_rate < 0.0 {
        return Err(LoanError::invalid_terms(format!(
            "per-period rate must be non-negative, got {}",
            per_period_rate
        )));
    }

    let (rows, totals) = match method {
        AmortizationMethod::French => {
            french_rows(principal, per_period_rate, period_count, start_date, frequency)?
        }
        AmortizationMethod::Italian => {
            italian_rows(principal, per_period_rate, period_count, start_date, frequency)?
        }
    };

    debug!(
        "built {} schedule: {} periods, principal {:.2}, rate {:.6}",
        method, period_count, principal, per_period_rate
    );

    Ok(Schedule::new(rows, totals))
}

fn french_rows(
    principal: f64,
    rate: f64,
    periods: u32,
    start: NaiveDate,
    frequency: PaymentFrequency,
) -> Result<(Vec<AmortizationRow>, ScheduleTotals)> {
    let payment = level_payment(principal, rate, periods);
    let mut balance = principal;
    let mut rows = Vec::with_capacity(periods as usize);
    let mut totals = ScheduleTotals::default();

    for k in 0..periods {
        let interest = balance * rate;
        let principal_part = payment - interest;
        let closing = balance - principal_part;
        totals.add(interest, principal_part);

        rows.push(AmortizationRow {
            period: k + 1,
            date: period_date(start, frequency, k)?,
            opening_balance: round2(balance),
            payment: round2(payment),
            interest: round2(interest),
            principal: round2(principal_part),
            closing_balance: round2(closing),
        });

        balance = closing;
    }

    Ok((rows, totals))
}

fn italian_rows(
    principal: f64,
    rate: f64,
    periods: u32,
    start: NaiveDate,
    frequency: PaymentFrequency,
) -> Result<(Vec<AmortizationRow>, ScheduleTotals)> {
    let principal_part = principal / periods as f64;
    let mut rows = Vec::with_capacity(periods as usize);
    let mut totals = ScheduleTotals::default();

    for k in 0..periods {
        let opening = principal - principal_part * k as f64;
        let interest = opening * rate;
        let closing = principal - principal_part * (k + 1) as f64;
        totals.add(interest, principal_part);

        rows.push(AmortizationRow {
            period: k + 1,
            date: period_date(start, frequency, k)?,
            opening_balance: round2(opening),
            payment: round2(interest + principal_part),
            interest: round2(interest),
            principal: round2(principal_part),
            closing_balance: round2(closing),
        });
    }

    Ok((rows, totals))
}
