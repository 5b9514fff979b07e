//! Early and faster payoff analysis (closed-form annuity math)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::amortization::{level_payment, period_date};
use crate::error::{LoanError, Result};
use crate::terms::{PaymentFrequency, MAX_TERM_YEARS};

/// Fraction of a period absorbed by currency rounding before an extra
/// period is counted
const PERIOD_TOLERANCE: f64 = 0.01;

/// Current repayment position of a loan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoffTerms {
    pub per_period_rate: f64,
    pub level_payment: f64,
    pub principal: f64,
    pub period_count: u32,
    pub start_date: NaiveDate,
    pub frequency: PaymentFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyPayoff {
    pub new_period_count: u32,
    pub reduced_periods: u32,
    pub new_payoff_date: NaiveDate,
}

/// Periods needed to repay `principal` at `payment` per period:
/// n = −ln(1 − P·r / pmt) / ln(1 + r)
pub fn periods_to_repay(principal: f64, rate: f64, payment: f64) -> Result<f64> {
    let interest = principal * rate;
    if payment <= interest || payment <= 0.0 {
        return Err(LoanError::NonAmortizing { payment, interest });
    }
    if rate.abs() < 1e-12 {
        return Ok(principal / payment);
    }
    Ok(-(1.0 - interest / payment).ln() / (1.0 + rate).ln())
}

/// Horizon reached by adding `extra_payment` to every level payment
pub fn pay_early(terms: &PayoffTerms, extra_payment: f64) -> Result<EarlyPayoff> {
    let exact = periods_to_repay(terms.principal, terms.per_period_rate, terms.level_payment + extra_payment)?;
    let new_period_count = ((exact - PERIOD_TOLERANCE).ceil().max(1.0)) as u32;

    Ok(EarlyPayoff {
        new_period_count,
        reduced_periods: terms.period_count.saturating_sub(new_period_count),
        new_payoff_date: period_date(terms.start_date, terms.frequency, new_period_count - 1)?,
    })
}

/// Extra payment per period required to finish in `desired_years`
pub fn pay_faster(terms: &PayoffTerms, desired_years: f64) -> Result<f64> {
    if desired_years.is_nan() || desired_years <= 0.0 {
        return Err(LoanError::NonPositiveTarget { years: desired_years });
    }
    if desired_years > MAX_TERM_YEARS as f64 {
        return Err(LoanError::invalid_terms(format!(
            "target of {} years exceeds the {} year maximum",
            desired_years, MAX_TERM_YEARS
        )));
    }
    let periods = (desired_years * terms.frequency.periods_per_year() as f64).round() as u32;
    if periods == 0 {
        return Err(LoanError::NonPositiveTarget { years: desired_years });
    }

    let required = level_payment(terms.principal, terms.per_period_rate, periods);
    Ok(required - terms.level_payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::round2;
    use approx::assert_abs_diff_eq;

    fn reference_terms() -> PayoffTerms {
        let rate = 0.05 / 12.0;
        PayoffTerms {
            per_period_rate: rate,
            level_payment: round2(level_payment(100_000.0, rate, 240)),
            principal: 100_000.0,
            period_count: 240,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            frequency: PaymentFrequency::Monthly,
        }
    }

    #[test]
    fn test_pay_early_no_extra_is_noop() {
        let terms = reference_terms();
        let result = pay_early(&terms, 0.0).unwrap();
        assert_eq!(result.new_period_count, 240);
        assert_eq!(result.reduced_periods, 0);
        assert_eq!(result.new_payoff_date, NaiveDate::from_ymd_opt(2043, 12, 1).unwrap());
    }

    #[test]
    fn test_pay_early_with_extra() {
        let terms = reference_terms();
        let result = pay_early(&terms, 200.0).unwrap();
        assert!(result.new_period_count < 240);
        assert_eq!(result.reduced_periods, 240 - result.new_period_count);

        // The shortened horizon repays the loan, one period less would not
        let pmt = terms.level_payment + 200.0;
        let exact = periods_to_repay(terms.principal, terms.per_period_rate, pmt).unwrap();
        assert!(result.new_period_count as f64 >= exact - PERIOD_TOLERANCE);
        assert!(((result.new_period_count - 1) as f64) < exact);
    }

    #[test]
    fn test_pay_early_non_amortizing() {
        let mut terms = reference_terms();
        terms.level_payment = 400.0;
        let err = pay_early(&terms, 10.0).unwrap_err();
        assert!(matches!(err, LoanError::NonAmortizing { .. }));
    }

    #[test]
    fn test_pay_faster() {
        let terms = reference_terms();
        assert_abs_diff_eq!(pay_faster(&terms, 20.0).unwrap(), 0.0, epsilon = 0.01);

        let extra = pay_faster(&terms, 10.0).unwrap();
        let ten_year = level_payment(100_000.0, terms.per_period_rate, 120);
        assert_abs_diff_eq!(extra, ten_year - terms.level_payment, epsilon = 1e-9);
        assert!(extra > 0.0);

        assert!(matches!(pay_faster(&terms, 0.0), Err(LoanError::NonPositiveTarget { .. })));
        assert!(matches!(pay_faster(&terms, -3.0), Err(LoanError::NonPositiveTarget { .. })));
        assert!(matches!(pay_faster(&terms, 1e12), Err(LoanError::InvalidTerms { .. })));
    }

    #[test]
    fn test_pay_early_horizon_past_calendar() {
        let terms = PayoffTerms {
            per_period_rate: 0.0,
            level_payment: 100_000.0,
            principal: 100_000.0,
            period_count: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            frequency: PaymentFrequency::Annual,
        };
        let err = pay_early(&terms, -99_999.9999).unwrap_err();
        assert!(matches!(err, LoanError::DateOutOfRange { .. }));
    }
}
