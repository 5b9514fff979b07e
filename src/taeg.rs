//! TAEG (annual percentage rate of charge) solver
//!
//! Finds the rate that equates the discounted gross payment stream (scheduled
//! payments plus periodic expenses) to the net disbursed amount (principal
//! minus upfront costs). Discounting uses time in years, t / periods_per_year.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{LoanError, Result};
use crate::terms::PaymentFrequency;

const TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: u32 = 200;

/// Solved TAEG, both values in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaegResult {
    pub periodic_pct: f64,
    pub annual_pct: f64,
}

impl TaegResult {
    /// Build from a periodic rate (decimal), annualizing at `frequency`
    pub fn from_periodic(periodic_rate: f64, frequency: PaymentFrequency) -> Self {
        let annual = (1.0 + periodic_rate).powi(frequency.periods_per_year() as i32) - 1.0;
        Self {
            periodic_pct: periodic_rate * 100.0,
            annual_pct: annual * 100.0,
        }
    }

    pub fn periodic_rate(&self) -> f64 {
        self.periodic_pct / 100.0
    }
}

/// Inputs of one TAEG solve
#[derive(Debug, Clone)]
pub struct TaegInputs<'a> {
    pub payments: &'a [f64],
    pub upfront_costs_total: f64,
    pub periodic_expenses_total: f64,
    pub principal: f64,
    pub frequency: PaymentFrequency,
}

impl TaegInputs<'_> {
    fn net_disbursed(&self) -> f64 {
        self.principal - self.upfront_costs_total
    }

    /// f(r) = Σ gross_t / (1+r)^(t/ppy) − net
    fn objective(&self, rate: f64) -> f64 {
        let ppy = self.frequency.periods_per_year() as f64;
        let pv: f64 = self
            .payments
            .iter()
            .enumerate()
            .map(|(i, &payment)| {
                let years = (i + 1) as f64 / ppy;
                (payment + self.periodic_expenses_total) / (1.0 + rate).powf(years)
            })
            .sum();
        pv - self.net_disbursed()
    }
}

/// Solve for the TAEG by bisection over r ∈ (0, 1)
pub fn compute_taeg(inputs: &TaegInputs<'_>) -> Result<TaegResult> {
    let mut low = 0.0_f64;
    let mut high = 1.0_f64;
    let f_low = inputs.objective(low);
    let f_high = inputs.objective(high);

    // The root must lie strictly inside the interval
    if inputs.payments.is_empty() || inputs.net_disbursed() <= 0.0 || !(f_low > 0.0 && f_high < 0.0) {
        return Err(LoanError::NoRootFound { f_low, f_high });
    }

    let mut mid = 0.5;
    for _ in 0..MAX_ITERATIONS {
        mid = (low + high) / 2.0;
        let f_mid = inputs.objective(mid);

        if f_mid.abs() < TOLERANCE || (high - low) / 2.0 < TOLERANCE {
            break;
        }

        // f is decreasing in r
        if f_mid > 0.0 {
            low = mid;
        } else {
            high = mid;
        }
    }

    let result = TaegResult::from_periodic(mid, inputs.frequency);
    debug!(
        "TAEG solved: periodic {:.4}%, annual {:.4}% (net disbursed {:.2})",
        result.periodic_pct,
        result.annual_pct,
        inputs.net_disbursed()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::level_payment;
    use approx::assert_abs_diff_eq;

    fn monthly_payments(principal: f64, annual_rate: f64, years: u32) -> Vec<f64> {
        let n = years * 12;
        vec![level_payment(principal, annual_rate / 12.0, n); n as usize]
    }

    #[test]
    fn test_taeg_without_costs_is_effective_rate() {
        let payments = monthly_payments(100_000.0, 0.05, 20);
        let result = compute_taeg(&TaegInputs {
            payments: &payments,
            upfront_costs_total: 0.0,
            periodic_expenses_total: 0.0,
            principal: 100_000.0,
            frequency: PaymentFrequency::Monthly,
        })
        .unwrap();

        // Discounting in years recovers the effective annual rate of 5% nominal
        let effective = ((1.0_f64 + 0.05 / 12.0).powi(12) - 1.0) * 100.0;
        assert_abs_diff_eq!(result.periodic_pct, effective, epsilon = 1e-6);
        assert_abs_diff_eq!(
            result.annual_pct,
            ((1.0 + result.periodic_rate()).powi(12) - 1.0) * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_taeg_increases_with_upfront_costs() {
        let payments = monthly_payments(50_000.0, 0.06, 10);
        let mut previous = 0.0;

        for costs in [0.0, 500.0, 1_500.0, 5_000.0] {
            let result = compute_taeg(&TaegInputs {
                payments: &payments,
                upfront_costs_total: costs,
                periodic_expenses_total: 0.0,
                principal: 50_000.0,
                frequency: PaymentFrequency::Monthly,
            })
            .unwrap();
            assert!(result.periodic_pct > previous);
            previous = result.periodic_pct;
        }
    }

    #[test]
    fn test_taeg_periodic_expenses_raise_rate() {
        let payments = monthly_payments(50_000.0, 0.06, 10);
        let base = TaegInputs {
            payments: &payments,
            upfront_costs_total: 0.0,
            periodic_expenses_total: 0.0,
            principal: 50_000.0,
            frequency: PaymentFrequency::Monthly,
        };
        let with_expenses = TaegInputs { periodic_expenses_total: 5.0, ..base.clone() };

        assert!(compute_taeg(&with_expenses).unwrap().periodic_pct > compute_taeg(&base).unwrap().periodic_pct);
    }

    #[test]
    fn test_no_root_found() {
        let payments = monthly_payments(10_000.0, 0.05, 5);

        // Costs swallow the whole principal
        let err = compute_taeg(&TaegInputs {
            payments: &payments,
            upfront_costs_total: 10_000.0,
            periodic_expenses_total: 0.0,
            principal: 10_000.0,
            frequency: PaymentFrequency::Monthly,
        })
        .unwrap_err();
        assert!(matches!(err, LoanError::NoRootFound { .. }));

        // Payments that never repay the amount
        let err = compute_taeg(&TaegInputs {
            payments: &[10.0; 12],
            upfront_costs_total: 0.0,
            periodic_expenses_total: 0.0,
            principal: 10_000.0,
            frequency: PaymentFrequency::Monthly,
        })
        .unwrap_err();
        assert!(matches!(err, LoanError::NoRootFound { .. }));
    }
}
