//! Annual nominal rate to per-period rate conversion

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::source::VariableRateSource;
use crate::error::{LoanError, Result};
use crate::terms::{PaymentFrequency, RateType, UpdateFrequency};

/// Where a per-period rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateOrigin {
    /// Fixed-rate loan: nominal rate split over the payment frequency
    Nominal,
    /// Variable-rate loan priced off a published reference rate
    Live,
    /// Variable-rate loan whose reference rate was unavailable
    Fallback,
}

/// Per-period rate together with its origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateResolution {
    pub per_period_rate: f64,
    pub origin: RateOrigin,
}

impl RateResolution {
    pub fn is_fallback(&self) -> bool {
        self.origin == RateOrigin::Fallback
    }
}

pub fn periods_per_year(frequency: PaymentFrequency) -> u32 {
    frequency.periods_per_year()
}

pub fn period_count(term_years: u32, frequency: PaymentFrequency) -> Result<u32> {
    term_years
        .checked_mul(frequency.periods_per_year())
        .ok_or_else(|| LoanError::invalid_terms(format!("{} years of {} payments overflows", term_years, frequency)))
}

/// Resolve the per-period rate of a loan.
///
/// Variable-rate loans read the reference tenor matching `update_frequency`
/// and are always split monthly (/12), whatever the payment frequency.
pub fn per_period_rate(
    nominal_annual_rate: f64,
    rate_type: RateType,
    frequency: PaymentFrequency,
    update_frequency: UpdateFrequency,
    source: &dyn VariableRateSource,
) -> RateResolution {
    match rate_type {
        RateType::Fixed => RateResolution {
            per_period_rate: nominal_annual_rate / frequency.periods_per_year() as f64,
            origin: RateOrigin::Nominal,
        },
        RateType::Variable => {
            let tenor = update_frequency.tenor();
            let live = match source.current_rates() {
                Ok(rates) => rates.get(&tenor).copied().filter(|r| r.is_finite()),
                Err(e) => {
                    warn!("variable rate lookup failed ({}), using nominal rate", e);
                    None
                }
            };

            match live {
                Some(reference) => {
                    debug!("variable rate {} = {:.6}", tenor.code(), reference);
                    RateResolution { per_period_rate: reference / 12.0, origin: RateOrigin::Live }
                }
                None => {
                    warn!(
                        "no {} reference rate available, falling back to nominal {:.6}",
                        tenor.code(),
                        nominal_annual_rate
                    );
                    RateResolution {
                        per_period_rate: nominal_annual_rate / 12.0,
                        origin: RateOrigin::Fallback,
                    }
                }
            }
        }
    }
}

/// Convert a periodic rate between frequencies by compounding equivalence:
/// (1 + r_to) = (1 + r_from)^(months_to / months_from)
pub fn convert_periodic_rate(rate: f64, from: PaymentFrequency, to: PaymentFrequency) -> f64 {
    if from == to {
        return rate;
    }
    let exponent = to.months_per_period() as f64 / from.months_per_period() as f64;
    (1.0 + rate).powf(exponent) - 1.0
}

/// Effective annual rate of a periodic rate
pub fn annualize(periodic_rate: f64, frequency: PaymentFrequency) -> f64 {
    (1.0 + periodic_rate).powi(frequency.periods_per_year() as i32) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::source::{RateSourceError, StaticRateSource};
    use crate::terms::Tenor;
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;

    struct DownSource;

    impl VariableRateSource for DownSource {
        fn current_rates(&self) -> std::result::Result<HashMap<Tenor, f64>, RateSourceError> {
            Err(RateSourceError::new("timeout"))
        }
    }

    #[test]
    fn test_period_count() {
        assert_eq!(period_count(20, PaymentFrequency::Monthly).unwrap(), 240);
        assert_eq!(period_count(10, PaymentFrequency::Quarterly).unwrap(), 40);
        assert_eq!(period_count(3, PaymentFrequency::Annual).unwrap(), 3);
        assert!(matches!(
            period_count(400_000_000, PaymentFrequency::Monthly),
            Err(LoanError::InvalidTerms { .. })
        ));
    }

    #[test]
    fn test_fixed_rate() {
        let res = per_period_rate(
            0.06,
            RateType::Fixed,
            PaymentFrequency::Quarterly,
            UpdateFrequency::Monthly,
            &StaticRateSource::empty(),
        );
        assert_abs_diff_eq!(res.per_period_rate, 0.015, epsilon = 1e-12);
        assert_eq!(res.origin, RateOrigin::Nominal);
    }

    #[test]
    fn test_variable_rate_uses_update_tenor_and_monthly_split() {
        let source = StaticRateSource::empty()
            .with_rate(Tenor::OneMonth, 0.030)
            .with_rate(Tenor::ThreeMonths, 0.036);

        // Paid quarterly, reset quarterly: still divided by 12
        let res = per_period_rate(
            0.05,
            RateType::Variable,
            PaymentFrequency::Quarterly,
            UpdateFrequency::Quarterly,
            &source,
        );
        assert_abs_diff_eq!(res.per_period_rate, 0.003, epsilon = 1e-12);
        assert_eq!(res.origin, RateOrigin::Live);
    }

    #[test]
    fn test_variable_rate_fallback() {
        let missing = per_period_rate(
            0.048,
            RateType::Variable,
            PaymentFrequency::Monthly,
            UpdateFrequency::Annual,
            &StaticRateSource::empty().with_rate(Tenor::OneMonth, 0.03),
        );
        assert!(missing.is_fallback());
        assert_abs_diff_eq!(missing.per_period_rate, 0.004, epsilon = 1e-12);

        let failed = per_period_rate(
            0.048,
            RateType::Variable,
            PaymentFrequency::Monthly,
            UpdateFrequency::Monthly,
            &DownSource,
        );
        assert!(failed.is_fallback());
    }

    #[test]
    fn test_convert_periodic_rate() {
        let monthly = 0.05 / 12.0;
        let annual = convert_periodic_rate(monthly, PaymentFrequency::Monthly, PaymentFrequency::Annual);
        assert_abs_diff_eq!(annual, (1.0 + monthly).powi(12) - 1.0, epsilon = 1e-12);

        let back = convert_periodic_rate(annual, PaymentFrequency::Annual, PaymentFrequency::Monthly);
        assert_abs_diff_eq!(back, monthly, epsilon = 1e-12);

        let quarterly = convert_periodic_rate(monthly, PaymentFrequency::Monthly, PaymentFrequency::Quarterly);
        assert_abs_diff_eq!(quarterly, (1.0 + monthly).powi(3) - 1.0, epsilon = 1e-12);
    }
}
