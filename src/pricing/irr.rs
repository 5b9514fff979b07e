//! Internal Rate of Return (IRR) calculation
//!
//! Newton-Raphson on the periodic rate with a bisection fallback.

const TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: u32 = 1000;
const RATE_FLOOR: f64 = -0.99;
const RATE_CEILING: f64 = 10.0;

/// Periodic IRR of a cash-flow stream (index 0 undiscounted).
///
/// # Returns
/// * `Option<f64>` - periodic IRR as a decimal, or None if the stream has no
///   sign change or no root was found in [-99%, 1000%]
pub fn calculate_irr(cashflows: &[f64]) -> Option<f64> {
    if cashflows.is_empty() {
        return None;
    }

    if cashflows.iter().all(|&cf| cf.abs() < 1e-10) {
        return Some(0.0);
    }

    // A root needs at least one sign change
    let has_positive = cashflows.iter().any(|&cf| cf > 1e-10);
    let has_negative = cashflows.iter().any(|&cf| cf < -1e-10);
    if !has_positive || !has_negative {
        return None;
    }

    let mut rate = 0.01;

    for _ in 0..MAX_ITERATIONS {
        let (npv, dnpv) = npv_and_derivative(cashflows, rate);

        if dnpv.abs() < 1e-20 || !dnpv.is_finite() {
            return irr_bisection(cashflows);
        }

        let new_rate = (rate - npv / dnpv).clamp(RATE_FLOOR, RATE_CEILING);

        if (new_rate - rate).abs() < TOLERANCE {
            return Some(new_rate);
        }

        rate = new_rate;
    }

    irr_bisection(cashflows)
}

fn npv_and_derivative(cashflows: &[f64], rate: f64) -> (f64, f64) {
    let mut npv = 0.0;
    let mut dnpv = 0.0;

    for (t, &cf) in cashflows.iter().enumerate() {
        npv += cf / (1.0 + rate).powi(t as i32);
        if t > 0 {
            dnpv -= (t as f64) * cf / (1.0 + rate).powi(t as i32 + 1);
        }
    }

    (npv, dnpv)
}

fn irr_bisection(cashflows: &[f64]) -> Option<f64> {
    let mut low = RATE_FLOOR;
    let mut high = RATE_CEILING;

    let mut npv_low = npv_at_rate(cashflows, low);
    if npv_low * npv_at_rate(cashflows, high) > 0.0 {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let npv_mid = npv_at_rate(cashflows, mid);

        if npv_mid.abs() < TOLERANCE || (high - low) / 2.0 < TOLERANCE {
            return Some(mid);
        }

        if npv_mid * npv_low < 0.0 {
            high = mid;
        } else {
            low = mid;
            npv_low = npv_mid;
        }
    }

    None
}

fn npv_at_rate(cashflows: &[f64], rate: f64) -> f64 {
    cashflows
        .iter()
        .enumerate()
        .map(|(t, &cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_irr() {
        let irr = calculate_irr(&[-1000.0, 1100.0]).unwrap();
        assert!((irr - 0.10).abs() < 1e-8, "Expected 10% IRR, got {}", irr);
    }

    #[test]
    fn test_no_sign_change() {
        assert!(calculate_irr(&[100.0, 200.0]).is_none());
        assert!(calculate_irr(&[-100.0, -5.0]).is_none());
        assert!(calculate_irr(&[]).is_none());
    }

    #[test]
    fn test_level_loan_irr_matches_rate() {
        let rate: f64 = 0.01;
        let payment = 10_000.0 * rate / (1.0 - (1.0 + rate).powi(-24));
        let mut cashflows = vec![-10_000.0];
        cashflows.extend(vec![payment; 24]);

        let irr = calculate_irr(&cashflows).unwrap();
        assert!((irr - rate).abs() < 1e-8);
    }
}
