//! Default-probability curve and default-adjusted cash flows

/// Default-probability curve for a loan life of `loan_life` years.
///
/// Layout (loan_life + 3 entries):
/// - `[0]` initial default probability
/// - `[1..loan_life-1]` geometric decay of the previous value
/// - `[loan_life]` final default probability
/// - `[loan_life + 1]` zero
/// - `[loan_life + 2]` recovery rate
pub fn default_curve(
    initial_default: f64,
    default_decay: f64,
    final_default: f64,
    recovery_rate: f64,
    loan_life: u32,
) -> Vec<f64> {
    let life = loan_life as usize;
    let mut curve = vec![0.0; life + 3];

    curve[0] = initial_default;
    for i in 1..life {
        curve[i] = curve[i - 1] * default_decay;
    }
    curve[life] = final_default;
    curve[life + 1] = 0.0;
    curve[life + 2] = recovery_rate;

    curve
}

/// Apply a default curve to a raw cash-flow stream.
///
/// The stream and the curve are walked in lockstep; the shorter one bounds
/// the output. Branches match on exact values, so any step whose probability
/// equals `recovery_rate` (including a final default equal to it) is treated
/// as a recovery step.
pub fn adjust_cash_flows(
    raw: &[f64],
    curve: &[f64],
    rate: f64,
    principal: f64,
    recovery_rate: f64,
) -> Vec<f64> {
    let interest = rate * principal;

    raw.iter()
        .zip(curve)
        .enumerate()
        .map(|(i, (&cf, &p))| {
            if i == 0 {
                -principal + interest * (1.0 - p)
            } else if p == recovery_rate && cf == principal {
                interest * (1.0 - p)
            } else if p == recovery_rate {
                recovery_rate * principal
            } else if p == 0.0 && cf == 0.0 {
                0.0
            } else {
                cf * (1.0 - p)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_curve_layout() {
        let curve = default_curve(0.2, 0.9, 0.4, 0.4, 5);
        assert_eq!(curve.len(), 8);
        assert_abs_diff_eq!(curve[0], 0.2);
        assert_abs_diff_eq!(curve[1], 0.18, epsilon = 1e-12);
        assert_abs_diff_eq!(curve[4], 0.2 * 0.9_f64.powi(4), epsilon = 1e-12);
        assert_eq!(curve[5], 0.4);
        assert_eq!(curve[6], 0.0);
        assert_eq!(curve[7], 0.4);
    }

    #[test]
    fn test_curve_single_year() {
        let curve = default_curve(0.1, 0.9, 0.3, 0.4, 1);
        assert_eq!(curve, vec![0.1, 0.3, 0.0, 0.4]);
    }

    #[test]
    fn test_adjustment_branches() {
        let principal = 1000.0;
        let rate = 0.3;
        let curve = vec![0.1, 0.2, 0.0, 0.4, 0.4, 0.05];
        let raw = vec![-1000.0, 300.0, 0.0, 1000.0, 250.0, 300.0];

        let adjusted = adjust_cash_flows(&raw, &curve, rate, principal, 0.4);

        assert_abs_diff_eq!(adjusted[0], -1000.0 + 300.0 * 0.9, epsilon = 1e-9);
        assert_abs_diff_eq!(adjusted[1], 300.0 * 0.8, epsilon = 1e-9);
        assert_eq!(adjusted[2], 0.0);
        // Recovery slot holding the principal pays the surviving interest
        assert_abs_diff_eq!(adjusted[3], 300.0 * 0.6, epsilon = 1e-9);
        // Any other recovery slot pays the recovered principal
        assert_abs_diff_eq!(adjusted[4], 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(adjusted[5], 300.0 * 0.95, epsilon = 1e-9);
    }

    #[test]
    fn test_final_default_equal_to_recovery_hits_recovery_branch() {
        // Default parameters use final_default == recovery_rate == 0.4, so the
        // loan_life slot is a recovery step as well as the last slot
        let curve = default_curve(0.2, 0.9, 0.4, 0.4, 2);
        let raw = vec![-500.0, 100.0, 100.0, 100.0, 100.0];
        let adjusted = adjust_cash_flows(&raw, &curve, 0.3, 500.0, 0.4);

        assert_eq!(adjusted.len(), 5);
        assert_abs_diff_eq!(adjusted[2], 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(adjusted[3], 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(adjusted[4], 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shorter_stream_bounds_output() {
        let curve = default_curve(0.2, 0.9, 0.4, 0.4, 10);
        let adjusted = adjust_cash_flows(&[-100.0, 10.0, 10.0], &curve, 0.3, 100.0, 0.4);
        assert_eq!(adjusted.len(), 3);
    }
}
