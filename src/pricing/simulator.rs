//! Default-adjusted IRR pricing simulation
//!
//! Every (iteration, rate, default probability, loan life) combination
//! builds a default curve, adjusts the loan's cash flows and solves the IRR.
//! The model draws no random numbers, so repeated iterations reproduce the
//! same samples; iterations still run in parallel across the rayon pool.

use std::env;
use std::str::FromStr;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::curve::{adjust_cash_flows, default_curve};
use super::irr::calculate_irr;
use super::table::{ScenarioRow, ScenarioTable};
use crate::error::{LoanError, Result};

/// Pricing simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingParams {
    /// Seeds the default-probability grid when `default_probabilities` is empty
    pub initial_default: f64,

    /// Year-on-year multiplier of the default probability
    pub default_decay: f64,

    pub final_default: f64,

    pub recovery_rate: f64,

    pub iterations: u32,

    pub loan_lives: Vec<u32>,

    pub interest_rates: Vec<f64>,

    pub default_probabilities: Vec<f64>,
}

impl Default for PricingParams {
    fn default() -> Self {
        Self {
            initial_default: 0.2,
            default_decay: 0.9,
            final_default: 0.4,
            recovery_rate: 0.4,
            iterations: 100,
            loan_lives: vec![5, 10, 20],
            interest_rates: vec![0.30, 0.35, 0.40],
            default_probabilities: vec![0.1, 0.2, 0.3],
        }
    }
}

impl PricingParams {
    /// Defaults overridden by PRICING_* environment variables
    ///
    /// Lists are comma separated, e.g. PRICING_LOAN_LIVES=5,10
    pub fn from_env() -> Self {
        let mut params = Self::default();

        if let Some(v) = env_value("PRICING_INITIAL_DEFAULT") {
            params.initial_default = v;
        }
        if let Some(v) = env_value("PRICING_DEFAULT_DECAY") {
            params.default_decay = v;
        }
        if let Some(v) = env_value("PRICING_FINAL_DEFAULT") {
            params.final_default = v;
        }
        if let Some(v) = env_value("PRICING_RECOVERY_RATE") {
            params.recovery_rate = v;
        }
        if let Some(v) = env_value("PRICING_ITERATIONS") {
            params.iterations = v;
        }
        if let Some(v) = env_list("PRICING_LOAN_LIVES") {
            params.loan_lives = v;
        }
        if let Some(v) = env_list("PRICING_INTEREST_RATES") {
            params.interest_rates = v;
        }
        if let Some(v) = env_list("PRICING_DEFAULT_PROBABILITIES") {
            params.default_probabilities = v;
        }

        params
    }

    /// Evenly stepped candidate rates from `start` up to and including `end`
    pub fn rate_grid(start: f64, end: f64, step: f64) -> Vec<f64> {
        if step <= 0.0 || end < start {
            return vec![start];
        }
        let steps = ((end - start) / step + 1e-9).floor() as usize;
        (0..=steps)
            .map(|i| ((start + step * i as f64) * 1e8).round() / 1e8)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(LoanError::invalid_parameter("iterations", self.iterations));
        }
        if self.interest_rates.is_empty() {
            return Err(LoanError::invalid_parameter("interest_rates", "empty"));
        }
        if let Some(r) = self.interest_rates.iter().find(|&&r| !(r > 0.0 && r < 1.0)) {
            return Err(LoanError::invalid_parameter("interest_rates", r));
        }
        if self.loan_lives.is_empty() {
            return Err(LoanError::invalid_parameter("loan_lives", "empty"));
        }
        if let Some(l) = self.loan_lives.iter().find(|&&l| l == 0) {
            return Err(LoanError::invalid_parameter("loan_lives", l));
        }
        if let Some(p) = self.default_probabilities.iter().find(|&&p| !is_probability(p)) {
            return Err(LoanError::invalid_parameter("default_probabilities", p));
        }

        for (name, value) in [
            ("initial_default", self.initial_default),
            ("default_decay", self.default_decay),
            ("final_default", self.final_default),
            ("recovery_rate", self.recovery_rate),
        ] {
            if !is_probability(value) {
                return Err(LoanError::invalid_parameter(name, value));
            }
        }

        Ok(())
    }

    fn grid_probabilities(&self) -> Vec<f64> {
        if self.default_probabilities.is_empty() {
            vec![self.initial_default]
        } else {
            self.default_probabilities.clone()
        }
    }
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

fn env_value<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_list<T: FromStr>(key: &str) -> Option<Vec<T>> {
    let raw = env::var(key).ok()?;
    raw.split(',')
        .map(|s| s.trim().parse().ok())
        .collect::<Option<Vec<T>>>()
        .filter(|v| !v.is_empty())
}

/// One solved scenario, keyed by grid position
#[derive(Debug, Clone, Copy)]
struct PricingScenario {
    rate_idx: usize,
    life_idx: usize,
    prob_idx: usize,
    irr: f64,
}

/// Price a loan's payment stream across the scenario grid.
///
/// The raw stream is the disbursed principal (negative) followed by the
/// scheduled payments.
pub fn simulate(
    schedule_payments: &[f64],
    loan_rate: f64,
    loan_principal: f64,
    params: &PricingParams,
) -> Result<ScenarioTable> {
    params.validate()?;
    if !loan_principal.is_finite() || loan_principal <= 0.0 {
        return Err(LoanError::invalid_parameter("loan_principal", loan_principal));
    }
    if !loan_rate.is_finite() || loan_rate < 0.0 {
        return Err(LoanError::invalid_parameter("loan_rate", loan_rate));
    }

    let raw: Vec<f64> = std::iter::once(-loan_principal)
        .chain(schedule_payments.iter().copied())
        .collect();
    let probabilities = params.grid_probabilities();

    info!(
        "pricing {} iterations x {} rates x {} probabilities x {} lives",
        params.iterations,
        params.interest_rates.len(),
        probabilities.len(),
        params.loan_lives.len()
    );

    let batches: Vec<(Vec<PricingScenario>, usize)> = (0..params.iterations)
        .into_par_iter()
        .map(|_| run_iteration(&raw, loan_principal, params, &probabilities))
        .collect();

    let skipped: usize = batches.iter().map(|(_, s)| s).sum();
    let samples: Vec<PricingScenario> = batches.into_iter().flat_map(|(s, _)| s).collect();

    if skipped > 0 {
        warn!("{} pricing scenarios skipped: IRR did not solve", skipped);
    }

    Ok(aggregate(&samples, skipped, params, probabilities, loan_rate, calculate_irr(&raw)))
}

fn run_iteration(
    raw: &[f64],
    principal: f64,
    params: &PricingParams,
    probabilities: &[f64],
) -> (Vec<PricingScenario>, usize) {
    let mut samples = Vec::with_capacity(params.interest_rates.len() * probabilities.len() * params.loan_lives.len());
    let mut skipped = 0;

    for (rate_idx, &rate) in params.interest_rates.iter().enumerate() {
        for (prob_idx, &initial_default) in probabilities.iter().enumerate() {
            for (life_idx, &loan_life) in params.loan_lives.iter().enumerate() {
                let curve = default_curve(
                    initial_default,
                    params.default_decay,
                    params.final_default,
                    params.recovery_rate,
                    loan_life,
                );
                let adjusted = adjust_cash_flows(raw, &curve, rate, principal, params.recovery_rate);

                match calculate_irr(&adjusted) {
                    Some(irr) if irr.is_finite() => samples.push(PricingScenario {
                        rate_idx,
                        life_idx,
                        prob_idx,
                        irr,
                    }),
                    _ => {
                        debug!(
                            "skipping scenario rate={} life={} pd={}: no IRR",
                            rate, loan_life, initial_default
                        );
                        skipped += 1;
                    }
                }
            }
        }
    }

    (samples, skipped)
}

fn aggregate(
    samples: &[PricingScenario],
    skipped: usize,
    params: &PricingParams,
    probabilities: Vec<f64>,
    loan_rate: f64,
    base_irr: Option<f64>,
) -> ScenarioTable {
    let n_lives = params.loan_lives.len();
    let n_probs = probabilities.len();
    let mut cells = vec![(0.0_f64, 0_usize); params.interest_rates.len() * n_lives * n_probs];

    for s in samples {
        let cell = &mut cells[(s.rate_idx * n_lives + s.life_idx) * n_probs + s.prob_idx];
        cell.0 += s.irr;
        cell.1 += 1;
    }

    let std_dev = population_std(samples.iter().map(|s| s.irr));

    let mut rows = Vec::with_capacity(params.interest_rates.len() * n_lives);
    for (rate_idx, &rate) in params.interest_rates.iter().enumerate() {
        for (life_idx, &loan_life) in params.loan_lives.iter().enumerate() {
            let values = (0..n_probs)
                .map(|prob_idx| {
                    let (sum, count) = cells[(rate_idx * n_lives + life_idx) * n_probs + prob_idx];
                    (count > 0).then(|| sum / count as f64 - std_dev)
                })
                .collect();
            rows.push(ScenarioRow { rate, loan_life, values });
        }
    }

    ScenarioTable {
        default_probabilities: probabilities,
        rows,
        std_dev,
        sample_count: samples.len(),
        skipped,
        loan_rate,
        base_irr,
    }
}

fn population_std(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (sum, count) = values.clone().fold((0.0, 0_usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::{build_schedule, round2};
    use crate::terms::{AmortizationMethod, PaymentFrequency};
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn payments() -> Vec<f64> {
        build_schedule(
            100_000.0,
            0.05 / 12.0,
            240,
            AmortizationMethod::French,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            PaymentFrequency::Monthly,
        )
        .unwrap()
        .payments()
    }

    fn single_scenario(iterations: u32) -> PricingParams {
        PricingParams {
            iterations,
            loan_lives: vec![10],
            interest_rates: vec![0.35],
            default_probabilities: vec![0.2],
            ..PricingParams::default()
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(PricingParams::default().validate().is_ok());
        assert_eq!(PricingParams::rate_grid(0.30, 0.40, 0.05), vec![0.30, 0.35, 0.40]);
    }

    #[test]
    fn test_invalid_parameters() {
        let bad_rate = PricingParams { interest_rates: vec![0.3, 1.0], ..PricingParams::default() };
        assert!(matches!(
            bad_rate.validate(),
            Err(LoanError::InvalidParameter { name: "interest_rates", .. })
        ));

        let bad_life = PricingParams { loan_lives: vec![5, 0], ..PricingParams::default() };
        assert!(matches!(bad_life.validate(), Err(LoanError::InvalidParameter { name: "loan_lives", .. })));

        let bad_pd = PricingParams { default_probabilities: vec![-0.1], ..PricingParams::default() };
        assert!(matches!(
            bad_pd.validate(),
            Err(LoanError::InvalidParameter { name: "default_probabilities", .. })
        ));

        let bad_recovery = PricingParams { recovery_rate: 1.2, ..PricingParams::default() };
        assert!(simulate(&payments(), 0.05, 100_000.0, &bad_recovery).is_err());
    }

    #[test]
    fn test_single_scenario_is_deterministic() {
        let payments = payments();
        let once = simulate(&payments, 0.05, 100_000.0, &single_scenario(1)).unwrap();
        let again = simulate(&payments, 0.05, 100_000.0, &single_scenario(1)).unwrap();
        let many = simulate(&payments, 0.05, 100_000.0, &single_scenario(100)).unwrap();

        assert_eq!(once, again);
        assert_eq!(many.sample_count, 100);
        assert_eq!(once.std_dev, 0.0);

        let a = once.get(0.35, 10, 0.2).unwrap();
        let b = many.get(0.35, 10, 0.2).unwrap();
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }

    #[test]
    fn test_cell_matches_direct_computation() {
        let payments = payments();
        let table = simulate(&payments, 0.05, 100_000.0, &single_scenario(1)).unwrap();

        let mut raw = vec![-100_000.0];
        raw.extend(&payments);
        let curve = default_curve(0.2, 0.9, 0.4, 0.4, 10);
        let adjusted = adjust_cash_flows(&raw, &curve, 0.35, 100_000.0, 0.4);
        let irr = calculate_irr(&adjusted).unwrap();

        assert_abs_diff_eq!(table.get(0.35, 10, 0.2).unwrap(), irr, epsilon = 1e-12);
        assert_eq!(round2(payments[0]), 659.96);
    }

    #[test]
    fn test_full_grid_shape() {
        let params = PricingParams { iterations: 3, ..PricingParams::default() };
        let table = simulate(&payments(), 0.05, 100_000.0, &params).unwrap();

        assert_eq!(table.rows.len(), 9);
        assert_eq!(table.default_probabilities, vec![0.1, 0.2, 0.3]);
        assert_eq!(table.sample_count + table.skipped, 3 * 27);
        assert!(table.std_dev > 0.0);
        assert!(table.base_irr.is_some());

        let row = &table.rows[0];
        assert_eq!((row.rate, row.loan_life), (0.30, 5));
        assert_eq!(row.values.len(), 3);
    }

    #[test]
    fn test_empty_probability_grid_uses_initial_default() {
        let params = PricingParams {
            iterations: 1,
            default_probabilities: vec![],
            initial_default: 0.15,
            ..single_scenario(1)
        };
        let table = simulate(&payments(), 0.05, 100_000.0, &params).unwrap();
        assert_eq!(table.default_probabilities, vec![0.15]);
        assert!(table.get(0.35, 10, 0.15).is_some());
    }

    #[test]
    fn test_population_std() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(population_std(values.iter().copied()), 1.25_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(population_std(std::iter::empty()), 0.0);
    }
}
