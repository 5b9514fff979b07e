//! Loan aggregate: terms, derived state and the engine operations on them
//!
//! All derived state (period count, per-period rate, payment, schedule) is
//! rebuilt together whenever the terms or the rate source change. The TAEG is
//! only computed on request and is dropped on any change that affects it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amortization::{build_schedule, level_payment, Schedule};
use crate::consolidation::ConsolidatedLoanSpec;
use crate::error::{LoanError, Result};
use crate::payoff::{self, EarlyPayoff, PayoffTerms};
use crate::pricing::{self, PricingParams, ScenarioTable};
use crate::rates::{per_period_rate, period_count, RateResolution, VariableRateSource};
use crate::taeg::{compute_taeg, TaegInputs, TaegResult};
use crate::terms::{AmortizationMethod, LoanSpec, PaymentFrequency};

pub type LoanId = String;

/// TAEG state of a loan
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TaegState {
    #[default]
    NotComputed,
    Computed(TaegResult),
}

/// Derived values rebuilt from the terms
#[derive(Debug, Clone, PartialEq)]
struct Derived {
    principal: f64,
    period_count: u32,
    rate: RateResolution,
    payment: f64,
    schedule: Schedule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    id: LoanId,
    spec: LoanSpec,
    derived: Derived,
    taeg: TaegState,
    additional_costs: BTreeMap<String, f64>,
    periodic_expenses: BTreeMap<String, f64>,
}

/// Headline figures used to compare loans side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub id: LoanId,
    pub principal: f64,
    pub annual_rate: f64,
    pub term_years: u32,
    pub method: AmortizationMethod,
    pub frequency: PaymentFrequency,
    pub payment: f64,
    pub total_paid: f64,
    pub total_interest: f64,
    pub payoff_date: Option<NaiveDate>,
    pub taeg: Option<TaegResult>,
}

impl Loan {
    /// Build a loan and its schedule from its terms
    pub fn new(spec: LoanSpec, rates: &dyn VariableRateSource) -> Result<Self> {
        Self::with_id(Uuid::new_v4().to_string(), spec, rates)
    }

    pub fn with_id(id: impl Into<LoanId>, mut spec: LoanSpec, rates: &dyn VariableRateSource) -> Result<Self> {
        spec.start_date = spec.normalized_start();
        let derived = Self::derive(&spec, rates)?;

        Ok(Self {
            id: id.into(),
            spec,
            derived,
            taeg: TaegState::NotComputed,
            additional_costs: BTreeMap::new(),
            periodic_expenses: BTreeMap::new(),
        })
    }

    /// Build the loan that replaces a set of consolidated loans.
    ///
    /// The schedule is rebuilt from the consolidated terms; the aggregated
    /// TAEG is carried over.
    pub fn from_consolidated(consolidated: &ConsolidatedLoanSpec, rates: &dyn VariableRateSource) -> Result<Self> {
        let mut loan = Self::new(consolidated.to_loan_spec(), rates)?;
        loan.taeg = TaegState::Computed(consolidated.taeg);
        Ok(loan)
    }

    fn derive(spec: &LoanSpec, rates: &dyn VariableRateSource) -> Result<Derived> {
        spec.validate()?;

        let principal = spec.principal();
        let period_count = period_count(spec.term_years, spec.frequency)?;
        let rate = per_period_rate(
            spec.annual_rate,
            spec.rate_type,
            spec.frequency,
            spec.update_frequency,
            rates,
        );
        let schedule = build_schedule(
            principal,
            rate.per_period_rate,
            period_count,
            spec.method,
            spec.start_date,
            spec.frequency,
        )?;

        Ok(Derived {
            principal,
            period_count,
            rate,
            payment: schedule.first_payment(),
            schedule,
        })
    }

    /// Derive from `spec` and install it with the new state; the TAEG is dropped.
    /// Nothing changes if derivation fails.
    fn rebuild(&mut self, spec: LoanSpec, rates: &dyn VariableRateSource) -> Result<()> {
        let derived = Self::derive(&spec, rates)?;

        self.spec = spec;
        self.derived = derived;
        self.taeg = TaegState::NotComputed;
        debug!(
            "loan {} recomputed: {} periods, payment {:.2}",
            self.id, self.derived.period_count, self.derived.payment
        );
        Ok(())
    }

    /// Rebuild every derived value from the current terms, e.g. after the
    /// variable-rate source has moved
    pub fn recompute(&mut self, rates: &dyn VariableRateSource) -> Result<()> {
        self.rebuild(self.spec.clone(), rates)
    }

    /// Replace the terms and recompute. On error the loan is left unchanged.
    pub fn edit(&mut self, mut spec: LoanSpec, rates: &dyn VariableRateSource) -> Result<()> {
        spec.start_date = spec.normalized_start();
        self.rebuild(spec, rates)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: LoanId) {
        self.id = id;
    }

    pub fn spec(&self) -> &LoanSpec {
        &self.spec
    }

    pub fn principal(&self) -> f64 {
        self.derived.principal
    }

    pub fn period_count(&self) -> u32 {
        self.derived.period_count
    }

    pub fn per_period_rate(&self) -> f64 {
        self.derived.rate.per_period_rate
    }

    pub fn rate_resolution(&self) -> RateResolution {
        self.derived.rate
    }

    /// Per-period payment (level payment for French, first payment for Italian)
    pub fn payment(&self) -> f64 {
        self.derived.payment
    }

    pub fn schedule(&self) -> &Schedule {
        &self.derived.schedule
    }

    pub fn taeg_state(&self) -> TaegState {
        self.taeg
    }

    pub fn taeg(&self) -> Option<TaegResult> {
        match self.taeg {
            TaegState::Computed(result) => Some(result),
            TaegState::NotComputed => None,
        }
    }

    pub fn additional_costs(&self) -> &BTreeMap<String, f64> {
        &self.additional_costs
    }

    pub fn periodic_expenses(&self) -> &BTreeMap<String, f64> {
        &self.periodic_expenses
    }

    /// Add or replace a named upfront cost
    pub fn set_additional_cost(&mut self, name: impl Into<String>, amount: f64) {
        self.additional_costs.insert(name.into(), amount);
        self.taeg = TaegState::NotComputed;
    }

    pub fn remove_additional_cost(&mut self, name: &str) -> Option<f64> {
        let removed = self.additional_costs.remove(name);
        if removed.is_some() {
            self.taeg = TaegState::NotComputed;
        }
        removed
    }

    /// Add or replace a named per-period expense
    pub fn set_periodic_expense(&mut self, name: impl Into<String>, amount: f64) {
        self.periodic_expenses.insert(name.into(), amount);
        self.taeg = TaegState::NotComputed;
    }

    pub fn remove_periodic_expense(&mut self, name: &str) -> Option<f64> {
        let removed = self.periodic_expenses.remove(name);
        if removed.is_some() {
            self.taeg = TaegState::NotComputed;
        }
        removed
    }

    pub(crate) fn replace_costs(&mut self, costs: BTreeMap<String, f64>, expenses: BTreeMap<String, f64>) {
        self.additional_costs = costs;
        self.periodic_expenses = expenses;
        self.taeg = TaegState::NotComputed;
    }

    /// Solve the TAEG without caching it
    pub fn solve_taeg(&self) -> Result<TaegResult> {
        let payments = self.derived.schedule.payments();
        compute_taeg(&TaegInputs {
            payments: &payments,
            upfront_costs_total: self.additional_costs.values().sum(),
            periodic_expenses_total: self.periodic_expenses.values().sum(),
            principal: self.derived.principal,
            frequency: self.spec.frequency,
        })
    }

    /// Solve and cache the TAEG
    pub fn compute_taeg(&mut self) -> Result<TaegResult> {
        let result = self.solve_taeg()?;
        self.taeg = TaegState::Computed(result);
        Ok(result)
    }

    /// Cached TAEG, or a freshly solved one when absent
    pub fn taeg_or_solve(&self) -> Result<TaegResult> {
        match self.taeg {
            TaegState::Computed(result) => Ok(result),
            TaegState::NotComputed => self.solve_taeg(),
        }
    }

    pub fn payoff_terms(&self) -> PayoffTerms {
        PayoffTerms {
            per_period_rate: self.derived.rate.per_period_rate,
            level_payment: level_payment(
                self.derived.principal,
                self.derived.rate.per_period_rate,
                self.derived.period_count,
            ),
            principal: self.derived.principal,
            period_count: self.derived.period_count,
            start_date: self.spec.start_date,
            frequency: self.spec.frequency,
        }
    }

    pub fn pay_early(&self, extra_payment: f64) -> Result<EarlyPayoff> {
        payoff::pay_early(&self.payoff_terms(), extra_payment)
    }

    pub fn pay_faster(&self, desired_years: f64) -> Result<f64> {
        payoff::pay_faster(&self.payoff_terms(), desired_years)
    }

    /// Default-adjusted pricing of this loan's payment stream
    pub fn price(&self, params: &PricingParams) -> Result<ScenarioTable> {
        pricing::simulate(
            &self.derived.schedule.payments(),
            self.spec.annual_rate,
            self.derived.principal,
            params,
        )
    }

    pub fn summary(&self) -> LoanSummary {
        let totals = self.derived.schedule.summary();
        LoanSummary {
            id: self.id.clone(),
            principal: self.derived.principal,
            annual_rate: self.spec.annual_rate,
            term_years: self.spec.term_years,
            method: self.spec.method,
            frequency: self.spec.frequency,
            payment: self.derived.payment,
            total_paid: totals.total_paid,
            total_interest: totals.total_interest,
            payoff_date: self.derived.schedule.payoff_date(),
            taeg: self.taeg(),
        }
    }
}
