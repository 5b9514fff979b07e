//! Loan terms: frequencies, amortization methods and the loan specification

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::LoanError;

/// Payment frequency of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentFrequency {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl PaymentFrequency {
    pub const ALL: [PaymentFrequency; 4] = [
        PaymentFrequency::Monthly,
        PaymentFrequency::Quarterly,
        PaymentFrequency::SemiAnnual,
        PaymentFrequency::Annual,
    ];

    /// Number of payments per year (12, 4, 2, 1)
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 12,
            PaymentFrequency::Quarterly => 4,
            PaymentFrequency::SemiAnnual => 2,
            PaymentFrequency::Annual => 1,
        }
    }

    /// Calendar months between two consecutive payments
    pub fn months_per_period(&self) -> u32 {
        12 / self.periods_per_year()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFrequency::Monthly => "monthly",
            PaymentFrequency::Quarterly => "quarterly",
            PaymentFrequency::SemiAnnual => "semi-annual",
            PaymentFrequency::Annual => "annual",
        }
    }
}

impl FromStr for PaymentFrequency {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "m" | "12" => Ok(PaymentFrequency::Monthly),
            "quarterly" | "q" | "4" => Ok(PaymentFrequency::Quarterly),
            "semi-annual" | "semi-annually" | "semiannual" | "s" | "2" => {
                Ok(PaymentFrequency::SemiAnnual)
            }
            "annual" | "annually" | "yearly" | "a" | "1" => Ok(PaymentFrequency::Annual),
            _ => Err(LoanError::InvalidFrequency { value: s.to_string() }),
        }
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a variable rate is reset against its reference index.
///
/// Each update frequency maps to one reference tenor (1m, 3m, 6m, 12m).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateFrequency {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl UpdateFrequency {
    pub fn tenor(&self) -> Tenor {
        match self {
            UpdateFrequency::Monthly => Tenor::OneMonth,
            UpdateFrequency::Quarterly => Tenor::ThreeMonths,
            UpdateFrequency::SemiAnnual => Tenor::SixMonths,
            UpdateFrequency::Annual => Tenor::TwelveMonths,
        }
    }
}

impl FromStr for UpdateFrequency {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "1m" => Ok(UpdateFrequency::Monthly),
            "quarterly" | "3m" => Ok(UpdateFrequency::Quarterly),
            "semi-annual" | "semi-annually" | "semiannual" | "6m" => Ok(UpdateFrequency::SemiAnnual),
            "annual" | "annually" | "yearly" | "12m" => Ok(UpdateFrequency::Annual),
            _ => Err(LoanError::InvalidUpdateFrequency { value: s.to_string() }),
        }
    }
}

/// Reference-rate tenor published by a variable-rate source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tenor {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "12m")]
    TwelveMonths,
}

impl Tenor {
    pub fn code(&self) -> &'static str {
        match self {
            Tenor::OneMonth => "1m",
            Tenor::ThreeMonths => "3m",
            Tenor::SixMonths => "6m",
            Tenor::TwelveMonths => "12m",
        }
    }
}

impl FromStr for Tenor {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Tenor::OneMonth),
            "3m" => Ok(Tenor::ThreeMonths),
            "6m" => Ok(Tenor::SixMonths),
            "12m" | "1y" => Ok(Tenor::TwelveMonths),
            _ => Err(LoanError::invalid_parameter("tenor", s)),
        }
    }
}

/// Amortization convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmortizationMethod {
    /// Level total payment, interest front-loaded
    French,
    /// Level principal repayment, decreasing total payment
    Italian,
}

impl FromStr for AmortizationMethod {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "french" => Ok(AmortizationMethod::French),
            "italian" => Ok(AmortizationMethod::Italian),
            _ => Err(LoanError::UnsupportedMethod { value: s.to_string() }),
        }
    }
}

impl fmt::Display for AmortizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmortizationMethod::French => f.write_str("French"),
            AmortizationMethod::Italian => f.write_str("Italian"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateType {
    Fixed,
    Variable,
}

impl FromStr for RateType {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(RateType::Fixed),
            "variable" => Ok(RateType::Variable),
            _ => Err(LoanError::InvalidRateType { value: s.to_string() }),
        }
    }
}

/// Longest term a loan may be written for
pub const MAX_TERM_YEARS: u32 = 100;

/// Contractual terms a loan is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSpec {
    /// Gross financed amount before the downpayment
    pub amount: f64,

    /// Nominal annual rate as a decimal (0.05 = 5%)
    pub annual_rate: f64,

    pub term_years: u32,

    pub method: AmortizationMethod,

    pub frequency: PaymentFrequency,

    pub rate_type: RateType,

    /// Reset cadence for variable-rate loans (ignored for fixed)
    pub update_frequency: UpdateFrequency,

    /// Downpayment as a percentage of `amount` (20.0 = 20%)
    pub downpayment_pct: f64,

    pub start_date: NaiveDate,
}

impl LoanSpec {
    /// Fixed-rate loan without downpayment
    pub fn fixed(
        amount: f64,
        annual_rate: f64,
        term_years: u32,
        method: AmortizationMethod,
        frequency: PaymentFrequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            annual_rate,
            term_years,
            method,
            frequency,
            rate_type: RateType::Fixed,
            update_frequency: UpdateFrequency::Monthly,
            downpayment_pct: 0.0,
            start_date,
        }
    }

    /// Financed principal once the downpayment is deducted
    pub fn principal(&self) -> f64 {
        self.amount * (1.0 - self.downpayment_pct / 100.0)
    }

    /// Start date moved to the first day of its month
    pub fn normalized_start(&self) -> NaiveDate {
        self.start_date.with_day(1).unwrap_or(self.start_date)
    }

    pub fn validate(&self) -> Result<(), LoanError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(LoanError::invalid_terms(format!("amount must be positive, got {}", self.amount)));
        }
        if !self.annual_rate.is_finite() || self.annual_rate < 0.0 {
            return Err(LoanError::invalid_terms(format!(
                "annual rate must be non-negative, got {}",
                self.annual_rate
            )));
        }
        if self.term_years == 0 || self.term_years > MAX_TERM_YEARS {
            return Err(LoanError::invalid_terms(format!(
                "term must be between 1 and {} years, got {}",
                MAX_TERM_YEARS, self.term_years
            )));
        }
        if !(0.0..100.0).contains(&self.downpayment_pct) {
            return Err(LoanError::invalid_terms(format!(
                "downpayment must be in [0, 100), got {}",
                self.downpayment_pct
            )));
        }
        Ok(())
    }
}
