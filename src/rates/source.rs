//! Variable-rate reference source collaborator

use std::collections::HashMap;

use thiserror::Error;

use crate::terms::Tenor;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("rate source unavailable: {message}")]
pub struct RateSourceError {
    pub message: String,
}

impl RateSourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Supplier of current reference rates (decimal, annual) by tenor.
///
/// Implementations own their timeouts; a failed or partial lookup is
/// treated by the engine as "use the nominal rate".
pub trait VariableRateSource {
    fn current_rates(&self) -> Result<HashMap<Tenor, f64>, RateSourceError>;
}

/// Fixed snapshot of reference rates
#[derive(Debug, Clone, Default)]
pub struct StaticRateSource {
    rates: HashMap<Tenor, f64>,
}

impl StaticRateSource {
    pub fn new(rates: HashMap<Tenor, f64>) -> Self {
        Self { rates }
    }

    /// Source that never publishes anything (every variable loan falls back)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, tenor: Tenor, rate: f64) -> Self {
        self.rates.insert(tenor, rate);
        self
    }
}

impl VariableRateSource for StaticRateSource {
    fn current_rates(&self) -> Result<HashMap<Tenor, f64>, RateSourceError> {
        Ok(self.rates.clone())
    }
}
