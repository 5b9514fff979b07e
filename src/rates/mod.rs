//! Rate derivation: per-period rates, period counts and reference-rate sources

mod converter;
mod source;

pub use converter::{
    annualize, convert_periodic_rate, per_period_rate, period_count, periods_per_year, RateOrigin,
    RateResolution,
};
pub use source::{RateSourceError, StaticRateSource, VariableRateSource};
