//! Default-adjusted loan pricing
//!
//! - Default-probability curves and cash-flow adjustment
//! - IRR solving
//! - Scenario grid simulation and pivoted results

mod curve;
mod irr;
mod simulator;
mod table;

pub use curve::{adjust_cash_flows, default_curve};
pub use irr::calculate_irr;
pub use simulator::{simulate, PricingParams};
pub use table::{ScenarioRow, ScenarioTable};
