//! Price every loan of a CSV loan book
//!
//! Outputs one row per loan: headline schedule figures, TAEG and the
//! risk-adjusted IRR range of its pricing grid

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::Parser;
use log::warn;
use rayon::prelude::*;
use serde::Serialize;

use loan_engine::terms::load_loan_specs;
use loan_engine::{Loan, PricingParams, StaticRateSource};

#[derive(Parser)]
#[command(name = "book_report")]
#[command(version, about = "Price every loan of a CSV loan book", long_about = None)]
struct Args {
    /// Loan book CSV
    #[arg(short, long, default_value = "loan_book.csv")]
    book: PathBuf,

    /// Report CSV
    #[arg(short, long, default_value = "book_report.csv")]
    output: PathBuf,
}

#[derive(Debug, Serialize)]
struct ReportRow {
    loan: String,
    principal: f64,
    annual_rate: f64,
    term_years: u32,
    method: String,
    frequency: String,
    periods: u32,
    first_payment: f64,
    total_paid: f64,
    total_interest: f64,
    payoff_date: Option<NaiveDate>,
    taeg_annual_pct: Option<f64>,
    base_irr: Option<f64>,
    min_adjusted_irr: Option<f64>,
    max_adjusted_irr: Option<f64>,
    skipped_scenarios: usize,
}

fn report_row(index: usize, loan: &Loan, params: &PricingParams) -> anyhow::Result<ReportRow> {
    let summary = loan.summary();
    let taeg = match loan.solve_taeg() {
        Ok(t) => Some(t.annual_pct),
        Err(e) => {
            warn!("row {}: {}", index + 1, e);
            None
        }
    };
    let table = loan.price(params).with_context(|| format!("row {}: pricing failed", index + 1))?;

    let adjusted = table.rows.iter().flat_map(|r| r.values.iter().flatten().copied());
    let (min, max) = adjusted.fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), v| {
        (Some(lo.map_or(v, |l| l.min(v))), Some(hi.map_or(v, |h| h.max(v))))
    });

    Ok(ReportRow {
        loan: summary.id,
        principal: summary.principal,
        annual_rate: summary.annual_rate,
        term_years: summary.term_years,
        method: summary.method.to_string(),
        frequency: summary.frequency.to_string(),
        periods: loan.period_count(),
        first_payment: summary.payment,
        total_paid: summary.total_paid,
        total_interest: summary.total_interest,
        payoff_date: summary.payoff_date,
        taeg_annual_pct: taeg,
        base_irr: table.base_irr,
        min_adjusted_irr: min,
        max_adjusted_irr: max,
        skipped_scenarios: table.skipped,
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    println!("Loading loans from {}...", args.book.display());

    let specs = load_loan_specs(&args.book).map_err(|e| anyhow!("failed to load {}: {}", args.book.display(), e))?;
    println!("Loaded {} loans in {:?}", specs.len(), start.elapsed());

    let params = PricingParams::from_env();
    let rates = StaticRateSource::empty();

    let loans = specs
        .into_iter()
        .enumerate()
        .map(|(i, spec)| Loan::with_id(format!("row-{}", i + 1), spec, &rates))
        .collect::<Result<Vec<_>, _>>()?;

    println!("Pricing...");
    let price_start = Instant::now();

    // Price loans in parallel
    let rows = loans
        .par_iter()
        .enumerate()
        .map(|(i, loan)| report_row(i, loan, &params))
        .collect::<anyhow::Result<Vec<_>>>()?;

    println!("Pricing complete in {:?}", price_start.elapsed());

    let file = File::create(&args.output).with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    println!("Output written to {}", args.output.display());

    println!("\nBook Summary:");
    println!("  Loans:          {}", rows.len());
    println!("  Principal:      {:.2}", rows.iter().map(|r| r.principal).sum::<f64>());
    println!("  Total interest: {:.2}", rows.iter().map(|r| r.total_interest).sum::<f64>());

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}
