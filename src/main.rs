//! Loan Engine CLI
//!
//! Command-line interface for single-loan analytics and loan-book consolidation
//!
//! # Commands
//!
//! - `loan_engine schedule` - Print the amortization schedule (CSV or JSON)
//! - `loan_engine taeg` - Solve the TAEG with upfront costs and periodic expenses
//! - `loan_engine pay-early` - Horizon reached with an extra payment per period
//! - `loan_engine pay-faster` - Extra payment needed to finish in a target term
//! - `loan_engine consolidate` - Merge every loan of a CSV book into one
//! - `loan_engine price` - Default-adjusted IRR pricing grid

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;

use loan_engine::terms::load_loan_specs;
use loan_engine::{
    AmortizationMethod, Loan, LoanBook, LoanSpec, PaymentFrequency, PricingParams, RateType,
    StaticRateSource, Tenor, UpdateFrequency,
};

/// Loan amortization, TAEG, consolidation and pricing
#[derive(Parser)]
#[command(name = "loan_engine")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Terms of a single loan
#[derive(Args, Debug, Clone)]
struct LoanArgs {
    /// Gross financed amount
    #[arg(long)]
    amount: f64,

    /// Nominal annual rate as a decimal (0.05 = 5%)
    #[arg(long)]
    rate: f64,

    /// Term in whole years
    #[arg(long)]
    years: u32,

    /// Amortization method (french, italian)
    #[arg(long, default_value = "french")]
    method: AmortizationMethod,

    /// Payment frequency (monthly, quarterly, semi-annual, annual)
    #[arg(long, default_value = "monthly")]
    frequency: PaymentFrequency,

    /// Rate type (fixed, variable)
    #[arg(long, default_value = "fixed")]
    rate_type: RateType,

    /// Variable-rate reset cadence (monthly, quarterly, semi-annual, annual)
    #[arg(long, default_value = "monthly")]
    update_frequency: UpdateFrequency,

    /// Downpayment in percent of the amount
    #[arg(long, default_value_t = 0.0)]
    downpayment: f64,

    /// First payment month (YYYY-MM-DD, moved to day 1)
    #[arg(long)]
    start: NaiveDate,

    /// Reference rate for a tenor, e.g. 3m=0.035 (repeatable)
    #[arg(long = "index-rate", value_parser = parse_index_rate)]
    index_rates: Vec<(Tenor, f64)>,
}

impl LoanArgs {
    fn spec(&self) -> LoanSpec {
        LoanSpec {
            amount: self.amount,
            annual_rate: self.rate,
            term_years: self.years,
            method: self.method,
            frequency: self.frequency,
            rate_type: self.rate_type,
            update_frequency: self.update_frequency,
            downpayment_pct: self.downpayment,
            start_date: self.start,
        }
    }

    fn rates(&self) -> StaticRateSource {
        self.index_rates
            .iter()
            .fold(StaticRateSource::empty(), |src, &(tenor, rate)| src.with_rate(tenor, rate))
    }

    fn build(&self) -> anyhow::Result<Loan> {
        let loan = Loan::new(self.spec(), &self.rates()).context("failed to build loan")?;
        if loan.rate_resolution().is_fallback() {
            eprintln!("Note: no reference rate for this loan, nominal rate used");
        }
        Ok(loan)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the amortization schedule
    Schedule {
        #[command(flatten)]
        loan: LoanArgs,

        /// Emit JSON instead of CSV
        #[arg(long)]
        json: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Solve the TAEG
    Taeg {
        #[command(flatten)]
        loan: LoanArgs,

        /// Upfront cost, e.g. appraisal=300 (repeatable)
        #[arg(long = "cost", value_parser = parse_named_amount)]
        costs: Vec<(String, f64)>,

        /// Periodic expense, e.g. insurance=8.5 (repeatable)
        #[arg(long = "expense", value_parser = parse_named_amount)]
        expenses: Vec<(String, f64)>,
    },

    /// Horizon reached by adding an extra amount to every payment
    PayEarly {
        #[command(flatten)]
        loan: LoanArgs,

        /// Extra amount paid each period
        #[arg(long)]
        extra: f64,
    },

    /// Extra payment per period needed to finish in a target term
    PayFaster {
        #[command(flatten)]
        loan: LoanArgs,

        /// Target term in years
        #[arg(long)]
        target_years: f64,
    },

    /// Consolidate every loan of a CSV loan book
    Consolidate {
        /// Loan book CSV
        #[arg(short, long)]
        book: PathBuf,

        /// Payment frequency of the consolidated loan
        #[arg(long, default_value = "monthly")]
        frequency: PaymentFrequency,

        /// Emit JSON instead of a text report
        #[arg(long)]
        json: bool,
    },

    /// Default-adjusted IRR pricing grid
    Price {
        #[command(flatten)]
        loan: LoanArgs,

        /// Simulation iterations (overrides PRICING_ITERATIONS)
        #[arg(long)]
        iterations: Option<u32>,

        /// Candidate annual rates, comma separated
        #[arg(long, value_delimiter = ',')]
        rates: Option<Vec<f64>>,

        /// Candidate annual rates stepped from START to END inclusive
        #[arg(long, num_args = 3, value_names = ["START", "END", "STEP"], conflicts_with = "rates")]
        rate_grid: Option<Vec<f64>>,

        /// Loan lives in years, comma separated
        #[arg(long, value_delimiter = ',')]
        lives: Option<Vec<u32>>,

        /// Default probabilities, comma separated
        #[arg(long, value_delimiter = ',')]
        default_probabilities: Option<Vec<f64>>,

        /// Recovery rate on default
        #[arg(long)]
        recovery_rate: Option<f64>,

        /// Emit JSON instead of CSV
        #[arg(long)]
        json: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_index_rate(s: &str) -> Result<(Tenor, f64), String> {
    let (tenor, rate) = s.split_once('=').ok_or_else(|| format!("expected TENOR=RATE, got {}", s))?;
    let tenor = tenor.parse::<Tenor>().map_err(|e| e.to_string())?;
    let rate = rate.trim().parse::<f64>().map_err(|e| format!("{}: {}", s, e))?;
    Ok((tenor, rate))
}

fn parse_named_amount(s: &str) -> Result<(String, f64), String> {
    let (name, amount) = s.split_once('=').ok_or_else(|| format!("expected NAME=AMOUNT, got {}", s))?;
    let amount = amount.trim().parse::<f64>().map_err(|e| format!("{}: {}", s, e))?;
    Ok((name.trim().to_string(), amount))
}

fn open_output(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(File::create(p).with_context(|| format!("failed to create {}", p.display()))?),
        None => Box::new(io::stdout().lock()),
    })
}

fn run_schedule(loan: &LoanArgs, json: bool, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let loan = loan.build()?;
    let mut out = open_output(output)?;

    if json {
        serde_json::to_writer_pretty(&mut out, loan.schedule())?;
        writeln!(out)?;
    } else {
        let mut wtr = csv::Writer::from_writer(out);
        for row in &loan.schedule().rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
    }

    let summary = loan.schedule().summary();
    info!(
        "{} periods, total paid {:.2}, total interest {:.2}",
        summary.periods, summary.total_paid, summary.total_interest
    );
    Ok(())
}

fn run_taeg(loan: &LoanArgs, costs: &[(String, f64)], expenses: &[(String, f64)]) -> anyhow::Result<()> {
    let mut loan = loan.build()?;
    for (name, amount) in costs {
        loan.set_additional_cost(name.as_str(), *amount);
    }
    for (name, amount) in expenses {
        loan.set_periodic_expense(name.as_str(), *amount);
    }

    let taeg = loan.compute_taeg().context("TAEG did not solve")?;

    println!("Principal:         {:.2}", loan.principal());
    println!("Payment:           {:.2}", loan.payment());
    println!("Upfront costs:     {:.2}", loan.additional_costs().values().sum::<f64>());
    println!("Periodic expenses: {:.2}", loan.periodic_expenses().values().sum::<f64>());
    println!("TAEG (periodic):   {:.4}%", taeg.periodic_pct);
    println!("TAEG (annual):     {:.4}%", taeg.annual_pct);
    Ok(())
}

fn run_pay_early(loan: &LoanArgs, extra: f64) -> anyhow::Result<()> {
    let loan = loan.build()?;
    let result = loan.pay_early(extra)?;

    println!("Current periods:  {}", loan.period_count());
    println!("New periods:      {}", result.new_period_count);
    println!("Periods saved:    {}", result.reduced_periods);
    println!("New payoff date:  {}", result.new_payoff_date);
    Ok(())
}

fn run_pay_faster(loan: &LoanArgs, target_years: f64) -> anyhow::Result<()> {
    let loan = loan.build()?;
    let extra = loan.pay_faster(target_years)?;

    println!("Current payment:  {:.2}", loan.payoff_terms().level_payment);
    println!("Extra per period: {:.2}", extra);
    println!("New payment:      {:.2}", loan.payoff_terms().level_payment + extra);
    Ok(())
}

fn run_consolidate(book_path: &Path, frequency: PaymentFrequency, json: bool) -> anyhow::Result<()> {
    let specs = load_loan_specs(book_path)
        .map_err(|e| anyhow!("failed to load {}: {}", book_path.display(), e))?;
    if specs.len() < 2 {
        bail!("{} holds {} loan(s); consolidation needs at least 2", book_path.display(), specs.len());
    }

    let rates = StaticRateSource::empty();
    let mut book = LoanBook::new();
    let ids = specs
        .into_iter()
        .map(|spec| book.create(spec, &rates, false))
        .collect::<Result<Vec<_>, _>>()?;
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let merged = book.consolidation_spec(&id_refs, frequency)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
        return Ok(());
    }

    println!("Consolidated {} loans", ids.len());
    println!("  Principal:      {:.2}", merged.principal);
    println!("  Annual rate:    {:.4}%", merged.annual_rate * 100.0);
    println!("  Term:           {} years ({:.2} averaged)", merged.term_years, merged.average_term_years);
    println!("  Payment:        {:.2} {}", merged.average_payment, merged.frequency);
    println!("  Method:         {}", merged.method);
    println!("  TAEG (annual):  {:.4}%", merged.taeg.annual_pct);
    println!("  Start date:     {}", merged.start_date);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_price(
    loan: &LoanArgs,
    iterations: Option<u32>,
    rates: Option<Vec<f64>>,
    lives: Option<Vec<u32>>,
    default_probabilities: Option<Vec<f64>>,
    recovery_rate: Option<f64>,
    json: bool,
    output: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let mut params = PricingParams::from_env();
    if let Some(v) = iterations {
        params.iterations = v;
    }
    if let Some(v) = rates {
        params.interest_rates = v;
    }
    if let Some(v) = lives {
        params.loan_lives = v;
    }
    if let Some(v) = default_probabilities {
        params.default_probabilities = v;
    }
    if let Some(v) = recovery_rate {
        params.recovery_rate = v;
    }

    let loan = loan.build()?;
    let table = loan.price(&params)?;
    info!(
        "priced {} samples ({} skipped), std dev {:.6}",
        table.sample_count, table.skipped, table.std_dev
    );

    let mut out = open_output(output)?;
    if json {
        serde_json::to_writer_pretty(&mut out, &table)?;
        writeln!(out)?;
    } else {
        table.write_csv(out)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schedule { loan, json, output } => run_schedule(&loan, json, output.as_ref()),
        Commands::Taeg { loan, costs, expenses } => run_taeg(&loan, &costs, &expenses),
        Commands::PayEarly { loan, extra } => run_pay_early(&loan, extra),
        Commands::PayFaster { loan, target_years } => run_pay_faster(&loan, target_years),
        Commands::Consolidate { book, frequency, json } => run_consolidate(&book, frequency, json),
        Commands::Price {
            loan,
            iterations,
            rates,
            rate_grid,
            lives,
            default_probabilities,
            recovery_rate,
            json,
            output,
        } => {
            let rates = match rate_grid.as_deref() {
                Some(&[start, end, step]) => Some(PricingParams::rate_grid(start, end, step)),
                _ => rates,
            };
            run_price(
                &loan,
                iterations,
                rates,
                lives,
                default_probabilities,
                recovery_rate,
                json,
                output.as_ref(),
            )
        }
    }
}
