//! Command-line front end: prints the EMI summary for a loan and optionally
//! writes the full payment schedule as CSV.
//!
//! Set `RUST_LOG=debug` to see the computed plan in the log.

use anyhow::{Context, Result};
use clap::Parser;
use emi_calculator::{
    calculate_payment_plan, format_amount, write_schedule_csv, Currency, LoanTerms, PaymentPlan,
    TenureUnit,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

const DEFAULT_SCHEDULE_FILE: &str = "loan_payment_schedule.csv";

#[derive(Debug, Parser)]
#[command(name = "emi", about = "Loan EMI and amortization schedule calculator")]
struct Cli {
    /// Loan amount
    #[arg(long, default_value_t = 100_000.0)]
    amount: f64,

    /// Annual interest rate in percent
    #[arg(long, default_value_t = 8.0)]
    rate: f64,

    /// Loan tenure, in the unit given by --unit
    #[arg(long, default_value_t = 5.0)]
    tenure: f64,

    /// Tenure unit: years or months
    #[arg(long, default_value = "years")]
    unit: TenureUnit,

    /// Display currency: BDT or USD
    #[arg(long, default_value = "BDT")]
    currency: Currency,

    /// Read loan terms from a JSON file instead of --amount/--rate/--tenure
    #[arg(long)]
    terms: Option<PathBuf>,

    /// Write the schedule as CSV (defaults to loan_payment_schedule.csv)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_SCHEDULE_FILE)]
    csv: Option<PathBuf>,

    /// Print the whole plan as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

fn load_terms(cli: &Cli) -> Result<LoanTerms> {
    match &cli.terms {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            LoanTerms::from_json_str(&raw)
                .with_context(|| format!("invalid loan terms in {}", path.display()))
        }
        None => LoanTerms::from_tenure(cli.amount, cli.rate, cli.tenure, cli.unit)
            .context("invalid loan terms"),
    }
}

fn print_summary(terms: &LoanTerms, plan: &PaymentPlan, currency: Currency) -> Result<()> {
    println!("Loan amount:    {}", format_amount(terms.principal, currency)?);
    println!("Interest rate:  {}%", terms.annual_rate_percent);
    println!("Tenure:         {} months", plan.schedule.len());
    println!("Monthly EMI:    {}", format_amount(plan.periodic_payment, currency)?);
    println!("Total interest: {}", format_amount(plan.total_interest, currency)?);
    println!("Total payment:  {}", format_amount(plan.total_payment, currency)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let terms = load_terms(&cli)?;
    let plan = calculate_payment_plan(&terms).context("calculation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_summary(&terms, &plan, cli.currency)?;
    }

    if let Some(path) = &cli.csv {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_schedule_csv(&plan.schedule, BufWriter::new(file))
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("wrote {} rows to {}", plan.schedule.len(), path.display());
    }

    Ok(())
}
