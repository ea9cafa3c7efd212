//! `emi_calculator` computes the equated monthly installment (EMI) of a fixed-rate
//! amortizing loan together with its month-by-month amortization schedule.
//!
//! Every calculation is a pure function of the loan terms: there is no state to
//! reset between calls, and a change to any input is handled by calling the engine
//! again.
//!
//! ## Usage
//!
//! ```rust
//! use emi_calculator::{calculate_payment_plan, format_amount, Currency, LoanTerms};
//!
//! fn main() -> Result<(), emi_calculator::EmiError> {
//!     let terms = LoanTerms::new(100_000.0, 8.0, 5.0)?;
//!     let plan = calculate_payment_plan(&terms)?;
//!
//!     println!("EMI:            {}", format_amount(plan.periodic_payment, Currency::Usd)?);
//!     println!("Total interest: {}", format_amount(plan.total_interest, Currency::Usd)?);
//!     println!("Months:         {}", plan.schedule.len());
//!
//!     assert_eq!(plan.schedule.len(), 60);
//!     Ok(())
//! }
//! ```

mod error;
pub mod currency;
pub mod export;

pub use currency::{format_amount, Currency, CurrencyFormat};
pub use error::{EmiError, EmiResult};
pub use export::{schedule_to_csv, write_schedule_csv, CSV_HEADERS};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Distance from a whole month below which a term is treated as exact.
const WHOLE_MONTH_TOLERANCE: f64 = 1e-9;

/// Longest schedule the engine will build, in months (1000 years).
pub const MAX_PERIODS: u32 = 12_000;

/// Unit in which a loan tenure is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenureUnit {
    #[default]
    Years,
    Months,
}

impl FromStr for TenureUnit {
    type Err = EmiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "years" | "y" => Ok(TenureUnit::Years),
            "month" | "months" | "m" => Ok(TenureUnit::Months),
            other => Err(EmiError::invalid(
                "tenure_unit",
                format!("unknown tenure unit '{other}'"),
            )),
        }
    }
}

/// Validated loan terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// The amount borrowed.
    pub principal: f64,
    /// The nominal annual interest rate as a percentage (e.g. 8.0 for 8%).
    pub annual_rate_percent: f64,
    /// The loan term in years. Fractions are allowed.
    pub term_years: f64,
}

impl LoanTerms {
    /// Builds loan terms, rejecting anything outside the input contract.
    pub fn new(principal: f64, annual_rate_percent: f64, term_years: f64) -> EmiResult<Self> {
        let terms = LoanTerms {
            principal,
            annual_rate_percent,
            term_years,
        };
        terms.validate()?;
        Ok(terms)
    }

    /// Builds loan terms from a tenure expressed in either years or months.
    pub fn from_tenure(
        principal: f64,
        annual_rate_percent: f64,
        tenure: f64,
        unit: TenureUnit,
    ) -> EmiResult<Self> {
        let term_years = match unit {
            TenureUnit::Years => tenure,
            TenureUnit::Months => tenure / 12.0,
        };
        Self::new(principal, annual_rate_percent, term_years)
    }

    /// Parses loan terms from JSON and validates them.
    pub fn from_json_str(json: &str) -> EmiResult<Self> {
        let terms: LoanTerms = serde_json::from_str(json)?;
        terms.validate()?;
        Ok(terms)
    }

    /// Checks the input contract, including that the term covers at least one month.
    pub fn validate(&self) -> EmiResult<()> {
        validate_inputs(self.principal, self.annual_rate_percent, self.term_years)?;
        whole_months(self.term_years)?;
        Ok(())
    }

    /// Number of monthly periods the schedule will contain.
    pub fn months(&self) -> EmiResult<u32> {
        term_in_months(self.term_years)
    }
}

/// One row of an amortization schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmortizationEntry {
    /// 1-based month number.
    pub period_index: u32,
    /// The level payment due this month.
    pub payment: f64,
    /// The part of the payment that reduces the balance.
    pub principal_component: f64,
    /// The part of the payment that covers interest on the opening balance.
    pub interest_component: f64,
    /// The balance after this payment, never below zero.
    pub remaining_balance: f64,
}

/// Aggregate payment totals over the whole term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of every scheduled payment.
    pub total_payment: f64,
    /// The part of `total_payment` above the principal.
    pub total_interest: f64,
}

/// Everything derived from one set of loan terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    /// The level monthly payment (EMI).
    pub periodic_payment: f64,
    /// The total paid over the whole term.
    pub total_payment: f64,
    /// The total interest paid over the whole term.
    pub total_interest: f64,
    /// One entry per month, in order.
    pub schedule: Vec<AmortizationEntry>,
}

/// Converts a nominal annual percentage to a fractional monthly rate.
pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 12.0 / 100.0
}

/// Converts a term in years to a whole number of months.
///
/// Terms are rounded to the nearest month; a term that rounds to zero months is
/// rejected as `InvalidInput`, one longer than [`MAX_PERIODS`] months as
/// `NumericDegeneracy`. Rounding is logged at `warn`.
pub fn term_in_months(term_years: f64) -> EmiResult<u32> {
    let (months, exact) = whole_months(term_years)?;
    if (exact - f64::from(months)).abs() > WHOLE_MONTH_TOLERANCE {
        warn!("term of {term_years} years is {exact} months, rounding to {months}");
    }
    Ok(months)
}

/// Rounds the term to whole months without logging. Returns the rounded count and
/// the exact, possibly fractional, one.
fn whole_months(term_years: f64) -> EmiResult<(u32, f64)> {
    if !term_years.is_finite() || term_years <= 0.0 {
        return Err(EmiError::invalid(
            "term_years",
            format!("must be a positive finite number, got {term_years}"),
        ));
    }

    let exact = term_years * 12.0;
    let months = exact.round();
    if months < 1.0 {
        return Err(EmiError::invalid(
            "term_years",
            format!("{term_years} years is shorter than one month"),
        ));
    }
    if months > f64::from(MAX_PERIODS) {
        return Err(EmiError::NumericDegeneracy(format!(
            "{term_years} years is {months} months, more than the {MAX_PERIODS} supported"
        )));
    }

    Ok((months as u32, exact))
}

fn validate_inputs(principal: f64, annual_rate_percent: f64, term_years: f64) -> EmiResult<()> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(EmiError::invalid(
            "principal",
            format!("must be a positive finite amount, got {principal}"),
        ));
    }
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(EmiError::invalid(
            "annual_rate_percent",
            format!("must be a non-negative finite percentage, got {annual_rate_percent}"),
        ));
    }
    if !term_years.is_finite() || term_years <= 0.0 {
        return Err(EmiError::invalid(
            "term_years",
            format!("must be a positive finite number, got {term_years}"),
        ));
    }
    Ok(())
}

/// Calculates the level monthly payment.
///
/// The payment follows the annuity formula `P * r * (1 + r)^n / ((1 + r)^n - 1)`,
/// where `r` is the monthly rate and `n` the number of months. A zero rate divides
/// the principal evenly across the months instead.
///
/// # Errors
///
/// `InvalidInput` when the terms break the input contract, `NumericDegeneracy`
/// when the rate is too small or the term too long for `f64` to produce a finite
/// payment.
pub fn compute_periodic_payment(
    principal: f64,
    annual_rate_percent: f64,
    term_years: f64,
) -> EmiResult<f64> {
    validate_inputs(principal, annual_rate_percent, term_years)?;
    let months = term_in_months(term_years)?;
    level_payment(principal, monthly_rate(annual_rate_percent), months)
}

fn level_payment(principal: f64, rate: f64, months: u32) -> EmiResult<f64> {
    let payment = if rate == 0.0 {
        principal / f64::from(months)
    } else {
        let growth = (1.0 + rate).powf(f64::from(months));
        principal * rate * growth / (growth - 1.0)
    };

    if !payment.is_finite() || payment <= 0.0 {
        return Err(EmiError::NumericDegeneracy(format!(
            "payment for {principal} at monthly rate {rate} over {months} months evaluated to {payment}"
        )));
    }
    Ok(payment)
}

/// Calculates the total paid and the interest share of it.
///
/// The total is the level payment times the number of scheduled months, so it
/// agrees with the sum of the schedule's payments.
pub fn compute_totals(periodic_payment: f64, principal: f64, months: u32) -> EmiResult<Totals> {
    let total_payment = periodic_payment * f64::from(months);
    let total_interest = total_payment - principal;

    if !total_payment.is_finite() || !total_interest.is_finite() {
        return Err(EmiError::NumericDegeneracy(format!(
            "totals for payment {periodic_payment} over {months} months are not finite"
        )));
    }
    Ok(Totals {
        total_payment,
        total_interest,
    })
}

/// Builds the full amortization schedule, one entry per month.
///
/// Each month's interest is charged on the balance left by the month before, so
/// entries are produced strictly in order.
pub fn generate_schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_years: f64,
) -> EmiResult<Vec<AmortizationEntry>> {
    validate_inputs(principal, annual_rate_percent, term_years)?;
    let months = term_in_months(term_years)?;
    let rate = monthly_rate(annual_rate_percent);
    let payment = level_payment(principal, rate, months)?;
    amortize(principal, rate, months, payment)
}

fn amortize(
    principal: f64,
    rate: f64,
    months: u32,
    payment: f64,
) -> EmiResult<Vec<AmortizationEntry>> {
    let mut balance = principal;
    let mut schedule = Vec::with_capacity(months as usize);

    for period_index in 1..=months {
        let interest_component = balance * rate;
        let principal_component = payment - interest_component;
        balance -= principal_component;

        if !balance.is_finite() || !principal_component.is_finite() {
            return Err(EmiError::NumericDegeneracy(format!(
                "schedule diverged at period {period_index}"
            )));
        }

        schedule.push(AmortizationEntry {
            period_index,
            payment,
            principal_component,
            interest_component,
            remaining_balance: balance.max(0.0),
        });
    }

    Ok(schedule)
}

/// Calculates payment, totals and schedule for one set of loan terms.
///
/// # Errors
///
/// Returns the first error from validation or from any derived value; no partial
/// plan is ever returned.
pub fn calculate_payment_plan(terms: &LoanTerms) -> EmiResult<PaymentPlan> {
    validate_inputs(terms.principal, terms.annual_rate_percent, terms.term_years)?;
    let months = term_in_months(terms.term_years)?;
    let rate = monthly_rate(terms.annual_rate_percent);

    let periodic_payment = level_payment(terms.principal, rate, months)?;
    let totals = compute_totals(periodic_payment, terms.principal, months)?;
    let schedule = amortize(terms.principal, rate, months, periodic_payment)?;

    debug!(
        "plan for {:?}: {} months, payment {:.2}, total interest {:.2}",
        terms, months, periodic_payment, totals.total_interest
    );

    Ok(PaymentPlan {
        periodic_payment,
        total_payment: totals.total_payment,
        total_interest: totals.total_interest,
        schedule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;

    #[test]
    fn test_regression_fixture_eight_percent_five_years() {
        let terms = LoanTerms::new(100_000.0, 8.0, 5.0).unwrap();
        let plan = calculate_payment_plan(&terms).unwrap();

        assert_abs_diff_eq!(monthly_rate(8.0), 0.0066667, epsilon = 1e-7);
        assert_eq!(plan.schedule.len(), 60);
        assert_abs_diff_eq!(plan.periodic_payment, 2027.64, epsilon = 0.005);
        assert_abs_diff_eq!(plan.total_payment, 121_658.37, epsilon = 0.01);
        assert_abs_diff_eq!(plan.total_interest, 21_658.37, epsilon = 0.01);
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let terms = LoanTerms::new(120_000.0, 0.0, 10.0).unwrap();
        let plan = calculate_payment_plan(&terms).unwrap();

        assert_eq!(plan.periodic_payment, 1000.0);
        assert_eq!(plan.total_payment, 120_000.0);
        assert_eq!(plan.total_interest, 0.0);
        assert_eq!(plan.schedule.len(), 120);
        assert!(plan.schedule.iter().all(|e| e.interest_component == 0.0));
        assert!(plan.schedule.iter().all(|e| e.principal_component == 1000.0));
        assert_eq!(plan.schedule.last().unwrap().remaining_balance, 0.0);
    }

    #[rstest]
    #[case(100_000.0, 8.0, 5.0)]
    #[case(2_500_000.0, 10.5, 20.0)]
    #[case(5_000.0, 24.0, 1.0)]
    #[case(360_000.0, 6.75, 30.0)]
    #[case(1_000.0, 0.0, 2.5)]
    fn test_schedule_invariants(#[case] principal: f64, #[case] rate: f64, #[case] years: f64) {
        let schedule = generate_schedule(principal, rate, years).unwrap();
        let payment = compute_periodic_payment(principal, rate, years).unwrap();
        let expected_months = (years * 12.0).round() as usize;

        assert_eq!(schedule.len(), expected_months);
        for (i, entry) in schedule.iter().enumerate() {
            assert_eq!(entry.period_index as usize, i + 1);
            assert_eq!(entry.payment, payment);
            assert!(entry.remaining_balance >= 0.0);
        }
        for entry in &schedule[..schedule.len() - 1] {
            assert_relative_eq!(
                entry.principal_component + entry.interest_component,
                payment,
                max_relative = 1e-6
            );
        }
        for pair in schedule.windows(2) {
            assert!(pair[1].remaining_balance <= pair[0].remaining_balance);
        }
        assert_abs_diff_eq!(
            schedule.last().unwrap().remaining_balance,
            0.0,
            epsilon = 1e-6 * principal
        );
    }

    #[test]
    fn test_interest_declines_and_principal_grows() {
        let schedule = generate_schedule(100_000.0, 8.0, 5.0).unwrap();

        assert_abs_diff_eq!(schedule[0].interest_component, 666.67, epsilon = 0.005);
        assert_abs_diff_eq!(schedule[0].principal_component, 1360.97, epsilon = 0.005);
        assert_abs_diff_eq!(schedule[0].remaining_balance, 98_639.03, epsilon = 0.005);
        for pair in schedule.windows(2) {
            assert!(pair[1].interest_component < pair[0].interest_component);
            assert!(pair[1].principal_component > pair[0].principal_component);
        }
    }

    #[test]
    fn test_totals_match_schedule_sum() {
        let terms = LoanTerms::new(250_000.0, 9.25, 15.0).unwrap();
        let plan = calculate_payment_plan(&terms).unwrap();
        let summed: f64 = plan.schedule.iter().map(|e| e.payment).sum();

        assert_relative_eq!(plan.total_payment, summed, max_relative = 1e-9);
        assert_relative_eq!(
            plan.total_interest,
            plan.schedule.iter().map(|e| e.interest_component).sum::<f64>(),
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_generate_schedule_is_deterministic() {
        let first = generate_schedule(75_000.0, 7.1, 12.0).unwrap();
        let second = generate_schedule(75_000.0, 7.1, 12.0).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(2.5, 30)]
    #[case(1.0 / 12.0, 1)]
    #[case(2.51, 30)]
    #[case(2.54, 30)]
    #[case(2.55, 31)]
    #[case(0.05, 1)]
    fn test_fractional_terms_round_to_nearest_month(#[case] years: f64, #[case] months: u32) {
        assert_eq!(term_in_months(years).unwrap(), months);
        assert_eq!(
            generate_schedule(10_000.0, 5.0, years).unwrap().len(),
            months as usize
        );
    }

    #[test]
    fn test_term_shorter_than_half_a_month_is_rejected() {
        let err = generate_schedule(10_000.0, 5.0, 0.04).unwrap_err();
        assert!(matches!(err, EmiError::InvalidInput { field: "term_years", .. }));
    }

    #[rstest]
    #[case(1_000.05, 0.0)]
    #[case(100_000_000.0, 0.0)]
    #[case(100_000_000.0, 8.0)]
    #[case(f64::MAX, 8.0)]
    fn test_term_longer_than_max_periods_is_rejected(#[case] years: f64, #[case] rate: f64) {
        assert!(matches!(term_in_months(years), Err(EmiError::NumericDegeneracy(_))));
        assert!(matches!(
            generate_schedule(1_000.0, rate, years),
            Err(EmiError::NumericDegeneracy(_))
        ));
        assert!(matches!(
            compute_periodic_payment(1_000.0, rate, years),
            Err(EmiError::NumericDegeneracy(_))
        ));
        assert!(matches!(
            LoanTerms::new(1_000.0, rate, years),
            Err(EmiError::NumericDegeneracy(_))
        ));
    }

    #[test]
    fn test_term_of_exactly_max_periods_is_built() {
        let years = f64::from(MAX_PERIODS) / 12.0;
        assert_eq!(term_in_months(years).unwrap(), MAX_PERIODS);
        assert_eq!(
            generate_schedule(1_000.0, 0.0, years).unwrap().len(),
            MAX_PERIODS as usize
        );
    }

    mod warn_counter {
        use log::{Level, LevelFilter, Log, Metadata, Record};
        use std::cell::Cell;
        use std::sync::Once;

        thread_local! {
            static WARNINGS: Cell<usize> = const { Cell::new(0) };
        }

        struct CountingLogger;

        impl Log for CountingLogger {
            fn enabled(&self, metadata: &Metadata) -> bool {
                metadata.level() <= Level::Warn
            }

            fn log(&self, record: &Record) {
                if record.level() == Level::Warn {
                    WARNINGS.with(|w| w.set(w.get() + 1));
                }
            }

            fn flush(&self) {}
        }

        static LOGGER: CountingLogger = CountingLogger;
        static INIT: Once = Once::new();

        /// Number of warnings logged on this thread while `f` runs.
        pub fn warnings_during(f: impl FnOnce()) -> usize {
            INIT.call_once(|| {
                let _ = log::set_logger(&LOGGER);
                log::set_max_level(LevelFilter::Warn);
            });
            let before = WARNINGS.with(Cell::get);
            f();
            WARNINGS.with(Cell::get) - before
        }
    }

    #[test]
    fn test_fractional_term_warns_once_per_plan() {
        use warn_counter::warnings_during;

        let terms = LoanTerms::new(10_000.0, 5.0, 2.51).unwrap();
        assert_eq!(
            warnings_during(|| {
                LoanTerms::from_tenure(10_000.0, 5.0, 2.51, TenureUnit::Years).unwrap();
            }),
            0
        );
        assert_eq!(
            warnings_during(|| {
                calculate_payment_plan(&terms).unwrap();
            }),
            1
        );

        let whole = LoanTerms::new(10_000.0, 5.0, 2.5).unwrap();
        assert_eq!(
            warnings_during(|| {
                calculate_payment_plan(&whole).unwrap();
            }),
            0
        );
    }

    #[rstest]
    #[case(0.0, 8.0, 5.0, "principal")]
    #[case(-1.0, 8.0, 5.0, "principal")]
    #[case(f64::NAN, 8.0, 5.0, "principal")]
    #[case(f64::INFINITY, 8.0, 5.0, "principal")]
    #[case(1000.0, -0.5, 5.0, "annual_rate_percent")]
    #[case(1000.0, f64::NAN, 5.0, "annual_rate_percent")]
    #[case(1000.0, 8.0, 0.0, "term_years")]
    #[case(1000.0, 8.0, -3.0, "term_years")]
    fn test_invalid_input_fails_fast(
        #[case] principal: f64,
        #[case] rate: f64,
        #[case] years: f64,
        #[case] expected_field: &str,
    ) {
        for err in [
            compute_periodic_payment(principal, rate, years).unwrap_err(),
            generate_schedule(principal, rate, years).unwrap_err(),
            LoanTerms::new(principal, rate, years).unwrap_err(),
        ] {
            match err {
                EmiError::InvalidInput { field, .. } => assert_eq!(field, expected_field),
                other => panic!("expected InvalidInput, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_vanishing_rate_is_numeric_degeneracy() {
        let err = compute_periodic_payment(10_000.0, 1e-14, 5.0).unwrap_err();
        assert!(matches!(err, EmiError::NumericDegeneracy(_)));

        let err = generate_schedule(10_000.0, 1e-14, 5.0).unwrap_err();
        assert!(matches!(err, EmiError::NumericDegeneracy(_)));
    }

    #[test]
    fn test_non_finite_totals_are_numeric_degeneracy() {
        let err = compute_totals(f64::MAX, 1.0, 12).unwrap_err();
        assert!(matches!(err, EmiError::NumericDegeneracy(_)));
    }

    #[test]
    fn test_from_tenure_in_months() {
        let by_months = LoanTerms::from_tenure(50_000.0, 12.0, 18.0, TenureUnit::Months).unwrap();
        let by_years = LoanTerms::from_tenure(50_000.0, 12.0, 1.5, TenureUnit::Years).unwrap();

        assert_eq!(by_months.months().unwrap(), 18);
        assert_eq!(
            calculate_payment_plan(&by_months).unwrap(),
            calculate_payment_plan(&by_years).unwrap()
        );
    }

    #[rstest]
    #[case("years", TenureUnit::Years)]
    #[case("Year", TenureUnit::Years)]
    #[case("m", TenureUnit::Months)]
    #[case(" months ", TenureUnit::Months)]
    fn test_tenure_unit_from_str(#[case] input: &str, #[case] expected: TenureUnit) {
        assert_eq!(input.parse::<TenureUnit>().unwrap(), expected);
    }

    #[test]
    fn test_loan_terms_from_json() {
        let terms = LoanTerms::from_json_str(
            r#"{ "principal": 100000, "annual_rate_percent": 8, "term_years": 5 }"#,
        )
        .unwrap();
        assert_eq!(terms, LoanTerms::new(100_000.0, 8.0, 5.0).unwrap());

        let err = LoanTerms::from_json_str(
            r#"{ "principal": 100000, "annual_rate_percent": -1, "term_years": 5 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, EmiError::InvalidInput { .. }));

        let err = LoanTerms::from_json_str(r#"{ "principal": "lots" }"#).unwrap_err();
        assert!(matches!(err, EmiError::Serialization(_)));
    }
}
