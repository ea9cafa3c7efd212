//! CSV export of an amortization schedule.

use crate::error::{EmiError, EmiResult};
use crate::AmortizationEntry;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::io;

/// Column names of the exported table, in order.
pub const CSV_HEADERS: [&str; 5] = ["period", "payment", "principal", "interest", "balance"];

/// Writes the schedule as CSV: a header row, then one row per period with every
/// amount rendered to exactly two decimal places.
pub fn write_schedule_csv<W: io::Write>(
    schedule: &[AmortizationEntry],
    writer: W,
) -> EmiResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(CSV_HEADERS)?;
    for entry in schedule {
        wtr.write_record([
            entry.period_index.to_string(),
            two_decimals(entry.payment)?,
            two_decimals(entry.principal_component)?,
            two_decimals(entry.interest_component)?,
            two_decimals(entry.remaining_balance)?,
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Renders the schedule as a CSV string.
pub fn schedule_to_csv(schedule: &[AmortizationEntry]) -> EmiResult<String> {
    let mut buf = Vec::new();
    write_schedule_csv(schedule, &mut buf)?;
    String::from_utf8(buf).map_err(|e| EmiError::Export(e.to_string()))
}

fn two_decimals(value: f64) -> EmiResult<String> {
    let amount = Decimal::from_f64(value)
        .ok_or_else(|| EmiError::NumericDegeneracy(format!("cannot export {value}")))?;
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // no -0.00
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    Ok(format!("{rounded:.2}"))
}
