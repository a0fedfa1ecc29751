use datafusion::arrow::datatypes::DataType;
use datafusion::common::ScalarValue;
use datafusion::dataframe::DataFrame;
use datafusion::functions::expr_fn::{date_part, to_char};
use datafusion::logical_expr::{cast, col, lit, when, Expr};

use crate::error::Result;
use crate::schema::ColumnType;
use crate::writer::schema_gen::{arrow_type, TIMESTAMP_TZ};

/// 0000-01-01T00:00:00Z in epoch milliseconds
pub const MIN_START_MS: i64 = -62_167_219_200_000;
/// 9999-12-31T23:59:59.999Z in epoch milliseconds
pub const MAX_START_MS: i64 = 253_402_300_799_999;

/// Integer calendar fields of the time dimension, named after the
/// `date_part` unit that derives them. `week` is the ISO 8601 week.
pub const CALENDAR_PARTS: &[&str] = &["hour", "day", "week", "month", "year"];

/// `ts` (epoch milliseconds) as a UTC timestamp.
///
/// Instants outside years 0000..=9999 have no calendar fields, so they
/// become null like a missing `ts`.
pub fn start_time(ts: Expr) -> Result<Expr> {
    let null = ScalarValue::TimestampMillisecond(None, Some(TIMESTAMP_TZ.into()));
    let in_range = ts.clone().between(lit(MIN_START_MS), lit(MAX_START_MS));
    Ok(when(in_range, cast(ts, arrow_type(ColumnType::Timestamp))).otherwise(lit(null))?)
}

pub fn calendar_part(part: &str, start_time: Expr) -> Expr {
    cast(date_part(lit(part), start_time), DataType::Int32)
}

/// Abbreviated English weekday name (`Mon`..`Sun`)
pub fn weekday(start_time: Expr) -> Expr {
    to_char(start_time, lit("%a"))
}

/// Add `start_time` and its calendar fields, derived from `ts`
pub fn with_calendar(df: DataFrame) -> Result<DataFrame> {
    let mut df = df.with_column("start_time", start_time(col("ts"))?)?;
    for part in CALENDAR_PARTS {
        df = df.with_column(part, calendar_part(part, col("start_time")))?;
    }
    Ok(df.with_column("weekday", weekday(col("start_time")))?)
}
