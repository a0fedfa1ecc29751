use anyhow::{Context, Result};
use datafusion::arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion::functions_window::expr_fn::row_number;
use datafusion::logical_expr::{cast, col, lit, ExprFunctionExt, JoinType};
use tracing::{info, warn};

use super::catalog::ItemTable;
use super::first_per_key;
use super::time::with_calendar;
use crate::engine::Engine;
use crate::error::EtlError;
use crate::parser::ARRIVAL;
use crate::schema::tables::{ACTORS, COMPLETED_PLAYBACK, EVENT_RECORDS, FACT, TIME};

/// Item title as carried into the join, clear of the play's own `title`
const ITEM_TITLE: &str = "item_title";

const ROW_NUMBER: &str = "row_number";

/// Row counts produced by [`transform_events`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventSummary {
    /// Event records read
    pub records: usize,
    /// Records left after the playback filter
    pub plays: usize,
    pub actors: usize,
    pub time_rows: usize,
    pub fact_rows: usize,
    /// Plays dropped because no catalog item carries their title
    pub unmatched: usize,
}

/// Number the rows from 0 by start time, then arrival
fn with_event_ids(df: DataFrame) -> Result<DataFrame, EtlError> {
    let order = vec![col("start_time").sort(true, false), col(ARRIVAL).sort(true, false)];
    let df = df.window(vec![row_number().order_by(order).build()?.alias(ROW_NUMBER)])?;
    Ok(df.with_column("event_id", cast(col(ROW_NUMBER), DataType::Int64) - lit(1i64))?)
}

/// Build the actor, time and fact tables from the event log
pub async fn transform_events(
    engine: &Engine,
    source_uri: &str,
    dest_uri: &str,
    log_path: &str,
    items: &ItemTable,
) -> Result<EventSummary> {
    let records = engine
        .read_json(source_uri, log_path, &EVENT_RECORDS)
        .await
        .context("Failed to read event records")?;
    let record_count = records.clone().count().await?;

    let plays = records.filter(col("page").eq(lit(COMPLETED_PLAYBACK)))?;
    let play_count = plays.clone().count().await?;

    // Latest event wins so a subscription change is reflected
    let actors = first_per_key(plays.clone(), &ACTORS, vec![col("ts").sort(false, false)])?;
    let actors = engine
        .write_table(actors, &ACTORS, dest_uri)
        .await
        .context("Failed to write actors table")?;

    let plays = with_calendar(plays)?;

    let time = first_per_key(plays.clone(), &TIME, vec![])?;
    let time = engine
        .write_table(time, &TIME, dest_uri)
        .await
        .context("Failed to write time table")?;

    let item_dim = engine
        .read_table(items.location())
        .await
        .context("Failed to read items table")?
        .select(vec![col("item_id"), col("entity_id"), col("title").alias(ITEM_TITLE)])?;

    let unmatched = plays
        .clone()
        .join(item_dim.clone(), JoinType::LeftAnti, &["title"], &[ITEM_TITLE], None)?
        .count()
        .await?;
    if unmatched > 0 {
        warn!(
            unmatched,
            plays = play_count,
            "plays without a matching catalog item were dropped"
        );
    }

    let fact = plays
        .join(item_dim, JoinType::Inner, &["title"], &[ITEM_TITLE], None)?
        .filter(col("start_time").is_not_null().and(col("actor_id").is_not_null()))?;
    let fact = engine
        .write_table(with_event_ids(fact)?, &FACT, dest_uri)
        .await
        .context("Failed to write fact table")?;

    let summary = EventSummary {
        records: record_count,
        plays: play_count,
        actors: actors.stats.rows,
        time_rows: time.stats.rows,
        fact_rows: fact.stats.rows,
        unmatched,
    };
    info!(?summary, "event transform complete");

    Ok(summary)
}
