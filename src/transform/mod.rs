pub mod catalog;
pub mod events;
pub mod time;

pub use catalog::{transform_catalog, CatalogOutput, ItemTable};
pub use events::{transform_events, EventSummary};

use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::{col, Expr, SortExpr};

use crate::error::Result;
use crate::parser::ARRIVAL;
use crate::schema::TableSchema;

/// Keep one row per non-null value of the table's key.
///
/// The survivor is the first row by `order`, then by arrival.
pub(crate) fn first_per_key(df: DataFrame, table: &TableSchema, order: Vec<SortExpr>) -> Result<DataFrame> {
    let key = table.key()?;
    let columns: Vec<Expr> = df.schema().columns().into_iter().map(Expr::Column).collect();

    let mut sort = vec![col(key).sort(true, false)];
    sort.extend(order);
    sort.push(col(ARRIVAL).sort(true, false));

    Ok(df
        .filter(col(key).is_not_null())?
        .distinct_on(vec![col(key)], columns, Some(sort))?)
}
