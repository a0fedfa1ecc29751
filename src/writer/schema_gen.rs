use datafusion::arrow::datatypes::{DataType, Field, Schema, TimeUnit};

use crate::schema::{ColumnType, TableSchema};

/// Timezone attached to every timestamp column
pub const TIMESTAMP_TZ: &str = "UTC";

/// Arrow type for a column type
pub fn arrow_type(col_type: ColumnType) -> DataType {
    match col_type {
        ColumnType::Integer => DataType::Int32,
        ColumnType::Long => DataType::Int64,
        ColumnType::Double => DataType::Float64,
        ColumnType::Text => DataType::Utf8,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, Some(TIMESTAMP_TZ.into())),
    }
}

/// Schema of the Parquet files of a table, as handed to the reader.
///
/// Partition columns live in the directory names, so they are left out.
/// Fields are nullable: required columns are enforced on write.
pub fn file_schema(table: &TableSchema) -> Schema {
    let fields: Vec<Field> = table
        .data_columns()
        .iter()
        .map(|col| Field::new(col.name, arrow_type(col.col_type), true))
        .collect();

    Schema::new(fields)
}
