use datafusion::arrow::array::{
    ArrayRef, Float64Builder, Int32Builder, Int64Builder, StringBuilder, TimestampMillisecondBuilder,
};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use std::sync::Arc;

use super::record::Datum;
use crate::error::Result;
use crate::schema::{ColumnType, TableSchema};
use crate::writer::schema_gen::{arrow_type, TIMESTAMP_TZ};

/// Extra column holding each record's position in the dataset.
///
/// Objects are read in key order and lines in file order, so this is the
/// arrival order that first-wins dedup and surrogate ids follow.
pub const ARRIVAL: &str = "arrival";

/// Parsed rows of one dataset, waiting to become a record batch
#[derive(Debug)]
pub struct RecordBuffer {
    schema: &'static TableSchema,
    rows: Vec<Vec<Datum>>,
}

impl RecordBuffer {
    pub fn new(schema: &'static TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }

    pub fn push(&mut self, row: Vec<Datum>) {
        debug_assert_eq!(row.len(), self.schema.columns.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build one batch: the schema's columns followed by [`ARRIVAL`]
    pub fn into_batch(self) -> Result<RecordBatch> {
        let mut fields: Vec<Field> = self
            .schema
            .columns
            .iter()
            .map(|col| Field::new(col.name, arrow_type(col.col_type), true))
            .collect();
        fields.push(Field::new(ARRIVAL, DataType::Int64, false));

        let mut arrays: Vec<ArrayRef> = self
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| build_array(col.col_type, self.rows.iter().map(|row| &row[idx])))
            .collect();
        let mut arrival = Int64Builder::with_capacity(self.rows.len());
        for seq in 0..self.rows.len() {
            arrival.append_value(seq as i64);
        }
        arrays.push(Arc::new(arrival.finish()));

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

fn build_array<'a>(col_type: ColumnType, values: impl Iterator<Item = &'a Datum>) -> ArrayRef {
    match col_type {
        ColumnType::Integer => {
            let mut b = Int32Builder::new();
            for v in values {
                b.append_option(v.as_i64().and_then(|i| i32::try_from(i).ok()));
            }
            Arc::new(b.finish())
        }
        ColumnType::Long => {
            let mut b = Int64Builder::new();
            for v in values {
                b.append_option(v.as_i64());
            }
            Arc::new(b.finish())
        }
        ColumnType::Double => {
            let mut b = Float64Builder::new();
            for v in values {
                b.append_option(v.as_f64());
            }
            Arc::new(b.finish())
        }
        ColumnType::Text => {
            let mut b = StringBuilder::new();
            for v in values {
                b.append_option(v.as_str());
            }
            Arc::new(b.finish())
        }
        ColumnType::Timestamp => {
            let mut b = TimestampMillisecondBuilder::new().with_timezone(TIMESTAMP_TZ);
            for v in values {
                b.append_option(v.as_i64());
            }
            Arc::new(b.finish())
        }
    }
}
