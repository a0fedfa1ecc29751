use crate::error::{EtlError, Result};

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    Long,
    Double,
    Text,
    /// Milliseconds since the Unix epoch, UTC
    Timestamp,
}

/// Column definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
    /// Override JSON field name (default: the column name)
    pub json_field: Option<&'static str>,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
            json_field: None,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: false,
            json_field: None,
        }
    }

    /// Set the JSON field name (for when it differs from the column name)
    pub const fn json(self, field: &'static str) -> Self {
        Self {
            json_field: Some(field),
            ..self
        }
    }

    /// Key to look up in a JSON record
    pub fn json_key(&self) -> &'static str {
        self.json_field.unwrap_or(self.name)
    }
}

/// Table schema definition, used both for source records and output tables
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Columns encoded in the directory layout instead of the data files
    pub partition_by: &'static [&'static str],
    /// Dedup key: one row per distinct non-null value survives
    pub unique_key: Option<&'static str>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn key(&self) -> Result<&'static str> {
        self.unique_key.ok_or(EtlError::NoUniqueKey(self.name))
    }

    /// Columns that may not be null in written rows
    pub fn required_columns(&self) -> impl Iterator<Item = &'static Column> {
        self.columns.iter().filter(|c| !c.nullable)
    }

    /// Columns stored inside the data files, in table order
    pub fn data_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|c| !self.partition_by.contains(&c.name))
            .copied()
            .collect()
    }

    /// Partition columns in partition order
    pub fn partition_columns(&self) -> Vec<Column> {
        self.partition_by
            .iter()
            .filter_map(|name| self.column(name).copied())
            .collect()
    }
}
