use serde_json::Value;

use crate::schema::{ColumnType, TableSchema};

/// One parsed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl Datum {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Double(f) => Some(*f),
            Datum::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Parse a JSON line into a row for the given schema, in column order.
///
/// Fields that are missing, null or of an incompatible type become
/// [`Datum::Null`]. Only a line that is not a JSON object is an error.
pub fn parse_record(line: &str, schema: &TableSchema) -> Result<Vec<Datum>, String> {
    let json: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let obj = json
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, found {}", kind(&json)))?;

    Ok(schema
        .columns
        .iter()
        .map(|col| extract_value(obj.get(col.json_key()), col.col_type))
        .collect())
}

fn extract_value(val: Option<&Value>, col_type: ColumnType) -> Datum {
    let v = match val {
        None | Some(Value::Null) => return Datum::Null,
        Some(v) => v,
    };

    match col_type {
        ColumnType::Integer => integer(v)
            .filter(|i| i32::try_from(*i).is_ok())
            .map(Datum::Integer)
            .unwrap_or(Datum::Null),
        ColumnType::Long | ColumnType::Timestamp => integer(v).map(Datum::Integer).unwrap_or(Datum::Null),
        ColumnType::Double => match v {
            Value::Number(n) => n.as_f64().map(Datum::Double).unwrap_or(Datum::Null),
            Value::String(s) => s.trim().parse().map(Datum::Double).unwrap_or(Datum::Null),
            _ => Datum::Null,
        },
        ColumnType::Text => match v {
            Value::String(s) => Datum::Text(s.clone()),
            Value::Number(_) | Value::Bool(_) => Datum::Text(v.to_string()),
            _ => Datum::Null,
        },
    }
}

/// Integers may arrive as numbers, integral floats or numeric strings
fn integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
