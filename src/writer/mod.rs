pub mod schema_gen;

use datafusion::arrow::array::AsArray;
use datafusion::arrow::datatypes::{DataType, UInt64Type};
use datafusion::common::ScalarValue;
use datafusion::config::TableParquetOptions;
use datafusion::dataframe::{DataFrame, DataFrameWriteOptions};
use datafusion::functions::expr_fn::replace;
use datafusion::logical_expr::{cast, col, lit, when, Expr};
use datafusion::prelude::{ParquetReadOptions, SessionContext};
use object_store::path::Path;
use object_store::ObjectStore;
use std::collections::BTreeSet;
use tracing::{debug, info};

use self::schema_gen::{arrow_type, file_schema};
use crate::error::{EtlError, Result};
use crate::schema::TableSchema;
use crate::store::{self, join_key, ObjectUri};

/// Written last; its presence marks a complete table
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Directory value standing in for a null partition value
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

const COMPRESSION: &str = "snappy";

/// Characters escaped in partition directory names, with their escapes.
/// `%` comes last so decoding never produces a new escape.
const ESCAPES: &[(&str, &str)] = &[
    ("%2F", "/"),
    ("%5C", "\\"),
    ("%7B", "{"),
    ("%7D", "}"),
    ("%5B", "["),
    ("%5D", "]"),
    ("%5E", "^"),
    ("%60", "`"),
    ("%22", "\""),
    ("%3C", "<"),
    ("%3E", ">"),
    ("%7E", "~"),
    ("%23", "#"),
    ("%7C", "|"),
    ("%25", "%"),
];

/// Outcome of a table write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub rows: usize,
    pub partitions: usize,
    /// Objects removed from the previous run
    pub replaced: usize,
}

fn not_null(columns: impl Iterator<Item = &'static str>) -> Option<Expr> {
    columns
        .map(|name| col(name).is_not_null())
        .reduce(|acc, e| acc.and(e))
}

/// Partition column rendered as the text that goes into its directory name
fn partition_text(name: &str) -> Result<Expr> {
    let text = cast(col(name), DataType::Utf8);
    let missing = text.clone().is_null().or(text.clone().eq(lit("")));
    Ok(when(missing, lit(DEFAULT_PARTITION)).otherwise(text)?.alias(name))
}

/// Partition value parsed back from its directory name
fn partition_value(name: &str, dtype: DataType) -> Result<Expr> {
    let raw = col(name);
    let missing = raw.clone().eq(lit(DEFAULT_PARTITION)).or(raw.clone().eq(lit("")));
    let decoded = ESCAPES
        .iter()
        .fold(raw, |acc, (escape, plain)| replace(acc, lit(*escape), lit(*plain)));
    let null = ScalarValue::try_from(&dtype)?;

    Ok(when(missing, lit(null)).otherwise(cast(decoded, dtype))?.alias(name))
}

/// Write `df` as a partitioned Parquet table at `dir`, replacing whatever
/// the table held before.
///
/// Rows with a null in a required column are dropped. Returns once the
/// success marker is in place.
pub async fn write_table(
    store: &dyn ObjectStore,
    dir: &ObjectUri,
    df: DataFrame,
    schema: &TableSchema,
) -> Result<WriteStats> {
    let dir = dir.as_dir();
    let prefix = dir.object_path();
    let replaced = store::delete_prefix(store, &prefix).await?;

    let df = match not_null(schema.required_columns().map(|c| c.name)) {
        Some(predicate) => df.filter(predicate)?,
        None => df,
    };

    let projection = schema
        .columns
        .iter()
        .map(|c| {
            if schema.partition_by.contains(&c.name) {
                partition_text(c.name)
            } else {
                Ok(cast(col(c.name), arrow_type(c.col_type)).alias(c.name))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let df = df.select(projection)?;

    let mut parquet_options = TableParquetOptions::default();
    parquet_options.global.compression = Some(COMPRESSION.to_string());
    let write_options = DataFrameWriteOptions::new()
        .with_partition_by(schema.partition_by.iter().map(|s| s.to_string()).collect());

    let counts = df
        .write_parquet(&dir.to_string(), write_options, Some(parquet_options))
        .await?;
    let rows: u64 = counts
        .iter()
        .filter_map(|batch| batch.column_by_name("count"))
        .map(|counts| counts.as_primitive::<UInt64Type>().iter().flatten().sum::<u64>())
        .sum();

    store::put_marker(store, &Path::from(join_key(dir.key(), SUCCESS_MARKER))).await?;

    let partitions: BTreeSet<String> = store::list_objects(store, &prefix)
        .await?
        .iter()
        .filter(|key| key.extension() == Some("parquet"))
        .map(|key| {
            let key = key.as_ref();
            key[..key.rfind('/').unwrap_or(0)].to_string()
        })
        .collect();

    let stats = WriteStats {
        rows: rows as usize,
        partitions: partitions.len(),
        replaced,
    };
    info!(
        table = schema.name,
        rows = stats.rows,
        partitions = stats.partitions,
        replaced = stats.replaced,
        "table written"
    );

    Ok(stats)
}

/// Read a table written by [`write_table`] back, columns in schema order
/// and partition columns restored to their types
pub async fn read_table(
    ctx: &SessionContext,
    store: &dyn ObjectStore,
    dir: &ObjectUri,
    schema: &TableSchema,
) -> Result<DataFrame> {
    let dir = dir.as_dir();
    let marker = Path::from(join_key(dir.key(), SUCCESS_MARKER));
    if !store::exists(store, &marker).await? {
        return Err(EtlError::TableNotFound(dir.to_string()));
    }

    let files = file_schema(schema);
    let partition_cols = schema
        .partition_columns()
        .iter()
        .map(|c| (c.name.to_string(), DataType::Utf8))
        .collect();
    let options = ParquetReadOptions::default()
        .schema(&files)
        .table_partition_cols(partition_cols);
    let df = ctx.read_parquet(dir.to_string(), options).await?;

    let projection = schema
        .columns
        .iter()
        .map(|c| {
            if schema.partition_by.contains(&c.name) {
                partition_value(c.name, arrow_type(c.col_type))
            } else {
                Ok(col(c.name))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(table = schema.name, dir = %dir, "table opened");
    Ok(df.select(projection)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{ACTORS, ITEMS};
    use crate::transform::testing::{ints, texts};
    use datafusion::arrow::array::{ArrayRef, Float64Array, Int32Array, RecordBatch, StringArray};
    use object_store::memory::InMemory;
    use datafusion::prelude::SessionConfig;
    use object_store::PutPayload;
    use std::sync::Arc;

    fn memory_context() -> (SessionContext, Arc<InMemory>) {
        let ctx = SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1));
        let store = Arc::new(InMemory::new());
        let url = ObjectUri::parse("memory:///").unwrap().store_url().unwrap();
        ctx.register_object_store(url.as_ref(), store.clone());
        (ctx, store)
    }

    fn items(ctx: &SessionContext) -> DataFrame {
        let columns: Vec<(&str, ArrayRef)> = vec![
            ("item_id", Arc::new(StringArray::from(vec![Some("S1"), Some("S2"), Some("S3"), None]))),
            ("title", Arc::new(StringArray::from(vec!["Song A", "Song B", "Song C", "Lost"]))),
            ("entity_id", Arc::new(StringArray::from(vec![Some("E1"), Some("E1"), None, Some("E3")]))),
            ("year", Arc::new(Int32Array::from(vec![2000, 2000, 0, 1999]))),
            ("duration", Arc::new(Float64Array::from(vec![200.0; 4]))),
        ];
        ctx.read_batch(RecordBatch::try_from_iter(columns).unwrap()).unwrap()
    }

    fn dirs(keys: &[Path]) -> BTreeSet<String> {
        keys.iter()
            .filter(|k| k.extension() == Some("parquet"))
            .map(|k| k.as_ref().rsplit_once('/').unwrap().0.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_write_lays_out_partitions() {
        let (ctx, store) = memory_context();
        let dir = ObjectUri::parse("memory:///out/items").unwrap();

        let stats = write_table(store.as_ref(), &dir, items(&ctx), &ITEMS).await.unwrap();
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.partitions, 2);

        let keys = store::list_objects(store.as_ref(), &Path::from("out/items")).await.unwrap();
        assert!(keys.contains(&Path::from("out/items/_SUCCESS")));
        assert_eq!(
            dirs(&keys),
            BTreeSet::from([
                "out/items/entity_id=E1/year=2000".to_string(),
                format!("out/items/entity_id={}/year=0", DEFAULT_PARTITION),
            ])
        );
    }

    #[tokio::test]
    async fn test_read_back_restores_partition_columns() {
        let (ctx, store) = memory_context();
        let dir = ObjectUri::parse("memory:///out/items").unwrap();
        write_table(store.as_ref(), &dir, items(&ctx), &ITEMS).await.unwrap();

        let df = read_table(&ctx, store.as_ref(), &dir, &ITEMS).await.unwrap();
        let names: Vec<_> = df.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["item_id", "title", "entity_id", "year", "duration"]);

        let df = df.sort(vec![col("item_id").sort(true, false)]).unwrap();
        let batches = df.collect().await.unwrap();
        assert_eq!(texts(&batches, "item_id"), vec![Some("S1".into()), Some("S2".into()), Some("S3".into())]);
        assert_eq!(texts(&batches, "entity_id"), vec![Some("E1".into()), Some("E1".into()), None]);
        assert_eq!(ints(&batches, "year"), vec![Some(2000), Some(2000), Some(0)]);
    }

    #[tokio::test]
    async fn test_partition_values_are_escaped() {
        let (ctx, store) = memory_context();
        let columns: Vec<(&str, ArrayRef)> = vec![
            ("actor_id", Arc::new(Int32Array::from(vec![1]))),
            ("first_name", Arc::new(StringArray::from(vec!["A"]))),
            ("last_name", Arc::new(StringArray::from(vec!["B"]))),
            ("gender", Arc::new(StringArray::from(vec!["F/M"]))),
            ("level", Arc::new(StringArray::from(vec!["100%"]))),
        ];
        let df = ctx.read_batch(RecordBatch::try_from_iter(columns).unwrap()).unwrap();
        let dir = ObjectUri::parse("memory:///out/actors").unwrap();
        write_table(store.as_ref(), &dir, df, &ACTORS).await.unwrap();

        let keys = store::list_objects(store.as_ref(), &Path::from("out/actors")).await.unwrap();
        assert_eq!(
            dirs(&keys),
            BTreeSet::from(["out/actors/gender=F%2FM/level=100%25".to_string()])
        );

        let batches = read_table(&ctx, store.as_ref(), &dir, &ACTORS)
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(texts(&batches, "gender"), vec![Some("F/M".into())]);
        assert_eq!(texts(&batches, "level"), vec![Some("100%".into())]);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous_contents() {
        let (ctx, store) = memory_context();
        let dir = ObjectUri::parse("memory:///out/items").unwrap();
        write_table(store.as_ref(), &dir, items(&ctx), &ITEMS).await.unwrap();
        let stale = Path::from("out/items/entity_id=OLD/year=1/part-0.parquet");
        store.put(&stale, PutPayload::from_static(b"x")).await.unwrap();

        let stats = write_table(store.as_ref(), &dir, items(&ctx), &ITEMS).await.unwrap();
        assert_eq!(stats.replaced, 4);
        assert!(!store::exists(store.as_ref(), &stale).await.unwrap());

        let rows = read_table(&ctx, store.as_ref(), &dir, &ITEMS)
            .await
            .unwrap()
            .count()
            .await
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[tokio::test]
    async fn test_read_missing_table() {
        let (ctx, store) = memory_context();
        let dir = ObjectUri::parse("memory:///out/items").unwrap();
        assert!(matches!(
            read_table(&ctx, store.as_ref(), &dir, &ITEMS).await,
            Err(EtlError::TableNotFound(_))
        ));
    }
}
