use anyhow::{Context, Result};
use tracing::info;

use super::first_per_key;
use crate::engine::{Engine, TableLocation, WrittenTable};
use crate::schema::tables::{ENTITIES, ITEMS, ITEM_RECORDS};

/// Catalog record columns renamed for the entity dimension
const ENTITY_RENAMES: &[(&str, &str)] = &[
    ("entity_name", "name"),
    ("entity_location", "location"),
    ("entity_latitude", "latitude"),
    ("entity_longitude", "longitude"),
];

/// Handle to the item dimension written by [`transform_catalog`].
///
/// The event transform reads items back through this handle rather than
/// rebuilding the destination path itself.
#[derive(Debug, Clone)]
pub struct ItemTable {
    location: TableLocation,
    rows: usize,
}

impl ItemTable {
    pub fn location(&self) -> &TableLocation {
        &self.location
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

#[derive(Debug, Clone)]
pub struct CatalogOutput {
    pub items: ItemTable,
    pub entities: WrittenTable,
    /// Catalog records read before dedup
    pub records: usize,
}

/// Build the item and entity dimensions from the catalog dataset
pub async fn transform_catalog(
    engine: &Engine,
    source_uri: &str,
    dest_uri: &str,
    catalog_path: &str,
) -> Result<CatalogOutput> {
    let records = engine
        .read_json(source_uri, catalog_path, &ITEM_RECORDS)
        .await
        .context("Failed to read catalog records")?;
    let record_count = records.clone().count().await?;

    let items = first_per_key(records.clone(), &ITEMS, vec![])?;
    let items = engine
        .write_table(items, &ITEMS, dest_uri)
        .await
        .context("Failed to write items table")?;

    let mut entities = records;
    for (from, to) in ENTITY_RENAMES {
        entities = entities.with_column_renamed(*from, *to)?;
    }
    let entities = first_per_key(entities, &ENTITIES, vec![])?;
    let entities = engine
        .write_table(entities, &ENTITIES, dest_uri)
        .await
        .context("Failed to write entities table")?;

    info!(
        records = record_count,
        items = items.stats.rows,
        entities = entities.stats.rows,
        "catalog transform complete"
    );

    Ok(CatalogOutput {
        items: ItemTable {
            location: items.location,
            rows: items.stats.rows,
        },
        entities,
        records: record_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::testing::{memory_engine, texts};
    use datafusion::logical_expr::col;

    fn song(id: &str, title: &str, artist: &str, location: &str) -> String {
        format!(
            r#"{{"num_songs": 1, "artist_id": "{artist}", "artist_latitude": 40.0, "artist_longitude": -70.0, "artist_location": "{location}", "artist_name": "Band {artist}", "song_id": "{id}", "title": "{title}", "duration": 200.0, "year": 2000}}"#
        )
    }

    async fn engine_with(lines: &[String]) -> Engine {
        let objects: Vec<(String, String)> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| (format!("in/song_data/A/{:03}.json", i), line.clone()))
            .collect();
        let objects: Vec<(&str, String)> = objects.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        memory_engine(&objects).await
    }

    #[tokio::test]
    async fn test_items_deduplicated_first_wins() {
        let engine = engine_with(&[
            song("S1", "First", "E1", "NYC"),
            song("S1", "Second", "E1", "NYC"),
            song("S2", "Other", "E2", "LA"),
        ])
        .await;

        let out = transform_catalog(&engine, "memory:///in/", "memory:///out/", "song_data")
            .await
            .unwrap();
        assert_eq!(out.records, 3);
        assert_eq!(out.items.rows(), 2);
        assert_eq!(out.entities.stats.rows, 2);

        let items = engine.read_table(out.items.location()).await.unwrap();
        let batches = items
            .sort(vec![col("item_id").sort(true, false)])
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(texts(&batches, "title"), vec![Some("First".into()), Some("Other".into())]);
    }

    #[tokio::test]
    async fn test_entities_renamed_and_partitioned_by_location() {
        let engine = engine_with(&[song("S1", "A", "E1", "NYC"), song("S2", "B", "E1", "NYC")]).await;
        let out = transform_catalog(&engine, "memory:///in/", "memory:///out/", "song_data")
            .await
            .unwrap();
        assert_eq!(out.entities.stats.partitions, 1);

        let batches = engine
            .read_table(&out.entities.location)
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(texts(&batches, "name"), vec![Some("Band E1".into())]);
        assert_eq!(texts(&batches, "location"), vec![Some("NYC".into())]);
    }

    #[tokio::test]
    async fn test_missing_catalog_is_error() {
        let engine = engine_with(&[]).await;
        let err = transform_catalog(&engine, "memory:///in/", "memory:///out/", "song_data")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read catalog records"));
    }
}
