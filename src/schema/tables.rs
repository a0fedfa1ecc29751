//! Schema definitions for the source datasets and the star schema tables

use super::types::*;

// =============================================================================
// Source Records
// =============================================================================

/// One line of the catalog dataset
pub static ITEM_RECORDS: TableSchema = TableSchema {
    name: "item_records",
    columns: &[
        Column::new("num_items", ColumnType::Integer).json("num_songs"),
        Column::new("entity_id", ColumnType::Text).json("artist_id"),
        Column::new("entity_latitude", ColumnType::Double).json("artist_latitude"),
        Column::new("entity_longitude", ColumnType::Double).json("artist_longitude"),
        Column::new("entity_location", ColumnType::Text).json("artist_location"),
        Column::new("entity_name", ColumnType::Text).json("artist_name"),
        Column::new("item_id", ColumnType::Text).json("song_id"),
        Column::new("title", ColumnType::Text),
        Column::new("duration", ColumnType::Double),
        Column::new("year", ColumnType::Integer),
    ],
    partition_by: &[],
    unique_key: None,
};

/// One line of the event-log dataset
pub static EVENT_RECORDS: TableSchema = TableSchema {
    name: "event_records",
    columns: &[
        Column::new("entity_name", ColumnType::Text).json("artist"),
        Column::new("auth", ColumnType::Text),
        Column::new("first_name", ColumnType::Text).json("firstName"),
        Column::new("gender", ColumnType::Text),
        Column::new("item_in_session", ColumnType::Integer).json("itemInSession"),
        Column::new("last_name", ColumnType::Text).json("lastName"),
        Column::new("length", ColumnType::Double),
        Column::new("level", ColumnType::Text),
        Column::new("location", ColumnType::Text),
        Column::new("method", ColumnType::Text),
        Column::new("page", ColumnType::Text),
        Column::new("registration", ColumnType::Long),
        Column::new("session_id", ColumnType::Integer).json("sessionId"),
        Column::new("title", ColumnType::Text).json("song"),
        Column::new("status", ColumnType::Integer),
        Column::new("ts", ColumnType::Long),
        Column::new("user_agent", ColumnType::Text).json("userAgent"),
        Column::new("actor_id", ColumnType::Integer).json("userId"),
    ],
    partition_by: &[],
    unique_key: None,
};

/// `page` value marking a completed playback
pub const COMPLETED_PLAYBACK: &str = "NextSong";

// =============================================================================
// Dimension Tables
// =============================================================================

pub static ITEMS: TableSchema = TableSchema {
    name: "items",
    columns: &[
        Column::required("item_id", ColumnType::Text),
        Column::new("title", ColumnType::Text),
        Column::new("entity_id", ColumnType::Text),
        Column::new("year", ColumnType::Integer),
        Column::new("duration", ColumnType::Double),
    ],
    partition_by: &["entity_id", "year"],
    unique_key: Some("item_id"),
};

pub static ENTITIES: TableSchema = TableSchema {
    name: "entities",
    columns: &[
        Column::required("entity_id", ColumnType::Text),
        Column::new("name", ColumnType::Text),
        Column::new("location", ColumnType::Text),
        Column::new("latitude", ColumnType::Double),
        Column::new("longitude", ColumnType::Double),
    ],
    partition_by: &["location"],
    unique_key: Some("entity_id"),
};

pub static ACTORS: TableSchema = TableSchema {
    name: "actors",
    columns: &[
        Column::required("actor_id", ColumnType::Integer),
        Column::new("first_name", ColumnType::Text),
        Column::new("last_name", ColumnType::Text),
        Column::new("gender", ColumnType::Text),
        Column::new("level", ColumnType::Text),
    ],
    partition_by: &["gender", "level"],
    unique_key: Some("actor_id"),
};

pub static TIME: TableSchema = TableSchema {
    name: "time",
    columns: &[
        Column::required("start_time", ColumnType::Timestamp),
        Column::required("hour", ColumnType::Integer),
        Column::required("day", ColumnType::Integer),
        Column::required("week", ColumnType::Integer),
        Column::required("month", ColumnType::Integer),
        Column::required("year", ColumnType::Integer),
        Column::required("weekday", ColumnType::Text),
    ],
    partition_by: &["year", "month"],
    unique_key: Some("start_time"),
};

// =============================================================================
// Fact Table
// =============================================================================

/// One row per matched playback. `event_id` is assigned at write time, so
/// the table has no dedup key.
pub static FACT: TableSchema = TableSchema {
    name: "fact",
    columns: &[
        Column::required("event_id", ColumnType::Long),
        Column::required("start_time", ColumnType::Timestamp),
        Column::required("actor_id", ColumnType::Integer),
        Column::new("level", ColumnType::Text),
        Column::required("item_id", ColumnType::Text),
        Column::new("entity_id", ColumnType::Text),
        Column::new("session_id", ColumnType::Integer),
        Column::new("location", ColumnType::Text),
        Column::new("user_agent", ColumnType::Text),
        Column::required("year", ColumnType::Integer),
        Column::required("month", ColumnType::Integer),
    ],
    partition_by: &["year", "month"],
    unique_key: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT_TABLES: [&TableSchema; 5] = [&ITEMS, &ENTITIES, &ACTORS, &TIME, &FACT];

    #[test]
    fn partition_and_key_columns_exist() {
        for table in OUTPUT_TABLES {
            for name in table.partition_by {
                assert!(table.column(name).is_some(), "{}.{}", table.name, name);
            }
            if let Some(key) = table.unique_key {
                let column = table.column(key).unwrap();
                assert!(!column.nullable, "{} key must be required", table.name);
                assert!(!table.partition_by.contains(&key));
            }
        }
    }

    #[test]
    fn dimension_keys() {
        assert_eq!(ITEMS.key().unwrap(), "item_id");
        assert_eq!(TIME.key().unwrap(), "start_time");
        assert!(FACT.key().is_err());
    }

    #[test]
    fn data_columns_exclude_partitions() {
        let names: Vec<_> = ITEMS.data_columns().iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["item_id", "title", "duration"]);

        let parts: Vec<_> = FACT.partition_columns().iter().map(|c| c.name).collect();
        assert_eq!(parts, vec!["year", "month"]);
    }

    #[test]
    fn source_json_keys() {
        assert_eq!(ITEM_RECORDS.column("item_id").unwrap().json_key(), "song_id");
        assert_eq!(EVENT_RECORDS.column("actor_id").unwrap().json_key(), "userId");
        assert_eq!(EVENT_RECORDS.column("page").unwrap().json_key(), "page");
    }
}
