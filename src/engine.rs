use datafusion::dataframe::DataFrame;
use datafusion::execution::object_store::ObjectStoreUrl;
use datafusion::prelude::{SessionConfig, SessionContext};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Credentials, Settings};
use crate::error::{EtlError, Result};
use crate::filter::DatasetSelector;
use crate::parser::{read_json_lines, RecordBuffer};
use crate::schema::TableSchema;
use crate::store::{self, ObjectUri};
use crate::writer::{self, WriteStats};

/// Immutable provisioning input for [`acquire_engine`]
#[derive(Clone)]
pub struct EngineConfig {
    credentials: Credentials,
    connectors: Vec<(String, Arc<dyn ObjectStore>)>,
}

impl EngineConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            connectors: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.credentials.clone())
    }

    /// Serve `store_url` (`scheme://[bucket]`) from `store`, replacing any
    /// built-in connector
    pub fn with_connector(mut self, store_url: &str, store: Arc<dyn ObjectStore>) -> Self {
        self.connectors.push((store_url.to_string(), store));
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("credentials", &self.credentials)
            .field(
                "connectors",
                &self.connectors.iter().map(|(url, _)| url).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Where a table lives, and the schema it was written with
#[derive(Debug, Clone)]
pub struct TableLocation {
    uri: ObjectUri,
    schema: &'static TableSchema,
}

impl TableLocation {
    pub fn uri(&self) -> &ObjectUri {
        &self.uri
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.schema
    }
}

/// A table the engine has just written
#[derive(Debug, Clone)]
pub struct WrittenTable {
    pub location: TableLocation,
    pub stats: WriteStats,
}

pub struct Engine {
    ctx: SessionContext,
}

/// Establish the execution context.
///
/// Fails when the credential pair is missing: nothing is read or written
/// without it.
pub fn acquire_engine(config: EngineConfig) -> Result<Engine> {
    config.credentials.validate()?;

    let session = SessionConfig::new().with_target_partitions(1);
    let engine = Engine {
        ctx: SessionContext::new_with_config(session),
    };

    engine.register_store("memory://", Arc::new(InMemory::new()))?;
    for (url, store) in config.connectors {
        engine.register_store(&url, store)?;
    }

    info!(credential_id = %config.credentials.credential_id, "engine acquired");
    Ok(engine)
}

impl Engine {
    /// Add or replace the connector serving `store_url`
    pub fn register_store(&self, store_url: &str, store: Arc<dyn ObjectStore>) -> Result<()> {
        let url = ObjectStoreUrl::parse(store_url)?;
        self.ctx.register_object_store(url.as_ref(), store);
        debug!(store_url = %url.as_str(), "connector registered");
        Ok(())
    }

    /// Map a URI to its connector
    pub fn resolve(&self, uri: &ObjectUri) -> Result<Arc<dyn ObjectStore>> {
        self.ctx
            .runtime_env()
            .object_store(uri.store_url()?)
            .map_err(|_| EtlError::UnsupportedScheme {
                scheme: uri.scheme.clone(),
                uri: uri.to_string(),
            })
    }

    /// Location of the table `schema.name` under `dest`
    pub fn locate(&self, dest: &str, schema: &'static TableSchema) -> Result<TableLocation> {
        Ok(TableLocation {
            uri: ObjectUri::parse(dest)?.join(schema.name).as_dir(),
            schema,
        })
    }

    /// Read every record object under `base + path` against `schema`.
    ///
    /// Objects are read in key order and lines in file order; the result
    /// carries that order in its `arrival` column.
    pub async fn read_json(&self, base: &str, path: &str, schema: &'static TableSchema) -> Result<DataFrame> {
        let uri = ObjectUri::parse(base)?.join(path);
        let store = self.resolve(&uri)?;
        let selector = DatasetSelector::new(uri.key())?;

        let listed = store::list_objects(store.as_ref(), &Path::from(selector.list_prefix())).await?;
        let keys = selector.select(listed.iter().map(|p| p.to_string()).collect());
        if keys.is_empty() {
            return Err(EtlError::SourceNotFound(uri.to_string()));
        }

        let mut buffer = RecordBuffer::new(schema);
        for key in &keys {
            let data = store.get(&Path::from(key.as_str())).await?.bytes().await?;
            let count = read_json_lines(&data, key, &mut buffer)?;
            debug!(key = %key, records = count, "read object");
        }

        info!(
            dataset = %uri,
            objects = keys.len(),
            records = buffer.len(),
            "dataset read"
        );
        Ok(self.ctx.read_batch(buffer.into_batch()?)?)
    }

    /// Overwrite the table `schema.name` under `dest` with `df`
    pub async fn write_table(
        &self,
        df: DataFrame,
        schema: &'static TableSchema,
        dest: &str,
    ) -> Result<WrittenTable> {
        let location = self.locate(dest, schema)?;
        let store = self.resolve(&location.uri)?;
        let stats = writer::write_table(store.as_ref(), &location.uri, df, schema).await?;

        Ok(WrittenTable { location, stats })
    }

    /// Read a table previously written by [`Engine::write_table`]
    pub async fn read_table(&self, location: &TableLocation) -> Result<DataFrame> {
        let store = self.resolve(&location.uri)?;
        writer::read_table(&self.ctx, store.as_ref(), &location.uri, location.schema).await
    }
}
