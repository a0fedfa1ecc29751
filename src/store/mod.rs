use datafusion::execution::object_store::ObjectStoreUrl;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::fmt;

use crate::error::{EtlError, Result};

/// Schemes whose URIs carry no bucket: everything after `://` is the path
const PATH_ONLY_SCHEMES: &[&str] = &["file", "memory"];

/// A parsed `scheme://[bucket]/path` reference.
///
/// Bare paths use the `file` scheme and are made absolute against the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub scheme: String,
    /// Bucket or host; empty for `file` and `memory`
    pub authority: String,
    /// Always starts with `/`
    pub path: String,
}

impl ObjectUri {
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.trim().is_empty() {
            return Err(EtlError::InvalidUri("empty URI".to_string()));
        }

        let Some((scheme, rest)) = uri.split_once("://") else {
            return Self::local(uri);
        };

        let valid = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid {
            return Err(EtlError::InvalidUri(uri.to_string()));
        }
        let scheme = scheme.to_ascii_lowercase();

        if scheme == "file" && !rest.starts_with('/') {
            return Self::local(rest);
        }

        let (authority, path) = if PATH_ONLY_SCHEMES.contains(&scheme.as_str()) {
            ("", rest)
        } else {
            rest.split_once('/').unwrap_or((rest, ""))
        };

        Ok(Self {
            scheme,
            authority: authority.to_string(),
            path: join_key("/", path),
        })
    }

    fn local(path: &str) -> Result<Self> {
        let absolute = if path.starts_with('/') {
            path.to_string()
        } else {
            let cwd = std::env::current_dir()
                .map_err(|e| EtlError::InvalidUri(format!("{}: {}", path, e)))?;
            join_key(&cwd.to_string_lossy(), path)
        };

        Ok(Self {
            scheme: "file".to_string(),
            authority: String::new(),
            path: absolute,
        })
    }

    /// Append a relative path below this URI
    pub fn join(&self, rel: &str) -> Self {
        Self {
            path: join_key(&self.path, rel),
            ..self.clone()
        }
    }

    /// Same location, as a directory (trailing `/`)
    pub fn as_dir(&self) -> Self {
        Self {
            path: format!("{}/", self.path.trim_end_matches('/')),
            ..self.clone()
        }
    }

    /// Key of the store that serves this URI
    pub fn store_url(&self) -> Result<ObjectStoreUrl> {
        Ok(ObjectStoreUrl::parse(format!("{}://{}", self.scheme, self.authority))?)
    }

    /// Object key within the store, without the leading `/`
    pub fn key(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    pub fn object_path(&self) -> Path {
        Path::from(self.key())
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path)
    }
}

/// Join two key fragments with exactly one `/` between them
pub fn join_key(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if base.is_empty() {
        return rel.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), rel)
}

/// Every object below `prefix`, sorted by key
pub async fn list_objects(store: &dyn ObjectStore, prefix: &Path) -> Result<Vec<Path>> {
    let mut keys: Vec<Path> = store
        .list(Some(prefix))
        .map_ok(|meta| meta.location)
        .try_collect()
        .await?;
    keys.sort();
    Ok(keys)
}

/// Remove every object below `prefix`; returns how many were removed
pub async fn delete_prefix(store: &dyn ObjectStore, prefix: &Path) -> Result<usize> {
    let keys = list_objects(store, prefix).await?;
    for key in &keys {
        store.delete(key).await?;
    }
    Ok(keys.len())
}

pub async fn exists(store: &dyn ObjectStore, key: &Path) -> Result<bool> {
    match store.head(key).await {
        Ok(_) => Ok(true),
        Err(object_store::Error::NotFound { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Write an empty marker object
pub async fn put_marker(store: &dyn ObjectStore, key: &Path) -> Result<()> {
    store.put(key, PutPayload::new()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_parse_schemes() {
        let uri = ObjectUri::parse("s3a://bucket/prefix/").unwrap();
        assert_eq!(uri.scheme, "s3a");
        assert_eq!(uri.authority, "bucket");
        assert_eq!(uri.path, "/prefix/");

        let uri = ObjectUri::parse("file:///tmp/out").unwrap();
        assert_eq!(uri.path, "/tmp/out");
        assert_eq!(uri.key(), "tmp/out");

        let uri = ObjectUri::parse("MEMORY://in/").unwrap();
        assert_eq!(uri.scheme, "memory");
        assert_eq!(uri.to_string(), "memory:///in/");
    }

    #[test]
    fn test_bare_paths_are_absolute_files() {
        let uri = ObjectUri::parse("data/input").unwrap();
        assert_eq!(uri.scheme, "file");
        assert!(uri.path.starts_with('/'));
        assert!(uri.path.ends_with("/data/input"));
    }

    #[test]
    fn test_parse_rejects_bad_uris() {
        assert!(ObjectUri::parse("").is_err());
        assert!(ObjectUri::parse("://nope").is_err());
        assert!(ObjectUri::parse("s 3://x").is_err());
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("out/", "items/"), "out/items/");
        assert_eq!(join_key("out", "/items"), "out/items");
        assert_eq!(join_key("/", "tmp"), "/tmp");
        assert_eq!(join_key("", "items"), "items");

        let uri = ObjectUri::parse("memory://bucket/").unwrap().join("log_data");
        assert_eq!(uri.to_string(), "memory:///bucket/log_data");
        assert_eq!(uri.as_dir().to_string(), "memory:///bucket/log_data/");
    }

    #[tokio::test]
    async fn test_delete_prefix_keeps_siblings() {
        let store = InMemory::new();
        for key in ["out/items/a.parquet", "out/items/b/c.parquet", "out/items_old/d.parquet"] {
            store.put(&Path::from(key), PutPayload::from_static(b"x")).await.unwrap();
        }

        let removed = delete_prefix(&store, &Path::from("out/items")).await.unwrap();
        assert_eq!(removed, 2);
        assert!(exists(&store, &Path::from("out/items_old/d.parquet")).await.unwrap());
        assert!(!exists(&store, &Path::from("out/items/a.parquet")).await.unwrap());
    }

    #[tokio::test]
    async fn test_listing_is_sorted() {
        let store = InMemory::new();
        for key in ["in/b.json", "in/a.json", "in/sub/c.json"] {
            store.put(&Path::from(key), PutPayload::from_static(b"{}")).await.unwrap();
        }

        let keys = list_objects(&store, &Path::from("in")).await.unwrap();
        let keys: Vec<_> = keys.iter().map(|p| p.to_string()).collect();
        assert_eq!(keys, vec!["in/a.json", "in/b.json", "in/sub/c.json"]);
    }
}
