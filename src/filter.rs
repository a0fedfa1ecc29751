use globset::{GlobBuilder, GlobMatcher};

use crate::error::{EtlError, Result};

const RECORD_EXTENSIONS: &[&str] = &[".json", ".jsonl"];

/// Resolves which objects belong to a dataset path.
///
/// A plain path selects every record object below it (or the object itself);
/// a path with glob syntax (`log_data/*/*/*.json`) is matched segment by
/// segment, `*` never crossing a `/`.
#[derive(Debug, Clone)]
pub struct DatasetSelector {
    pattern: String,
    matcher: Option<GlobMatcher>,
}

impl DatasetSelector {
    pub fn new(pattern: &str) -> Result<Self> {
        let matcher = if is_glob(pattern) {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| EtlError::Config(format!("invalid dataset path '{}': {}", pattern, e)))?;
            Some(glob.compile_matcher())
        } else {
            None
        };

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// Directory to list before matching: the literal part of a glob, or
    /// the parent of a plain path (which may name a single object)
    pub fn list_prefix(&self) -> &str {
        let literal = match self.pattern.find(['*', '?', '[', '{']) {
            Some(pos) => &self.pattern[..pos],
            None => self.pattern.trim_end_matches('/'),
        };
        match literal.rfind('/') {
            Some(slash) => &literal[..=slash],
            None => "",
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match &self.matcher {
            Some(glob) => glob.is_match(key),
            None => {
                if key == self.pattern {
                    return true;
                }
                let dir = if self.pattern.ends_with('/') || self.pattern.is_empty() {
                    self.pattern.clone()
                } else {
                    format!("{}/", self.pattern)
                };
                key.starts_with(&dir) && is_record_object(key)
            }
        }
    }

    /// Keep the matching keys, sorted for a stable arrival order
    pub fn select(&self, keys: Vec<String>) -> Vec<String> {
        let mut selected: Vec<String> = keys.into_iter().filter(|k| self.matches(k)).collect();
        selected.sort();
        selected
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn is_record_object(key: &str) -> bool {
    RECORD_EXTENSIONS.iter().any(|ext| key.ends_with(ext))
}
