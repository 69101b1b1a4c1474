use std::{marker::PhantomData, path::PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::warn;

use crate::errors::ServiceError;

/// JSON file-backed array store.
///
/// Persists a `Vec<T>` as one pretty-printed JSON document. The file is the
/// single source of truth: nothing is cached between calls, every `read`
/// parses the document again and every `write` replaces it in full. Callers
/// that mutate therefore run an unguarded read-modify-write cycle, and two
/// concurrent writers can lose an update. Intended for collections small
/// enough that a database would be overkill.
#[derive(Clone)]
pub struct JsonArrayStore<T> {
    file_path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonArrayStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Initialize the store from a path, making sure the parent directory
    /// exists. The file itself is only created by the first `write`.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Self {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }
        Self { file_path, _marker: PhantomData }
    }

    /// Load the whole collection. A missing or unparsable file yields an
    /// empty collection rather than an error; callers cannot tell the two
    /// apart, so the parse failure is at least logged for operators.
    pub async fn read(&self) -> Vec<T> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(items) => items,
            Err(e) => {
                warn!(path = %self.file_path.display(), error = %e, "store file unparsable; treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace the document with the given collection, pretty-printed with
    /// two-space indentation to keep diffs readable.
    pub async fn write(&self, items: &[T]) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(items).map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }
}
