//! Static content catalog.
//!
//! A JSON array of article records loaded once at startup and served
//! verbatim. Nothing in the gateway inspects the records.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog {0} must contain a JSON array")]
    NotAnArray(PathBuf),
}

/// Load the catalog from `path`.
///
/// A missing file yields an empty catalog; anything unreadable or not a
/// JSON array is an error.
pub async fn load_catalog(path: &Path) -> Result<Vec<Value>, CatalogError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No catalog found at {}, serving an empty list", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(CatalogError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let value: Value = serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Array(records) => {
            tracing::debug!(records = records.len(), "Catalog loaded from {}", path.display());
            Ok(records)
        }
        _ => Err(CatalogError::NotAnArray(path.to_path_buf())),
    }
}
