//! On-disk snapshot persistence.
//!
//! One JSON file holds the refresh timestamp and both indices. Writes go
//! through a sibling temp file and an atomic rename so a crashed process
//! never leaves a torn cache behind; a failed persist is logged by the
//! caller and the in-memory indices stay authoritative.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PriceError;
use crate::index::{BridgeIndex, PriceIndex, Snapshot};

/// Wire form of the snapshot file. Every field defaults independently and
/// unknown fields are ignored, so older and richer files both load.
#[derive(Debug, Default, Deserialize)]
struct CacheFile {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    prices: PriceIndex,
    #[serde(default, rename = "catalogMap")]
    catalog_map: BridgeIndex,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    timestamp: Option<i64>,
    prices: &'a PriceIndex,
    #[serde(rename = "catalogMap")]
    catalog_map: &'a BridgeIndex,
}

/// Reads the snapshot file. A missing file is `Ok(None)`, not an error.
///
/// # Errors
///
/// - [`PriceError::CacheRead`] when the file exists but cannot be read.
/// - [`PriceError::CacheDecode`] when the contents do not decode.
pub(crate) async fn load(path: &Path) -> Result<Option<Snapshot>, PriceError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(PriceError::CacheRead {
                path: path.display().to_string(),
                source: err,
            })
        }
    };
    let file: CacheFile =
        serde_json::from_slice(&bytes).map_err(|source| PriceError::CacheDecode {
            path: path.display().to_string(),
            source,
        })?;
    let refreshed_at = file
        .timestamp
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
    Ok(Some(Snapshot {
        refreshed_at,
        prices: Arc::new(file.prices),
        catalog_map: Arc::new(file.catalog_map),
    }))
}

/// Serializes the snapshot and atomically replaces the file.
///
/// # Errors
///
/// Returns [`PriceError::CacheWrite`] when serialization or any filesystem
/// step fails; the temp file is the only thing that can be left behind.
pub(crate) async fn store(path: &Path, snapshot: &Snapshot) -> Result<(), PriceError> {
    let write_err = |source: std::io::Error| PriceError::CacheWrite {
        path: path.display().to_string(),
        source,
    };

    let body = CacheFileRef {
        timestamp: snapshot.refreshed_at.map(|ts| ts.timestamp_millis()),
        prices: &snapshot.prices,
        catalog_map: &snapshot.catalog_map,
    };
    let bytes =
        serde_json::to_vec(&body).map_err(|source| write_err(std::io::Error::other(source)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
