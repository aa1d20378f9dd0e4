//! Recorded responses for offline tests.
//!
//! A testdata directory holds an `index.json` array describing each recorded
//! request, and a `files/` directory with one body per request named by the
//! SHA-256 of its URL.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::query::QueryValues;

pub const INDEX_FILE: &str = "index.json";
pub const FILES_DIR: &str = "files";

#[derive(Debug, Error)]
pub enum TestdataError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid testdata index '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestdataEntry {
    #[serde(rename = "ID")]
    pub id: String,
    /// Body location relative to the testdata directory.
    pub path: String,
    #[serde(with = "rfc3339")]
    pub fetched: OffsetDateTime,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestdataIndex {
    entries: Vec<TestdataEntry>,
}

impl TestdataIndex {
    pub fn load(dir: &Path) -> Result<Self, TestdataError> {
        let path = dir.join(INDEX_FILE);
        let raw = fs::read(&path).map_err(|source| TestdataError::Io {
            path: path.clone(),
            source,
        })?;
        let index: Self =
            serde_json::from_slice(&raw).map_err(|source| TestdataError::Json { path, source })?;
        debug!(dir = %dir.display(), entries = index.entries.len(), "loaded testdata index");
        Ok(index)
    }

    pub fn save(&self, dir: &Path) -> Result<(), TestdataError> {
        let path = dir.join(INDEX_FILE);
        let mut raw = serde_json::to_vec_pretty(self).map_err(|source| TestdataError::Json {
            path: path.clone(),
            source,
        })?;
        raw.push(b'\n');
        fs::write(&path, raw).map_err(|source| TestdataError::Io { path, source })
    }

    pub fn entries(&self) -> &[TestdataEntry] {
        &self.entries
    }

    /// Finds the entry whose query parameters match `url`, ignoring `apikey`.
    pub fn lookup(&self, url: &str) -> Option<&TestdataEntry> {
        let wanted = comparable_query(url);
        self.entries
            .iter()
            .find(|entry| comparable_query(&entry.url) == wanted)
    }

    /// Stores `body` under `files/` and adds or replaces the entry for `url`.
    pub fn record(
        &mut self,
        dir: &Path,
        id: impl Into<String>,
        url: &str,
        body: &[u8],
        fetched: OffsetDateTime,
    ) -> Result<&TestdataEntry, TestdataError> {
        let files = dir.join(FILES_DIR);
        fs::create_dir_all(&files).map_err(|source| TestdataError::Io {
            path: files.clone(),
            source,
        })?;

        let digest = url_digest(url);
        let file = files.join(&digest);
        fs::write(&file, body).map_err(|source| TestdataError::Io { path: file, source })?;

        let entry = TestdataEntry {
            id: id.into(),
            path: format!("{FILES_DIR}/{digest}"),
            fetched,
            url: url.to_owned(),
        };
        let wanted = comparable_query(url);
        let position = match self
            .entries
            .iter()
            .position(|existing| comparable_query(&existing.url) == wanted)
        {
            Some(position) => {
                self.entries[position] = entry;
                position
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        Ok(&self.entries[position])
    }
}

/// Lowercase hex SHA-256 of `url`.
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

fn comparable_query(url: &str) -> QueryValues {
    let query = url.split_once('?').map_or("", |(_, query)| query);
    let mut values = QueryValues::parse(query);
    values.remove("apikey");
    values
}

mod rfc3339 {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = value
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&value, &Rfc3339).map_err(D::Error::custom)
    }
}
