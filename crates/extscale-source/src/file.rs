//! Shared-file transport.
//!
//! A producer (typically a scaling agent) rewrites a small JSON file
//! holding the desired action; the whole file is read on every fetch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use extscale_core::{FetchError, Reading};

use crate::{DataSource, FetchFuture};

#[derive(Debug, Deserialize)]
struct SharedAction {
    action: i64,
}

/// Reads `{"action": <integer>}` from a path on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    timeout: Duration,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn fetch_once(&self) -> Result<Reading, FetchError> {
        let target = self.path.display().to_string();

        let bytes = match tokio::time::timeout(self.timeout, tokio::fs::read(&self.path)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(FetchError::read(target, e)),
            Err(_) => {
                return Err(FetchError::read(
                    target,
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        let reading = decode(&target, &bytes)?;
        debug!(source = %target, value = %reading.value, "read reading");
        Ok(reading)
    }
}

impl DataSource for FileSource {
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(self.fetch_once())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

fn decode(target: &str, bytes: &[u8]) -> Result<Reading, FetchError> {
    let data: SharedAction =
        serde_json::from_slice(bytes).map_err(|e| FetchError::decode(target, e))?;
    Ok(Reading::integer(data.action))
}
