//! What a failed fetch turns into.
//!
//! Sources always report failures as errors. Whether a caller then sees
//! an error or a zero reading is decided here, once, for every RPC.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SourceKind;
use crate::error::FetchError;
use crate::reading::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Substitute [`Reading::zero`] and answer normally.
    FailOpen,
    /// Propagate the fetch error to the caller.
    FailClosed,
}

impl FailurePolicy {
    /// Default policy for a transport: the socket feed fails open, the
    /// shared file fails closed.
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Socket => FailurePolicy::FailOpen,
            SourceKind::File => FailurePolicy::FailClosed,
        }
    }

    pub fn resolve(self, outcome: Result<Reading, FetchError>) -> Result<Reading, FetchError> {
        match (self, outcome) {
            (_, Ok(reading)) => Ok(reading),
            (FailurePolicy::FailOpen, Err(e)) => {
                warn!(error = %e, kind = e.kind(), "fetch failed, using zero reading");
                Ok(Reading::zero())
            }
            (FailurePolicy::FailClosed, Err(e)) => Err(e),
        }
    }
}
