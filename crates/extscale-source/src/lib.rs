//! extscale-source — single-shot fetches from the external data source.
//!
//! Each call to [`DataSource::fetch`] opens its own resource, reads one
//! reading, and releases the resource before returning. Nothing is
//! cached or retried, and failures are always returned as
//! [`FetchError`]; turning a failure into a default is the caller's
//! decision (see `extscale_core::FailurePolicy`).
//!
//! # Transports
//!
//! ```text
//! SocketSource  connect host:port → read one line → {"timestamp", "value"}
//! FileSource    read whole file   → {"action"}
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use extscale_core::{FetchError, Reading, SourceConfig, SourceKind};

pub mod file;
pub mod socket;

pub use file::FileSource;
pub use socket::SocketSource;

/// Boxed future returned by [`DataSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Reading, FetchError>> + Send + 'a>>;

/// A place readings come from. Injected into the RPC service so tests
/// can substitute their own.
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Perform one fetch attempt.
    fn fetch(&self) -> FetchFuture<'_>;

    /// Human-readable endpoint, for logs.
    fn describe(&self) -> String;
}

/// Build the data source selected by configuration.
pub fn from_config(config: &SourceConfig) -> Arc<dyn DataSource> {
    match config.kind {
        SourceKind::Socket => Arc::new(SocketSource::new(
            config.address.clone(),
            config.fetch_timeout,
        )),
        SourceKind::File => Arc::new(FileSource::new(config.path.clone(), config.fetch_timeout)),
    }
}
