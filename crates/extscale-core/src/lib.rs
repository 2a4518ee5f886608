//! extscale-core — the data model shared by every extscale crate.
//!
//! A [`Reading`] is fetched from an external data source, an
//! [`ActivityRule`] turns it into the activity signal, [`to_metric`]
//! turns it into the reported metric value, and a [`FailurePolicy`]
//! decides what happens when the fetch fails.

pub mod config;
pub mod error;
pub mod interpret;
pub mod policy;
pub mod reading;

pub use config::{ConfigFile, MetricConfig, ScalerConfig, SourceConfig, SourceKind};
pub use error::{ConfigError, FetchError};
pub use interpret::{to_metric, ActivityRule, Comparison};
pub use policy::FailurePolicy;
pub use reading::{Reading, ReadingValue};
