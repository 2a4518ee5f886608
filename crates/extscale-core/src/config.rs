//! extscale.toml configuration parser.
//!
//! The file is optional and every field in it is optional. Missing
//! values fall back to per-transport defaults: a socket deployment is
//! active above 300 and fails open, a file deployment is active at or
//! above 0 and fails closed.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::interpret::{ActivityRule, Comparison};
use crate::policy::FailurePolicy;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:50051";
pub const DEFAULT_SOCKET_ADDRESS: &str = "127.0.0.1:8082";
pub const DEFAULT_FILE_PATH: &str = "/tmp/shared_file.json";
pub const DEFAULT_METRIC_NAME: &str = "constant_metric";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_millis(100);

/// Which transport the data source uses. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// One newline-terminated JSON object per TCP connection.
    #[default]
    Socket,
    /// A JSON file re-read in full on every fetch.
    File,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Socket => "socket",
            SourceKind::File => "file",
        }
    }

    fn default_target_size(self) -> i64 {
        match self {
            SourceKind::Socket => 300,
            SourceKind::File => 1,
        }
    }

    fn default_activity(self) -> ActivityRule {
        match self {
            SourceKind::Socket => ActivityRule::socket_default(),
            SourceKind::File => ActivityRule::file_default(),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socket" => Ok(SourceKind::Socket),
            "file" => Ok(SourceKind::File),
            other => Err(format!("unknown source kind '{other}' (expected socket or file)")),
        }
    }
}

// ── On-disk shape ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub source: SourceSection,
    pub activity: ActivitySection,
    pub metric: MetricSection,
    pub stream: StreamSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSection {
    pub kind: Option<SourceKind>,
    pub address: Option<String>,
    pub path: Option<PathBuf>,
    pub fetch_timeout_ms: Option<u64>,
    pub on_error: Option<FailurePolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivitySection {
    pub comparison: Option<Comparison>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricSection {
    pub name: Option<String>,
    pub target_size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    pub interval_ms: Option<u64>,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Fill in defaults for the selected transport and validate.
    pub fn resolve(self) -> ConfigResult<ScalerConfig> {
        let kind = self.source.kind.unwrap_or_default();
        let defaults = ScalerConfig::for_kind(kind);

        let listen = match self.server.listen {
            Some(s) => s
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::Invalid(format!("server.listen '{s}': {e}")))?,
            None => defaults.listen,
        };

        let activity = ActivityRule::new(
            self.activity
                .comparison
                .unwrap_or(defaults.activity.comparison),
            self.activity.threshold.unwrap_or(defaults.activity.threshold),
        );

        let config = ScalerConfig {
            listen,
            source: SourceConfig {
                kind,
                address: self.source.address.unwrap_or(defaults.source.address),
                path: self.source.path.unwrap_or(defaults.source.path),
                fetch_timeout: self
                    .source
                    .fetch_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.source.fetch_timeout),
            },
            on_error: self.source.on_error.unwrap_or(defaults.on_error),
            activity,
            metric: MetricConfig {
                name: self.metric.name.unwrap_or(defaults.metric.name),
                target_size: self.metric.target_size.unwrap_or(defaults.metric.target_size),
            },
            stream_interval: self
                .stream
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.stream_interval),
        };

        config.validate()?;
        Ok(config)
    }
}

// ── Resolved configuration ─────────────────────────────────────

/// Fully resolved configuration, passed to every component at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerConfig {
    /// gRPC listen address.
    pub listen: SocketAddr,
    pub source: SourceConfig,
    /// What a failed fetch turns into.
    pub on_error: FailurePolicy,
    pub activity: ActivityRule,
    pub metric: MetricConfig,
    /// Tick interval of `StreamIsActive`.
    pub stream_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// `host:port` of the socket feed.
    pub address: String,
    /// Path of the shared JSON file.
    pub path: PathBuf,
    /// Upper bound on one fetch (connect and read each).
    pub fetch_timeout: Duration,
}

/// Name and target reported by `GetMetricSpec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricConfig {
    pub name: String,
    pub target_size: i64,
}

impl ScalerConfig {
    /// Defaults for the given transport.
    pub fn for_kind(kind: SourceKind) -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 50051)),
            source: SourceConfig {
                kind,
                address: DEFAULT_SOCKET_ADDRESS.to_string(),
                path: PathBuf::from(DEFAULT_FILE_PATH),
                fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            },
            on_error: FailurePolicy::for_kind(kind),
            activity: kind.default_activity(),
            metric: MetricConfig {
                name: DEFAULT_METRIC_NAME.to_string(),
                target_size: kind.default_target_size(),
            },
            stream_interval: DEFAULT_STREAM_INTERVAL,
        }
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        ConfigFile::from_file(path)?.resolve()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.stream_interval.is_zero() {
            return Err(ConfigError::Invalid("stream.interval_ms must be > 0".into()));
        }
        if self.source.fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid("source.fetch_timeout_ms must be > 0".into()));
        }
        if self.metric.name.trim().is_empty() {
            return Err(ConfigError::Invalid("metric.name must not be empty".into()));
        }
        if !self.activity.threshold.is_finite() {
            return Err(ConfigError::Invalid("activity.threshold must be finite".into()));
        }
        match self.source.kind {
            SourceKind::Socket if self.source.address.trim().is_empty() => {
                Err(ConfigError::Invalid("source.address must not be empty".into()))
            }
            SourceKind::File if self.source.path.as_os_str().is_empty() => {
                Err(ConfigError::Invalid("source.path must not be empty".into()))
            }
            _ => Ok(()),
        }
    }
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self::for_kind(SourceKind::default())
    }
}
