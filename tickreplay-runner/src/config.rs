//! Layered TOML run configuration.
//!
//! Three layers are merged key by key: the built-in defaults, an optional
//! defaults file, then the user's file. Tables merge recursively; any other
//! value in a later layer replaces the earlier one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tickreplay_core::domain::Timestamp;
use tickreplay_core::engine::{Diagnostics, SimConfig};

/// Content-addressable identifier of a resolved configuration.
pub type RunId = String;

const BUILTIN_DEFAULTS: &str = r#"
cash = 100000.0
start_time = 0
end_time = 9223372036854775807
interval = 86400
max_market_effect = 0.0

[commission]
per_share = 0.0
minimum = 0.0

[strategy]
name = "noop"

[strategy.params]

[data]
synthetic_symbols = ["SPY"]
synthetic_seed = 42
synthetic_days = 252

[diagnostics]
noisy = false
timers = false
mtm = false
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Commission section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub per_share: f64,
    pub minimum: f64,
}

/// Which strategy to run and its free-form parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,
}

/// Where market data comes from.
///
/// With `path` set, the CSV file is loaded; otherwise a synthetic random walk
/// is generated for `synthetic_symbols`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub synthetic_symbols: Vec<String>,
    pub synthetic_seed: u64,
    /// Trading days generated per synthetic symbol.
    pub synthetic_days: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    pub noisy: bool,
    pub timers: bool,
    pub mtm: bool,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub cash: f64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub interval: i64,
    pub max_market_effect: f64,
    pub commission: CommissionConfig,
    pub strategy: StrategyConfig,
    pub data: DataConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl RunConfig {
    /// Resolve a config from the built-in defaults plus any TOML layers,
    /// lowest precedence first.
    pub fn from_layers(layers: &[&str]) -> Result<Self, ConfigError> {
        let mut merged = parse_layer(BUILTIN_DEFAULTS, "built-in defaults")?;
        for (i, layer) in layers.iter().enumerate() {
            let value = parse_layer(layer, &format!("layer {i}"))?;
            merge(&mut merged, value);
        }
        Self::from_value(merged)
    }

    /// Resolve a config from files: an optional defaults file, then the
    /// user's file.
    ///
    /// A relative `[data] path` in the user's file is resolved against that
    /// file's directory.
    pub fn load(path: &Path, defaults: Option<&Path>) -> Result<Self, ConfigError> {
        let mut merged = parse_layer(BUILTIN_DEFAULTS, "built-in defaults")?;
        if let Some(defaults) = defaults {
            merge(&mut merged, read_layer(defaults)?);
        }
        merge(&mut merged, read_layer(path)?);

        let mut config = Self::from_value(merged)?;
        if let (Some(data_path), Some(base)) = (config.data.path.as_mut(), path.parent()) {
            if data_path.is_relative() {
                *data_path = base.join(&*data_path);
            }
        }
        tracing::debug!(
            config = %path.display(),
            defaults = ?defaults.map(Path::display),
            "config resolved"
        );
        Ok(config)
    }

    fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
        let config: Self = value.try_into().map_err(|source| ConfigError::Parse {
            origin: "merged config".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cash.is_finite() || self.cash < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "cash must be non-negative, got {}",
                self.cash
            )));
        }
        if self.interval <= 0 {
            return Err(ConfigError::Invalid(format!(
                "interval must be positive, got {}",
                self.interval
            )));
        }
        if self.end_time <= self.start_time {
            return Err(ConfigError::Invalid(format!(
                "end_time {} must be after start_time {}",
                self.end_time, self.start_time
            )));
        }
        let CommissionConfig { per_share, minimum } = self.commission;
        if !per_share.is_finite() || !minimum.is_finite() || per_share < 0.0 || minimum < 0.0 {
            return Err(ConfigError::Invalid(
                "commission rates must be non-negative".into(),
            ));
        }
        if !self.max_market_effect.is_finite() || self.max_market_effect < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_market_effect must be non-negative, got {}",
                self.max_market_effect
            )));
        }
        if self.data.path.is_none() && self.data.synthetic_symbols.is_empty() {
            return Err(ConfigError::Invalid(
                "either [data] path or synthetic_symbols is required".into(),
            ));
        }
        Ok(())
    }

    /// Engine settings derived from this config.
    pub fn to_sim_config(&self) -> SimConfig {
        SimConfig::new(self.cash, self.start_time, self.end_time, self.interval)
            .with_commission(self.commission.per_share, self.commission.minimum)
            .with_max_market_effect(self.max_market_effect)
            .with_diagnostics(Diagnostics {
                noisy: self.diagnostics.noisy,
                timers: self.diagnostics.timers,
                mtm: self.diagnostics.mtm,
            })
    }

    /// BLAKE3 of the canonical JSON form. Identical configs share an ID.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Pretty TOML of the resolved config, for `check-config`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn parse_layer(content: &str, origin: &str) -> Result<toml::Value, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}

fn read_layer(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_layer(&content, &path.display().to_string())
}

/// Merge `overlay` into `base`, table by table.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
