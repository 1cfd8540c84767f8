//! Run configuration, persisted as TOML.
//!
//! ```toml
//! url = "http://localhost:4000/graphql"
//! count = 500
//! seed = 42
//! exit_on_failure = true
//!
//! [headers]
//! authorization = "Bearer ..."
//!
//! [input]
//! username = "artorias"
//!
//! [synthesis]
//! null_probability = 0.3
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, ProbeResult};
use crate::schema::{Schema, introspection};
use crate::synth::SynthesisOptions;

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// GraphQL endpoint URL.
    #[serde(default)]
    pub url: String,
    /// Number of requests to send.
    #[serde(default = "default_count")]
    pub count: usize,
    /// Seed for reproducible runs; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Stop at the first failed request.
    #[serde(default)]
    pub exit_on_failure: bool,
    /// Where per-request reports and snapshots are written.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// SDL or introspection JSON to use instead of live introspection.
    #[serde(default)]
    pub schema_file: Option<PathBuf>,
    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Seed data ingested into memory before the first request.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub input: serde_json::Value,
    #[serde(default)]
    pub synthesis: SynthesisOptions,
}

fn default_count() -> usize {
    100
}
fn default_out_dir() -> PathBuf {
    PathBuf::from("__gqlprobe__")
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            count: default_count(),
            seed: None,
            exit_on_failure: false,
            out_dir: default_out_dir(),
            timeout_secs: default_timeout_secs(),
            schema_file: None,
            headers: BTreeMap::new(),
            input: serde_json::Value::Null,
            synthesis: SynthesisOptions::default(),
        }
    }
}

impl ProbeConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Replace the seed data with the contents of a JSON file.
    pub fn load_input(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        self.input = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.schema_file.is_none() && self.url.is_empty() {
            return Err(ConfigError::Invalid {
                message: "either `url` or `schema_file` must be set".into(),
            });
        }
        if !self.url.is_empty() && !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                message: format!("url \"{}\" must start with http:// or https://", self.url),
            });
        }
        for (name, p) in [
            ("null_probability", self.synthesis.null_probability),
            ("fallback_probability", self.synthesis.fallback_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid {
                    message: format!("synthesis.{name} must be within 0..=1, got {p}"),
                });
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "timeout_secs must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The schema from `schema_file` if set, otherwise by introspecting `url`.
    ///
    /// Files ending in `.json` are read as introspection results, anything
    /// else as SDL.
    pub fn load_schema(&self) -> ProbeResult<Schema> {
        let Some(path) = &self.schema_file else {
            return Ok(introspection::introspect(&self.url, &self.headers, self.timeout())?);
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let schema = if path.extension().is_some_and(|ext| ext == "json") {
            let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            Schema::from_introspection(&json)?
        } else {
            Schema::from_sdl(&content)?
        };
        Ok(schema)
    }
}
