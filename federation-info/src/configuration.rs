//! Configuration of the federation info host.

use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use displaydoc::Display;
use indexmap::IndexMap;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::error::SubgraphSchemaError;
use crate::gateway::Gateway;
use crate::plugins::federation_info::Config;
use crate::subgraph::SubgraphSchema;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read {path}: {source}
    CannotReadFile {
        path: String,
        source: std::io::Error,
    },
    /// could not deserialize configuration: {0}
    Deserialize(#[from] serde_yaml::Error),
    /// {0}
    Subgraph(#[from] SubgraphSchemaError),
}

/// The configuration of the host.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct Configuration {
    /// The socket address the endpoint is served on
    pub listen: SocketAddr,

    /// Federation info endpoint
    pub federation_info: Config,

    /// Subgraphs registered on the gateway at startup, by name
    pub subgraphs: IndexMap<String, SubgraphSource>,

    /// Log output
    pub log: LogConfig,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            federation_info: Config::default(),
            subgraphs: IndexMap::new(),
            log: LogConfig::default(),
        }
    }
}

/// Where the SDL of a subgraph is read from.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubgraphSource {
    /// Path of the SDL file, relative to the configuration file
    pub schema_path: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct LogConfig {
    /// Output format of the logs
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl Configuration {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let yaml = read_file(path)?;
        Self::from_yaml(&yaml)
    }

    /// Read and register every configured subgraph.
    ///
    /// Relative schema paths are resolved against `base_dir`.
    pub fn build_gateway(&self, base_dir: &Path) -> Result<Gateway, ConfigurationError> {
        let gateway = Gateway::default();
        for (name, source) in &self.subgraphs {
            let sdl = read_file(&base_dir.join(&source.schema_path))?;
            gateway.register(SubgraphSchema::parse(name.as_str(), sdl)?);
        }
        Ok(gateway)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigurationError> {
    std::fs::read_to_string(path).map_err(|source| ConfigurationError::CannotReadFile {
        path: path.display().to_string(),
        source,
    })
}

/// JSON schema of the configuration file.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings
        .into_generator()
        .into_root_schema_for::<Configuration>()
}
