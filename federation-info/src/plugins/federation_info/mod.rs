//! Federation info plugin
//!
//! Exposes, for every subgraph registered on the gateway, the standard introspection
//! result annotated with the federation directives plain introspection leaves out:
//! - `isExtension` and `key` on types declared with `@extends` and `@key`
//! - `isExternal` and `requires` on fields declared with `@external` and `@requires`
//!
//! The endpoint answers `GET <path>` (default `/federation-schema`):
//! - 200 with `{status, version, services}` when enabled
//! - 403 with `{code: 403, message: "Disabled"}` when the `enabled` setting says no
//! - 404 when the host has no gateway to read subgraphs from

use std::sync::Arc;

use axum::Router;
use axum::routing::get_service;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::aggregator::SchemaAggregator;
use crate::gate::Enabled;
use crate::gateway::Gateway;

mod graphiql;
mod response_builder;
mod service;


pub use graphiql::GraphiqlPlugin;
pub use graphiql::GraphiqlProps;
pub use graphiql::federation_info_graphiql_plugin;
use service::FederationInfoService;

pub(crate) const DEFAULT_PATH: &str = "/federation-schema";
pub(crate) const DEFAULT_DISPLAY_NAME: &str = "federationInfo";

/// Configuration for the federation info plugin
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct Config {
    /// Set to false to answer every request with 403
    /// Per-request decisions are configured programmatically with `Enabled::Predicate`
    pub enabled: bool,

    /// Optionally set a custom path for the endpoint
    /// Defaults to /federation-schema
    pub path: String,

    /// Descriptor handed to GraphiQL to display the federation info
    pub graphiql: GraphiqlConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            path: DEFAULT_PATH.to_string(),
            graphiql: GraphiqlConfig::default(),
        }
    }
}

/// Configuration of the GraphiQL descriptor.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct GraphiqlConfig {
    /// Name the GraphiQL plugin is displayed under
    pub display_name: String,

    /// URL of the GraphiQL plugin bundle, `{version}` is replaced with the running version
    pub asset_url: Option<String>,
}

impl Default for GraphiqlConfig {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            asset_url: None,
        }
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

/// The federation info plugin
#[derive(Debug, Clone)]
pub struct FederationInfo {
    config: Config,
    gateway: Option<Arc<Gateway>>,
    enabled: Enabled,
    aggregator: Arc<SchemaAggregator>,
}

#[buildstructor::buildstructor]
impl FederationInfo {
    /// Build the plugin.
    ///
    /// `version` is the version of the host, reported in every response.
    /// Without a `gateway` the endpoint answers 404.
    /// An `enabled` predicate takes precedence over `config.enabled`.
    #[builder]
    pub fn new(
        config: Config,
        version: String,
        gateway: Option<Arc<Gateway>>,
        enabled: Option<Enabled>,
    ) -> Self {
        let mut config = config;
        config.path = normalize_path(config.path);
        let enabled = enabled.unwrap_or(Enabled::Always(config.enabled));

        if gateway.is_none() {
            tracing::warn!(
                "federation info is exposed at {} but the host has no federation gateway",
                config.path
            );
        } else {
            tracing::info!("Federation info exposed at {}", config.path);
        }

        Self {
            config,
            gateway,
            enabled,
            aggregator: Arc::new(SchemaAggregator::new(version)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    pub fn version(&self) -> &str {
        self.aggregator.version()
    }

    /// Routes serving the endpoint, to be merged into the host's router.
    pub fn web_endpoints(&self) -> Router {
        let service = FederationInfoService::new(
            self.gateway.clone(),
            self.enabled.clone(),
            self.aggregator.clone(),
        );
        Router::new().route(&self.config.path, get_service(service))
    }

    /// Descriptor letting GraphiQL fetch and display the endpoint.
    pub fn graphiql_plugin(&self) -> GraphiqlPlugin {
        federation_info_graphiql_plugin(&self.config, self.version())
    }
}
