//! Federation info: an endpoint exposing the federation directives of every subgraph.
//!
//! Subgraph schemas are registered on a [`Gateway`]. The [`FederationInfo`] plugin serves,
//! for each of them, the standard introspection result annotated with the `@key`,
//! `@extends`, `@external` and `@requires` directives introspection leaves out.

#![warn(unreachable_pub)]

pub mod aggregator;
pub mod configuration;
pub mod directives;
pub mod error;
mod executable;
pub mod gate;
pub mod gateway;
pub mod introspection;
pub mod plugins;
pub mod subgraph;

pub use aggregator::FederationSchema;
pub use aggregator::SchemaAggregator;
pub use configuration::Configuration;
pub use executable::main;
pub use gate::Enabled;
pub use gate::RequestContext;
pub use gateway::Gateway;
pub use gateway::ServiceMap;
pub use plugins::federation_info::Config;
pub use plugins::federation_info::FederationInfo;
pub use subgraph::SubgraphSchema;
