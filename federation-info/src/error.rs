//! Federation info errors.
use displaydoc::Display;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;

/// Error building a subgraph schema from its SDL.
///
/// These are raised when a subgraph is registered, never while answering a request.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubgraphSchemaError {
    /// could not parse the SDL of subgraph '{name}': {errors}
    Parse {
        /// Name of the subgraph.
        name: String,
        /// Compiler diagnostics.
        errors: String,
    },

    /// schema of subgraph '{name}' is invalid: {errors}
    Validation {
        /// Name of the subgraph.
        name: String,
        /// Compiler diagnostics.
        errors: String,
    },
}

/// introspection failed: {message}
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub struct IntrospectionError {
    /// The reason introspection failed.
    pub message: String,
}

impl IntrospectionError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error while answering a federation info request.
///
/// These never escape the endpoint: they are rendered as a JSON `{code, message}` body.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum FederationInfoError {
    /// could not introspect subgraph '{service}': {source}
    Introspection {
        /// The subgraph that failed.
        service: String,
        /// The introspection failure.
        source: IntrospectionError,
    },

    /// could not serialize the federation schema: {0}
    Serialization(#[from] serde_json::Error),

    /// could not build the HTTP response: {0}
    Http(#[from] http::Error),
}
