//! The federation capability of the host: the registry of subgraph schemas.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::SubgraphSchemaError;
use crate::subgraph::SubgraphSchema;

/// Subgraph name to schema, in registration order.
pub type ServiceMap = IndexMap<String, Arc<SubgraphSchema>>;

/// Registry of the subgraphs composed by the gateway.
///
/// Readers get a snapshot of the whole map, so a registration happening while a
/// request is being answered is never partially observed.
#[derive(Debug, Default)]
pub struct Gateway {
    services: RwLock<Arc<ServiceMap>>,
}

impl Gateway {
    pub fn new(services: ServiceMap) -> Self {
        Self {
            services: RwLock::new(Arc::new(services)),
        }
    }

    /// Build a gateway from `(name, sdl)` pairs.
    pub fn from_sdl<I, N, S>(subgraphs: I) -> Result<Self, SubgraphSchemaError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let services = subgraphs
            .into_iter()
            .map(|(name, sdl)| {
                let schema = SubgraphSchema::parse(name, sdl)?;
                Ok((schema.name().to_string(), Arc::new(schema)))
            })
            .collect::<Result<ServiceMap, SubgraphSchemaError>>()?;
        Ok(Self::new(services))
    }

    /// Insert or replace one subgraph.
    pub fn register(&self, schema: SubgraphSchema) {
        let name = schema.name().to_string();
        let mut services = self.services.write();
        let mut updated = ServiceMap::clone(&services);
        let replaced = updated.insert(name.clone(), Arc::new(schema)).is_some();
        *services = Arc::new(updated);
        tracing::info!(subgraph = %name, replaced, "registered subgraph schema");
    }

    /// The subgraphs currently registered.
    pub fn service_map(&self) -> Arc<ServiceMap> {
        self.services.read().clone()
    }
}
