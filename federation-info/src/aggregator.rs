//! Aggregation of the annotated introspection of every subgraph.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::directives;
use crate::directives::IntrospectedType;
use crate::error::FederationInfoError;
use crate::gateway::ServiceMap;
use crate::introspection;
use crate::introspection::IntrospectionOptions;
use crate::subgraph::SubgraphSchema;

const INTERNAL_TYPE_PREFIX: &str = "_";
const SCALAR_KIND: &str = "SCALAR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
}

/// Body of a successful federation info response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FederationSchema {
    pub status: Status,
    /// Version of the running host.
    pub version: String,
    /// Annotated introspection of every subgraph, by subgraph name.
    pub services: IndexMap<String, Value>,
}

/// Builds the annotated introspection of every registered subgraph.
#[derive(Debug, Clone)]
pub struct SchemaAggregator {
    version: String,
    options: IntrospectionOptions,
}

impl SchemaAggregator {
    /// `version` is reported as is in every response.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            options: IntrospectionOptions {
                descriptions: true,
                schema_description: true,
                input_value_deprecation: true,
                ..Default::default()
            },
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn aggregate(&self, services: &ServiceMap) -> Result<FederationSchema, FederationInfoError> {
        let services = services
            .iter()
            .map(|(name, schema)| {
                self.annotated_introspection(schema)
                    .map(|introspection| (name.clone(), introspection))
                    .map_err(|source| FederationInfoError::Introspection {
                        service: name.clone(),
                        source,
                    })
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;

        Ok(FederationSchema {
            status: Status::Ok,
            version: self.version.clone(),
            services,
        })
    }

    fn annotated_introspection(
        &self,
        schema: &SubgraphSchema,
    ) -> Result<Value, crate::error::IntrospectionError> {
        let mut introspection = introspection::introspect(schema, &self.options)?;

        let types = introspection
            .pointer_mut("/__schema/types")
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten();
        for introspected in types {
            let Ok(ty) = IntrospectedType::deserialize(&*introspected) else {
                continue;
            };
            if !is_annotatable(&ty) {
                continue;
            }
            if let Some(object) = introspected.as_object_mut() {
                directives::annotate(&ty, schema).merge_into(object);
            }
        }

        Ok(introspection)
    }
}

/// Internal (`_` prefixed) and scalar types never carry federation annotations.
pub fn is_annotatable(ty: &IntrospectedType) -> bool {
    !ty.name.starts_with(INTERNAL_TYPE_PREFIX) && ty.kind != SCALAR_KIND
}
