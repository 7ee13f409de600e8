//! Subgraph schemas as seen by the federation info endpoint.
//!
//! A [`SubgraphSchema`] pairs the validated schema of one subgraph with the extension
//! definitions recorded while its SDL was built. Federation directives only live on
//! those extension nodes, so they are kept around next to the schema.

use std::collections::HashMap;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::ast::Definition;
use apollo_compiler::validation::Valid;

use crate::error::SubgraphSchemaError;

/// Definitions every federated subgraph can rely on.
///
/// Only the ones the subgraph SDL does not declare itself are added.
const FEDERATION_PRELUDE: &str = r#"
scalar _Any
scalar _FieldSet

type _Service {
  sdl: String
}

directive @external on OBJECT | FIELD_DEFINITION
directive @requires(fields: _FieldSet!) on FIELD_DEFINITION
directive @provides(fields: _FieldSet!) on FIELD_DEFINITION
directive @key(fields: _FieldSet!) repeatable on OBJECT | INTERFACE
directive @extends on OBJECT | INTERFACE
"#;

const EXTENDS_DIRECTIVE_NAME: &str = "extends";
const DEFAULT_QUERY_ROOT: &str = "Query";
const SERVICE_FIELD: &str = "_service";

/// The parsed `extend ...` node of a type.
///
/// Type definitions carrying `@extends` are recorded as extensions too, since
/// federation treats `type User @extends { .. }` exactly like `extend type User { .. }`.
#[derive(Debug, Clone)]
pub struct TypeExtension {
    /// Name of the extended type.
    pub name: Name,
    /// Directives applied on the extension node itself.
    pub directives: ast::DirectiveList,
    /// Fields declared by the extension node. Empty for unions, enums and scalars.
    pub fields: Vec<Node<ast::FieldDefinition>>,
}

impl TypeExtension {
    fn new(
        name: &Name,
        directives: &ast::DirectiveList,
        fields: &[Node<ast::FieldDefinition>],
    ) -> Self {
        Self {
            name: name.clone(),
            directives: directives.clone(),
            fields: fields.to_vec(),
        }
    }

    fn from_definition(definition: &Definition) -> Option<Self> {
        match definition {
            Definition::ObjectTypeExtension(ext) => {
                Some(Self::new(&ext.name, &ext.directives, &ext.fields))
            }
            Definition::InterfaceTypeExtension(ext) => {
                Some(Self::new(&ext.name, &ext.directives, &ext.fields))
            }
            Definition::UnionTypeExtension(ext) => Some(Self::new(&ext.name, &ext.directives, &[])),
            Definition::EnumTypeExtension(ext) => Some(Self::new(&ext.name, &ext.directives, &[])),
            Definition::InputObjectTypeExtension(ext) => {
                Some(Self::new(&ext.name, &ext.directives, &[]))
            }
            Definition::ScalarTypeExtension(ext) => {
                Some(Self::new(&ext.name, &ext.directives, &[]))
            }
            Definition::ObjectTypeDefinition(def) if is_extends(&def.directives) => {
                Some(Self::new(&def.name, &def.directives, &def.fields))
            }
            Definition::InterfaceTypeDefinition(def) if is_extends(&def.directives) => {
                Some(Self::new(&def.name, &def.directives, &def.fields))
            }
            _ => None,
        }
    }
}

fn is_extends(directives: &ast::DirectiveList) -> bool {
    directives
        .iter()
        .any(|directive| directive.name.as_str() == EXTENDS_DIRECTIVE_NAME)
}

/// The schema of one registered subgraph.
///
/// Immutable once built: requests only ever read it.
#[derive(Debug)]
pub struct SubgraphSchema {
    name: String,
    sdl: Arc<str>,
    schema: Valid<Schema>,
    extensions: HashMap<Name, Vec<TypeExtension>>,
}

impl SubgraphSchema {
    /// Build the schema of subgraph `name` from its SDL.
    pub fn parse(
        name: impl Into<String>,
        sdl: impl Into<String>,
    ) -> Result<Self, SubgraphSchemaError> {
        let name = name.into();
        let sdl: String = sdl.into();

        let document =
            ast::Document::parse(sdl.as_str(), format!("{name}.graphql")).map_err(|err| {
                SubgraphSchemaError::Parse {
                    name: name.clone(),
                    errors: err.errors.to_string(),
                }
            })?;

        let mut extensions: HashMap<Name, Vec<TypeExtension>> = HashMap::new();
        for extension in document
            .definitions
            .iter()
            .filter_map(TypeExtension::from_definition)
        {
            extensions
                .entry(extension.name.clone())
                .or_default()
                .push(extension);
        }

        let schema = Schema::builder()
            .adopt_orphan_extensions()
            .add_ast(&with_federation_prelude(&document))
            .build()
            .and_then(|schema| schema.validate())
            .map_err(|err| SubgraphSchemaError::Validation {
                name: name.clone(),
                errors: err.errors.to_string(),
            })?;

        tracing::debug!(
            subgraph = %name,
            extended_types = extensions.len(),
            "built subgraph schema"
        );

        Ok(Self {
            name,
            sdl: sdl.into(),
            schema,
            extensions,
        })
    }

    /// Name of the subgraph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SDL the schema was built from.
    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    /// The validated schema, federation prelude included.
    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    /// Extension nodes recorded for `type_name`, in source order.
    pub fn extensions(&self, type_name: &str) -> &[TypeExtension] {
        self.extensions
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Identifies a definition the prelude may collide with.
#[derive(PartialEq, Eq, Hash)]
enum DefinitionKey<'a> {
    Directive(&'a str),
    Type(&'a str),
}

fn definition_key(definition: &Definition) -> Option<DefinitionKey<'_>> {
    let key = match definition {
        Definition::DirectiveDefinition(def) => DefinitionKey::Directive(def.name.as_str()),
        Definition::ScalarTypeDefinition(def) => DefinitionKey::Type(def.name.as_str()),
        Definition::ObjectTypeDefinition(def) => DefinitionKey::Type(def.name.as_str()),
        Definition::InterfaceTypeDefinition(def) => DefinitionKey::Type(def.name.as_str()),
        Definition::UnionTypeDefinition(def) => DefinitionKey::Type(def.name.as_str()),
        Definition::EnumTypeDefinition(def) => DefinitionKey::Type(def.name.as_str()),
        Definition::InputObjectTypeDefinition(def) => DefinitionKey::Type(def.name.as_str()),
        _ => return None,
    };
    Some(key)
}

fn with_federation_prelude(document: &ast::Document) -> ast::Document {
    let Ok(prelude) = ast::Document::parse(FEDERATION_PRELUDE, "federation.graphql") else {
        // the prelude is a constant that always parses
        return document.clone();
    };

    let declared: std::collections::HashSet<_> = document
        .definitions
        .iter()
        .filter_map(definition_key)
        .collect();

    let mut merged = document.clone();
    merged.definitions.extend(
        prelude
            .definitions
            .iter()
            .filter(|definition| {
                definition_key(definition).is_none_or(|key| !declared.contains(&key))
            })
            .cloned(),
    );

    let query_root = query_root_name(document);
    if !declares_service_field(document, query_root) {
        merged.definitions.extend(service_field_extension(query_root));
    }
    merged
}

/// Name of the query root: from the schema definition or extension, `Query` otherwise.
fn query_root_name(document: &ast::Document) -> &str {
    document
        .definitions
        .iter()
        .flat_map(|definition| match definition {
            Definition::SchemaDefinition(def) => def.root_operations.as_slice(),
            Definition::SchemaExtension(ext) => ext.root_operations.as_slice(),
            _ => &[],
        })
        .find(|operation| operation.0 == ast::OperationType::Query)
        .map_or(DEFAULT_QUERY_ROOT, |operation| operation.1.as_str())
}

fn declares_service_field(document: &ast::Document, query_root: &str) -> bool {
    document.definitions.iter().any(|definition| {
        let (name, fields) = match definition {
            Definition::ObjectTypeDefinition(def) => (&def.name, &def.fields),
            Definition::ObjectTypeExtension(ext) => (&ext.name, &ext.fields),
            _ => return false,
        };
        name.as_str() == query_root
            && fields
                .iter()
                .any(|field| field.name.as_str() == SERVICE_FIELD)
    })
}

/// `extend type <query_root> { _service: _Service! }`
fn service_field_extension(query_root: &str) -> Option<Definition> {
    let sdl = format!("extend type {query_root} {{\n  {SERVICE_FIELD}: _Service!\n}}\n");
    ast::Document::parse(sdl, "federation.graphql")
        .ok()?
        .definitions
        .into_iter()
        .next()
}
