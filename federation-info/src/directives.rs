//! Federation directive extraction.
//!
//! Plain introspection does not carry `@key`, `@extends`, `@external` and `@requires`.
//! The functions here cross-reference an introspected type with the extension node
//! recorded for it in the subgraph schema and build the matching annotations.
//!
//! Only the first extension node of a type is inspected: directives declared on a
//! second `extend type` block of the same type are not reported.

use apollo_compiler::Node;
use apollo_compiler::ast;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::subgraph::SubgraphSchema;
use crate::subgraph::TypeExtension;

const EXTENDS: &str = "extends";
const KEY: &str = "key";
const EXTERNAL: &str = "external";
const REQUIRES: &str = "requires";

/// Kind label of an argument node.
///
/// Reported as the `name` of every extracted argument instead of the argument's own name,
/// so `fields: "id"` and any other argument of `@key` or `@requires` share the same `name`.
const ARGUMENT_KIND: &str = "Argument";

/// The part of an introspected type the extractor looks at.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectedType {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub fields: Option<Vec<IntrospectedField>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectedField {
    pub name: String,
}

/// One argument of a `@key` or `@requires` directive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveArgument {
    /// Kind label of the argument node, see [`ARGUMENT_KIND`].
    pub name: String,
    /// Kind of the argument value node, `StringValue` for `fields: "id"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The literal value. Absent for null, variable, list and object values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Federation metadata of one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_external: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<DirectiveArgument>>,
}

impl FieldAnnotations {
    pub fn is_empty(&self) -> bool {
        self.is_external.is_none() && self.requires.is_none()
    }
}

/// Federation metadata of one type and its fields.
///
/// Every member is optional: a directive that is absent leaves the introspection
/// node untouched rather than setting `false` or `[]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_extension: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<DirectiveArgument>>,
    /// Field annotations by field name.
    #[serde(skip)]
    pub fields: IndexMap<String, FieldAnnotations>,
}

impl TypeAnnotations {
    pub fn is_empty(&self) -> bool {
        self.is_extension.is_none() && self.key.is_none() && self.fields.is_empty()
    }

    /// Set the annotations on an introspected type object and its `fields`.
    ///
    /// Merging the same annotations again leaves the object unchanged.
    pub fn merge_into(&self, introspected_type: &mut Map<String, Value>) {
        if let Ok(Value::Object(annotations)) = serde_json::to_value(self) {
            introspected_type.extend(annotations);
        }

        if self.fields.is_empty() {
            return;
        }
        let Some(fields) = introspected_type
            .get_mut("fields")
            .and_then(Value::as_array_mut)
        else {
            return;
        };
        for field in fields.iter_mut().filter_map(Value::as_object_mut) {
            let Some(annotations) = field
                .get("name")
                .and_then(Value::as_str)
                .and_then(|name| self.fields.get(name))
            else {
                continue;
            };
            if let Ok(Value::Object(annotations)) = serde_json::to_value(annotations) {
                field.extend(annotations);
            }
        }
    }
}

/// The extension node consulted for `type_name`, if the schema knows the type and recorded one.
pub fn find_type_extension<'a>(
    schema: &'a SubgraphSchema,
    type_name: &str,
) -> Option<&'a TypeExtension> {
    if !schema.schema().types.contains_key(type_name) {
        return None;
    }
    schema.extensions(type_name).first()
}

/// The field named `field_name` declared by `extension`.
pub fn find_field<'a>(
    extension: &'a TypeExtension,
    field_name: &str,
) -> Option<&'a Node<ast::FieldDefinition>> {
    extension
        .fields
        .iter()
        .find(|field| field.name.as_str() == field_name)
}

/// The first directive named `name` in `directives`.
pub fn find_directive<'a>(
    directives: &'a ast::DirectiveList,
    name: &str,
) -> Option<&'a Node<ast::Directive>> {
    directives
        .iter()
        .find(|directive| directive.name.as_str() == name)
}

/// Map the arguments of a `@key` or `@requires` application.
///
/// Values are not unpacked: a list or object argument only reports its kind.
pub fn directive_arguments(directive: &ast::Directive) -> Vec<DirectiveArgument> {
    directive
        .arguments
        .iter()
        .map(|argument| {
            let (kind, value) = value_kind_and_literal(&argument.value);
            DirectiveArgument {
                name: ARGUMENT_KIND.to_string(),
                kind: kind.to_string(),
                value,
            }
        })
        .collect()
}

fn value_kind_and_literal(value: &ast::Value) -> (&'static str, Option<Value>) {
    match value {
        ast::Value::String(value) => ("StringValue", Some(Value::from(value.as_str()))),
        ast::Value::Int(value) => ("IntValue", Some(Value::from(value.as_str()))),
        ast::Value::Float(value) => ("FloatValue", Some(Value::from(value.as_str()))),
        ast::Value::Boolean(value) => ("BooleanValue", Some(Value::from(*value))),
        ast::Value::Enum(value) => ("EnumValue", Some(Value::from(value.as_str()))),
        ast::Value::Null => ("NullValue", None),
        ast::Value::Variable(_) => ("Variable", None),
        ast::Value::List(_) => ("ListValue", None),
        ast::Value::Object(_) => ("ObjectValue", None),
    }
}

/// `Some(true)` when the type's extension node carries `@extends`.
pub fn extension_marker(ty: &IntrospectedType, schema: &SubgraphSchema) -> Option<bool> {
    let extension = find_type_extension(schema, &ty.name)?;
    find_directive(&extension.directives, EXTENDS).map(|_| true)
}

/// Arguments of the `@key` applied on the type's extension node.
pub fn key_arguments(
    ty: &IntrospectedType,
    schema: &SubgraphSchema,
) -> Option<Vec<DirectiveArgument>> {
    let extension = find_type_extension(schema, &ty.name)?;
    find_directive(&extension.directives, KEY).map(|key| directive_arguments(key))
}

/// Names of the introspected fields declared `@external` on the type's extension node.
pub fn external_fields(ty: &IntrospectedType, schema: &SubgraphSchema) -> Vec<String> {
    field_directives(ty, schema, EXTERNAL)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// `@requires` arguments of the introspected fields, by field name.
pub fn requires_fields(
    ty: &IntrospectedType,
    schema: &SubgraphSchema,
) -> IndexMap<String, Vec<DirectiveArgument>> {
    field_directives(ty, schema, REQUIRES)
        .map(|(name, requires)| (name.to_string(), directive_arguments(requires)))
        .collect()
}

/// Introspected fields whose extension field carries `directive_name`, with that directive.
fn field_directives<'a>(
    ty: &'a IntrospectedType,
    schema: &'a SubgraphSchema,
    directive_name: &'a str,
) -> impl Iterator<Item = (&'a str, &'a Node<ast::Directive>)> + 'a {
    let extension = find_type_extension(schema, &ty.name);
    ty.fields
        .iter()
        .flatten()
        .filter_map(move |field| {
            let definition = find_field(extension?, &field.name)?;
            let directive = find_directive(&definition.directives, directive_name)?;
            Some((field.name.as_str(), directive))
        })
}

/// Run the four extraction passes on one introspected type.
pub fn annotate(ty: &IntrospectedType, schema: &SubgraphSchema) -> TypeAnnotations {
    let mut annotations = TypeAnnotations {
        is_extension: extension_marker(ty, schema),
        key: key_arguments(ty, schema),
        fields: IndexMap::new(),
    };

    for name in external_fields(ty, schema) {
        annotations.fields.entry(name).or_default().is_external = Some(true);
    }
    for (name, requires) in requires_fields(ty, schema) {
        annotations.fields.entry(name).or_default().requires = Some(requires);
    }

    annotations
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const USERS_SDL: &str = r#"
        type Query @extends {
          hello: String
        }

        type User @key(fields: "id") @extends {
          id: ID! @external
          name: String @external
          numberOfPosts: Int @requires(fields: "id name")
        }

        type Post {
          pid: ID
        }
    "#;

    fn users() -> SubgraphSchema {
        SubgraphSchema::parse("users", USERS_SDL).unwrap()
    }

    fn introspected(value: Value) -> IntrospectedType {
        IntrospectedType::deserialize(&value).unwrap()
    }

    fn user_type() -> Value {
        json!({
            "kind": "OBJECT",
            "name": "User",
            "fields": [
                { "name": "id" },
                { "name": "name" },
                { "name": "numberOfPosts" }
            ]
        })
    }

    fn string_argument(value: &str) -> DirectiveArgument {
        DirectiveArgument {
            name: "Argument".to_string(),
            kind: "StringValue".to_string(),
            value: Some(json!(value)),
        }
    }

    #[test]
    fn extension_and_key_on_extended_type() {
        let schema = users();
        let user = introspected(user_type());

        assert_eq!(extension_marker(&user, &schema), Some(true));
        assert_eq!(key_arguments(&user, &schema), Some(vec![string_argument("id")]));
    }

    #[test]
    fn external_and_requires_fields() {
        let schema = users();
        let user = introspected(user_type());

        assert_eq!(external_fields(&user, &schema), ["id", "name"]);

        let requires = requires_fields(&user, &schema);
        assert_eq!(requires.len(), 1);
        assert_eq!(requires["numberOfPosts"], vec![string_argument("id name")]);
    }

    #[test]
    fn type_without_extension_gets_nothing() {
        let schema = users();
        let post = introspected(json!({
            "kind": "OBJECT",
            "name": "Post",
            "fields": [{ "name": "pid" }]
        }));

        assert!(annotate(&post, &schema).is_empty());
    }

    #[test]
    fn type_unknown_to_the_schema_gets_nothing() {
        let schema = users();
        let ghost = introspected(json!({
            "kind": "OBJECT",
            "name": "Ghost",
            "fields": [{ "name": "id" }]
        }));

        assert!(find_type_extension(&schema, "Ghost").is_none());
        assert!(annotate(&ghost, &schema).is_empty());
    }

    #[test]
    fn fields_missing_from_the_extension_are_skipped() {
        let schema = users();
        let user = introspected(json!({
            "kind": "OBJECT",
            "name": "User",
            "fields": [{ "name": "fullName" }, { "name": "id" }]
        }));

        let annotations = annotate(&user, &schema);
        assert_eq!(annotations.fields.len(), 1);
        assert_eq!(annotations.fields["id"].is_external, Some(true));
    }

    #[test]
    fn only_the_first_extension_block_is_inspected() {
        let schema = SubgraphSchema::parse(
            "products",
            r#"
            type Query {
              top: Product
            }

            type Product {
              upc: ID
            }

            extend type Product @key(fields: "upc") {
              price: Int @external
            }

            extend type Product @extends {
              weight: Int @external
            }
            "#,
        )
        .unwrap();
        let product = introspected(json!({
            "kind": "OBJECT",
            "name": "Product",
            "fields": [{ "name": "upc" }, { "name": "price" }, { "name": "weight" }]
        }));

        let annotations = annotate(&product, &schema);
        assert_eq!(annotations.is_extension, None);
        assert_eq!(annotations.key, Some(vec![string_argument("upc")]));
        assert_eq!(annotations.fields.keys().collect::<Vec<_>>(), ["price"]);
    }

    #[test]
    fn non_string_arguments_report_their_kind() {
        let schema = SubgraphSchema::parse(
            "custom",
            r#"
            directive @key(fields: _FieldSet!, resolvable: Boolean = true, tags: [String]) repeatable on OBJECT

            type Query {
              hello: String
            }

            extend type Query @key(fields: "hello", resolvable: false, tags: ["a", "b"])
            "#,
        )
        .unwrap();
        let query = introspected(json!({ "kind": "OBJECT", "name": "Query", "fields": [] }));

        let key = key_arguments(&query, &schema).unwrap();
        assert_eq!(
            key,
            vec![
                string_argument("hello"),
                DirectiveArgument {
                    name: "Argument".to_string(),
                    kind: "BooleanValue".to_string(),
                    value: Some(json!(false)),
                },
                DirectiveArgument {
                    name: "Argument".to_string(),
                    kind: "ListValue".to_string(),
                    value: None,
                },
            ]
        );
    }

    #[test]
    fn merge_adds_only_present_annotations() {
        let schema = users();
        let mut user = user_type();
        let annotations = annotate(&introspected(user.clone()), &schema);

        annotations.merge_into(user.as_object_mut().unwrap());

        assert_eq!(
            user,
            json!({
                "kind": "OBJECT",
                "name": "User",
                "fields": [
                    { "name": "id", "isExternal": true },
                    { "name": "name", "isExternal": true },
                    {
                        "name": "numberOfPosts",
                        "requires": [
                            { "name": "Argument", "type": "StringValue", "value": "id name" }
                        ]
                    }
                ],
                "isExtension": true,
                "key": [{ "name": "Argument", "type": "StringValue", "value": "id" }]
            })
        );
    }

    #[test]
    fn annotating_twice_is_idempotent() {
        let schema = users();
        let mut once = user_type();
        annotate(&introspected(once.clone()), &schema).merge_into(once.as_object_mut().unwrap());

        let mut twice = once.clone();
        annotate(&introspected(twice.clone()), &schema).merge_into(twice.as_object_mut().unwrap());

        assert_eq!(once, twice);
    }
}
