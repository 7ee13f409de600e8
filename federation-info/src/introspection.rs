//! Standard GraphQL introspection of a subgraph schema.

use apollo_compiler::ExecutableDocument;
use apollo_compiler::introspection;
use apollo_compiler::validation::Valid;
use serde_json::Value;

use crate::error::IntrospectionError;
use crate::subgraph::SubgraphSchema;

const INTROSPECTION_OPERATION_NAME: &str = "IntrospectionQuery";

/// Which optional parts of the schema the introspection query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrospectionOptions {
    /// Include descriptions on types, fields, arguments and directives.
    pub descriptions: bool,
    /// Include `specifiedByURL` on scalars.
    pub specified_by_url: bool,
    /// Include `isRepeatable` on directives.
    pub directive_is_repeatable: bool,
    /// Include the description of the schema itself.
    pub schema_description: bool,
    /// Include deprecated arguments and input fields, with their deprecation status.
    pub input_value_deprecation: bool,
}

impl Default for IntrospectionOptions {
    fn default() -> Self {
        Self {
            descriptions: true,
            specified_by_url: false,
            directive_is_repeatable: false,
            schema_description: false,
            input_value_deprecation: false,
        }
    }
}

/// Render the standard introspection query for `options`.
pub fn introspection_query(options: &IntrospectionOptions) -> String {
    let description = if options.descriptions {
        "description"
    } else {
        ""
    };
    let schema_description = if options.descriptions && options.schema_description {
        "description"
    } else {
        ""
    };
    let specified_by_url = if options.specified_by_url {
        "specifiedByURL"
    } else {
        ""
    };
    let directive_is_repeatable = if options.directive_is_repeatable {
        "isRepeatable"
    } else {
        ""
    };
    let include_deprecated = if options.input_value_deprecation {
        "(includeDeprecated: true)"
    } else {
        ""
    };
    let input_deprecation = if options.input_value_deprecation {
        "isDeprecated\n      deprecationReason"
    } else {
        ""
    };

    format!(
        r#"query {INTROSPECTION_OPERATION_NAME} {{
  __schema {{
    {schema_description}
    queryType {{ name }}
    mutationType {{ name }}
    subscriptionType {{ name }}
    types {{
      ...FullType
    }}
    directives {{
      name
      {description}
      {directive_is_repeatable}
      locations
      args{include_deprecated} {{
        ...InputValue
      }}
    }}
  }}
}}

fragment FullType on __Type {{
  kind
  name
  {description}
  {specified_by_url}
  fields(includeDeprecated: true) {{
    name
    {description}
    args{include_deprecated} {{
      ...InputValue
    }}
    type {{
      ...TypeRef
    }}
    isDeprecated
    deprecationReason
  }}
  inputFields{include_deprecated} {{
    ...InputValue
  }}
  interfaces {{
    ...TypeRef
  }}
  enumValues(includeDeprecated: true) {{
    name
    {description}
    isDeprecated
    deprecationReason
  }}
  possibleTypes {{
    ...TypeRef
  }}
}}

fragment InputValue on __InputValue {{
  name
  {description}
  type {{ ...TypeRef }}
  defaultValue
  {input_deprecation}
}}

fragment TypeRef on __Type {{
  kind
  name
  ofType {{
    kind
    name
    ofType {{
      kind
      name
      ofType {{
        kind
        name
        ofType {{
          kind
          name
          ofType {{
            kind
            name
            ofType {{
              kind
              name
              ofType {{
                kind
                name
                ofType {{
                  kind
                  name
                }}
              }}
            }}
          }}
        }}
      }}
    }}
  }}
}}
"#
    )
}

/// Introspect `schema`, returning the `data` object of the response: `{"__schema": {..}}`.
pub fn introspect(
    schema: &SubgraphSchema,
    options: &IntrospectionOptions,
) -> Result<Value, IntrospectionError> {
    let schema = schema.schema();
    let document = ExecutableDocument::parse_and_validate(
        schema,
        introspection_query(options),
        "introspection_query.graphql",
    )
    .map_err(|err| IntrospectionError::new(err.errors.to_string()))?;
    let operation = document
        .operations
        .get(Some(INTROSPECTION_OPERATION_NAME))
        .map_err(|_| IntrospectionError::new("cannot find the introspection operation"))?;

    let response = introspection::partial_execute(
        schema,
        &schema.implementers_map(),
        &document,
        operation,
        Valid::assume_valid_ref(&Default::default()),
    )
    .map_err(|err| IntrospectionError::new(err.message().to_string()))?;

    let mut response = serde_json::to_value(&response)
        .map_err(|err| IntrospectionError::new(format!("invalid introspection response: {err}")))?;

    if let Some(errors) = response
        .get("errors")
        .and_then(Value::as_array)
        .filter(|errors| !errors.is_empty())
    {
        return Err(IntrospectionError::new(
            errors
                .iter()
                .map(|error| {
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join(", "),
        ));
    }

    match response.get_mut("data").map(Value::take) {
        Some(data @ Value::Object(_)) => Ok(data),
        _ => Err(IntrospectionError::new(
            "cannot find the introspection response",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SubgraphSchema {
        SubgraphSchema::parse(
            "reviews",
            r#"
            """
            Reviews subgraph
            """
            schema {
              query: Query
            }

            type Query {
              "Top reviews"
              topReviews(first: Int, legacy: Boolean @deprecated(reason: "use first")): [Review]
            }

            type Review {
              body: String
              rating: Rating @deprecated
            }

            enum Rating {
              GOOD
              BAD
            }
            "#,
        )
        .unwrap()
    }

    fn find_type<'a>(introspection: &'a Value, name: &str) -> &'a Value {
        introspection["__schema"]["types"]
            .as_array()
            .unwrap()
            .iter()
            .find(|ty| ty["name"] == name)
            .unwrap()
    }

    #[test]
    fn query_only_asks_for_enabled_options() {
        let query = introspection_query(&IntrospectionOptions {
            descriptions: false,
            ..Default::default()
        });
        assert!(!query.contains("description"));
        assert!(!query.contains("isRepeatable"));
        assert!(!query.contains("specifiedByURL"));
        assert!(query.contains("fields(includeDeprecated: true)"));
        assert!(!query.contains("inputFields(includeDeprecated: true)"));

        let query = introspection_query(&IntrospectionOptions {
            descriptions: true,
            specified_by_url: true,
            directive_is_repeatable: true,
            schema_description: true,
            input_value_deprecation: true,
        });
        assert!(query.contains("description"));
        assert!(query.contains("isRepeatable"));
        assert!(query.contains("specifiedByURL"));
        assert!(query.contains("inputFields(includeDeprecated: true)"));
    }

    #[test]
    fn introspects_types_and_fields() {
        let introspection = introspect(&schema(), &IntrospectionOptions::default()).unwrap();

        assert_eq!(introspection["__schema"]["queryType"]["name"], "Query");

        let query = find_type(&introspection, "Query");
        assert_eq!(query["kind"], "OBJECT");
        let top_reviews = &query["fields"][0];
        assert_eq!(top_reviews["name"], "topReviews");
        assert_eq!(top_reviews["description"], "Top reviews");

        let rating = find_type(&introspection, "Rating");
        assert_eq!(rating["kind"], "ENUM");
        assert_eq!(rating["enumValues"].as_array().unwrap().len(), 2);

        assert_eq!(find_type(&introspection, "String")["kind"], "SCALAR");
    }

    #[test]
    fn schema_description_and_input_value_deprecation() {
        let introspection = introspect(
            &schema(),
            &IntrospectionOptions {
                schema_description: true,
                input_value_deprecation: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(introspection["__schema"]["description"], "Reviews subgraph");

        let args = find_type(&introspection, "Query")["fields"][0]["args"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(args.len(), 2);
        let legacy = args.iter().find(|arg| arg["name"] == "legacy").unwrap();
        assert_eq!(legacy["isDeprecated"], true);
        assert_eq!(legacy["deprecationReason"], "use first");
    }

    #[test]
    fn deprecated_arguments_are_hidden_without_input_value_deprecation() {
        let introspection = introspect(&schema(), &IntrospectionOptions::default()).unwrap();
        let args = find_type(&introspection, "Query")["fields"][0]["args"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0]["name"], "first");
    }
}
