use serde::Serialize;

use super::Config;
use super::normalize_path;

const VERSION_PLACEHOLDER: &str = "{version}";
const FETCHER_WRAPPER: &str = "parseFetchResponse";

/// Descriptor of the GraphiQL plugin rendering the federation info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphiqlPlugin {
    pub name: String,
    pub props: GraphiqlProps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub umd_url: Option<String>,
    pub fetcher_wrapper: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphiqlProps {
    /// Where the plugin fetches the federation info from.
    pub federation_schema_url: String,
}

/// Build the GraphiQL descriptor for the endpoint configured by `config`.
pub fn federation_info_graphiql_plugin(config: &Config, version: &str) -> GraphiqlPlugin {
    GraphiqlPlugin {
        name: config.graphiql.display_name.clone(),
        props: GraphiqlProps {
            federation_schema_url: normalize_path(config.path.clone()),
        },
        umd_url: config
            .graphiql
            .asset_url
            .as_ref()
            .map(|url| url.replace(VERSION_PLACEHOLDER, version)),
        fetcher_wrapper: FETCHER_WRAPPER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::federation_info::GraphiqlConfig;

    #[test]
    fn default_descriptor() {
        let descriptor = federation_info_graphiql_plugin(&Config::default(), "1.2.3");

        insta::assert_json_snapshot!(descriptor, @r###"
        {
          "name": "federationInfo",
          "props": {
            "federationSchemaUrl": "/federation-schema"
          },
          "fetcherWrapper": "parseFetchResponse"
        }
        "###);
    }

    #[test]
    fn asset_url_is_templated_by_version() {
        let config = Config {
            path: "internal/federation".to_string(),
            graphiql: GraphiqlConfig {
                display_name: "Federation".to_string(),
                asset_url: Some(
                    "https://unpkg.com/federation-info-graphiql-plugin@{version}/dist/index.umd.js"
                        .to_string(),
                ),
            },
            ..Default::default()
        };

        let descriptor = federation_info_graphiql_plugin(&config, "1.2.3");

        assert_eq!(descriptor.name, "Federation");
        assert_eq!(descriptor.props.federation_schema_url, "/internal/federation");
        assert_eq!(
            descriptor.umd_url.as_deref(),
            Some("https://unpkg.com/federation-info-graphiql-plugin@1.2.3/dist/index.umd.js")
        );
    }
}
