//! Main entry point for CLI command to start server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::configuration::Configuration;
use crate::configuration::LogFormat;
use crate::configuration::generate_config_schema;
use crate::gate::is_evaluating_predicate;
use crate::plugins::federation_info::FederationInfo;
use crate::plugins::federation_info::federation_info_graphiql_plugin;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for the federation info server
#[derive(Parser, Debug)]
#[command(
    name = "federation-info",
    about = "Serves the federation directives of every subgraph of a gateway",
    disable_version_flag = true
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "FEDERATION_INFO_LOG"
    )]
    log_level: String,

    /// Configuration location relative to the current directory.
    #[arg(short, long = "config", env = "FEDERATION_INFO_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,

    /// Prints the GraphiQL plugin descriptor of the configured endpoint.
    #[arg(long)]
    graphiql_plugin: bool,

    /// Display version and exit.
    #[arg(long, short = 'V')]
    version: bool,
}

/// This is the main federation info entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("FEDERATION_INFO_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    if opt.version {
        println!("{VERSION}");
        return Ok(());
    }

    if opt.schema {
        let schema = generate_config_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let current_directory = std::env::current_dir()?;
    let configuration_path = match opt.config_path {
        Some(path) if path.is_relative() => current_directory.join(path),
        Some(path) => path,
        None => {
            return Err(anyhow!(
                "a configuration file is required, pass it with '--config'"
            ));
        }
    };
    let configuration = Configuration::load(&configuration_path).with_context(|| {
        format!(
            "could not load configuration from {}",
            configuration_path.display()
        )
    })?;

    if opt.graphiql_plugin {
        let descriptor = federation_info_graphiql_plugin(&configuration.federation_info, VERSION);
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    setup_tracing(&opt.log_level, configuration.log.format)?;
    setup_panic_handler();
    tracing::info!("Federation info v{VERSION}");

    let base_dir = configuration_path
        .parent()
        .map_or_else(|| current_directory.clone(), |dir| dir.to_path_buf());
    let gateway = configuration
        .build_gateway(&base_dir)
        .context("could not register the configured subgraphs")?;

    let listen = configuration.listen;
    let federation_info = FederationInfo::builder()
        .config(configuration.federation_info)
        .version(VERSION)
        .gateway(Arc::new(gateway))
        .build();

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("could not listen on {listen}"))?;
    tracing::info!(
        "federation info served at http://{}{}",
        listener.local_addr()?,
        federation_info.path()
    );

    axum::serve(listener, federation_info.web_endpoints())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("stopped");
    Ok(())
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(log_level).context("could not parse log configuration")?,
    );

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| anyhow!("could not install the log subscriber: {err}"))
}

fn setup_panic_handler() {
    // Redirect panics to the logs.
    // Panicking `enabled` predicates are caught and answered with 403, so they are not errors.
    std::panic::set_hook(Box::new(|info| {
        if is_evaluating_predicate() {
            tracing::debug!("enabled predicate panicked: {info}");
        } else {
            tracing::error!("{info}");
        }
    }));
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "could not listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Opt::command().debug_assert();
    }

    #[test]
    fn parses_options() {
        let opt = Opt::parse_from([
            "federation-info",
            "--config",
            "federation.yaml",
            "--log",
            "debug",
        ]);

        assert_eq!(opt.config_path, Some(PathBuf::from("federation.yaml")));
        assert_eq!(opt.log_level, "debug");
        assert!(!opt.schema);
        assert!(!opt.version);
    }

    #[test]
    fn short_version_flag() {
        let opt = Opt::parse_from(["federation-info", "-V"]);

        assert!(opt.version);
    }
}
