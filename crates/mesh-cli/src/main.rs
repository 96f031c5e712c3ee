use clap::{Parser, Subcommand};
use mesh_core::MergeStrategy;
use mesh_runtime::ExecutionMode;
use mesh_services::Service;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "mesh", version, about = "Insurance agent mesh")]
struct Cli {
    /// Mesh configuration file (YAML)
    #[arg(long, global = true, env = "MESH_CONFIG")]
    config: Option<PathBuf>,

    /// Run the four insurance agents in-process instead of connecting to
    /// agent servers
    #[arg(long, global = true, default_value_t = false)]
    local: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve one insurance agent over JSON-RPC.
    Serve {
        /// policy, claims, underwriting or customer
        service: Service,

        /// Bind address (default: server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port (default: the agent's conventional port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// List every qualified action in the catalog.
    Actions,

    /// Resolve a request to one action and invoke it.
    Ask {
        text: String,

        /// Print the score of every candidate instead of invoking
        #[arg(long, default_value_t = false)]
        explain: bool,
    },

    /// Run a compound request as a pipeline.
    Pipeline {
        text: String,

        /// sequential or independent (default: inferred from the request)
        #[arg(long)]
        mode: Option<ExecutionMode>,

        /// concatenate or structured (default: pipeline.merge from config)
        #[arg(long)]
        merge: Option<MergeStrategy>,
    },

    /// Run the scripted insurance scenario.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Serve { service, host, port } => {
            commands::serve::run(service, host, port, config).await?
        }
        Command::Actions => {
            let mesh = commands::connect(config, cli.local).await?;
            commands::query::actions(&mesh).await;
        }
        Command::Ask { text, explain } => {
            let mesh = commands::connect(config, cli.local).await?;
            commands::query::ask(&mesh, &text, explain).await?
        }
        Command::Pipeline { text, mode, merge } => {
            let mesh = commands::connect(config, cli.local).await?;
            commands::query::pipeline(&mesh, &text, mode, merge).await?
        }
        Command::Demo => {
            let mesh = commands::connect(config, cli.local).await?;
            commands::demo::run(&mesh).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pipeline_flags_parse() {
        let cli = Cli::try_parse_from([
            "mesh",
            "--local",
            "pipeline",
            "get policy details for POL-1",
            "--mode",
            "sequential",
            "--merge",
            "structured",
        ])
        .unwrap();

        assert!(cli.local);
        match cli.cmd {
            Command::Pipeline { mode, merge, .. } => {
                assert_eq!(mode, Some(ExecutionMode::Sequential));
                assert_eq!(merge, Some(MergeStrategy::Structured));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_rejects_unknown_services() {
        assert!(Cli::try_parse_from(["mesh", "serve", "billing"]).is_err());
        assert!(Cli::try_parse_from(["mesh", "serve", "claims", "--port", "9000"]).is_ok());
    }
}
