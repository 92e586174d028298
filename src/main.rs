use std::sync::Arc;

use agentbay_tools::config::Config;
use agentbay_tools::dispatch::{ActionRequest, ToolDispatcher};
use agentbay_tools::sandbox::agentbay::AgentBayClient;
use agentbay_tools::tools::all_tools;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "agentbay_tools=info";

#[derive(Parser)]
#[command(
    name = "agentbay-tools",
    version,
    about = "Expose AgentBay cloud sandboxes as agent tools"
)]
struct Cli {
    /// Path to the TOML config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log filter, e.g. "agentbay_tools=debug" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tool specs (name, description, parameter schema)
    Tools,
    /// Run a single tool call and print its result
    Call {
        /// Tool name, e.g. session_create
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Serve JSON-lines tool calls on stdin/stdout
    Serve,
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the JSON Schema of the config file
    Schema,
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_dispatcher(config: &Config) -> Result<Arc<ToolDispatcher>> {
    let client = AgentBayClient::new(&config.agentbay).context("failed to build AgentBay client")?;
    Ok(Arc::new(ToolDispatcher::new(
        Arc::new(client),
        config.agentbay.session_label.clone(),
        config.dispatch.clone(),
    )))
}

async fn start_dispatcher(config: &Config) -> Result<Arc<ToolDispatcher>> {
    let dispatcher = build_dispatcher(config)?;
    if config.dispatch.reconcile_on_startup {
        match dispatcher.reconcile().await {
            Ok(report) => tracing::info!(
                adopted = report.adopted,
                dropped = report.dropped,
                "startup reconciliation finished"
            ),
            Err(e) => tracing::warn!("startup reconciliation failed, keeping local state: {e:#}"),
        }
    }

    Ok(dispatcher)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Command::Config {
            command: ConfigCommand::Schema,
        } => {
            println!("{}", serde_json::to_string_pretty(&Config::json_schema())?);
        }
        Command::Tools => {
            let specs: Vec<_> = all_tools(build_dispatcher(&config)?)
                .iter()
                .map(|tool| tool.spec())
                .collect();
            println!("{}", serde_json::to_string_pretty(&specs)?);
        }
        Command::Call { tool, args } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            if !args.is_object() {
                bail!("--args must be a JSON object");
            }
            let dispatcher = start_dispatcher(&config).await?;
            let result = dispatcher.dispatch(ActionRequest::from_args(tool, args)).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Command::Serve => {
            let dispatcher = start_dispatcher(&config).await?;
            tracing::info!("serving JSON-lines tool calls on stdio");
            agentbay_tools::host::serve(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await?;
        }
    }

    Ok(())
}
