//
// Purpose:
//
// This Rust application implements an MCP (Model Context Protocol) server that acts as a
// bridge to the Mallory threat intelligence API. It exposes threat actor and vulnerability
// lookups as tools that can be invoked by MCP clients (e.g., AI models, automation scripts).
//
// Workflow:
// 1. Settings are resolved (OS environment > env file > defaults) and logging is set up.
// 2. Every tool is registered once; a registration failure aborts startup.
// 3. Server starts and listens for MCP requests on stdio.
// 4. MCP client sends a `call_tool` request; the registry validates the arguments and runs
//    the tool, which calls the Mallory API exactly once.
// 5. The upstream payload, or an error envelope, is packaged into a `CallToolResult`.
//
// Configuration:
// `MALLORY_API_KEY`, `MALLORY_API_URL`, `LOG_LEVEL`, `LOG_DIR` and `APP_ENV`, read from the
// environment or from `.env.<APP_ENV>` / `.env`. `RUST_LOG` overrides `LOG_LEVEL`.

use clap::Parser;
use mcp_server_mallory::{logging, MalloryToolsServer, Settings};
use rmcp::{transport::stdio, ServiceExt};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mcp-server-mallory")]
#[command(about = "Mallory Threat Intelligence MCP Server")]
struct Args {
    /// Directory searched for `.env.<APP_ENV>` and `.env`
    #[arg(long, default_value = ".")]
    env_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&args.env_dir)?;
    let _log_guard = logging::init_logging(&settings.log_level, &settings.log_dir)?;

    tracing::info!(app_env = %settings.app_env, "Starting Mallory MCP Server...");

    let server = MalloryToolsServer::from_settings(&settings).inspect_err(|e| {
        tracing::error!("Error initializing Mallory tools server: {:?}", e);
    })?;

    tracing::info!("Using stdio transport");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    service.waiting().await?;
    tracing::info!("Mallory MCP Server stopped");
    Ok(())
}
