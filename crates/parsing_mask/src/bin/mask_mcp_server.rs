//cargo run --package parsing_mask --bin parsing_mask_mcp_server
use parsing_mask::mcp::ParsingMaskMcpServer;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish()
        .init();

    tracing::info!("Starting parsing mask MCP server");

    let server = ParsingMaskMcpServer::new();
    let service = match server.serve(stdio()).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to start MCP server: {:?}", e);
            return Err(e.into());
        }
    };

    tracing::info!("MCP server started, listening on stdio");

    tokio::select! {
        result = service.waiting() => {
            if let Err(e) = result {
                tracing::error!("MCP server error: {:?}", e);
                return Err(e.into());
            }
            tracing::info!("MCP client disconnected");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
