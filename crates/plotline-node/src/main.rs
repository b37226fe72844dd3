//! Plotline Node binary
//!
//! Serves the public sign-up form and the local admin socket for a garden
//! waitlist.

use plotline_node::{NodeConfig, PlotlineNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plotline_node=info,plotline=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Plotline Node");

    let config = NodeConfig::from_env()?;

    // Create and run node
    let node = PlotlineNode::new(config).await?;
    node.run().await?;

    Ok(())
}
