//! Ledgerchat - Conversational personal-finance ledger driven by a hosted LLM agent

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerchat=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ledgerchat v{}", env!("CARGO_PKG_VERSION"));

    // Run CLI
    ledgerchat::cli::run()?;

    Ok(())
}
