//! Command-line entrypoint for the bridge.

use clap::Parser;

use arc_bridge::cli::{self, Cli};
use arc_bridge::setup_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli { env, command } = Cli::parse();
    let config = env.into_config()?;
    setup_tracing(&config.log_level);

    cli::run(config, command).await?;
    Ok(())
}
