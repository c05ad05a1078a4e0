use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rednote::app::AppContext;
use rednote::cli::{commands, Cli};
use rednote::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(bin) = cli.bin {
        config.browser.binary_path = Some(bin);
    }

    let ctx = AppContext::new(config)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, closing browser");
                cancel.cancel();
            }
        }
    });

    commands::run(&ctx, cli.command, &cancel).await?;
    Ok(())
}
