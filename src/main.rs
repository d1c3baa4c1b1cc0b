use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use farmbot::{
    claims::{ClaimSource, DemoSource, LookupSource},
    config::ClaimSourceKind,
    dispatcher::Dispatcher,
    ledger::FarmLedger,
    registry::WalletRegistry,
    telegram::Telegram,
    Config, Error, Result,
};

#[derive(Parser)]
#[command(about = "Telegram airdrop-farming bot", version)]
struct Args {
    /// Path to the configuration file (defaults to ./farmbot.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let registry = WalletRegistry::open(config.wallets_path()).await?;
    let ledger = FarmLedger::open(config.mined_path(), config.merge_policy).await?;

    let claims: Box<dyn ClaimSource> = match config.claim_source {
        ClaimSourceKind::Demo => Box::new(DemoSource),
        ClaimSourceKind::Lookup => {
            let endpoint = config
                .lookup_endpoint
                .clone()
                .ok_or(Error::BadConfig("lookup_endpoint is required"))?;
            Box::new(LookupSource::new(endpoint))
        }
    };

    let dispatcher = Dispatcher::new(registry, ledger, claims);
    let telegram = Telegram::new(config.telegram_api.clone(), config.bot_token.clone());

    telegram.run(&dispatcher).await
}
