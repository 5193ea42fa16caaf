use clap::Parser;
use coinscope::application::analysis::AnalysisService;
use coinscope::config::Config;
use coinscope::infrastructure::coinpaprika::CoinPaprikaClient;
use coinscope::infrastructure::geckoterminal::GeckoTerminalClient;
use coinscope::infrastructure::provider::MarketDataProvider;
use coinscope::interfaces::handler::ToolHandler;
use coinscope::interfaces::rpc::RpcServer;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(name = "coinscope", about = "Crypto technical analysis over stdio JSON-RPC")]
struct Cli {
    /// Log debug output to stderr. Without this flag logging is off:
    /// stdout belongs to the protocol stream.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env();

    let level = if cli.debug { Level::DEBUG } else { Level::ERROR };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!(
        free_tier = config.coinpaprika_api_key.is_none(),
        "starting coinscope"
    );

    let primary = Arc::new(CoinPaprikaClient::new(
        config.coinpaprika_base_url.clone(),
        config.coinpaprika_api_key.clone(),
    ));
    let dex = Arc::new(GeckoTerminalClient::new(
        config.geckoterminal_base_url.clone(),
    ));
    let provider = Arc::new(MarketDataProvider::new(primary, dex.clone()));
    let analysis = AnalysisService::new(provider);
    let handler = ToolHandler::new(analysis, dex);

    RpcServer::new(handler).run().await
}
