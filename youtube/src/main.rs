use youtube_traffic_export::config::{ChannelSelector, Config};
use youtube_traffic_export::{logging, run};

const CLIENT_SECRETS: &str = "client_secret.json";
const TOKEN_FILE: &str = "token.json";
const OUTPUT_DIR: &str = "youtube_export";
const CHANNEL_ID: &str = "UCrfdAtinUodsj_hcjgTJBVA";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let today = jiff::Zoned::now().date();
    let config = Config::new(
        CLIENT_SECRETS,
        TOKEN_FILE,
        OUTPUT_DIR,
        ChannelSelector::Id(CHANNEL_ID.to_string()),
        today,
    );

    // flushes the log file on drop
    let _guard = match logging::init(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to set up logging: {e:#}");
            return Ok(());
        }
    };
    tracing::info!(
        start = %config.window.start,
        end = %config.window.end,
        "starting export"
    );

    if let Err(e) = run(&config).await {
        tracing::error!("failed during execution: {:#}", e);
    }

    Ok(())
}
