use std::fs::File;
use std::sync::Arc;

use armtree::api::ArmClient;
use armtree::core::bus::EventBus;
use armtree::core::config::{self, CliOverrides};
use armtree::core::navigator::Navigator;
use armtree::core::tracker::Tracker;
use armtree::expanders;
use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "armtree", about = "Terminal browser for cloud resource hierarchies")]
struct Args {
    /// Verbose logging and a 600s expansion deadline
    #[arg(long)]
    debug: bool,

    /// Management endpoint, overrides config and ARMTREE_BASE_URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to armtree.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Ok(log_file) = File::create("armtree.log") {
        let _ = WriteLogger::init(level, log_config, log_file);
    }

    let file_config = config::load_config().map_err(std::io::Error::other)?;
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            base_url: args.base_url,
            debug: args.debug,
        },
    );
    log::info!(
        "armtree starting against {} (api-version {}, debug: {})",
        resolved.base_url,
        resolved.api_version,
        resolved.debug
    );

    let bus = EventBus::new();
    let client = ArmClient::new(
        &resolved.base_url,
        resolved.access_token.clone(),
        resolved.api_version.clone(),
    )
    .map_err(std::io::Error::other)?;

    let cancel = CancellationToken::new();
    let tracker = Tracker::start(
        bus.clone(),
        Arc::new(client.clone()),
        resolved.tracker,
        cancel.clone(),
    );
    let client = client.with_observer(tracker.handle());

    let navigator = Arc::new(Navigator::new(
        bus,
        expanders::default_expanders(&client),
        resolved.expand_timeout,
    ));

    let result = armtree::tui::run(navigator, expanders::root_node());

    tracker.shutdown().await;
    log::info!("armtree exiting");
    result
}
