//! sidekick-hub - WebSocket relay between a Hero and its Sidekicks.
//!
//! ## Usage
//!
//! ```bash
//! # Listen on 127.0.0.1:5163
//! sidekick-hub
//!
//! # Custom interface and port
//! sidekick-hub --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use sidekick_hub::{HubConfig, HubServer, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(name = "sidekick-hub", about = "WebSocket hub relaying Sidekick UI messages")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, env = "SIDEKICK_HUB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host to bind to.
    #[arg(long, env = "SIDEKICK_HUB_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose logging.
    #[arg(short, long, env = "SIDEKICK_HUB_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let server = HubServer::new(HubConfig::new(args.host, args.port));
    if let Err(e) = server.run().await {
        log::error!("Hub stopped: {e}");
        std::process::exit(1);
    }
}
