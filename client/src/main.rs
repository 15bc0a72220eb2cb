use clap::Parser;
use client::game::OpenField;
use client::input::InputReader;
use client::network::{Client, ClientConfig, RetryPolicy};
use client::rendering::Renderer;
use log::info;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player identity to register with
    id: String,

    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8932")]
    server: String,

    /// Milliseconds between state polls
    #[arg(long, default_value = "100")]
    poll_interval_ms: u64,

    /// Milliseconds between status redraws
    #[arg(long, default_value = "50")]
    render_interval_ms: u64,

    /// Attempts per movement before giving up
    #[arg(long, default_value = "3")]
    max_attempts: u32,

    /// Pause between movement attempts in milliseconds
    #[arg(long, default_value = "100")]
    backoff_ms: u64,

    /// Field width, including the border wall
    #[arg(short = 'w', long, default_value = "40")]
    width: i32,

    /// Field height, including the border wall (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "20")]
    height: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ClientConfig {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        render_interval: Duration::from_millis(args.render_interval_ms),
        retry: RetryPolicy {
            max_attempts: args.max_attempts,
            backoff: Duration::from_millis(args.backoff_ms),
        },
    };
    let terrain = Arc::new(OpenField::new(args.width, args.height));

    let client = Client::connect(&args.id, &args.server, terrain, config).await?;

    info!("Controls: w/a/s/d + Enter to move, e to interact, q to quit");

    let input = InputReader::new(tokio::io::BufReader::new(tokio::io::stdin()));
    client.run(input, Renderer::new(std::io::stdout())).await;

    Ok(())
}
