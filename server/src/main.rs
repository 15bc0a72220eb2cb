use clap::Parser;
use log::{error, info};
use server::authority::Authority;
use server::network::Server;
use shared::framing::FrameConfig;
use shared::DEFAULT_PORT;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest request payload accepted, in bytes
    #[arg(long, default_value_t = shared::framing::DEFAULT_MAX_PAYLOAD)]
    max_frame_bytes: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let authority = Arc::new(Authority::new());
    let server = Server::new(&address, Arc::clone(&authority))
        .await?
        .with_frame_config(FrameConfig {
            max_payload: args.max_frame_bytes,
        });

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!(
                "Received Ctrl+C, shutting down with {} players registered",
                authority.player_count().await
            );
        }
    }

    Ok(())
}
