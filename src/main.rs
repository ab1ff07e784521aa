//! CLI for stclient
//!
//! Connects to a timer server, registers a handler that prints triggers for
//! the chosen topic, optionally schedules one task, and runs until Ctrl-C.

use std::time::Duration;

use clap::Parser;
use stclient::utils::logging;
use stclient::{TimerClient, load_config};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "stclient", about = "Timer service client")]
struct Args {
    /// Server host, overrides config and STCLIENT_HOST
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides config and STCLIENT_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Topic to listen on and schedule to
    #[arg(long, default_value = "demo")]
    topic: String,

    /// Delay of the scheduled task in milliseconds
    #[arg(long, default_value_t = 5000)]
    delay_ms: i64,

    /// Payload to schedule; nothing is scheduled when omitted
    #[arg(long)]
    payload: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(&args.log_level);

    if let Err(e) = run(args).await {
        error!("Client failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_config()?;
    let config = loaded
        .with_address(
            args.host.unwrap_or_else(|| loaded.host().to_string()),
            args.port.unwrap_or(loaded.port()),
        )
        .build()?;

    let client = TimerClient::new(config);
    client.register_handler(&args.topic, |message| {
        println!(
            "triggered {}: {}",
            message.topic(),
            String::from_utf8_lossy(message.payload())
        );
        Ok(())
    })?;
    client.start()?;

    if !client.wait_until_connected(client.config().connect_timeout()).await {
        warn!(address = %client.config().address(), "not connected yet, still retrying");
    }

    if let Some(payload) = args.payload {
        if client.schedule(&args.topic, args.delay_ms, payload).await {
            info!(topic = %args.topic, delay_ms = args.delay_ms, "task scheduled");
        }
    }

    tokio::select! {
        _ = client.closed() => {
            error!("Client stopped after too many failed reconnects.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    client.shutdown();
    let stopped = tokio::time::timeout(Duration::from_secs(2), client.join()).await;
    if stopped.is_err() {
        warn!("connection task did not stop in time");
    }
    Ok(())
}
