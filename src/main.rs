//! How to run:
//!
//! ```
//! $ cargo run                      # asynchronous sends
//! $ cargo run -- sync              # blocking sends
//! $ cargo run -- sync --broker=localhost:9092 --topic=topic1 --messages=100
//! ```

use kafka_producer_demo::cli::Args;
use kafka_producer_demo::launcher::*;
use kafka_producer_demo::producer::*;
use rdkafka::util::get_rdkafka_version;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn report(e: &LaunchError) {
    let mut trace = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        trace.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    error!("Producer demo failed: {trace}");
}

#[tokio::main]
async fn main() {
    let args = Args::parse_lenient(std::env::args());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let (_, version_s) = get_rdkafka_version();
    info!("rd_kafka_version {version_s}");

    let mode = args.delivery_mode();
    info!(%mode, topic = %args.topic, "Starting producer");

    let config = args.producer_config();
    let outcome = Launcher::new(args.startup_delay())
        .launch(|| Ok(args.demo_producer(create_producer(&config)?)))
        .await;

    match outcome {
        Ok(WorkerReport { delivered, failed }) => {
            info!(delivered, failed, "Producer demo finished")
        }
        Err(e) => report(&e),
    }
}
