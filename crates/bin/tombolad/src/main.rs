//! tombolad - confidential lottery settlement service
//!
//! exposes the settlement engine over http json: round lifecycle,
//! encrypted ticket purchases, the oracle callback and settlement.
//!
//! usage:
//!   tombolad --listen 0.0.0.0:4700 --db-path ./tombola.db
//!   tombolad --no-dev-oracle        # wait for a real external oracle
//!
//! without --no-dev-oracle a background pump plays the decryption
//! oracle against the in-process dev co-processor, answering pending
//! requests after a short delay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use tombola_engine::{LocalCoprocessor, SettlementEngine};

mod api;

use api::SharedEngine;

#[derive(Parser, Debug)]
#[command(name = "tombolad")]
#[command(about = "confidential lottery settlement service", long_about = None)]
struct Args {
    /// http listen address
    #[arg(long, default_value = "0.0.0.0:4700")]
    listen: SocketAddr,

    /// database path
    #[arg(long, default_value = "./tombola.db")]
    db_path: String,

    /// disable the in-process dev oracle; decryptions must then arrive
    /// via POST /oracle/decrypted
    #[arg(long)]
    no_dev_oracle: bool,

    /// dev oracle poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    oracle_interval_ms: u64,
}

/// dev-mode oracle: drain pending decryption requests from the local
/// co-processor and feed the plaintexts back through the callback
async fn oracle_pump(engine: SharedEngine, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;

        let mut engine = engine.write().await;
        let pending = engine.coprocessor_mut().take_pending();
        for req in pending {
            match engine.coprocessor().decrypt(req.handle) {
                Some(value) => {
                    if let Err(e) = engine.on_winning_number_decrypted(&req.round_id, value) {
                        error!(round_id = %req.round_id, "oracle callback rejected: {}", e);
                    }
                }
                None => {
                    warn!(round_id = %req.round_id, "pending decryption for unknown handle");
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tombolad=info,tombola_engine=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    info!("starting tombolad v{}", env!("CARGO_PKG_VERSION"));
    info!("  listen: {}", args.listen);
    info!("  database: {}", args.db_path);
    info!("  dev oracle: {}", !args.no_dev_oracle);

    let engine = SettlementEngine::open(&args.db_path, LocalCoprocessor::new())?;
    let engine: SharedEngine = Arc::new(RwLock::new(engine));

    if !args.no_dev_oracle {
        let pump_engine = engine.clone();
        let interval = Duration::from_millis(args.oracle_interval_ms);
        tokio::spawn(oracle_pump(pump_engine, interval));
    }

    let app = api::router(engine)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("listening on {}", args.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
