//! Catalyst balancer operator tool.
//!
//! # Architecture Overview
//!
//! ```text
//!     catalyst.toml ──▶ config ──▶ stats store (PostgreSQL)
//!                                        │
//!                                        ▼
//!     members ─────────────────────▶ CataBalancer ──▶ best node / source
//! ```
//!
//! Runs a single balancer decision against the live stats store, which is
//! useful for checking what the cluster would do for a given request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use catalyst_balancer::balancer::{Balancer, PlaybackRequest};
use catalyst_balancer::config::load_config;
use catalyst_balancer::lifecycle::startup::{build_balancer, build_store};
use catalyst_balancer::lifecycle::{signals, Shutdown};
use catalyst_balancer::observability::{logging, metrics};
use catalyst_balancer::stats::{
    LocalNodeState, NodeMetrics, NodeStatsPublisher, StaticStateSource, StoreError,
};

#[derive(Parser)]
#[command(name = "catalyst-balancer")]
#[command(about = "Query the cluster load balancer", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "catalyst.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the node that should serve a playback request
    BestNode {
        #[arg(long)]
        playback_id: String,

        #[arg(long, default_value = "")]
        lat: String,

        #[arg(long, default_value = "")]
        lon: String,

        /// Redirect prefix; repeat for several
        #[arg(long = "prefix")]
        prefixes: Vec<String>,
    },
    /// Find the node currently ingesting a stream
    LoadSource {
        #[arg(long)]
        stream_id: String,
    },
    /// List the media nodes known to the balancer
    Members,
    /// Publish fixed stats for this node until Ctrl+C
    Publish {
        #[arg(long, default_value_t = 0.0)]
        cpu: f64,

        #[arg(long, default_value_t = 0.0)]
        lat: f64,

        #[arg(long, default_value_t = 0.0)]
        lon: f64,

        /// Stream served by this node; repeat for several
        #[arg(long = "stream")]
        streams: Vec<String>,

        /// Stream ingested by this node; repeat for several
        #[arg(long = "ingest")]
        ingest_streams: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        node = %config.node.name,
        metric_timeout_secs = config.balancer.metric_timeout_secs,
        ingest_stream_timeout_secs = config.balancer.ingest_stream_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = build_store(&config.stats_store)?;
    let balancer = build_balancer(&config, store.clone());
    balancer.start().await?;

    let cancel = CancellationToken::new();

    match cli.command {
        Commands::BestNode {
            playback_id,
            lat,
            lon,
            prefixes,
        } => {
            let mut request = PlaybackRequest::new(playback_id).with_location(lat, lon);
            request.redirect_prefixes = prefixes;
            let (node, path) = balancer.get_best_node(&cancel, &request).await?;
            println!("{node}\t{path}");
        }
        Commands::LoadSource { stream_id } => {
            let source = balancer
                .mist_util_load_source(&cancel, &stream_id, "", "")
                .await?;
            println!("{source}");
        }
        Commands::Members => {
            let mut nodes = balancer.registry().snapshot();
            nodes.sort_by(|a, b| a.name.cmp(&b.name));
            for node in nodes {
                println!("{}\t{}", node.name, node.dtsc);
            }
        }
        Commands::Publish {
            cpu,
            lat,
            lon,
            streams,
            ingest_streams,
        } => {
            let store = store.ok_or(StoreError::Unavailable)?;
            let state = LocalNodeState {
                metrics: NodeMetrics {
                    cpu_usage_percentage: cpu,
                    geo_latitude: lat,
                    geo_longitude: lon,
                    ..Default::default()
                },
                streams,
                ingest_streams,
            };
            let publisher = NodeStatsPublisher::new(
                config.node.name.clone(),
                Arc::new(StaticStateSource(state)),
                store,
                Duration::from_secs(config.stats_store.publish_interval_secs),
            );

            let shutdown = Shutdown::new();
            let task = tokio::spawn(publisher.run(shutdown.subscribe()));
            signals::shutdown_on_ctrl_c(&shutdown).await?;
            task.await?;
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}
