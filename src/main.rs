use clap::Parser;
use quorum_store::cluster::client::HttpPeerClient;
use quorum_store::cluster::coordinator::NodeCoordinator;
use quorum_store::cluster::handlers::router;
use quorum_store::config::{self, Config, SeedConfig};
use quorum_store::storage::memory::LocalStore;
use std::sync::Arc;
use std::time::Duration;

/// Command-line arguments. Each flag overrides the matching config value.
#[derive(Parser, Debug)]
#[command(
    name = "quorum-store",
    version,
    about = "Leader-based replicated key-value store node"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "quorum-store.yaml")]
    config: String,

    /// Numeric node id. The lowest id in the cluster leads.
    #[arg(long)]
    id: Option<u32>,

    /// Host peers use to reach this node.
    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Existing member to join through, as id@host:port.
    #[arg(long)]
    seed: Option<String>,

    /// Wait for POST /internal/bootstrap instead of initializing at startup.
    #[arg(long)]
    no_bootstrap: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    init_logging(&config);

    let me = config.node.identity();
    let seed = config.node.seed.as_ref().map(SeedConfig::node);

    tracing::info!("Starting {}", me);
    match &seed {
        Some(seed) => tracing::info!("Seed node: {}", seed),
        None => tracing::info!("Starting as seed node (founder)"),
    }

    // 1. Local storage and peer transport:
    let store = Arc::new(LocalStore::new());
    let settings = config.cluster.settings();
    let peers = Arc::new(HttpPeerClient::new(
        settings.peer_timeout,
        settings.forward_timeout,
    ));

    // 2. Coordinator (inert until initialized):
    let coordinator = NodeCoordinator::new(peers, store, settings);

    // 3. HTTP Router:
    let app = router(coordinator.clone());

    let bind_addr = format!("{}:{}", config.node.host, config.node.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("HTTP server listening on {}", bind_addr);

    // 4. Bootstrap once the listener accepts connections:
    if config.node.auto_bootstrap {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.initialize(me, seed).await {
                tracing::error!("Bootstrap failed: {}", e);
            }
        });
    } else {
        tracing::info!("Waiting for bootstrap request");
    }

    // 5. Spawn stats reporter:
    let stats_coordinator = coordinator.clone();
    let stats_interval = Duration::from_millis(config.cluster.stats_interval_ms);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(stats_interval);

        loop {
            interval.tick().await;
            report_stats(&stats_coordinator).await;
        }
    });

    // 6. Serve until Ctrl+C:
    tracing::info!("Press Ctrl+C to shutdown");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    coordinator.shutdown().await;
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = config::load_config(&cli.config)?;

    if let Some(id) = cli.id {
        config.node.id = id;
    }
    if let Some(host) = &cli.host {
        config.node.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.node.port = port;
    }
    if let Some(seed) = &cli.seed {
        config.node.seed = Some(SeedConfig::parse(seed)?);
    }
    if cli.no_bootstrap {
        config.node.auto_bootstrap = false;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn report_stats(coordinator: &NodeCoordinator) {
    let Some(me) = coordinator.identity() else {
        tracing::info!("Cluster stats: not bootstrapped yet");
        return;
    };

    let members = coordinator.members_view().await;
    let role = coordinator.role().await;
    match coordinator.current_leader().await {
        Ok(leader) => tracing::info!(
            "Cluster stats: {} is {:?}, leader {}, {} members, {} local keys",
            me,
            role,
            leader,
            members.len(),
            coordinator.store().len()
        ),
        Err(e) => tracing::warn!("Cluster stats unavailable: {}", e),
    }
    if !coordinator.is_healthy().await {
        tracing::warn!(
            "Cluster below healthy size ({} of {} members), quorum operations will fail",
            members.len(),
            quorum_store::membership::service::HEALTHY_CLUSTER_MIN_SIZE
        );
    }
    for node in members {
        tracing::debug!("  - {}", node);
    }
}
