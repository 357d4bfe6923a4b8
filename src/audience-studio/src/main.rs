//! Audience Studio — segment criteria, preview and persistence service.
//!
//! Loads configuration, selects the segment backend and serves the REST API.

use audience_api::ApiServer;
use audience_core::config::{AppConfig, BackendKind};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "audience-studio")]
#[command(about = "Audience segmentation service: criteria catalogs, preview and segment storage")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "AUDIENCE_STUDIO__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "AUDIENCE_STUDIO__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Segment backend (overrides config)
    #[arg(long, value_enum, env = "AUDIENCE_STUDIO__BACKEND__KIND")]
    backend: Option<BackendArg>,

    /// Base URL of the hosted REST backend (overrides config)
    #[arg(long, env = "AUDIENCE_STUDIO__BACKEND__URL")]
    backend_url: Option<String>,

    /// Start the in-memory backend without demo users and segments
    #[arg(long, default_value_t = false)]
    no_seed: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Memory,
    Remote,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => BackendKind::Memory,
            BackendArg::Remote => BackendKind::Remote,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "audience_studio=info,audience_store=info,tower_http=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Audience Studio starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(backend) = cli.backend {
        config.backend.kind = backend.into();
    }
    if let Some(url) = cli.backend_url {
        config.backend.url = url;
    }
    if cli.no_seed {
        config.backend.seed_demo_data = false;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        backend = ?config.backend.kind,
        seed_demo_data = config.backend.seed_demo_data,
        "Configuration loaded"
    );

    let service = audience_store::service_from_config(&config.backend)?;
    info!(backend = service.backend_name(), "Segment backend ready");

    let api_server = ApiServer::new(config.clone(), service);

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics() {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("Audience Studio is ready to serve traffic");

    api_server.start_http().await?;

    Ok(())
}
