//! `responder` binary: assembles the engine with the built-in provider and
//! simulated actuator, and serves the HTTP API.
//!
//! ```bash
//! # Defaults: bind 127.0.0.1:8080, built-in tier policy, log notifications
//! responder
//!
//! # Custom policy and webhook notifications
//! responder --bind 0.0.0.0:9000 --policy tiers.toml --webhook-url http://hooks.internal/ops
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;

use remediation::{
    HeuristicProvider, MemoryRegistry, NotificationSink, ResponseEngine, SimulatedActuator,
    TierPolicy, TracingNotifier, WebhookNotifier,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the HTTP server on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Path to a tier policy TOML file (overrides RESPONDER_POLICY)
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Webhook URL for operator notifications (overrides RESPONDER_WEBHOOK_URL)
    #[arg(long)]
    webhook_url: Option<String>,

    /// Simulated actuator latency in milliseconds
    #[arg(long, default_value_t = 250)]
    actuator_latency_ms: u64,
}

fn load_policy(args: &Args) -> Result<TierPolicy> {
    let path = args
        .policy
        .clone()
        .or_else(|| std::env::var("RESPONDER_POLICY").ok().map(PathBuf::from));

    match path {
        Some(path) => {
            let policy = TierPolicy::from_toml_file(&path)
                .with_context(|| format!("loading tier policy from {}", path.display()))?;
            info!(path = %path.display(), "tier policy loaded");
            Ok(policy)
        }
        None => {
            info!("using default tier policy");
            Ok(TierPolicy::default())
        }
    }
}

fn build_notifier(args: &Args) -> Arc<dyn NotificationSink> {
    let url = args
        .webhook_url
        .clone()
        .or_else(|| std::env::var("RESPONDER_WEBHOOK_URL").ok());

    match url {
        Some(url) => {
            info!(url = %url, "webhook notifications enabled");
            Arc::new(WebhookNotifier::new(url))
        }
        None => Arc::new(TracingNotifier),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("responder=info".parse().unwrap())
                .add_directive("remediation=info".parse().unwrap()),
        )
        .init();

    let policy = load_policy(&args)?;
    let notifier = build_notifier(&args);

    let engine = ResponseEngine::new(
        MemoryRegistry::new().shared(),
        Arc::new(HeuristicProvider::new()),
        Arc::new(SimulatedActuator::new(Duration::from_millis(
            args.actuator_latency_ms,
        ))),
        notifier,
        policy,
    )
    .shared();

    let app = responder::api_router(engine).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, "incident responder listening");

    axum::serve(listener, app).await?;
    Ok(())
}
