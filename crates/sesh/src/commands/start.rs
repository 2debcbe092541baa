//! Start command - launches the session counter server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::{info, warn};

use sesh_config::{self, LoadedConfig};
use sesh_server::{Server, ServerConfig};
use sesh_session::{Manager, ManagerConfig, ProviderRegistry};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Session cookie name (overrides config)
    #[arg(long)]
    pub cookie_name: Option<String>,

    /// Session idle window in seconds (overrides config)
    #[arg(long)]
    pub max_age: Option<u64>,

    /// Session provider (overrides config)
    #[arg(long)]
    pub provider: Option<String>,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for rotated JSON log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let loaded = match args.config {
        Some(ref path) => LoadedConfig::from_file(path)?,
        None => sesh_config::load_config(None)?,
    };

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    let mut session = loaded.config.session();
    let mut server = loaded.config.server();

    if let Some(name) = args.cookie_name {
        session.cookie_name = name;
    }
    if let Some(secs) = args.max_age {
        session.max_age_secs = secs;
    }
    if let Some(provider) = args.provider {
        session.provider = provider;
    }
    if let Some(bind) = args.bind {
        server.bind = bind;
    }
    if let Some(port) = args.port {
        server.port = port;
    }

    let registry = ProviderRegistry::<i64>::with_defaults();
    let manager_config = ManagerConfig::new()
        .with_cookie_name(session.cookie_name.clone())
        .with_max_age(Duration::from_secs(session.max_age_secs));
    let manager = Manager::new(&registry, &session.provider, manager_config).with_context(|| {
        format!(
            "cannot create session manager (available providers: {})",
            registry.names().join(", ")
        )
    })?;

    let server_config = ServerConfig::new()
        .with_host_port(&server.bind, server.port)?
        .with_request_logging(server.request_logging);

    if ctx.verbose {
        for source in loaded.loaded_from() {
            println!("Loaded config: {}", source.display());
        }
        println!(
            "Sessions: provider={} cookie={} max_age={}s",
            session.provider, session.cookie_name, session.max_age_secs
        );
    }

    info!(
        bind = %server_config.bind_address,
        provider = %session.provider,
        "Starting sesh"
    );
    println!("sesh listening on http://{}", server_config.bind_address);

    Server::new(Arc::new(manager), server_config)
        .run_with_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
