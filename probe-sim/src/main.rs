mod config;
mod report;
mod segment;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use name_prober::{MemorySegment, NameProber};
use crate::config::Config;
use crate::report::ProbeMode;
use crate::segment::responder::{register_responder, unregister_responder};
use crate::segment::sessions::{run_sessions, ServiceRequest};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("probe_sim=info,name_prober=info"))
        )
        .init();

    tracing::info!("Starting probe-sim");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "probe-sim.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    let segment = MemorySegment::new(config.segment.interfaces.clone());
    tracing::info!("Simulating segment with interfaces {:?}", config.segment.interfaces);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Hosts that own their names before anyone probes
    let mut responders = Vec::new();
    for responder in &config.responders {
        let service = responder.to_service()?;
        responders.push(register_responder(&segment, service, &cancel)?);
    }

    let requests = config
        .services
        .iter()
        .map(|s| {
            Ok(ServiceRequest {
                service: s.to_service()?,
                mode: if s.reprobe { ProbeMode::Reprobe } else { ProbeMode::Probe },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let prober = Arc::new(NameProber::new(
        segment.clone(),
        Arc::new(segment.clone()),
        config.probe.clone(),
    ));
    tracing::info!(
        "Probing with up to {} attempts within {} seconds",
        prober.config().max_attempts,
        prober.config().timeout_secs
    );

    // Cancel everything on ctrl-c
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal_cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
        }
    });

    let (reports, claimed) = run_sessions(prober, segment.clone(), requests, cancel.clone()).await;

    for report in &reports {
        let line = serde_json::to_string(report).context("Failed to serialize report")?;
        println!("{}", line);
    }

    responders.extend(claimed);

    // Trigger cancellation
    cancel.cancel();

    for responder in responders {
        let hostname = responder.service().hostname();
        if let Err(e) = unregister_responder(responder).await {
            tracing::error!("Failed to unregister responder for {}: {}", hostname, e);
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
