// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ktunnel_sidecar::config::{self, Config};
use ktunnel_sidecar::kubernetes::ClusterContext;
use ktunnel_sidecar::{provision_sidecar, wait_for_ready, PollOptions, SidecarRequest};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    config::set_verbose(config.verbose);
    info!(
        "Configuration loaded: namespace={}, name={}, image={}",
        config.namespace, config.name, config.image
    );

    let ctx = ClusterContext::connect(&config.namespace).await?;

    let request = SidecarRequest::from_config(&config);
    let provisioned = provision_sidecar(&ctx, &request).await?;

    // Stop waiting on Ctrl-C
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no longer waiting for the tunnel");
            on_signal.cancel();
        }
    });

    let options = PollOptions {
        interval: config.poll_interval,
        deadline: config.ready_timeout,
    };
    wait_for_ready(&ctx, provisioned.readiness_criteria(), options, cancel)
        .wait()
        .await?;

    info!(
        "Tunnel {}/{} is ready on port {}",
        config.namespace, config.name, config.port
    );
    Ok(())
}
