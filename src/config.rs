// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{container, readiness};
use crate::resources::PortMapping;
use anyhow::{Context, Result};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable the process-wide verbose flag passed to the sidecar
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::SeqCst);
}

/// Whether the sidecar should be launched with its diagnostic flag
pub fn verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Provisioning configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: String,
    /// Name of the Deployment and Service, also the pod name prefix
    pub name: String,
    pub port: u16,
    pub image: String,
    pub replicas: i32,
    /// Service port mappings; empty means the tunnel port only
    pub ports: Vec<PortMapping>,
    pub verbose: bool,
    pub poll_interval: Duration,
    pub ready_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = lookup("TUNNEL_NAME").context("TUNNEL_NAME environment variable not set")?;
        let namespace = lookup("TUNNEL_NAMESPACE").unwrap_or_else(|| "default".to_string());
        let image =
            lookup("TUNNEL_IMAGE").unwrap_or_else(|| container::DEFAULT_IMAGE.to_string());

        let port = match lookup("TUNNEL_PORT") {
            Some(v) => v.parse().context("TUNNEL_PORT must be a valid port number")?,
            None => container::DEFAULT_PORT,
        };
        let replicas = match lookup("TUNNEL_REPLICAS") {
            Some(v) => v.parse().context("TUNNEL_REPLICAS must be an integer")?,
            None => 1,
        };
        let ports = match lookup("TUNNEL_PORTS") {
            Some(v) => v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse)
                .collect::<std::result::Result<Vec<PortMapping>, _>>()
                .context("TUNNEL_PORTS must be a comma-separated list of port mappings")?,
            None => Vec::new(),
        };

        let verbose: bool = lookup("VERBOSE")
            .unwrap_or("false".to_string())
            .parse()
            .unwrap_or(false);

        let poll_interval_ms = match lookup("POLL_INTERVAL_MS") {
            Some(v) => v.parse().context("POLL_INTERVAL_MS must be an integer")?,
            None => readiness::POLL_INTERVAL_MS,
        };
        let ready_timeout = lookup("READY_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("READY_TIMEOUT_SECS must be an integer")?
            .map(Duration::from_secs);

        Ok(Config {
            namespace,
            name,
            port,
            image,
            replicas,
            ports,
            verbose,
            poll_interval: Duration::from_millis(poll_interval_ms),
            ready_timeout,
        })
    }
}
