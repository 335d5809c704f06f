// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubeconfig resolution and client creation

use crate::error::{Result, TunnelError};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Environment variable pointing at an explicit kubeconfig file
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Pick the kubeconfig file: the explicit path if set, else `<home>/.kube/config`
pub fn kubeconfig_path(explicit: Option<String>, home: Option<PathBuf>) -> Option<PathBuf> {
    match explicit.filter(|p| !p.is_empty()) {
        Some(path) => Some(PathBuf::from(path)),
        None => home.map(|h| h.join(".kube").join("config")),
    }
}

/// Resolve the kubeconfig from the environment and create a client from it.
/// Falls back to the in-cluster service account when no file can be located.
pub async fn resolve_client() -> Result<Client> {
    let path = kubeconfig_path(env::var(KUBECONFIG_ENV).ok(), dirs::home_dir());
    create_client(path.as_deref()).await
}

/// Create a Kubernetes client from a kubeconfig file, or from in-cluster config when `path` is None
#[instrument]
pub async fn create_client(path: Option<&Path>) -> Result<Client> {
    let config = match path {
        Some(path) => {
            info!("Loading kubeconfig from {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                TunnelError::KubeconfigError(format!(
                    "Failed to read kubeconfig from {}: {}",
                    path.display(),
                    e
                ))
            })?;

            KConfig::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    TunnelError::KubeconfigError(format!("Failed to create config: {}", e))
                })?
        }
        None => {
            debug!("No kubeconfig file found, using in-cluster configuration");
            KConfig::incluster().map_err(|e| {
                TunnelError::KubeconfigError(format!("Failed to load in-cluster config: {}", e))
            })?
        }
    };

    Client::try_from(config)
        .map_err(|e| TunnelError::KubeconfigError(format!("Failed to create client: {}", e)))
}
