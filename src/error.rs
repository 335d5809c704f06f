// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Invalid port mapping: {0}")]
    InvalidPortMapping(String),

    #[error("Sidecar pods not ready after {0:?}")]
    Timeout(Duration),

    #[error("Readiness wait was cancelled")]
    Cancelled,

    #[error("Readiness poller stopped without signaling")]
    SignalLost,
}

pub type Result<T> = std::result::Result<T, TunnelError>;
