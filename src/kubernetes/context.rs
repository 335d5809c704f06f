// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace-scoped API handles used to submit the tunnel and watch its pods

use super::client::resolve_client;
use crate::error::Result;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{Api, Client};
use std::future::Future;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

/// Deployment, Pod and Service handles bound to a single namespace
#[derive(Clone)]
pub struct ClusterContext {
    namespace: String,
    deployments: Api<Deployment>,
    pods: Api<Pod>,
    services: Api<Service>,
}

impl ClusterContext {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            deployments: Api::namespaced(client.clone(), namespace),
            pods: Api::namespaced(client.clone(), namespace),
            services: Api::namespaced(client, namespace),
        }
    }

    /// Resolve credentials from the environment and build the handles for `namespace`
    #[instrument]
    pub async fn connect(namespace: &str) -> Result<Self> {
        let client = resolve_client().await?;
        info!("Connected to Kubernetes cluster");
        Ok(Self::new(client, namespace))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn deployments(&self) -> &Api<Deployment> {
        &self.deployments
    }

    pub fn pods(&self) -> &Api<Pod> {
        &self.pods
    }

    pub fn services(&self) -> &Api<Service> {
        &self.services
    }
}

/// A ClusterContext built on first use. Concurrent first callers share one initialization.
pub struct LazyClusterContext {
    namespace: String,
    cell: OnceCell<ClusterContext>,
}

impl LazyClusterContext {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            cell: OnceCell::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the context, connecting with ambient credentials on first call
    pub async fn get(&self) -> Result<&ClusterContext> {
        self.get_or_try_init(|namespace| async move { ClusterContext::connect(&namespace).await })
            .await
    }

    /// Get the context, running `init` with the bound namespace if it is not built yet.
    /// A failed initialization leaves the cell empty so a later call can try again.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<&ClusterContext>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<ClusterContext>>,
    {
        self.cell
            .get_or_try_init(|| init(self.namespace.clone()))
            .await
    }
}
