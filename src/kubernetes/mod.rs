// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes credential resolution and namespace-scoped API handles.

pub mod client;
pub mod context;

pub use client::{create_client, kubeconfig_path};
pub use context::{ClusterContext, LazyClusterContext};
