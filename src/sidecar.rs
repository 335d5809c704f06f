// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Detection and injection of the tunnel sidecar in existing workloads.

use crate::resources::build_container;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PodSpec;
use kube::ResourceExt;
use tracing::{debug, info};

/// Check if any container of the pod spec runs exactly `image`
pub fn has_sidecar(pod_spec: &PodSpec, image: &str) -> bool {
    pod_spec
        .containers
        .iter()
        .any(|c| c.image.as_deref() == Some(image))
}

/// Add the tunnel container to the Deployment's pod template unless it is already there.
/// Returns whether the Deployment was modified.
pub fn inject_sidecar(deployment: &mut Deployment, port: u16, image: &str, verbose: bool) -> bool {
    let name = deployment.name_any();
    let pod_spec = deployment
        .spec
        .get_or_insert_with(Default::default)
        .template
        .spec
        .get_or_insert_with(Default::default);

    if has_sidecar(pod_spec, image) {
        debug!("Deployment {} already runs {}, skipping injection", name, image);
        return false;
    }

    pod_spec.containers.push(build_container(port, image, verbose));
    info!("Injected tunnel sidecar {} into deployment {}", image, name);
    true
}
