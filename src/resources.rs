// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Builders for the tunnel sidecar Deployment, Service and container.

use crate::constants::{container, labels, resources};
use crate::error::TunnelError;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, PodSpec, PodTemplateSpec, ResourceRequirements, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Labels identifying the pods of a tunnel; also used as the Service selector
pub fn identity_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::NAME.to_string(), name.to_string()),
        (labels::INSTANCE.to_string(), name.to_string()),
    ])
}

/// Build the tunnel server container listening on `port`
pub fn build_container(port: u16, image: &str, verbose: bool) -> Container {
    let mut args = vec![
        container::SERVER_SUBCOMMAND.to_string(),
        container::PORT_FLAG.to_string(),
        port.to_string(),
    ];
    if verbose {
        args.push(container::VERBOSE_FLAG.to_string());
    }

    let requests = BTreeMap::from([
        ("cpu".to_string(), Quantity(resources::CPU_REQUEST.to_string())),
        ("memory".to_string(), Quantity(resources::MEMORY_REQUEST.to_string())),
    ]);
    let limits = BTreeMap::from([
        ("cpu".to_string(), Quantity(resources::CPU_LIMIT.to_string())),
        ("memory".to_string(), Quantity(resources::MEMORY_LIMIT.to_string())),
    ]);

    Container {
        name: container::NAME.to_string(),
        image: Some(image.to_string()),
        command: Some(vec![container::COMMAND.to_string()]),
        args: Some(args),
        resources: Some(ResourceRequirements {
            requests: Some(requests),
            limits: Some(limits),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build a Deployment running `replicas` copies of the tunnel container
pub fn build_deployment(
    namespace: &str,
    name: &str,
    port: u16,
    image: &str,
    replicas: i32,
    verbose: bool,
) -> Deployment {
    let labels = identity_labels(name);

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![build_container(port, image, verbose)],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build a Service routing `ports` to the pods of the named tunnel
pub fn build_service(namespace: &str, name: &str, ports: &[PortMapping]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(ports.iter().map(PortMapping::to_service_port).collect()),
            selector: Some(identity_labels(name)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A Service port forwarded to a container port, written `source:target`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub source: u16,
    pub target: u16,
}

impl PortMapping {
    pub fn new(source: u16, target: u16) -> Self {
        Self { source, target }
    }

    pub fn to_service_port(&self) -> ServicePort {
        ServicePort {
            name: Some(format!("port-{}", self.source)),
            port: i32::from(self.source),
            protocol: Some("TCP".to_string()),
            target_port: Some(IntOrString::Int(i32::from(self.target))),
            ..Default::default()
        }
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)
    }
}

impl FromStr for PortMapping {
    type Err = TunnelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |p: &str| {
            p.trim()
                .parse::<u16>()
                .map_err(|e| TunnelError::InvalidPortMapping(format!("{}: {}", s, e)))
        };

        match s.split_once(':') {
            Some((source, target)) => Ok(Self::new(parse(source)?, parse(target)?)),
            None => {
                let port = parse(s)?;
                Ok(Self::new(port, port))
            }
        }
    }
}
