// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Submission of the tunnel Deployment and Service, and the readiness wait that follows.

use crate::config::{self, Config};
use crate::error::Result;
use crate::kubernetes::ClusterContext;
use crate::readiness::{
    readiness_threshold, spawn_readiness_poller, PollOptions, ReadinessCriteria, ReadySignal,
};
use crate::resources::{build_deployment, build_service, PortMapping};
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::PostParams;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Parameters of a tunnel sidecar deployment
#[derive(Debug, Clone, PartialEq)]
pub struct SidecarRequest {
    pub namespace: String,
    pub name: String,
    /// Port the tunnel server listens on
    pub port: u16,
    pub image: String,
    pub replicas: i32,
    pub verbose: bool,
    /// Ports exposed by the Service
    pub ports: Vec<PortMapping>,
}

impl SidecarRequest {
    /// A single replica exposing the tunnel port, verbose per the process-wide flag
    pub fn new(namespace: &str, name: &str, port: u16, image: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            port,
            image: image.to_string(),
            replicas: 1,
            verbose: config::verbose(),
            ports: vec![PortMapping::new(port, port)],
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut request = Self::new(&config.namespace, &config.name, config.port, &config.image)
            .with_replicas(config.replicas)
            .with_verbose(config.verbose);
        if !config.ports.is_empty() {
            request.ports = config.ports.clone();
        }
        request
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_ports(mut self, ports: Vec<PortMapping>) -> Self {
        self.ports = ports;
        self
    }

    pub fn deployment(&self) -> Deployment {
        build_deployment(
            &self.namespace,
            &self.name,
            self.port,
            &self.image,
            self.replicas,
            self.verbose,
        )
    }

    pub fn service(&self) -> Service {
        build_service(&self.namespace, &self.name, &self.ports)
    }
}

/// Objects accepted by the API server for a provisioned sidecar
#[derive(Debug, Clone)]
pub struct ProvisionedSidecar {
    pub deployment: Deployment,
    pub service: Service,
    /// Creation-time threshold captured before the Deployment was submitted
    pub since: DateTime<Utc>,
}

impl ProvisionedSidecar {
    /// Criteria matching every replica of the submitted Deployment
    pub fn readiness_criteria(&self) -> ReadinessCriteria {
        let replicas = self
            .deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(1);
        ReadinessCriteria::new(
            &self.deployment.name_any(),
            self.since,
            usize::try_from(replicas).unwrap_or(0),
        )
    }
}

/// Create the tunnel Deployment and its Service
#[instrument(skip(ctx, request), fields(namespace = %request.namespace, name = %request.name))]
pub async fn provision_sidecar(
    ctx: &ClusterContext,
    request: &SidecarRequest,
) -> Result<ProvisionedSidecar> {
    // Must precede submission so pods of an earlier revision are not counted
    let since = readiness_threshold(Utc::now());

    let deployment = request.deployment();
    let service = request.service();
    debug!(
        "Submitting deployment {}",
        serde_json::to_string(&deployment).unwrap_or_default()
    );

    let pp = PostParams::default();
    let deployment = ctx.deployments().create(&pp, &deployment).await?;
    info!(
        "Created deployment {}/{} with image {}",
        ctx.namespace(),
        deployment.name_any(),
        request.image
    );

    let service = ctx.services().create(&pp, &service).await?;
    info!(
        "Created service {}/{} exposing {}",
        ctx.namespace(),
        service.name_any(),
        request
            .ports
            .iter()
            .map(PortMapping::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );

    Ok(ProvisionedSidecar {
        deployment,
        service,
        since,
    })
}

/// Start waiting for the pods matching `criteria` in the context's namespace
pub fn wait_for_ready(
    ctx: &ClusterContext,
    criteria: ReadinessCriteria,
    options: PollOptions,
    cancel: CancellationToken,
) -> ReadySignal {
    info!(
        "Waiting for {} pod(s) of {} to be running",
        criteria.target, criteria.name_prefix
    );
    spawn_readiness_poller(ctx.pods().clone(), criteria, options, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::labels;
    use crate::error::TunnelError;
    use crate::test_utils::{forbidden_json, pod_json, pod_list_json, MockService};
    use chrono::{Duration as ChronoDuration, SecondsFormat};
    use std::collections::BTreeMap;
    use std::time::Duration;

    const DEPLOYMENTS_PATH: &str = "/apis/apps/v1/namespaces/ns1/deployments";
    const SERVICES_PATH: &str = "/api/v1/namespaces/ns1/services";
    const PODS_PATH: &str = "/api/v1/namespaces/ns1/pods";

    fn make_request() -> SidecarRequest {
        SidecarRequest::new("ns1", "tun-abc", 28688, "example/tunnel:latest").with_verbose(false)
    }

    fn make_config() -> Config {
        Config {
            namespace: "ns1".to_string(),
            name: "tun-abc".to_string(),
            port: 28688,
            image: "example/tunnel:latest".to_string(),
            replicas: 2,
            ports: vec![],
            verbose: true,
            poll_interval: Duration::from_millis(300),
            ready_timeout: None,
        }
    }

    fn mock_cluster(request: &SidecarRequest, pods: String) -> MockService {
        MockService::new()
            .on_post(
                DEPLOYMENTS_PATH,
                201,
                &serde_json::to_string(&request.deployment()).unwrap(),
            )
            .on_post(
                SERVICES_PATH,
                201,
                &serde_json::to_string(&request.service()).unwrap(),
            )
            .on_get(PODS_PATH, 200, &pods)
    }

    #[test]
    fn test_request_defaults_expose_tunnel_port() {
        let request = make_request();

        assert_eq!(request.replicas, 1);
        assert_eq!(request.ports, vec![PortMapping::new(28688, 28688)]);
    }

    #[test]
    fn test_request_from_config() {
        let request = SidecarRequest::from_config(&make_config());

        assert_eq!(request.namespace, "ns1");
        assert_eq!(request.replicas, 2);
        assert!(request.verbose);
        assert_eq!(request.ports, vec![PortMapping::new(28688, 28688)]);
    }

    #[test]
    fn test_request_from_config_with_ports() {
        let mut config = make_config();
        config.ports = vec![PortMapping::new(80, 8080)];

        let request = SidecarRequest::from_config(&config);

        assert_eq!(request.ports, vec![PortMapping::new(80, 8080)]);
    }

    #[test]
    fn test_readiness_criteria_from_provisioned() {
        let request = make_request().with_replicas(3);
        let since = Utc::now();
        let provisioned = ProvisionedSidecar {
            deployment: request.deployment(),
            service: request.service(),
            since,
        };

        assert_eq!(
            provisioned.readiness_criteria(),
            ReadinessCriteria::new("tun-abc", since, 3)
        );
    }

    #[tokio::test]
    async fn test_provision_and_wait_end_to_end() {
        let request = make_request();
        let created = (Utc::now() + ChronoDuration::seconds(60))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let mock = mock_cluster(
            &request,
            pod_list_json(vec![
                pod_json("tun-abc-7f9d8", &created, "Running"),
                pod_json("unrelated-1", &created, "Running"),
            ]),
        );
        let ctx = ClusterContext::new(mock.clone().into_client(), "ns1");

        let before = Utc::now();
        let provisioned = provision_sidecar(&ctx, &request).await.unwrap();
        assert!(provisioned.since < before);

        let spec = provisioned.deployment.spec.as_ref().unwrap();
        let container = &spec.template.spec.as_ref().unwrap().containers[0];
        assert_eq!(
            container.args.as_deref().unwrap()[..3],
            ["server".to_string(), "-p".to_string(), "28688".to_string()]
        );
        assert_eq!(
            provisioned.service.spec.as_ref().unwrap().selector,
            Some(BTreeMap::from([
                (labels::NAME.to_string(), "tun-abc".to_string()),
                (labels::INSTANCE.to_string(), "tun-abc".to_string()),
            ]))
        );

        let signal = wait_for_ready(
            &ctx,
            provisioned.readiness_criteria(),
            PollOptions {
                deadline: Some(Duration::from_secs(5)),
                ..Default::default()
            },
            CancellationToken::new(),
        );

        assert!(signal.wait().await.is_ok());
        assert_eq!(mock.calls("POST", DEPLOYMENTS_PATH), 1);
        assert_eq!(mock.calls("POST", SERVICES_PATH), 1);
        assert!(mock.calls("GET", PODS_PATH) <= 2);
    }

    #[tokio::test]
    async fn test_provision_stops_when_deployment_rejected() {
        let mock = MockService::new()
            .on_post(DEPLOYMENTS_PATH, 403, &forbidden_json(DEPLOYMENTS_PATH));
        let ctx = ClusterContext::new(mock.clone().into_client(), "ns1");

        let result = provision_sidecar(&ctx, &make_request()).await;

        assert!(matches!(result, Err(TunnelError::KubeError(_))));
        assert_eq!(mock.calls("POST", SERVICES_PATH), 0);
    }
}
