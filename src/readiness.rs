// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Background polling of the tunnel pods until enough of them are running.

use crate::constants::readiness::{POLL_INTERVAL_MS, RUNNING_PHASE};
use crate::error::{Result, TunnelError};
use chrono::{DateTime, Duration as ChronoDuration, SubsecRound, Utc};
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::Api;
use std::future::pending;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Which pods count as ready, and how many are needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessCriteria {
    pub name_prefix: String,
    /// Exclusive lower bound on pod creation time
    pub since: DateTime<Utc>,
    pub target: usize,
}

impl ReadinessCriteria {
    pub fn new(name_prefix: &str, since: DateTime<Utc>, target: usize) -> Self {
        Self {
            name_prefix: name_prefix.to_string(),
            since,
            target,
        }
    }

    /// Check if a pod has the prefix, was created after `since` and is running
    pub fn matches(&self, pod: &Pod) -> bool {
        let has_prefix = pod
            .metadata
            .name
            .as_deref()
            .is_some_and(|n| n.starts_with(&self.name_prefix));
        let is_new = pod
            .metadata
            .creation_timestamp
            .as_ref()
            .is_some_and(|t| t.0 > self.since);
        let is_running = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .is_some_and(|p| p == RUNNING_PHASE);

        has_prefix && is_new && is_running
    }

    pub fn count_ready(&self, pods: &[Pod]) -> usize {
        pods.iter().filter(|p| self.matches(p)).count()
    }
}

/// Threshold for pods created from `now` on.
/// Creation timestamps have whole-second precision, so the instant is floored
/// and moved back one second to keep pods created within the same second.
pub fn readiness_threshold(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(0) - ChronoDuration::seconds(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Fixed delay between two pod listings
    pub interval: Duration,
    /// Give up with `TunnelError::Timeout` after this long
    pub deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(POLL_INTERVAL_MS),
            deadline: None,
        }
    }
}

/// One-shot completion of a readiness poller
pub struct ReadySignal {
    rx: oneshot::Receiver<Result<()>>,
}

impl ReadySignal {
    /// Wait for the poller outcome
    pub async fn wait(self) -> Result<()> {
        self.rx.await.unwrap_or(Err(TunnelError::SignalLost))
    }
}

/// Start polling `pods` in the background and return immediately.
/// The returned signal resolves exactly once: Ok when the criteria are met, or with the
/// error that stopped the poller (list failure, deadline, cancellation).
pub fn spawn_readiness_poller(
    pods: Api<Pod>,
    criteria: ReadinessCriteria,
    options: PollOptions,
    cancel: CancellationToken,
) -> ReadySignal {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let outcome = run_poller(&pods, &criteria, options, &cancel).await;
        if let Err(e) = &outcome {
            warn!("Readiness poller for {} stopped: {}", criteria.name_prefix, e);
        }
        if tx.send(outcome).is_err() {
            debug!("Readiness signal for {} was dropped", criteria.name_prefix);
        }
    });

    ReadySignal { rx }
}

async fn run_poller(
    pods: &Api<Pod>,
    criteria: &ReadinessCriteria,
    options: PollOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let deadline = async {
        match options.deadline {
            Some(d) => {
                sleep(d).await;
                d
            }
            None => pending().await,
        }
    };

    tokio::select! {
        res = poll_until_ready(pods, criteria, options.interval) => res,
        elapsed = deadline => Err(TunnelError::Timeout(elapsed)),
        _ = cancel.cancelled() => Err(TunnelError::Cancelled),
    }
}

#[instrument(skip(pods, criteria, interval), fields(prefix = %criteria.name_prefix, target = criteria.target))]
async fn poll_until_ready(
    pods: &Api<Pod>,
    criteria: &ReadinessCriteria,
    interval: Duration,
) -> Result<()> {
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let pod_list = pods.list(&ListParams::default()).await?;
        let ready = criteria.count_ready(&pod_list.items);
        debug!("Poll {}: {}/{} pods running", polls, ready, criteria.target);

        if ready >= criteria.target {
            info!("{} pods running after {} polls", ready, polls);
            return Ok(());
        }

        sleep(interval).await;
    }
}
