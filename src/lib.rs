// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod provision;
pub mod readiness;
pub mod resources;
pub mod sidecar;

#[cfg(test)]
pub mod test_utils;

pub use error::{Result, TunnelError};
pub use provision::{provision_sidecar, wait_for_ready, ProvisionedSidecar, SidecarRequest};
pub use readiness::{PollOptions, ReadinessCriteria, ReadySignal};
pub use sidecar::has_sidecar;
