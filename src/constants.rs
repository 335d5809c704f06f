// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Identity label keys shared by the Deployment and the Service selector
pub mod labels {
    pub const NAME: &str = "app.kubernetes.io/name";
    pub const INSTANCE: &str = "app.kubernetes.io/instance";
}

/// Tunnel sidecar container settings
pub mod container {
    pub const NAME: &str = "ktunnel";
    pub const COMMAND: &str = "/ktunnel/ktunnel";
    pub const SERVER_SUBCOMMAND: &str = "server";
    pub const PORT_FLAG: &str = "-p";
    pub const VERBOSE_FLAG: &str = "-v";
    pub const DEFAULT_IMAGE: &str = "quay.io/omrikiei/ktunnel:latest";
    pub const DEFAULT_PORT: u16 = 28688;
}

/// Fixed resource policy for the injected sidecar (decimal units)
pub mod resources {
    pub const CPU_REQUEST: &str = "500m";
    pub const CPU_LIMIT: &str = "1000m";
    pub const MEMORY_REQUEST: &str = "100M";
    pub const MEMORY_LIMIT: &str = "1G";
}

/// Readiness polling configuration
pub mod readiness {
    /// Delay between two pod list operations, in milliseconds
    pub const POLL_INTERVAL_MS: u64 = 300;
    /// Pod phase counted as ready
    pub const RUNNING_PHASE: &str = "Running";
}
