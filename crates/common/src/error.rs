// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::address::Family;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid socket address: {0}")]
    InvalidFormat(String),

    #[error("No address found for host: {0}")]
    HostNotFound(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Unsupported address family: {0}")]
    UnsupportedFamily(Family),
}

impl EndpointError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }
}

/// Failure reported by a [`crate::resolver::HostResolver`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Host not found: {0}")]
    NotFound(String),

    #[error("Lookup of {host} failed: {reason}")]
    Failed { host: String, reason: String },
}

pub type Result<T, E = EndpointError> = std::result::Result<T, E>;
