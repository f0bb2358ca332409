// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

pub mod address;
pub mod error;
pub mod parse;
pub mod raw;
pub mod resolver;

pub use address::{Endpoint, Family};
pub use error::{EndpointError, LookupError};
pub use resolver::{
    HostResolver, HostTable, NoHosts, Resolver, ServiceResolver, ServiceTable, SystemHosts,
};
