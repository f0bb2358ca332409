// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::{EndpointError, Result};
use crate::parse::{is_socket_path, parse_address, parse_literal};
use crate::raw;
use crate::resolver::{HostResolver, Resolver, ServiceResolver};

/// Address family, in the order endpoints sort by
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Family {
    #[strum(serialize = "ipv4")]
    #[serde(rename = "ipv4")]
    IPv4,
    #[strum(serialize = "ipv6")]
    #[serde(rename = "ipv6")]
    IPv6,
    #[strum(serialize = "local")]
    #[serde(rename = "local")]
    UnixLocal,
}

#[derive(Debug, Clone)]
pub(crate) enum Repr {
    V4(SocketAddrV4),
    V6(SocketAddrV6),
    Local(String), // "/path/to/sock"  (same host only)
}

/// Socket endpoint: IPv4 or IPv6 address with port, or a unix socket path.
///
/// Values are immutable; comparison, hashing and equality only look at
/// family, host (with IPv6 scope id) or path, and port.
#[derive(Debug, Clone)]
pub struct Endpoint(Repr);

impl Default for Endpoint {
    /// IPv4 wildcard address, port 0
    fn default() -> Self {
        Self::from_port(0)
    }
}

impl Endpoint {
    /// # Errors
    /// Return `UnsupportedFamily` for IPv6 addresses when built without `ipv6`
    pub fn new(host: IpAddr, port: u16) -> Result<Self> {
        Self::with_scope(host, port, 0)
    }

    fn with_scope(host: IpAddr, port: u16, scope_id: u32) -> Result<Self> {
        match host {
            IpAddr::V4(v4) => Ok(Self(Repr::V4(SocketAddrV4::new(v4, port)))),
            IpAddr::V6(v6) => Self::try_from(SocketAddrV6::new(v6, port, 0, scope_id)),
        }
    }

    /// Wildcard IPv4 address with given port
    #[must_use]
    pub const fn from_port(port: u16) -> Self {
        Self(Repr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Unix domain socket. The path must hold a `/` and not start with `[`,
    /// so its text form parses back as a path (`./sock`, not `sock`).
    ///
    /// # Errors
    /// Return `InvalidFormat` if path is empty, has no `/`, contains NUL, or doesn't fit `sockaddr_un`
    pub fn local(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(EndpointError::invalid("Empty socket path"));
        }
        if !is_socket_path(&path) {
            return Err(EndpointError::InvalidFormat(format!(
                "Socket path {path} would not parse back as a path"
            )));
        }
        if path.contains('\0') {
            return Err(EndpointError::invalid("Socket path contains NUL"));
        }
        if path.len() > raw::MAX_PATH_LEN {
            return Err(EndpointError::InvalidFormat(format!(
                "Socket path longer than {} bytes",
                raw::MAX_PATH_LEN
            )));
        }
        Ok(Self(Repr::Local(path)))
    }

    /// Host is either IP literal, or name passed to the host resolver
    ///
    /// # Errors
    /// Return `HostNotFound` if host resolves to nothing
    pub fn resolve<H, S>(host: &str, port: u16, resolver: &Resolver<H, S>) -> Result<Self>
    where
        H: HostResolver,
        S: ServiceResolver,
    {
        let (ip, scope_id) = resolver.host_address(host)?;
        Self::with_scope(ip, port, scope_id)
    }

    /// Like [`Endpoint::resolve`], with port given as number or service name
    ///
    /// # Errors
    /// Return `ServiceNotFound` or `HostNotFound` if either lookup fails
    pub fn resolve_service<H, S>(
        host: &str,
        service: &str,
        resolver: &Resolver<H, S>,
    ) -> Result<Self>
    where
        H: HostResolver,
        S: ServiceResolver,
    {
        let port = resolver.port(service)?;
        Self::resolve(host, port, resolver)
    }

    /// Path for `UnixLocal`, `host:port` text for IP families
    ///
    /// # Errors
    /// Return `InvalidFormat` if text produces an endpoint of another family
    pub fn with_family<H, S>(family: Family, text: &str, resolver: &Resolver<H, S>) -> Result<Self>
    where
        H: HostResolver,
        S: ServiceResolver,
    {
        if family == Family::UnixLocal {
            return Self::local(text);
        }
        let endpoint = Self::parse(text, resolver)?;
        if endpoint.family() != family {
            return Err(EndpointError::InvalidFormat(format!(
                "Expected {family} address, got {}",
                endpoint.family()
            )));
        }
        Ok(endpoint)
    }

    /// Parse `host:port`, `[ipv6]:port` or a socket path
    ///
    /// # Errors
    /// Return `InvalidFormat` for malformed text, and lookup errors for unknown hosts or services
    pub fn parse<H, S>(text: &str, resolver: &Resolver<H, S>) -> Result<Self>
    where
        H: HostResolver,
        S: ServiceResolver,
    {
        let parsed = parse_address(text)?;
        let Some(service) = parsed.service else {
            return Self::local(parsed.host);
        };
        let port = resolver.port(service)?;
        if parsed.family == Some(Family::IPv6) {
            let (ip, scope_id) = parse_literal(parsed.host)
                .filter(|(ip, _)| ip.is_ipv6())
                .ok_or_else(|| EndpointError::invalid("Malformed IPv6 address"))?;
            return Self::with_scope(ip, port, scope_id);
        }
        Self::resolve(parsed.host, port, resolver)
    }

    /// Decode a raw `sockaddr_in`, `sockaddr_in6` or `sockaddr_un`
    ///
    /// # Errors
    /// Return `InvalidFormat` if length and family tag match none of them
    pub fn from_raw(bytes: &[u8]) -> Result<Self> {
        raw::decode(bytes)
    }

    #[must_use]
    pub fn to_raw(&self) -> Vec<u8> {
        raw::encode(self)
    }

    #[must_use]
    pub fn raw_len(&self) -> usize {
        raw::encoded_len(self)
    }

    #[must_use]
    pub fn family(&self) -> Family {
        match self.0 {
            Repr::V4(_) => Family::IPv4,
            Repr::V6(_) => Family::IPv6,
            Repr::Local(_) => Family::UnixLocal,
        }
    }

    /// `None` for unix sockets
    #[must_use]
    pub fn host(&self) -> Option<IpAddr> {
        self.socket_addr().map(|sa| sa.ip())
    }

    /// `None` for unix sockets
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.socket_addr().map(|sa| sa.port())
    }

    #[must_use]
    pub fn scope_id(&self) -> Option<u32> {
        match &self.0 {
            Repr::V6(sa) => Some(sa.scope_id()),
            _ => None,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match &self.0 {
            Repr::Local(path) => Some(path),
            _ => None,
        }
    }

    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match &self.0 {
            Repr::V4(sa) => Some(SocketAddr::V4(*sa)),
            Repr::V6(sa) => Some(SocketAddr::V6(*sa)),
            Repr::Local(_) => None,
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.0, Repr::Local(_))
    }

    pub(crate) fn repr(&self) -> &Repr {
        &self.0
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(sa: SocketAddrV4) -> Self {
        Self(Repr::V4(sa))
    }
}

impl TryFrom<SocketAddrV6> for Endpoint {
    type Error = EndpointError;
    fn try_from(sa: SocketAddrV6) -> Result<Self> {
        if cfg!(feature = "ipv6") {
            Ok(Self(Repr::V6(sa)))
        } else {
            Err(EndpointError::UnsupportedFamily(Family::IPv6))
        }
    }
}

impl TryFrom<SocketAddr> for Endpoint {
    type Error = EndpointError;
    fn try_from(sa: SocketAddr) -> Result<Self> {
        match sa {
            SocketAddr::V4(v4) => Ok(Self::from(v4)),
            SocketAddr::V6(v6) => Self::try_from(v6),
        }
    }
}

impl Ord for Endpoint {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Repr::V4(a), Repr::V4(b)) => a.ip().cmp(b.ip()).then(a.port().cmp(&b.port())),
            (Repr::V6(a), Repr::V6(b)) => a
                .ip()
                .cmp(b.ip())
                .then(a.scope_id().cmp(&b.scope_id()))
                .then(a.port().cmp(&b.port())),
            (Repr::Local(a), Repr::Local(b)) => a.cmp(b),
            _ => self.family().cmp(&other.family()),
        }
    }
}

impl PartialOrd for Endpoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family().hash(state);
        match &self.0 {
            Repr::V4(sa) => {
                sa.ip().hash(state);
                sa.port().hash(state);
            }
            Repr::V6(sa) => {
                sa.ip().hash(state);
                sa.scope_id().hash(state);
                sa.port().hash(state);
            }
            Repr::Local(path) => path.hash(state),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::V4(sa) => write!(f, "{}:{}", sa.ip(), sa.port()),
            Repr::V6(sa) if sa.scope_id() != 0 => {
                write!(f, "[{}%{}]:{}", sa.ip(), sa.scope_id(), sa.port())
            }
            Repr::V6(sa) => write!(f, "[{}]:{}", sa.ip(), sa.port()),
            Repr::Local(path) => f.write_str(path),
        }
    }
}

/// Parse without any host lookup: literal addresses, numeric ports and well known services
impl FromStr for Endpoint {
    type Err = EndpointError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, &Resolver::offline())
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
