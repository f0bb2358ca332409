// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context};
use tracing::{debug, warn};

use crate::error::{EndpointError, LookupError, Result};
use crate::parse::{parse_literal, parse_port_number};

pub const SYSTEM_SERVICES: &str = "/etc/services";

/// Map a host name to its addresses, in the order the source prefers them
pub trait HostResolver {
    /// # Errors
    /// Return `LookupError::NotFound` for unknown names
    fn resolve_host(&self, name: &str) -> Result<Vec<IpAddr>, LookupError>;

    /// Candidates with their IPv6 scope id, zero when the source has none
    ///
    /// # Errors
    /// Same as [`HostResolver::resolve_host`]
    fn resolve_scoped(&self, name: &str) -> Result<Vec<(IpAddr, u32)>, LookupError> {
        Ok(self
            .resolve_host(name)?
            .into_iter()
            .map(|ip| (ip, 0))
            .collect())
    }
}

/// Map a service name (`http`, `ssh`) to a port number
pub trait ServiceResolver {
    fn lookup_port(&self, service: &str) -> Option<u16>;
}

impl<T: HostResolver + ?Sized> HostResolver for &T {
    fn resolve_host(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
        (**self).resolve_host(name)
    }

    fn resolve_scoped(&self, name: &str) -> Result<Vec<(IpAddr, u32)>, LookupError> {
        (**self).resolve_scoped(name)
    }
}

impl<T: HostResolver + ?Sized> HostResolver for Box<T> {
    fn resolve_host(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
        (**self).resolve_host(name)
    }

    fn resolve_scoped(&self, name: &str) -> Result<Vec<(IpAddr, u32)>, LookupError> {
        (**self).resolve_scoped(name)
    }
}

impl<T: ServiceResolver + ?Sized> ServiceResolver for &T {
    fn lookup_port(&self, service: &str) -> Option<u16> {
        (**self).lookup_port(service)
    }
}

impl<T: ServiceResolver + ?Sized> ServiceResolver for Box<T> {
    fn lookup_port(&self, service: &str) -> Option<u16> {
        (**self).lookup_port(service)
    }
}

/// Host lookup through the operating system (`getaddrinfo`). Blocks the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHosts;

impl HostResolver for SystemHosts {
    fn resolve_host(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
        Ok(self
            .resolve_scoped(name)?
            .into_iter()
            .map(|(ip, _)| ip)
            .collect())
    }

    /// Keeps the zone getaddrinfo reports for link-local IPv6 results
    fn resolve_scoped(&self, name: &str) -> Result<Vec<(IpAddr, u32)>, LookupError> {
        debug!("Looking up {name} with system resolver");
        let addrs = (name, 0)
            .to_socket_addrs()
            .map_err(|err| LookupError::Failed {
                host: name.to_owned(),
                reason: err.to_string(),
            })?;
        Ok(dedup_scoped(addrs))
    }
}

/// getaddrinfo repeats each address once per socket type
fn dedup_scoped(addrs: impl IntoIterator<Item = SocketAddr>) -> Vec<(IpAddr, u32)> {
    let mut found = Vec::new();
    for sa in addrs {
        let scoped = match sa {
            SocketAddr::V4(v4) => (IpAddr::V4(*v4.ip()), 0),
            SocketAddr::V6(v6) => (IpAddr::V6(*v6.ip()), v6.scope_id()),
        };
        if !found.contains(&scoped) {
            found.push(scoped);
        }
    }
    found
}

/// Never resolves anything, only literal addresses get through
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHosts;

impl HostResolver for NoHosts {
    fn resolve_host(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
        Err(LookupError::NotFound(name.to_owned()))
    }
}

/// Static host table, in `/etc/hosts` spirit. Names are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostTable {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl HostTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append addresses for `name`, keeping the order of insertion
    pub fn insert(&mut self, name: &str, addrs: impl IntoIterator<Item = IpAddr>) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(addrs);
    }

    #[must_use]
    pub fn with(mut self, name: &str, addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        self.insert(name, addrs);
        self
    }

    /// Parse hosts file text: `<address> <name> [alias...]`, `#` starts a comment
    ///
    /// # Errors
    /// Return `Err` on lines with an invalid address or without a name
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut this = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let Some(addr) = fields.next() else {
                continue;
            };
            let Some((ip, _)) = parse_literal(addr) else {
                bail!("Invalid address {addr} at line {}", lineno + 1);
            };
            let mut names = fields.peekable();
            if names.peek().is_none() {
                bail!("Missing host name for {addr} at line {}", lineno + 1);
            }
            for name in names {
                this.insert(name, [ip]);
            }
        }
        Ok(this)
    }

    /// # Errors
    /// Return `Err` if file can't be read or parsed
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading hosts file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Parsing hosts file {}", path.display()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HostResolver for HostTable {
    fn resolve_host(&self, name: &str) -> Result<Vec<IpAddr>, LookupError> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| LookupError::NotFound(name.to_owned()))
    }
}

const WELL_KNOWN_SERVICES: &[(&str, u16)] = &[
    ("echo", 7),
    ("discard", 9),
    ("daytime", 13),
    ("ftp-data", 20),
    ("ftp", 21),
    ("ssh", 22),
    ("telnet", 23),
    ("smtp", 25),
    ("time", 37),
    ("domain", 53),
    ("tftp", 69),
    ("gopher", 70),
    ("finger", 79),
    ("http", 80),
    ("www", 80),
    ("kerberos", 88),
    ("pop3", 110),
    ("sunrpc", 111),
    ("nntp", 119),
    ("ntp", 123),
    ("imap", 143),
    ("snmp", 161),
    ("ldap", 389),
    ("https", 443),
    ("submission", 587),
    ("ldaps", 636),
    ("imaps", 993),
    ("pop3s", 995),
    ("mysql", 3306),
    ("postgresql", 5432),
];

static WELL_KNOWN: LazyLock<ServiceTable> = LazyLock::new(ServiceTable::well_known);

/// Static service table, in `/etc/services` spirit. Names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceTable {
    ports: HashMap<String, u16>,
}

impl ServiceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn well_known() -> Self {
        let mut this = Self::new();
        for (name, port) in WELL_KNOWN_SERVICES {
            this.insert(name, *port);
        }
        this
    }

    /// Load `/etc/services`, falling back to the built-in table
    #[must_use]
    pub fn system() -> Self {
        Self::load(Path::new(SYSTEM_SERVICES)).unwrap_or_else(|err| {
            warn!("Using built-in service table: {err:#}");
            Self::well_known()
        })
    }

    /// First definition of a name wins, like `getservbyname()`
    pub fn insert(&mut self, name: &str, port: u16) {
        self.ports.entry(name.to_owned()).or_insert(port);
    }

    #[must_use]
    pub fn with(mut self, name: &str, port: u16) -> Self {
        self.insert(name, port);
        self
    }

    /// Parse services file text: `<name> <port>/<protocol> [alias...]`
    ///
    /// # Errors
    /// Return `Err` on lines without a valid `port/protocol` field
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut this = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            let port = fields
                .next()
                .and_then(|field| field.split_once('/'))
                .and_then(|(port, _proto)| port.parse::<u16>().ok())
                .with_context(|| format!("Invalid port for {name} at line {}", lineno + 1))?;
            this.insert(name, port);
            for alias in fields {
                this.insert(alias, port);
            }
        }
        Ok(this)
    }

    /// # Errors
    /// Return `Err` if file can't be read or parsed
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading services file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Parsing services file {}", path.display()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl ServiceResolver for ServiceTable {
    fn lookup_port(&self, service: &str) -> Option<u16> {
        self.ports.get(service).copied()
    }
}

/// Host and service lookups used while constructing endpoints
#[derive(Debug, Clone)]
pub struct Resolver<H = SystemHosts, S = ServiceTable> {
    hosts: H,
    services: S,
}

impl Resolver {
    /// Operating system resolver with services from `/etc/services`
    #[must_use]
    pub fn system() -> Self {
        Self::new(SystemHosts, ServiceTable::system())
    }
}

impl Resolver<NoHosts, &'static ServiceTable> {
    /// Resolver without any network or file access
    #[must_use]
    pub fn offline() -> Self {
        Self::new(NoHosts, &*WELL_KNOWN)
    }
}

impl<H: HostResolver, S: ServiceResolver> Resolver<H, S> {
    pub fn new(hosts: H, services: S) -> Self {
        Self { hosts, services }
    }

    pub fn hosts(&self) -> &H {
        &self.hosts
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    /// Port number from numeric text, or from the service table otherwise
    ///
    /// # Errors
    /// `InvalidFormat` for numbers above 65535, `ServiceNotFound` for unknown names
    pub fn port(&self, service: &str) -> Result<u16> {
        if let Some(port) = parse_port_number(service) {
            return port;
        }
        self.services
            .lookup_port(service)
            .ok_or_else(|| EndpointError::ServiceNotFound(service.to_owned()))
    }

    /// Address and IPv6 scope id for `host`. Literals never reach the host resolver.
    /// With mixed results IPv4 candidates win over IPv6 ones.
    ///
    /// # Errors
    /// `HostNotFound` if the resolver has no candidates
    pub fn host_address(&self, host: &str) -> Result<(IpAddr, u32)> {
        if let Some(literal) = parse_literal(host) {
            return Ok(literal);
        }
        let mut candidates = self.hosts.resolve_scoped(host).map_err(|err| match err {
            LookupError::NotFound(_) => EndpointError::HostNotFound(host.to_owned()),
            LookupError::Failed { reason, .. } => {
                EndpointError::HostNotFound(format!("{host} ({reason})"))
            }
        })?;
        debug!("Host {host} resolved to {candidates:?}");
        if cfg!(feature = "ipv6") {
            // Stable, so each family keeps the resolver's order
            candidates.sort_by_key(|(ip, _)| ip.is_ipv6());
        }
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| EndpointError::HostNotFound(host.to_owned()))
    }
}
