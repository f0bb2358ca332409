// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv6Addr};

use crate::address::Family;
use crate::error::{EndpointError, Result};

/// Textual address split into its parts, before any resolution took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAddress<'a> {
    /// `Some(IPv6)` for bracketed hosts, `Some(UnixLocal)` for paths,
    /// `None` when only resolution can tell.
    pub family: Option<Family>,
    /// Host name, IP literal (without brackets) or filesystem path
    pub host: &'a str,
    /// Port number or service name, consumed verbatim. Absent for paths only.
    pub service: Option<&'a str>,
}

/// Split `host:port`, `[ipv6]:port` or a socket path
///
/// # Errors
/// Return `EndpointError::InvalidFormat` if text matches none of the forms
pub fn parse_address(text: &str) -> Result<ParsedAddress<'_>> {
    if text.is_empty() {
        return Err(EndpointError::invalid("Empty address"));
    }

    if let Some(rest) = text.strip_prefix('[') {
        let malformed = || EndpointError::invalid("Malformed IPv6 address");
        let (host, tail) = rest.split_once(']').ok_or_else(malformed)?;
        let service = tail
            .strip_prefix(':')
            .filter(|service| !service.is_empty())
            .ok_or_else(malformed)?;
        if host.is_empty() {
            return Err(malformed());
        }
        return Ok(ParsedAddress {
            family: Some(Family::IPv6),
            host,
            service: Some(service),
        });
    }

    if is_socket_path(text) {
        return Ok(ParsedAddress {
            family: Some(Family::UnixLocal),
            host: text,
            service: None,
        });
    }

    let Some((host, service)) = text.split_once(':') else {
        return Err(EndpointError::invalid("Missing port number"));
    };
    if service.is_empty() {
        return Err(EndpointError::invalid("Missing port number"));
    }
    if host.is_empty() {
        return Err(EndpointError::invalid("Missing host name"));
    }
    Ok(ParsedAddress {
        family: None,
        host,
        service: Some(service),
    })
}

/// Text naming a unix socket: it holds a slash and isn't a bracketed IPv6
/// host. Host names never contain a slash.
#[must_use]
pub fn is_socket_path(text: &str) -> bool {
    !text.starts_with('[') && text.contains('/')
}

/// Parse an IP literal, IPv6 may carry a numeric zone (`fe80::1%2`).
/// Returns the address and its scope id, zero when absent.
#[must_use]
pub fn parse_literal(host: &str) -> Option<(IpAddr, u32)> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some((ip, 0));
    }
    let (addr, zone) = host.split_once('%')?;
    let addr = addr.parse::<Ipv6Addr>().ok()?;
    let scope = zone.parse::<u32>().ok()?;
    Some((IpAddr::V6(addr), scope))
}

/// All-digit text is a port number, anything else has to be looked up.
/// `Err` means digits that overflow 16 bits.
pub(crate) fn parse_port_number(text: &str) -> Option<Result<u16>> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(
        text.parse::<u16>()
            .map_err(|_| EndpointError::invalid("Port number out of range")),
    )
}
