// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Linux `sockaddr` byte layouts. The family tag is in native byte order,
//! ports, IPv4 addresses and IPv6 flow info in network order.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};

use crate::address::{Endpoint, Repr};
use crate::error::{EndpointError, Result};

pub const AF_UNIX: u16 = 1;
pub const AF_INET: u16 = 2;
pub const AF_INET6: u16 = 10;

pub const SOCKADDR_IN_LEN: usize = 16;
pub const SOCKADDR_IN6_LEN: usize = 28;
pub const SOCKADDR_UN_LEN: usize = 110;

/// `sun_path` is 108 bytes, one is kept for the terminating NUL
pub const MAX_PATH_LEN: usize = SOCKADDR_UN_LEN - 2 - 1;

fn bytes<const N: usize>(raw: &[u8], at: usize) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(&raw[at..at + N]);
    out
}

/// # Errors
/// Return `InvalidFormat` if length and family tag match no known layout
pub fn decode(raw: &[u8]) -> Result<Endpoint> {
    let tag = (raw.len() >= 2).then(|| u16::from_ne_bytes(bytes(raw, 0)));
    match (raw.len(), tag) {
        (SOCKADDR_IN_LEN, Some(AF_INET)) => {
            let port = u16::from_be_bytes(bytes(raw, 2));
            let ip = Ipv4Addr::from(bytes::<4>(raw, 4));
            Ok(Endpoint::from(SocketAddrV4::new(ip, port)))
        }
        (SOCKADDR_IN6_LEN, Some(AF_INET6)) => {
            let port = u16::from_be_bytes(bytes(raw, 2));
            let flowinfo = u32::from_be_bytes(bytes(raw, 4));
            let ip = Ipv6Addr::from(bytes::<16>(raw, 8));
            let scope_id = u32::from_ne_bytes(bytes(raw, 24));
            Endpoint::try_from(SocketAddrV6::new(ip, port, flowinfo, scope_id))
        }
        (len, Some(AF_UNIX)) if len > 2 && len <= SOCKADDR_UN_LEN => {
            let path = &raw[2..];
            let path = path
                .iter()
                .position(|b| *b == 0)
                .map_or(path, |nul| &path[..nul]);
            let path = std::str::from_utf8(path)
                .map_err(|_| EndpointError::invalid("Socket path is not valid UTF-8"))?;
            Endpoint::local(path)
        }
        (len, tag) => Err(EndpointError::InvalidFormat(format!(
            "Unsupported raw address of {len} bytes (family tag {tag:?})"
        ))),
    }
}

#[must_use]
pub fn encode(endpoint: &Endpoint) -> Vec<u8> {
    let mut raw = Vec::with_capacity(encoded_len(endpoint));
    match endpoint.repr() {
        Repr::V4(sa) => {
            raw.extend_from_slice(&AF_INET.to_ne_bytes());
            raw.extend_from_slice(&sa.port().to_be_bytes());
            raw.extend_from_slice(&sa.ip().octets());
            raw.extend_from_slice(&[0; 8]);
        }
        Repr::V6(sa) => {
            raw.extend_from_slice(&AF_INET6.to_ne_bytes());
            raw.extend_from_slice(&sa.port().to_be_bytes());
            raw.extend_from_slice(&sa.flowinfo().to_be_bytes());
            raw.extend_from_slice(&sa.ip().octets());
            raw.extend_from_slice(&sa.scope_id().to_ne_bytes());
        }
        Repr::Local(path) => {
            raw.extend_from_slice(&AF_UNIX.to_ne_bytes());
            raw.extend_from_slice(path.as_bytes());
            raw.push(0);
        }
    }
    raw
}

#[must_use]
pub fn encoded_len(endpoint: &Endpoint) -> usize {
    match endpoint.repr() {
        Repr::V4(_) => SOCKADDR_IN_LEN,
        Repr::V6(_) => SOCKADDR_IN6_LEN,
        Repr::Local(path) => 2 + path.len() + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Family;

    #[test]
    fn test_ipv4_layout() -> anyhow::Result<()> {
        let e: Endpoint = "192.0.2.1:8080".parse()?;
        let raw = e.to_raw();
        assert_eq!(raw.len(), SOCKADDR_IN_LEN);
        assert_eq!(e.raw_len(), SOCKADDR_IN_LEN);
        assert_eq!(raw[..2], AF_INET.to_ne_bytes());
        assert_eq!(raw[2..4], [0x1f, 0x90]);
        assert_eq!(raw[4..8], [192, 0, 2, 1]);
        assert_eq!(Endpoint::from_raw(&raw)?, e);
        Ok(())
    }

    #[cfg(feature = "ipv6")]
    #[test]
    fn test_ipv6_layout() -> anyhow::Result<()> {
        let e = Endpoint::try_from(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 443, 7, 3))?;
        let raw = e.to_raw();
        assert_eq!(raw.len(), SOCKADDR_IN6_LEN);
        assert_eq!(raw[2..4], [0x01, 0xbb]);
        assert_eq!(raw[4..8], [0, 0, 0, 7]);
        assert_eq!(raw[23], 1);

        let back = Endpoint::from_raw(&raw)?;
        assert_eq!(back, e);
        assert_eq!(back.scope_id(), Some(3));
        // Flow info survives even though it takes no part in equality
        assert_eq!(back.socket_addr(), e.socket_addr());
        Ok(())
    }

    #[test]
    fn test_local_layout() -> anyhow::Result<()> {
        let e = Endpoint::local("/run/givc.sock")?;
        let raw = e.to_raw();
        assert_eq!(raw.len(), 2 + "/run/givc.sock".len() + 1);
        assert_eq!(raw.last(), Some(&0));
        assert_eq!(Endpoint::from_raw(&raw)?, e);

        // Full size sockaddr_un with zero padding
        let mut padded = raw.clone();
        padded.resize(SOCKADDR_UN_LEN, 0);
        let back = Endpoint::from_raw(&padded)?;
        assert_eq!(back.family(), Family::UnixLocal);
        assert_eq!(back.path(), Some("/run/givc.sock"));

        // Local socket with sockaddr_in sized buffer
        let mut short = AF_UNIX.to_ne_bytes().to_vec();
        short.extend_from_slice(b"/tmp/a.sock\0\0\0");
        assert_eq!(short.len(), SOCKADDR_IN_LEN);
        assert_eq!(Endpoint::from_raw(&short)?.path(), Some("/tmp/a.sock"));
        Ok(())
    }

    #[test]
    fn test_invalid_raw() {
        assert!(Endpoint::from_raw(&[]).is_err());
        assert!(Endpoint::from_raw(&[2]).is_err());
        assert!(Endpoint::from_raw(&[0; 20]).is_err());
        assert!(Endpoint::from_raw(&[0; SOCKADDR_UN_LEN + 1]).is_err());

        // Size of sockaddr_in but tagged AF_INET6
        let mut raw = vec![0; SOCKADDR_IN_LEN];
        raw[..2].copy_from_slice(&AF_INET6.to_ne_bytes());
        assert!(matches!(
            Endpoint::from_raw(&raw),
            Err(EndpointError::InvalidFormat(_))
        ));

        // Empty unix path
        let mut raw = AF_UNIX.to_ne_bytes().to_vec();
        raw.push(0);
        assert!(Endpoint::from_raw(&raw).is_err());

        // Bare name, its text would read as a host
        let mut raw = AF_UNIX.to_ne_bytes().to_vec();
        raw.extend_from_slice(b"sock\0");
        assert!(matches!(
            Endpoint::from_raw(&raw),
            Err(EndpointError::InvalidFormat(_))
        ));
    }
}
