// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

use netaddr::Endpoint;
use x509_parser::prelude::*;

/// Subject alternative names of a certificate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubjectNames {
    enabled: bool,
    dns_names: Vec<String>,
    ip_addrs: Vec<IpAddr>,
}

impl SubjectNames {
    fn new() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Accepts every address and name
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn check_address(&self, ia: &IpAddr) -> bool {
        !self.enabled || self.ip_addrs.iter().any(|a| a == ia)
    }

    #[must_use]
    pub fn check_hostname(&self, hostname: &str) -> bool {
        !self.enabled || self.dns_names.iter().any(|hn| hostname == hn)
    }

    /// Unix sockets carry no address, they only pass when checks are disabled
    #[must_use]
    pub fn check_endpoint(&self, endpoint: &Endpoint) -> bool {
        match endpoint.host() {
            Some(ip) => self.check_address(&ip),
            None => !self.enabled,
        }
    }

    #[must_use]
    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    #[must_use]
    pub fn ip_addrs(&self) -> &[IpAddr] {
        &self.ip_addrs
    }

    #[must_use]
    pub fn hostname(self) -> Option<String> {
        self.dns_names.into_iter().next()
    }
}

impl From<&X509Certificate<'_>> for SubjectNames {
    fn from(x509: &X509Certificate<'_>) -> Self {
        let mut this = Self::new();
        for ext in x509.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(s) => this.dns_names.push((*s).to_string()),
                        GeneralName::IPAddress(b) => {
                            if let Ok(v4) = <[u8; 4]>::try_from(*b) {
                                this.ip_addrs.push(IpAddr::from(v4));
                            } else if let Ok(v6) = <[u8; 16]>::try_from(*b) {
                                this.ip_addrs.push(IpAddr::from(v6));
                            }
                        }
                        _ => (),
                    }
                }
            }
        }
        this
    }
}

impl TryFrom<&[u8]> for SubjectNames {
    type Error = X509Error;
    fn try_from(cert: &[u8]) -> Result<Self, Self::Error> {
        let (_, x509) = parse_x509_certificate(cert)?;
        Ok(Self::from(&x509))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_accepts_all() -> anyhow::Result<()> {
        let names = SubjectNames::disabled();
        assert!(names.check_hostname("anything"));
        assert!(names.check_address(&"192.0.2.1".parse()?));
        assert!(names.check_endpoint(&Endpoint::local("/run/admin.sock")?));
        Ok(())
    }

    #[test]
    fn test_enabled_empty_rejects() -> anyhow::Result<()> {
        let names = SubjectNames::new();
        assert!(!names.check_hostname("admin.ghaf"));
        assert!(!names.check_endpoint(&"192.0.2.1:443".parse()?));
        assert!(!names.check_endpoint(&Endpoint::local("/run/admin.sock")?));
        assert_eq!(names.hostname(), None);
        Ok(())
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(SubjectNames::try_from(&b"not a certificate"[..]).is_err());
    }
}
