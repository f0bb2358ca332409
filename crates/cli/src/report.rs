// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

use netaddr::{Endpoint, Family};
use netaddr_x509::VerifyFailure;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointReport {
    pub endpoint: String,
    pub family: Family,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub raw_len: usize,
}

impl From<&Endpoint> for EndpointReport {
    fn from(e: &Endpoint) -> Self {
        Self {
            endpoint: e.to_string(),
            family: e.family(),
            host: e.host(),
            port: e.port(),
            scope_id: e.scope_id(),
            path: e.path().map(ToOwned::to_owned),
            raw_len: e.raw_len(),
        }
    }
}

/// Outcome of `verify`, `code` is zero on success like OpenSSL's `X509_V_OK`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub subject: String,
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_match: Option<bool>,
}

impl VerifyReport {
    #[must_use]
    pub fn new(subject: &str, result: Result<(), &VerifyFailure>) -> Self {
        match result {
            Ok(()) => Self {
                subject: subject.to_owned(),
                code: 0,
                message: "ok".to_owned(),
                depth: None,
                failed_subject: None,
                endpoint_match: None,
            },
            Err(failure) => Self {
                subject: subject.to_owned(),
                code: failure.code(),
                message: failure.message(),
                depth: Some(failure.depth),
                failed_subject: Some(failure.certificate.subject().to_owned()),
                endpoint_match: None,
            },
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == 0 && self.endpoint_match != Some(false)
    }
}

/// Print as JSON line or pretty debug form
///
/// # Errors
/// Return `Err` if value can't be serialized
pub fn dump<Q>(value: Q, as_json: bool) -> anyhow::Result<()>
where
    Q: std::fmt::Debug + Serialize,
{
    if as_json {
        let js = serde_json::to_string(&value)?;
        println!("{js}");
    } else {
        println!("{value:#?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inet_report() -> anyhow::Result<()> {
        let e: Endpoint = "192.0.2.1:80".parse()?;
        let report = EndpointReport::from(&e);
        assert_eq!(
            serde_json::to_value(&report)?,
            serde_json::json!({
                "endpoint": "192.0.2.1:80",
                "family": "ipv4",
                "host": "192.0.2.1",
                "port": 80,
                "raw_len": 16,
            })
        );
        Ok(())
    }

    #[test]
    fn test_local_report() -> anyhow::Result<()> {
        let e = Endpoint::local("/run/admin.sock")?;
        let report = EndpointReport::from(&e);
        assert_eq!(report.family, Family::UnixLocal);
        assert_eq!(report.host, None);
        assert_eq!(report.port, None);
        assert_eq!(report.path.as_deref(), Some("/run/admin.sock"));
        assert_eq!(
            serde_json::to_value(&report)?["family"],
            serde_json::json!("local")
        );
        Ok(())
    }

    #[test]
    fn test_verify_report_ok() {
        let report = VerifyReport::new("CN=admin.ghaf", Ok(()));
        assert_eq!(report.code, 0);
        assert!(report.is_ok());

        let mismatch = VerifyReport {
            endpoint_match: Some(false),
            ..report
        };
        assert!(!mismatch.is_ok());
    }
}
