// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use thiserror::Error;
use tracing::debug;
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

use crate::names::SubjectNames;

/// Longest chain walked before giving up, same as OpenSSL default
pub const MAX_DEPTH: usize = 100;

/// Decoded certificate, keeping what chain building needs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    raw_subject: Vec<u8>,
    raw_issuer: Vec<u8>,
    not_before: i64,
    not_after: i64,
    is_ca: bool,
    names: SubjectNames,
}

impl Certificate {
    /// # Errors
    /// Return `Err` if DER is not a X.509 certificate
    pub fn from_der(der: &[u8]) -> Result<Self, X509Error> {
        let (_, x509) = parse_x509_certificate(der)?;
        let validity = x509.validity();
        let is_ca = x509
            .basic_constraints()
            .ok()
            .flatten()
            .is_some_and(|bc| bc.value.ca);
        Ok(Self {
            der: der.to_vec(),
            subject: x509.subject().to_string(),
            raw_subject: x509.subject().as_raw().to_vec(),
            raw_issuer: x509.issuer().as_raw().to_vec(),
            not_before: validity.not_before.timestamp(),
            not_after: validity.not_after.timestamp(),
            is_ca,
            names: SubjectNames::from(&x509),
        })
    }

    /// All `CERTIFICATE` blocks of a PEM file
    ///
    /// # Errors
    /// Return `Err` if file can't be read, or holds a broken certificate
    pub fn from_pem_file(path: &Path) -> anyhow::Result<Vec<Self>> {
        let data =
            std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
        let mut certs = Vec::new();
        for pem in Pem::iter_from_buffer(&data) {
            let pem = pem.with_context(|| format!("Decoding PEM {}", path.display()))?;
            if pem.label != "CERTIFICATE" {
                debug!("Skipping {} block in {}", pem.label, path.display());
                continue;
            }
            let cert = Self::from_der(&pem.contents)
                .with_context(|| format!("Parsing certificate in {}", path.display()))?;
            certs.push(cert);
        }
        if certs.is_empty() {
            anyhow::bail!("No certificate found in {}", path.display());
        }
        Ok(certs)
    }

    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.raw_subject == self.raw_issuer
    }

    #[must_use]
    pub fn names(&self) -> &SubjectNames {
        &self.names
    }

    fn issued(&self, issuer: &Certificate) -> bool {
        self.raw_issuer == issuer.raw_subject
    }
}

/// Reasons a chain is refused, with OpenSSL `X509_V_ERR_*` codes and messages
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    #[error("certificate is not yet valid")]
    NotYetValid,
    #[error("certificate has expired")]
    Expired,
    #[error("self-signed certificate")]
    DepthZeroSelfSigned,
    #[error("self-signed certificate in certificate chain")]
    SelfSignedInChain,
    #[error("unable to get local issuer certificate")]
    UnableToGetIssuer,
    #[error("certificate chain too long")]
    ChainTooLong,
    #[error("invalid CA certificate")]
    InvalidCa,
}

impl VerifyError {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::NotYetValid => 9,
            Self::Expired => 10,
            Self::DepthZeroSelfSigned => 18,
            Self::SelfSignedInChain => 19,
            Self::UnableToGetIssuer => 20,
            Self::ChainTooLong => 22,
            Self::InvalidCa => 24,
        }
    }
}

/// Offending certificate and where in the chain it sits, leaf is depth 0
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} at depth {depth} ({})", .certificate.subject)]
pub struct VerifyFailure {
    pub certificate: Certificate,
    pub depth: usize,
    #[source]
    pub error: VerifyError,
}

impl VerifyFailure {
    #[must_use]
    pub fn code(&self) -> i32 {
        self.error.code()
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Trusted anchors plus untrusted intermediates used to build chains.
/// Signatures are not checked, only names, validity periods and CA flags.
#[derive(Clone, Debug, Default)]
pub struct CertStore {
    anchors: Vec<Certificate>,
    chain: Vec<Certificate>,
}

impl CertStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ca(&mut self, cert: Certificate) {
        self.anchors.push(cert);
    }

    /// Intermediates offered by a peer, never trusted by themselves
    pub fn add_chain(&mut self, chain: impl IntoIterator<Item = Certificate>) {
        self.chain.extend(chain);
    }

    /// # Errors
    /// Return `VerifyFailure` naming the first certificate that breaks the chain
    pub fn verify_chain(&self, leaf: &Certificate) -> Result<(), VerifyFailure> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        self.verify_chain_at(leaf, now)
    }

    /// Verify at given time, in seconds since the Unix epoch
    ///
    /// # Errors
    /// Return `VerifyFailure` naming the first certificate that breaks the chain
    pub fn verify_chain_at(&self, leaf: &Certificate, now: i64) -> Result<(), VerifyFailure> {
        let fail = |cert: &Certificate, depth, error| VerifyFailure {
            certificate: cert.clone(),
            depth,
            error,
        };
        let check_time = |cert: &Certificate, depth| {
            if now < cert.not_before {
                Err(fail(cert, depth, VerifyError::NotYetValid))
            } else if now > cert.not_after {
                Err(fail(cert, depth, VerifyError::Expired))
            } else {
                Ok(())
            }
        };

        let mut current = leaf;
        for depth in 0..MAX_DEPTH {
            check_time(current, depth)?;
            if self.anchors.contains(current) {
                debug!("Chain of {} ends at trusted {}", leaf.subject, current.subject);
                return Ok(());
            }
            if let Some(anchor) = self.anchors.iter().find(|a| current.issued(a)) {
                check_time(anchor, depth + 1)?;
                debug!("Chain of {} ends at trusted {}", leaf.subject, anchor.subject);
                return Ok(());
            }
            if current.is_self_issued() {
                let error = if depth == 0 {
                    VerifyError::DepthZeroSelfSigned
                } else {
                    VerifyError::SelfSignedInChain
                };
                return Err(fail(current, depth, error));
            }
            let Some(issuer) = self.chain.iter().find(|c| current.issued(c)) else {
                return Err(fail(current, depth, VerifyError::UnableToGetIssuer));
            };
            if !issuer.is_ca {
                return Err(fail(issuer, depth + 1, VerifyError::InvalidCa));
            }
            current = issuer;
        }
        Err(fail(current, MAX_DEPTH, VerifyError::ChainTooLong))
    }
}
