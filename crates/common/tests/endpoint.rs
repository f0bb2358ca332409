// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::thread;

use netaddr::{
    Endpoint, EndpointError, Family, HostResolver, LookupError, Resolver, ServiceTable,
};

/// Resolver returning a fixed answer and counting how often it was asked
struct Scripted {
    answer: Vec<IpAddr>,
    calls: Cell<usize>,
}

impl Scripted {
    fn new(answer: &[&str]) -> Self {
        Self {
            answer: answer.iter().map(|a| a.parse().unwrap()).collect(),
            calls: Cell::new(0),
        }
    }
}

impl HostResolver for Scripted {
    fn resolve_host(&self, _name: &str) -> Result<Vec<IpAddr>, LookupError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.answer.clone())
    }
}

#[test]
fn test_literal_never_resolved() -> anyhow::Result<()> {
    let resolver = Resolver::new(Scripted::new(&["192.0.2.1"]), ServiceTable::well_known());
    let e = Endpoint::parse("10.1.2.3:http", &resolver)?;
    assert_eq!(e.to_string(), "10.1.2.3:80");
    assert_eq!(resolver.hosts().calls.get(), 0);

    let e = Endpoint::parse("gateway:http", &resolver)?;
    assert_eq!(e.to_string(), "192.0.2.1:80");
    assert_eq!(resolver.hosts().calls.get(), 1);
    Ok(())
}

#[test]
fn test_empty_answer() {
    let resolver = Resolver::new(Scripted::new(&[]), ServiceTable::new());
    assert_eq!(
        Endpoint::parse("example.invalid:80", &resolver),
        Err(EndpointError::HostNotFound("example.invalid".into()))
    );
}

#[cfg(feature = "ipv6")]
#[test]
fn test_mixed_answer_order_independent() -> anyhow::Result<()> {
    let answers: [&[&str]; 3] = [
        &["2001:db8::1", "192.0.2.7", "192.0.2.8"],
        &["192.0.2.7", "2001:db8::1", "192.0.2.8"],
        &["2001:db8::1", "2001:db8::2", "192.0.2.7"],
    ];
    for answer in answers {
        let resolver = Resolver::new(Scripted::new(answer), ServiceTable::new());
        let e = Endpoint::resolve("dual", 22, &resolver)?;
        assert_eq!(e.family(), Family::IPv4);
        assert_eq!(e.to_string(), "192.0.2.7:22");
    }
    Ok(())
}

#[test]
fn test_dyn_resolver() -> anyhow::Result<()> {
    let hosts: Box<dyn HostResolver> = Box::new(Scripted::new(&["192.0.2.9"]));
    let resolver = Resolver::new(hosts, ServiceTable::new());
    assert_eq!(Endpoint::resolve("any", 1, &resolver)?.to_string(), "192.0.2.9:1");
    Ok(())
}

#[test]
fn test_container_keys() -> anyhow::Result<()> {
    let mut sessions = BTreeMap::new();
    sessions.insert("/run/admin.sock".parse::<Endpoint>()?, "admin");
    sessions.insert("10.0.0.2:9000".parse()?, "net-vm");
    sessions.insert("10.0.0.1:9000".parse()?, "gui-vm");
    let order: Vec<_> = sessions.values().copied().collect();
    assert_eq!(order, ["gui-vm", "net-vm", "admin"]);

    let set: HashSet<Endpoint> = ["10.0.0.1:1", "10.0.0.1:1", "10.0.0.1:2"]
        .iter()
        .map(|t| t.parse())
        .collect::<Result<_, _>>()?;
    assert_eq!(set.len(), 2);
    Ok(())
}

#[test]
fn test_shared_between_threads() -> anyhow::Result<()> {
    let shared = Arc::new("192.0.2.1:443".parse::<Endpoint>()?);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let e = Arc::clone(&shared);
            thread::spawn(move || e.to_string())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("thread panicked"), "192.0.2.1:443");
    }
    Ok(())
}
