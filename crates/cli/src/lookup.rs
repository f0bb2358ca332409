// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use netaddr::{EndpointError, HostResolver, HostTable, Resolver, ServiceTable, SystemHosts};
use tracing::{debug, info};

pub type Hosts = Box<dyn HostResolver + Send + Sync>;
pub type SharedResolver = Arc<Resolver<Hosts, ServiceTable>>;

#[derive(Debug, Clone, Args)]
pub struct LookupOptions {
    /// Hosts file used instead of the system resolver
    #[arg(long, env = "NETADDR_HOSTS")]
    pub hosts: Option<PathBuf>,

    /// Services file, `/etc/services` if omitted
    #[arg(long, env = "NETADDR_SERVICES")]
    pub services: Option<PathBuf>,

    /// Give up on host and service lookups after this many milliseconds
    #[arg(long, env = "NETADDR_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,
}

impl LookupOptions {
    /// # Errors
    /// Return `Err` if hosts or services file can't be loaded
    pub fn resolver(&self) -> anyhow::Result<SharedResolver> {
        let hosts: Hosts = match &self.hosts {
            Some(path) => {
                let table = HostTable::load(path)?;
                info!("Using {} host names from {}", table.len(), path.display());
                Box::new(table)
            }
            None => Box::new(SystemHosts),
        };
        let services = match &self.services {
            Some(path) => ServiceTable::load(path)?,
            None => ServiceTable::system(),
        };
        debug!("{} service names known", services.len());
        Ok(Arc::new(Resolver::new(hosts, services)))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Run a blocking lookup off the async runtime, bounded by `timeout`.
/// On timeout the lookup keeps its blocking thread until it returns,
/// run under [`block_on`] so that thread can't delay process exit.
///
/// # Errors
/// Return `Err` if lookup fails or doesn't finish in time
pub async fn with_timeout<T, F>(
    resolver: &SharedResolver,
    timeout: Duration,
    lookup: F,
) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Resolver<Hosts, ServiceTable>) -> Result<T, EndpointError> + Send + 'static,
{
    let resolver = Arc::clone(resolver);
    let task = tokio::task::spawn_blocking(move || lookup(&resolver));
    let result = tokio::time::timeout(timeout, task)
        .await
        .with_context(|| format!("Lookup timed out after {}ms", timeout.as_millis()))?
        .context("Lookup task failed")?;
    Ok(result?)
}

/// Drive `future` on a fresh multi-thread runtime. Blocking lookups still
/// running afterwards are left behind instead of being waited for.
///
/// # Errors
/// Return `Err` if the runtime can't be built
pub fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Building tokio runtime")?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netaddr::{Endpoint, LookupError};
    use std::net::IpAddr;
    use std::thread;

    struct SlowHosts(Duration);

    impl HostResolver for SlowHosts {
        fn resolve_host(&self, _name: &str) -> Result<Vec<IpAddr>, LookupError> {
            thread::sleep(self.0);
            Ok(vec![IpAddr::from([192, 0, 2, 1])])
        }
    }

    fn slow(delay: Duration) -> SharedResolver {
        Arc::new(Resolver::new(Box::new(SlowHosts(delay)), ServiceTable::well_known()))
    }

    #[tokio::test]
    async fn test_lookup_in_time() -> anyhow::Result<()> {
        let resolver = slow(Duration::ZERO);
        let e = with_timeout(&resolver, Duration::from_secs(5), |r| {
            Endpoint::parse("gateway:https", r)
        })
        .await?;
        assert_eq!(e.to_string(), "192.0.2.1:443");
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_timeout() {
        let resolver = slow(Duration::from_millis(300));
        let err = with_timeout(&resolver, Duration::from_millis(10), |r| {
            Endpoint::parse("gateway:https", r)
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Lookup timed out after 10ms");
    }

    #[test]
    fn test_timeout_bounds_shutdown() -> anyhow::Result<()> {
        let started = std::time::Instant::now();
        let resolver = slow(Duration::from_secs(2));
        let result = block_on(with_timeout(&resolver, Duration::from_millis(10), |r| {
            Endpoint::parse("gateway:https", r)
        }))?;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(1), "{:?}", started.elapsed());
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_error_passed_through() {
        let resolver = slow(Duration::ZERO);
        let err = with_timeout(&resolver, Duration::from_secs(5), |r| {
            Endpoint::parse("gateway:nosuchservice", r)
        })
        .await
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EndpointError>(),
            Some(&EndpointError::ServiceNotFound("nosuchservice".into()))
        );
    }

    #[test]
    fn test_hosts_file() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("netaddr-hosts-{}", std::process::id()));
        std::fs::write(&path, "192.0.2.5 net-vm\n")?;
        let opts = LookupOptions {
            hosts: Some(path.clone()),
            services: None,
            timeout_ms: 100,
        };
        let resolver = opts.resolver();
        std::fs::remove_file(&path)?;
        let e = Endpoint::resolve("net-vm", 22, &*resolver?)?;
        assert_eq!(e.to_string(), "192.0.2.5:22");
        assert_eq!(opts.timeout(), Duration::from_millis(100));

        let missing = LookupOptions {
            hosts: Some(path),
            ..opts
        };
        assert!(missing.resolver().is_err());
        Ok(())
    }
}
