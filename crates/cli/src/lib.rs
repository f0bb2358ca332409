// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use tracing::Subscriber;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

pub mod lookup;
pub mod report;

/// Filter directives, e.g. `NETADDR_LOG=netaddr=debug`
pub const LOG_ENV: &str = "NETADDR_LOG";

/// Directives from `spec`, or `info` when absent or unparsable
fn log_filter(spec: Option<&str>) -> EnvFilter {
    spec.and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Stderr output; debug level adds source locations and pretty layout
fn stderr_layer<S>(verbose: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .with_thread_ids(verbose);
    if verbose {
        layer.pretty().boxed()
    } else {
        layer.boxed()
    }
}

/// Init logging, journald gets a copy when started by systemd
///
/// # Errors
///
/// Will return `Err` if failed to initialize logging
pub fn trace_init() -> anyhow::Result<()> {
    let filter = log_filter(std::env::var(LOG_ENV).ok().as_deref());
    let verbose = filter
        .max_level_hint()
        .is_some_and(|level| level >= LevelFilter::DEBUG);

    let journald = std::env::var_os("INVOCATION_ID")
        .and_then(|_| tracing_journald::layer().ok())
        .with_filter(LevelFilter::INFO);

    let subscriber = tracing_subscriber::registry()
        .with(journald)
        .with(stderr_layer(verbose).with_filter(filter));

    tracing::subscriber::set_global_default(subscriber)
        .context("tracing shouldn't already have been set up")?;
    Ok(())
}
