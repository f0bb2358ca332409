// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use netaddr::{Endpoint, Family};
use netaddr_cli::lookup::{LookupOptions, SharedResolver, block_on, with_timeout};
use netaddr_cli::report::{EndpointReport, VerifyReport, dump};
use netaddr_x509::{CertStore, Certificate};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "netaddr")]
#[command(about = "Parse, resolve and compare socket endpoints", long_about = None)]
struct Cli {
    #[command(flatten)]
    lookup: LookupOptions,

    #[arg(long, global = true, default_value_t = false)]
    as_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse endpoints and show their parts
    Parse {
        /// Require this family: ipv4, ipv6 or local
        #[arg(long)]
        family: Option<Family>,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Resolve host and port, or service name
    Resolve { host: String, service: String },

    /// Print endpoints in order, duplicates removed
    Sort {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Hex dump of the raw socket address
    Raw {
        #[arg(required_unless_present = "decode", conflicts_with = "decode")]
        text: Option<String>,

        /// Decode hex dump back into an endpoint
        #[arg(long)]
        decode: Option<String>,
    },

    /// Verify certificate chain, and optionally that it names an endpoint
    Verify {
        /// Trusted CA certificates
        #[arg(long, required = true)]
        ca: Vec<PathBuf>,

        /// Untrusted intermediate certificates
        #[arg(long)]
        chain: Vec<PathBuf>,

        /// Leaf certificate, intermediates may follow in the same file
        leaf: PathBuf,

        #[arg(long)]
        endpoint: Option<String>,
    },
}

async fn parse_one(
    resolver: &SharedResolver,
    timeout: Duration,
    family: Option<Family>,
    text: String,
) -> anyhow::Result<Endpoint> {
    let what = text.clone();
    with_timeout(resolver, timeout, move |r| match family {
        Some(family) => Endpoint::with_family(family, &text, r),
        None => Endpoint::parse(&text, r),
    })
    .await
    .with_context(|| format!("Parsing {what}"))
}

fn load_store(
    ca: &[PathBuf],
    chain: &[PathBuf],
    leaf: &Path,
) -> anyhow::Result<(CertStore, Certificate)> {
    let mut store = CertStore::new();
    for path in ca {
        for cert in Certificate::from_pem_file(path)? {
            debug!("Trusting {}", cert.subject());
            store.add_ca(cert);
        }
    }
    for path in chain {
        store.add_chain(Certificate::from_pem_file(path)?);
    }
    let mut bundle = Certificate::from_pem_file(leaf)?.into_iter();
    let leaf = bundle
        .next()
        .with_context(|| format!("No leaf certificate in {}", leaf.display()))?;
    store.add_chain(bundle);
    Ok((store, leaf))
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    netaddr_cli::trace_init()?;

    let cli = Cli::parse();
    debug!("CLI is {:#?}", cli);

    block_on(run(cli))?
}

async fn run(cli: Cli) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let resolver = cli.lookup.resolver()?;
    let timeout = cli.lookup.timeout();
    let as_json = cli.as_json;

    match cli.command {
        Commands::Parse { family, text } => {
            for text in text {
                let endpoint = parse_one(&resolver, timeout, family, text).await?;
                dump(EndpointReport::from(&endpoint), as_json)?;
            }
        }
        Commands::Resolve { host, service } => {
            let endpoint = with_timeout(&resolver, timeout, move |r| {
                Endpoint::resolve_service(&host, &service, r)
            })
            .await?;
            dump(EndpointReport::from(&endpoint), as_json)?;
        }
        Commands::Sort { text } => {
            let mut sorted = BTreeSet::new();
            for text in text {
                sorted.insert(parse_one(&resolver, timeout, None, text).await?);
            }
            if as_json {
                dump(&sorted, true)?;
            } else {
                for endpoint in &sorted {
                    println!("{endpoint}");
                }
            }
        }
        Commands::Raw {
            decode: Some(dump_hex),
            ..
        } => {
            let bytes = hex::decode(dump_hex.trim()).context("Decoding hex dump")?;
            let endpoint = Endpoint::from_raw(&bytes)?;
            dump(EndpointReport::from(&endpoint), as_json)?;
        }
        Commands::Raw { text, decode: None } => {
            let text = text.context("Endpoint text is required")?;
            let endpoint = parse_one(&resolver, timeout, None, text).await?;
            println!("{}", hex::encode(endpoint.to_raw()));
        }
        Commands::Verify {
            ca,
            chain,
            leaf,
            endpoint,
        } => {
            let (store, leaf) = load_store(&ca, &chain, &leaf)?;
            let result = store.verify_chain(&leaf);
            let mut report = VerifyReport::new(leaf.subject(), result.as_ref().copied());
            if let Some(text) = endpoint {
                let endpoint = parse_one(&resolver, timeout, None, text).await?;
                report.endpoint_match = Some(leaf.names().check_endpoint(&endpoint));
            }
            dump(&report, as_json)?;
            if let Err(failure) = result {
                return Err(failure.into());
            }
            if report.endpoint_match == Some(false) {
                let msg = format!("Certificate {} does not name endpoint", leaf.subject());
                return Err(msg.into());
            }
            info!("Certificate {} verified", leaf.subject());
        }
    }
    Ok(())
}
