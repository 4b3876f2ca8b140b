//! Fan-out A-record lookups across the configured resolver set.
//!
//! Every resolver is queried on its own, concurrently, and the answers are
//! merged into one [`AddressMap`] that remembers which resolvers returned each
//! address. Resolver failures never escape this module: they are classified
//! as a [`LookupOutcome`], counted and logged.

use crate::config::ResolverEntry;
use crate::utils::{NetworkError, Result};
use async_trait::async_trait;
use hickory_resolver::Name;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

pub mod hickory;

pub use hickory::*;

/// Result of asking a single resolver for a domain's A records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Addresses(Vec<Ipv4Addr>),
    NoAnswer,
    NxDomain,
    Timeout,
    Failed(String),
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupOutcome::Addresses(ips) => write!(f, "{} addresses", ips.len()),
            LookupOutcome::NoAnswer => write!(f, "no answer"),
            LookupOutcome::NxDomain => write!(f, "NXDOMAIN"),
            LookupOutcome::Timeout => write!(f, "timeout"),
            LookupOutcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Where A records come from. Implementations must not fall back to the
/// system resolver: every call targets the given resolver only.
#[async_trait]
pub trait AddressSource: Send + Sync + 'static {
    async fn lookup_ipv4(&self, resolver: &ResolverEntry, domain: &str) -> LookupOutcome;
}

/// An address seen for one domain, with the resolvers that returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressObservation {
    pub address: Ipv4Addr,
    pub sources: BTreeSet<String>,
}

impl AddressObservation {
    fn new(address: Ipv4Addr, source: &str) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(source.to_string());
        Self { address, sources }
    }
}

pub type AddressMap = BTreeMap<Ipv4Addr, AddressObservation>;

/// Union `addresses` returned by `resolver` into `observations`.
pub fn merge_addresses(observations: &mut AddressMap, resolver: &str, addresses: &[Ipv4Addr]) {
    for &address in addresses {
        observations
            .entry(address)
            .and_modify(|observation| {
                observation.sources.insert(resolver.to_string());
            })
            .or_insert_with(|| AddressObservation::new(address, resolver));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub answered: usize,
    pub empty: usize,
    pub nxdomain: usize,
    pub timed_out: usize,
    pub failed: usize,
}

impl LookupStats {
    fn record(&mut self, outcome: &LookupOutcome) {
        match outcome {
            LookupOutcome::Addresses(ips) if !ips.is_empty() => self.answered += 1,
            LookupOutcome::Addresses(_) | LookupOutcome::NoAnswer => self.empty += 1,
            LookupOutcome::NxDomain => self.nxdomain += 1,
            LookupOutcome::Timeout => self.timed_out += 1,
            LookupOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.answered + self.empty + self.nxdomain + self.timed_out + self.failed
    }
}

pub struct DnsAggregator<S> {
    source: Arc<S>,
    resolvers: Arc<[ResolverEntry]>,
    lifetime: Duration,
    workers: usize,
}

impl<S: AddressSource> DnsAggregator<S> {
    pub fn new(source: S, resolvers: Vec<ResolverEntry>) -> Self {
        Self {
            source: Arc::new(source),
            resolvers: resolvers.into(),
            lifetime: Duration::from_millis(500),
            workers: crate::config::DEFAULT_WORKERS,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn resolvers(&self) -> &[ResolverEntry] {
        &self.resolvers
    }

    pub async fn resolve(&self, domain: &str) -> Result<AddressMap> {
        self.resolve_with_stats(domain)
            .await
            .map(|(observations, _)| observations)
    }

    /// Query every resolver and wait for all of them (or their cutoff)
    /// before returning the merged map.
    pub async fn resolve_with_stats(&self, domain: &str) -> Result<(AddressMap, LookupStats)> {
        validate_domain(domain)?;

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for resolver in self.resolvers.iter().cloned() {
            let permits = Arc::clone(&permits);
            let source = Arc::clone(&self.source);
            let domain = domain.to_string();
            let lifetime = self.lifetime;

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let outcome = timeout(lifetime, source.lookup_ipv4(&resolver, &domain))
                    .await
                    .unwrap_or(LookupOutcome::Timeout);
                (resolver, outcome)
            });
        }

        let mut observations = AddressMap::new();
        let mut stats = LookupStats::default();

        while let Some(joined) = tasks.join_next().await {
            let (resolver, outcome) =
                joined.map_err(|e| NetworkError::Worker(format!("DNS lookup task: {e}")))?;
            stats.record(&outcome);

            match outcome {
                LookupOutcome::Addresses(addresses) => {
                    log::debug!(
                        "{} via {} ({}): {:?}",
                        domain,
                        resolver.name,
                        resolver.address,
                        addresses
                    );
                    merge_addresses(&mut observations, &resolver.name, &addresses);
                }
                other => {
                    log::debug!(
                        "{} via {} ({}): {}",
                        domain,
                        resolver.name,
                        resolver.address,
                        other
                    );
                }
            }
        }

        log::info!(
            "{}: {} distinct addresses from {}/{} resolvers ({} empty, {} NXDOMAIN, {} timed out, {} failed)",
            domain,
            observations.len(),
            stats.answered,
            stats.total(),
            stats.empty,
            stats.nxdomain,
            stats.timed_out,
            stats.failed
        );

        Ok((observations, stats))
    }
}

fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() || domain.chars().any(char::is_whitespace) {
        return Err(NetworkError::InvalidDomain(domain.to_string()));
    }
    Name::from_ascii(domain)
        .map(|_| ())
        .map_err(|e| NetworkError::InvalidDomain(format!("{domain}: {e}")))
}

#[cfg(test)]
mod tests;
