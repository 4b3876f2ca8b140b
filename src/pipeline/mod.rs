//! Per-domain resolve → probe → rank cycle over a whole domain list.
//!
//! Domains run one after another in list order; each phase fans out
//! internally. A failure while handling one domain is recorded on that
//! domain's [`DomainRunResult`] and the batch moves on.

use crate::config::Config;
use crate::dns::{AddressSource, DnsAggregator, HickorySource};
use crate::probe::Prober;
use crate::rank::{select, RankedEndpoint};
use crate::utils::{format_duration, measure_time, NetworkError, Result};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DomainStatus {
    Success,
    NoAddressesFound,
    NoneReachable,
    Error,
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DomainStatus::Success => "success",
            DomainStatus::NoAddressesFound => "no addresses found",
            DomainStatus::NoneReachable => "none reachable",
            DomainStatus::Error => "error",
        };
        f.write_str(label)
    }
}

#[must_use]
#[derive(Debug)]
pub struct DomainRunResult {
    pub domain: String,
    pub status: DomainStatus,
    pub selected: Vec<RankedEndpoint>,
    /// Distinct addresses returned by the resolvers.
    pub candidates: usize,
    /// Addresses that failed the TCP connect, kept for diagnostics.
    pub unreachable: Vec<Ipv4Addr>,
    pub duration: Duration,
    pub error: Option<NetworkError>,
}

impl DomainRunResult {
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            status: DomainStatus::NoAddressesFound,
            selected: Vec::new(),
            candidates: 0,
            unreachable: Vec::new(),
            duration: Duration::ZERO,
            error: None,
        }
    }

    fn completed(mut self, duration: Duration, cycle: DomainCycle) -> Self {
        self.status = if cycle.candidates == 0 {
            DomainStatus::NoAddressesFound
        } else if cycle.selected.is_empty() {
            DomainStatus::NoneReachable
        } else {
            DomainStatus::Success
        };
        self.selected = cycle.selected;
        self.candidates = cycle.candidates;
        self.unreachable = cycle.unreachable;
        self.duration = duration;
        self
    }

    fn failure(mut self, duration: Duration, error: NetworkError) -> Self {
        self.status = DomainStatus::Error;
        self.duration = duration;
        self.error = Some(error);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == DomainStatus::Success
    }
}

struct DomainCycle {
    selected: Vec<RankedEndpoint>,
    candidates: usize,
    unreachable: Vec<Ipv4Addr>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// One entry per processed domain, in domain-list order.
    pub results: Vec<DomainRunResult>,
    /// Set when an interrupt stopped the batch before the list was exhausted.
    pub interrupted: bool,
}

impl RunReport {
    pub fn endpoints(&self) -> impl Iterator<Item = &RankedEndpoint> {
        self.results.iter().flat_map(|result| result.selected.iter())
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.succeeded() == 0
    }
}

/// Cooperative stop signal. Once triggered no new domain is started; work
/// already in flight finishes under its own timeouts.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Trigger, returning whether the flag was already set. A caller watching
    /// for repeated signals uses this to escalate to an immediate exit.
    pub fn trigger_repeated(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Pipeline<S> {
    aggregator: DnsAggregator<S>,
    prober: Prober,
    max_per_domain: usize,
    interrupt: Interrupt,
}

impl Pipeline<HickorySource> {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let source = HickorySource::new(config.query_timeout);
        let aggregator = DnsAggregator::new(source, config.resolvers.clone())
            .with_lifetime(config.lifetime)
            .with_workers(config.workers);
        let prober = Prober::new()?
            .with_port(config.port)
            .with_connect_timeout(config.connect_timeout)
            .with_handshake_timeout(config.handshake_timeout)
            .with_workers(config.workers);

        Ok(Pipeline::new(aggregator, prober).with_max_per_domain(config.max_per_domain))
    }
}

impl<S: AddressSource> Pipeline<S> {
    pub fn new(aggregator: DnsAggregator<S>, prober: Prober) -> Self {
        Self {
            aggregator,
            prober,
            max_per_domain: crate::config::DEFAULT_MAX_PER_DOMAIN,
            interrupt: Interrupt::default(),
        }
    }

    pub fn with_max_per_domain(mut self, max: usize) -> Self {
        self.max_per_domain = max;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn aggregator(&self) -> &DnsAggregator<S> {
        &self.aggregator
    }

    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    pub async fn run_domain(&self, domain: &str) -> DomainRunResult {
        let (duration, cycle) = measure_time(|| self.cycle(domain)).await;
        let result = DomainRunResult::new(domain.to_string());

        match cycle {
            Ok(cycle) => {
                let result = result.completed(duration, cycle);
                match result.status {
                    DomainStatus::Success => {
                        let picked: Vec<String> =
                            result.selected.iter().map(|e| e.address.to_string()).collect();
                        log::info!(
                            "{}: selected {} of {} addresses in {}: {}",
                            domain,
                            picked.len(),
                            result.candidates,
                            format_duration(duration),
                            picked.join(", ")
                        );
                    }
                    status => log::warn!("{}: {}", domain, status),
                }
                result
            }
            Err(error) => {
                log::warn!("{}: {}", domain, error);
                result.failure(duration, error)
            }
        }
    }

    async fn cycle(&self, domain: &str) -> Result<DomainCycle> {
        let observations = self.aggregator.resolve(domain).await?;
        if observations.is_empty() {
            return Ok(DomainCycle {
                selected: Vec::new(),
                candidates: 0,
                unreachable: Vec::new(),
            });
        }

        let addresses: Vec<Ipv4Addr> = observations.keys().copied().collect();
        let outcomes = self.prober.probe_all(&addresses, domain).await?;
        let unreachable = outcomes
            .iter()
            .filter(|outcome| !outcome.reachable())
            .map(|outcome| outcome.address())
            .collect();

        Ok(DomainCycle {
            selected: select(domain, &outcomes, &observations, self.max_per_domain),
            candidates: addresses.len(),
            unreachable,
        })
    }

    /// Process `domains` in order, calling `on_result` after each one.
    pub async fn run<F>(&self, domains: &[String], mut on_result: F) -> RunReport
    where
        F: FnMut(&DomainRunResult),
    {
        let mut report = RunReport::default();

        for domain in domains {
            if self.interrupt.is_triggered() {
                log::warn!(
                    "Interrupted, skipping {} remaining domains",
                    domains.len() - report.results.len()
                );
                report.interrupted = true;
                break;
            }

            let result = self.run_domain(domain).await;
            on_result(&result);
            report.results.push(result);
        }

        report
    }
}
