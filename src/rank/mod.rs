use crate::dns::AddressMap;
use crate::probe::{serialize_millis, ProbeOutcome};
use crate::utils::duration_millis;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Duration;

/// A selected address for a domain, in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEndpoint {
    pub address: Ipv4Addr,
    pub domain: String,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    pub secure_verified: bool,
    pub sources: BTreeSet<String>,
}

impl RankedEndpoint {
    pub fn latency_millis(&self) -> f64 {
        duration_millis(self.latency)
    }
}

/// Verified before unverified, then fastest first.
fn by_tier_then_latency(a: &ProbeOutcome, b: &ProbeOutcome) -> Ordering {
    b.secure_verified()
        .cmp(&a.secure_verified())
        .then_with(|| a.latency().cmp(&b.latency()))
}

/// Keep reachable outcomes, order them and cut to `max`. The sort is stable,
/// so equal measurements keep their input order.
pub fn rank(outcomes: &[ProbeOutcome], max: usize) -> Vec<ProbeOutcome> {
    let mut reachable: Vec<ProbeOutcome> = outcomes
        .iter()
        .filter(|outcome| outcome.reachable())
        .cloned()
        .collect();
    reachable.sort_by(by_tier_then_latency);
    reachable.truncate(max);
    reachable
}

/// [`rank`] and attach the domain and the resolvers that returned each address.
pub fn select(
    domain: &str,
    outcomes: &[ProbeOutcome],
    observations: &AddressMap,
    max: usize,
) -> Vec<RankedEndpoint> {
    rank(outcomes, max)
        .into_iter()
        .map(|outcome| RankedEndpoint {
            address: outcome.address(),
            domain: domain.to_string(),
            latency: outcome.latency(),
            secure_verified: outcome.secure_verified(),
            sources: observations
                .get(&outcome.address())
                .map(|observation| observation.sources.clone())
                .unwrap_or_default(),
        })
        .collect()
}
