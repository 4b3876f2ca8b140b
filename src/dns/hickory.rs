use super::{AddressSource, LookupOutcome};
use crate::config::ResolverEntry;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::{Name, TokioAsyncResolver};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Queries each resolver over UDP port 53 with a dedicated, cache-less
/// hickory resolver.
#[derive(Debug, Clone)]
pub struct HickorySource {
    pub query_timeout: Duration,
    pub attempts: usize,
}

impl Default for HickorySource {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(3),
            attempts: 1,
        }
    }
}

impl HickorySource {
    pub fn new(query_timeout: Duration) -> Self {
        Self {
            query_timeout,
            ..Self::default()
        }
    }

    fn resolver_for(&self, server: &ResolverEntry) -> TokioAsyncResolver {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(
            SocketAddr::new(IpAddr::V4(server.address), 53),
            Protocol::Udp,
        ));

        let mut opts = ResolverOpts::default();
        opts.ndots = 0;
        opts.timeout = self.query_timeout;
        opts.attempts = self.attempts;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        TokioAsyncResolver::tokio(config, opts)
    }
}

#[async_trait]
impl AddressSource for HickorySource {
    async fn lookup_ipv4(&self, resolver: &ResolverEntry, domain: &str) -> LookupOutcome {
        let name = match Name::from_ascii(domain) {
            Ok(name) => name,
            Err(e) => return LookupOutcome::Failed(format!("invalid domain: {e}")),
        };

        match self.resolver_for(resolver).ipv4_lookup(name).await {
            Ok(lookup) => {
                let addresses: Vec<_> = lookup.iter().map(|a| **a).collect();
                if addresses.is_empty() {
                    LookupOutcome::NoAnswer
                } else {
                    LookupOutcome::Addresses(addresses)
                }
            }
            Err(e) => classify_error(&e),
        }
    }
}

fn classify_error(error: &ResolveError) -> LookupOutcome {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                LookupOutcome::NxDomain
            } else {
                LookupOutcome::NoAnswer
            }
        }
        ResolveErrorKind::Timeout => LookupOutcome::Timeout,
        _ => LookupOutcome::Failed(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_timeout() {
        let error = ResolveError::from(ResolveErrorKind::Timeout);
        assert_eq!(classify_error(&error), LookupOutcome::Timeout);
    }

    #[test]
    fn test_classify_other_errors_as_failed() {
        let error = ResolveError::from(ResolveErrorKind::Message("connection reset"));
        assert!(matches!(classify_error(&error), LookupOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_resolver_is_absorbed() {
        // TEST-NET-1 address, nothing answers DNS there.
        let resolver = ResolverEntry::new("blackhole", "192.0.2.1".parse().unwrap());
        let source = HickorySource::new(Duration::from_millis(200));
        let outcome = source.lookup_ipv4(&resolver, "example.com").await;
        assert!(!matches!(outcome, LookupOutcome::Addresses(ref ips) if !ips.is_empty()));
    }
}
