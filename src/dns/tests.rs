use super::*;
use std::collections::HashMap;

/// Canned answers keyed by resolver name; unknown resolvers time out.
struct StaticSource {
    answers: HashMap<String, LookupOutcome>,
    delay: Duration,
}

impl StaticSource {
    fn new(answers: &[(&str, LookupOutcome)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(name, outcome)| (name.to_string(), outcome.clone()))
                .collect(),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl AddressSource for StaticSource {
    async fn lookup_ipv4(&self, resolver: &ResolverEntry, _domain: &str) -> LookupOutcome {
        tokio::time::sleep(self.delay).await;
        match self.answers.get(&resolver.name) {
            Some(outcome) => outcome.clone(),
            None => std::future::pending().await,
        }
    }
}

fn resolver(name: &str, last: u8) -> ResolverEntry {
    ResolverEntry::new(name, Ipv4Addr::new(10, 0, 0, last))
}

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn names(observation: &AddressObservation) -> Vec<&str> {
    observation.sources.iter().map(String::as_str).collect()
}

#[tokio::test]
async fn test_overlapping_answers_are_attributed_to_every_resolver() {
    let source = StaticSource::new(&[
        ("X", LookupOutcome::Addresses(vec![ip("1.2.3.4")])),
        (
            "Y",
            LookupOutcome::Addresses(vec![ip("1.2.3.4"), ip("5.6.7.8")]),
        ),
    ]);
    let aggregator = DnsAggregator::new(source, vec![resolver("X", 1), resolver("Y", 2)]);

    let observations = aggregator.resolve("example.com").await.unwrap();

    assert_eq!(observations.len(), 2);
    assert_eq!(names(&observations[&ip("1.2.3.4")]), vec!["X", "Y"]);
    assert_eq!(names(&observations[&ip("5.6.7.8")]), vec!["Y"]);
}

#[tokio::test]
async fn test_failures_are_absorbed_and_counted() {
    let source = StaticSource::new(&[
        ("ok", LookupOutcome::Addresses(vec![ip("9.9.9.9")])),
        ("empty", LookupOutcome::NoAnswer),
        ("nx", LookupOutcome::NxDomain),
        ("broken", LookupOutcome::Failed("connection refused".to_string())),
    ]);
    let aggregator = DnsAggregator::new(
        source,
        vec![
            resolver("ok", 1),
            resolver("empty", 2),
            resolver("nx", 3),
            resolver("broken", 4),
            resolver("silent", 5),
        ],
    )
    .with_lifetime(Duration::from_millis(50));

    let (observations, stats) = aggregator.resolve_with_stats("example.com").await.unwrap();

    assert_eq!(observations.keys().copied().collect::<Vec<_>>(), vec![ip("9.9.9.9")]);
    assert_eq!(
        stats,
        LookupStats {
            answered: 1,
            empty: 1,
            nxdomain: 1,
            timed_out: 1,
            failed: 1,
        }
    );
}

#[tokio::test]
async fn test_no_answers_yields_empty_map() {
    let source = StaticSource::new(&[
        ("a", LookupOutcome::NxDomain),
        ("b", LookupOutcome::Addresses(Vec::new())),
    ]);
    let aggregator = DnsAggregator::new(source, vec![resolver("a", 1), resolver("b", 2)]);

    let observations = aggregator.resolve("nothing.example").await.unwrap();
    assert!(observations.is_empty());
}

#[tokio::test]
async fn test_hanging_resolver_is_cut_off_by_lifetime() {
    let source = StaticSource::new(&[("fast", LookupOutcome::Addresses(vec![ip("1.1.1.1")]))]);
    let aggregator = DnsAggregator::new(source, vec![resolver("fast", 1), resolver("slow", 2)])
        .with_lifetime(Duration::from_millis(100));

    let started = std::time::Instant::now();
    let observations = aggregator.resolve("example.com").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(observations.len(), 1);
}

#[tokio::test]
async fn test_worker_limit_serializes_lookups() {
    let mut source = StaticSource::new(&[
        ("a", LookupOutcome::Addresses(vec![ip("1.0.0.1")])),
        ("b", LookupOutcome::Addresses(vec![ip("1.0.0.2")])),
    ]);
    source.delay = Duration::from_millis(100);
    let aggregator = DnsAggregator::new(source, vec![resolver("a", 1), resolver("b", 2)])
        .with_workers(1)
        .with_lifetime(Duration::from_secs(5));

    let started = std::time::Instant::now();
    let observations = aggregator.resolve("example.com").await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(190));
    assert_eq!(observations.len(), 2);
}

#[tokio::test]
async fn test_invalid_domain_is_rejected() {
    let aggregator = DnsAggregator::new(StaticSource::new(&[]), vec![resolver("a", 1)]);
    assert!(matches!(
        aggregator.resolve("bad domain.com").await,
        Err(NetworkError::InvalidDomain(_))
    ));
    assert!(matches!(
        aggregator.resolve("").await,
        Err(NetworkError::InvalidDomain(_))
    ));
}

#[test]
fn test_merge_is_idempotent() {
    let mut observations = AddressMap::new();
    merge_addresses(&mut observations, "X", &[ip("1.2.3.4")]);
    merge_addresses(&mut observations, "X", &[ip("1.2.3.4"), ip("1.2.3.4")]);

    assert_eq!(observations.len(), 1);
    assert_eq!(names(&observations[&ip("1.2.3.4")]), vec!["X"]);
}
