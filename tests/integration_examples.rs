//! Examples of driving the `fasthosts` library directly.
//!
//! The tests marked `#[ignore]` talk to public DNS servers and real hosts;
//! run them with `cargo test --test integration_examples -- --ignored`.

use fasthosts::*;
use std::net::Ipv4Addr;
use std::time::Duration;

#[tokio::test]
#[ignore = "needs internet access"]
async fn example_resolve_through_public_resolvers() {
    // Example: ask a couple of well-known resolvers directly
    let resolvers = vec![
        ResolverEntry::new("Google", Ipv4Addr::new(8, 8, 8, 8)),
        ResolverEntry::new("Cloudflare", Ipv4Addr::new(1, 1, 1, 1)),
    ];
    let aggregator = DnsAggregator::new(HickorySource::new(Duration::from_secs(3)), resolvers)
        .with_lifetime(Duration::from_secs(3));

    let (observations, stats) = aggregator.resolve_with_stats("github.com").await.unwrap();

    assert!(stats.answered > 0, "at least one resolver should answer");
    assert!(!observations.is_empty());
    assert!(observations.values().all(|o| !o.sources.is_empty()));
}

#[tokio::test]
#[ignore = "needs internet access"]
async fn example_full_pipeline_from_config() {
    // Example: the same pipeline the `run` command uses
    let config = Config::default()
        .with_resolvers(vec![ResolverEntry::new("Quad9", Ipv4Addr::new(9, 9, 9, 9))])
        .with_lifetime(Duration::from_secs(3))
        .with_max_per_domain(2);
    let pipeline = Pipeline::from_config(&config).unwrap();

    let report = pipeline
        .run(&["github.com".to_string()], |result| {
            println!("{}: {}", result.domain, result.status);
        })
        .await;

    let result = &report.results[0];
    assert_eq!(result.status, DomainStatus::Success, "{:?}", result.error);
    assert!(result.selected.len() <= 2);
    assert!(result.selected[0].secure_verified);
}

#[tokio::test]
async fn example_silent_resolver_is_absorbed() {
    // Example: a resolver nobody answers for is absorbed, not raised
    let resolvers = vec![ResolverEntry::new("TEST-NET", Ipv4Addr::new(192, 0, 2, 53))];
    let aggregator = DnsAggregator::new(HickorySource::new(Duration::from_millis(200)), resolvers)
        .with_lifetime(Duration::from_millis(300));

    let observations = aggregator.resolve("github.com").await.unwrap();

    assert!(observations.is_empty());
}

#[test]
fn example_rank_probe_outcomes() {
    // Example: ranking puts TLS-verified addresses first, then sorts by latency
    let outcomes = vec![
        ProbeOutcome::verified(Ipv4Addr::new(1, 0, 0, 1), Duration::from_millis(100)),
        ProbeOutcome::tcp_only(Ipv4Addr::new(1, 0, 0, 2), Duration::from_millis(10)),
        ProbeOutcome::verified(Ipv4Addr::new(1, 0, 0, 3), Duration::from_millis(50)),
        ProbeOutcome::unreachable(Ipv4Addr::new(1, 0, 0, 4), Duration::from_secs(3)),
    ];

    let ranked = rank(&outcomes, 2);

    let picked: Vec<(Ipv4Addr, f64)> = ranked
        .iter()
        .map(|o| (o.address(), o.latency_millis()))
        .collect();
    assert_eq!(
        picked,
        vec![
            (Ipv4Addr::new(1, 0, 0, 3), 50.0),
            (Ipv4Addr::new(1, 0, 0, 1), 100.0)
        ]
    );
}

#[test]
fn example_domain_list_parsing() {
    // Example: comments, blanks and malformed lines are skipped
    let domains = parse_domains("# hosts to pin\ngithub.com\n\nnot-a-domain\napi.github.com\n");
    assert_eq!(domains, vec!["github.com", "api.github.com"]);
}
