use crate::utils::{format_duration, NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_MAX_PER_DOMAIN: usize = 3;
pub const DEFAULT_WORKERS: usize = 10;

/// A DNS server queried directly by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverEntry {
    pub name: String,
    pub address: Ipv4Addr,
}

impl ResolverEntry {
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub resolvers: Vec<ResolverEntry>,
    /// Per-query timeout handed to each resolver.
    pub query_timeout: Duration,
    /// Hard cutoff for one resolver lookup, including retries.
    pub lifetime: Duration,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub workers: usize,
    pub port: u16,
    pub max_per_domain: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolvers: default_resolvers(),
            query_timeout: Duration::from_secs(3),
            lifetime: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(3),
            handshake_timeout: Duration::from_secs(3),
            workers: DEFAULT_WORKERS,
            port: DEFAULT_PORT,
            max_per_domain: DEFAULT_MAX_PER_DOMAIN,
        }
    }
}

impl Config {
    pub fn with_resolvers(mut self, resolvers: Vec<ResolverEntry>) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_per_domain(mut self, max: usize) -> Self {
        self.max_per_domain = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolvers.is_empty() {
            return Err(NetworkError::Config("no resolvers configured".to_string()));
        }
        check_unique_names(&self.resolvers)?;
        if self.workers == 0 {
            return Err(NetworkError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.max_per_domain == 0 {
            return Err(NetworkError::Config(
                "max addresses per domain must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("query timeout", self.query_timeout),
            ("lifetime", self.lifetime),
            ("connect timeout", self.connect_timeout),
            ("handshake timeout", self.handshake_timeout),
        ] {
            if value.is_zero() {
                return Err(NetworkError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.lifetime > self.query_timeout {
            return Err(NetworkError::Config(format!(
                "lifetime ({}) must not exceed the query timeout ({})",
                format_duration(self.lifetime),
                format_duration(self.query_timeout)
            )));
        }
        Ok(())
    }
}

fn check_unique_names(resolvers: &[ResolverEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for resolver in resolvers {
        if !seen.insert(resolver.name.as_str()) {
            return Err(NetworkError::Config(format!(
                "duplicate resolver name: {}",
                resolver.name
            )));
        }
    }
    Ok(())
}

/// Parse a resolver set from JSON: `[{"name": "...", "address": "1.2.3.4"}, ...]`.
pub fn parse_resolvers(json: &str) -> Result<Vec<ResolverEntry>> {
    let resolvers: Vec<ResolverEntry> = serde_json::from_str(json)?;
    if resolvers.is_empty() {
        return Err(NetworkError::Config("resolver file is empty".to_string()));
    }
    check_unique_names(&resolvers)?;
    Ok(resolvers)
}

pub fn load_resolvers(path: &Path) -> Result<Vec<ResolverEntry>> {
    let json = std::fs::read_to_string(path)?;
    let resolvers = parse_resolvers(&json)?;
    log::info!(
        "Loaded {} resolvers from {}",
        resolvers.len(),
        path.display()
    );
    Ok(resolvers)
}

/// Public resolvers spread over East Asia plus a few global anycast services.
pub fn default_resolvers() -> Vec<ResolverEntry> {
    let servers: [(&str, [u8; 4]); 24] = [
        // Japan
        ("IIJ (Japan)", [203, 112, 2, 4]),
        ("NTT Communications (Japan)", [129, 250, 35, 250]),
        ("Softbank (Japan)", [202, 26, 220, 227]),
        ("Yahoo Japan", [182, 22, 24, 52]),
        ("Japan 01", [89, 233, 109, 82]),
        // Korea
        ("KT (Korea)", [168, 126, 63, 1]),
        ("KT (Korea)2", [168, 126, 63, 2]),
        ("LG (Korea)", [164, 124, 107, 9]),
        // Singapore
        ("Singtel (Singapore)", [165, 21, 100, 84]),
        ("Starhub (Singapore)", [202, 166, 200, 1]),
        // Hong Kong
        ("PCCW (Hong Kong)", [202, 45, 84, 58]),
        ("China 01", [210, 16, 67, 138]),
        // Taiwan
        ("Chunghwa (Taiwan)", [168, 95, 1, 1]),
        ("Chunghwa (Taiwan)2", [168, 95, 192, 1]),
        // Mainland China
        ("Alibaba (China)", [223, 5, 5, 5]),
        ("Alibaba (China)2", [223, 6, 6, 48]),
        ("Tencent (China)", [119, 29, 29, 29]),
        ("Baidu (China)", [180, 76, 76, 76]),
        ("114DNS", [114, 114, 114, 114]),
        // Global
        ("Google", [8, 8, 8, 8]),
        ("Google2", [8, 8, 4, 4]),
        ("Cloudflare", [1, 1, 1, 1]),
        ("Cloudflare2", [1, 0, 0, 1]),
        ("Quad9", [9, 9, 9, 9]),
    ];

    servers
        .iter()
        .map(|(name, octets)| ResolverEntry::new(*name, Ipv4Addr::from(*octets)))
        .collect()
}
