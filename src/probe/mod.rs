use crate::utils::{duration_millis, format_duration, NetworkError, Result};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

pub mod tls;

/// Outcome of probing one address.
///
/// An unreachable outcome carries the connect timeout as its latency. That
/// value is a penalty, not a measurement; check [`ProbeOutcome::reachable`]
/// before reading [`ProbeOutcome::latency`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    address: Ipv4Addr,
    reachable: bool,
    secure_verified: bool,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    latency: Duration,
}

impl ProbeOutcome {
    pub fn unreachable(address: Ipv4Addr, penalty: Duration) -> Self {
        Self {
            address,
            reachable: false,
            secure_verified: false,
            latency: penalty,
        }
    }

    pub fn tcp_only(address: Ipv4Addr, latency: Duration) -> Self {
        Self {
            address,
            reachable: true,
            secure_verified: false,
            latency,
        }
    }

    pub fn verified(address: Ipv4Addr, latency: Duration) -> Self {
        Self {
            address,
            reachable: true,
            secure_verified: true,
            latency,
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn reachable(&self) -> bool {
        self.reachable
    }

    pub fn secure_verified(&self) -> bool {
        self.secure_verified
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn latency_millis(&self) -> f64 {
        duration_millis(self.latency)
    }
}

pub(crate) fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration_millis(*duration))
}

#[derive(Clone)]
pub struct Prober {
    pub port: u16,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub workers: usize,
    connector: TlsConnector,
}

impl Prober {
    pub fn new() -> Result<Self> {
        Ok(Self {
            port: crate::config::DEFAULT_PORT,
            connect_timeout: Duration::from_secs(3),
            handshake_timeout: Duration::from_secs(3),
            workers: crate::config::DEFAULT_WORKERS,
            connector: tls::probe_connector()?,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
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
        self.workers = workers.max(1);
        self
    }

    /// Probe every address concurrently. Outcomes come back in input order.
    pub async fn probe_all(&self, addresses: &[Ipv4Addr], domain: &str) -> Result<Vec<ProbeOutcome>> {
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, &address) in addresses.iter().enumerate() {
            let permits = Arc::clone(&permits);
            let prober = self.clone();
            let domain = domain.to_string();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (index, prober.probe(address, &domain).await)
            });
        }

        let mut outcomes = vec![None; addresses.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) =
                joined.map_err(|e| NetworkError::Worker(format!("probe task: {e}")))?;
            outcomes[index] = Some(outcome);
        }

        Ok(outcomes.into_iter().flatten().collect())
    }

    /// TCP connect, then an opportunistic TLS handshake using `domain` as SNI.
    ///
    /// Latency covers the handshake when it succeeds and only the TCP connect
    /// otherwise. The socket is closed when this returns, on every path.
    pub async fn probe(&self, address: Ipv4Addr, domain: &str) -> ProbeOutcome {
        let target = SocketAddr::new(IpAddr::V4(address), self.port);
        let start = Instant::now();

        let stream = match self.connect(target).await {
            Ok(stream) => stream,
            Err(e) => {
                log::debug!("{} {}: {}", domain, target, e);
                return ProbeOutcome::unreachable(address, self.connect_timeout);
            }
        };
        let tcp_latency = start.elapsed();

        match self.handshake(stream, domain, start).await {
            Ok(latency) => {
                log::debug!(
                    "{} {}: TLS ok in {}",
                    domain,
                    target,
                    format_duration(latency)
                );
                ProbeOutcome::verified(address, latency)
            }
            Err(e) => {
                log::debug!(
                    "{} {}: TCP ok in {}, {}",
                    domain,
                    target,
                    format_duration(tcp_latency),
                    e
                );
                ProbeOutcome::tcp_only(address, tcp_latency)
            }
        }
    }

    async fn connect(&self, target: SocketAddr) -> Result<TcpStream> {
        timeout(self.connect_timeout, TcpStream::connect(target))
            .await
            .map_err(|_| NetworkError::Timeout(self.connect_timeout))?
            .map_err(|e| NetworkError::Connect(e.to_string()))
    }

    /// Returns the time elapsed since `start` once the handshake completes.
    /// `stream` is consumed and dropped either way.
    async fn handshake(&self, stream: TcpStream, domain: &str, start: Instant) -> Result<Duration> {
        let name = tls::server_name(domain)?;

        let mut tls_stream = timeout(self.handshake_timeout, self.connector.connect(name, stream))
            .await
            .map_err(|_| NetworkError::Timeout(self.handshake_timeout))?
            .map_err(|e| NetworkError::Handshake(e.to_string()))?;
        let elapsed = start.elapsed();

        // Best-effort close_notify; errors here do not affect the outcome.
        let _ = timeout(self.handshake_timeout, tls_stream.shutdown()).await;

        Ok(elapsed)
    }
}
