use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Timed out after {}", format_duration(.0.clone()))]
    Timeout(Duration),
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
    #[error("Worker task failed: {0}")]
    Worker(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NetworkError>;

pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", duration.as_secs_f32())
    }
}

/// Milliseconds as a float, the unit latencies are reported in.
pub fn duration_millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

pub async fn measure_time<F, Fut, T>(f: F) -> (Duration, T)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f().await;
    let duration = start.elapsed();
    (duration, result)
}

mod tests;
