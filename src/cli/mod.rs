use crate::config::{self, Config};
use crate::utils::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fasthosts")]
#[command(about = "Pick the fastest reachable addresses for a list of domains and write them as a hosts file")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Resolve, probe and rank every domain, then write the hosts file")]
    Run {
        #[arg(short, long, default_value = "conf/domains.txt")]
        domains: PathBuf,
        #[arg(short, long, default_value = "hosts.txt")]
        output: PathBuf,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        #[arg(long)]
        no_snapshot: bool,
        #[arg(long)]
        readme: Option<PathBuf>,
        #[arg(long, default_value = crate::hosts::DEFAULT_README_MARKER)]
        readme_marker: String,
        #[arg(long, default_value = crate::hosts::DEFAULT_TITLE)]
        title: String,
        #[arg(
            long,
            default_value_t = crate::hosts::DEFAULT_RETENTION_DAYS,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        keep_days: u32,
        #[command(flatten)]
        settings: Settings,
    },
    #[command(about = "Query every resolver for one domain and show who returned what")]
    Resolve {
        domain: String,
        #[command(flatten)]
        settings: Settings,
    },
    #[command(about = "Resolve and probe one domain, showing every outcome")]
    Probe {
        domain: String,
        #[command(flatten)]
        settings: Settings,
    },
    #[command(about = "List the configured resolvers")]
    Resolvers {
        #[arg(short, long)]
        resolvers: Option<PathBuf>,
    },
    #[command(about = "Delete dated snapshots older than the retention window")]
    Clean {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        #[arg(
            long,
            default_value_t = crate::hosts::DEFAULT_RETENTION_DAYS,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        keep_days: u32,
    },
}

/// Tuning shared by every command that touches the network.
#[derive(Args, Clone)]
pub struct Settings {
    /// JSON file with `[{"name": ..., "address": ...}]` resolver entries
    #[arg(short, long)]
    pub resolvers: Option<PathBuf>,
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    pub port: u16,
    /// Per-query DNS timeout in milliseconds
    #[arg(long, default_value = "3000")]
    pub query_timeout: u64,
    /// Overall cutoff for one resolver lookup in milliseconds
    #[arg(long, default_value = "500")]
    pub lifetime: u64,
    /// TCP connect timeout in milliseconds
    #[arg(long, default_value = "3000")]
    pub connect_timeout: u64,
    /// TLS handshake timeout in milliseconds
    #[arg(long, default_value = "3000")]
    pub handshake_timeout: u64,
    #[arg(short, long, default_value_t = config::DEFAULT_WORKERS)]
    pub workers: usize,
    #[arg(short, long, default_value_t = config::DEFAULT_MAX_PER_DOMAIN)]
    pub max: usize,
}

impl Settings {
    pub fn to_config(&self) -> Result<Config> {
        let resolvers = resolver_set(self.resolvers.as_ref())?;
        let config = Config::default()
            .with_resolvers(resolvers)
            .with_port(self.port)
            .with_query_timeout(Duration::from_millis(self.query_timeout))
            .with_lifetime(Duration::from_millis(self.lifetime))
            .with_connect_timeout(Duration::from_millis(self.connect_timeout))
            .with_handshake_timeout(Duration::from_millis(self.handshake_timeout))
            .with_workers(self.workers)
            .with_max_per_domain(self.max);
        config.validate()?;
        Ok(config)
    }
}

pub fn resolver_set(path: Option<&PathBuf>) -> Result<Vec<config::ResolverEntry>> {
    match path {
        Some(path) => config::load_resolvers(path),
        None => Ok(config::default_resolvers()),
    }
}
