use chrono::Local;
use clap::Parser;
use colored::*;
use fasthosts::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {}", "error:".red().bold(), error);
            2
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

async fn dispatch(cli: cli::Cli) -> Result<i32> {
    let json = cli.json;
    match cli.command {
        cli::Commands::Run {
            domains,
            output,
            data_dir,
            no_snapshot,
            readme,
            readme_marker,
            title,
            keep_days,
            settings,
        } => {
            let outputs = HostsOutputs {
                output,
                data_dir,
                snapshot: !no_snapshot,
                readme,
                readme_marker,
                title,
                keep_days,
            };
            handle_run(domains, &settings, outputs, json).await
        }
        cli::Commands::Resolve { domain, settings } => {
            handle_resolve(&domain, &settings, json).await
        }
        cli::Commands::Probe { domain, settings } => handle_probe(&domain, &settings, json).await,
        cli::Commands::Resolvers { resolvers } => {
            let resolvers = cli::resolver_set(resolvers.as_ref())?;
            print_resolvers(&resolvers, json)?;
            Ok(0)
        }
        cli::Commands::Clean {
            data_dir,
            keep_days,
        } => {
            let removed = clean_history(&data_dir, Local::now().date_naive(), keep_days)?;
            println!(
                "Removed {} snapshot(s) from {}",
                removed.len().to_string().bold(),
                data_dir.display()
            );
            Ok(0)
        }
    }
}

fn watch_for_interrupt(interrupt: Interrupt) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt.trigger_repeated() {
                eprintln!("{}", "Interrupted again: exiting now".red());
                std::process::exit(130);
            }
            eprintln!(
                "{}",
                "Interrupted: finishing the current domain, then stopping (Ctrl-C again to quit)"
                    .yellow()
            );
        }
    });
}

async fn handle_run(
    domains_file: PathBuf,
    settings: &cli::Settings,
    outputs: HostsOutputs,
    json: bool,
) -> Result<i32> {
    let config = settings.to_config()?;
    let domains = load_domains(&domains_file)?;
    if domains.is_empty() {
        eprintln!(
            "{}",
            format!("No domains found in {}", domains_file.display()).red()
        );
        return Ok(1);
    }

    let pipeline = Pipeline::from_config(&config)?;
    watch_for_interrupt(pipeline.interrupt());

    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(domains.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .map_err(|e| NetworkError::Other(e.to_string()))?
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );

    let report = pipeline
        .run(&domains, |result| {
            pb.set_message(result.domain.clone());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    if json {
        print_report_json(&report)?;
    } else {
        print_report_human(&report);
    }

    let errors = outputs.publish(&report, Local::now().naive_local());
    for error in &errors {
        eprintln!("{} {}", "output error:".red().bold(), error);
    }

    Ok(if !errors.is_empty() {
        2
    } else if report.all_failed() {
        1
    } else {
        0
    })
}

async fn handle_resolve(domain: &str, settings: &cli::Settings, json: bool) -> Result<i32> {
    let config = settings.to_config()?;
    let pipeline = Pipeline::from_config(&config)?;
    let (observations, stats) = pipeline.aggregator().resolve_with_stats(domain).await?;

    if json {
        #[derive(serde::Serialize)]
        struct JsonObservation<'a> {
            address: Ipv4Addr,
            sources: Vec<&'a str>,
        }

        let rows: Vec<JsonObservation> = observations
            .values()
            .map(|o| JsonObservation {
                address: o.address,
                sources: o.sources.iter().map(String::as_str).collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!(
            "{} {} ({} of {} resolvers answered)",
            "Addresses for".bold(),
            domain.bold().blue(),
            stats.answered.to_string().green(),
            stats.total()
        );
        for observation in observations.values() {
            let sources: Vec<&str> = observation.sources.iter().map(String::as_str).collect();
            println!(
                "  {:<16} {}",
                observation.address.to_string().cyan(),
                sources.join(", ")
            );
        }
    }

    Ok(if observations.is_empty() { 1 } else { 0 })
}

async fn handle_probe(domain: &str, settings: &cli::Settings, json: bool) -> Result<i32> {
    let config = settings.to_config()?;
    let pipeline = Pipeline::from_config(&config)?;
    let observations = pipeline.aggregator().resolve(domain).await?;
    let addresses: Vec<Ipv4Addr> = observations.keys().copied().collect();
    let mut outcomes = pipeline.prober().probe_all(&addresses, domain).await?;
    let selected: Vec<Ipv4Addr> = rank(&outcomes, config.max_per_domain)
        .iter()
        .map(ProbeOutcome::address)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(if selected.is_empty() { 1 } else { 0 });
    }

    // Unreachable last, then by latency, so the list reads top-down.
    outcomes.sort_by_key(|o| (!o.reachable(), !o.secure_verified(), o.latency()));
    println!(
        "{} {} on port {}",
        "Probing".bold(),
        domain.bold().blue(),
        config.port
    );
    for outcome in &outcomes {
        let tier = match (outcome.reachable(), outcome.secure_verified()) {
            (true, true) => "TLS ".green().bold(),
            (true, false) => "TCP ".yellow().bold(),
            _ => "DOWN".red().bold(),
        };
        let marker = if selected.contains(&outcome.address()) {
            "*"
        } else {
            " "
        };
        let latency = if outcome.reachable() {
            format_duration(outcome.latency())
        } else {
            "-".to_string()
        };
        println!(
            "{} {} {:<16} {}",
            marker,
            tier,
            outcome.address().to_string(),
            latency.cyan()
        );
    }

    Ok(if selected.is_empty() { 1 } else { 0 })
}

fn print_resolvers(resolvers: &[ResolverEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resolvers)?);
        return Ok(());
    }
    for resolver in resolvers {
        println!("  {:<16} {}", resolver.address.to_string().cyan(), resolver.name);
    }
    println!("{} resolvers", resolvers.len().to_string().bold());
    Ok(())
}

fn print_report_human(report: &RunReport) {
    println!("\n{}", "=".repeat(80).blue());
    println!("{}", "Endpoint Selection Results".bold().blue());
    println!("{}", "=".repeat(80).blue());

    for result in &report.results {
        let status = match result.status {
            DomainStatus::Success => "PASS".green().bold(),
            DomainStatus::NoAddressesFound | DomainStatus::NoneReachable => {
                "MISS".yellow().bold()
            }
            DomainStatus::Error => "FAIL".red().bold(),
        };
        println!(
            "{} {} ({})",
            status,
            result.domain,
            format_duration(result.duration).cyan()
        );

        match result.status {
            DomainStatus::Success => {
                for endpoint in &result.selected {
                    let tier = if endpoint.secure_verified { "TLS" } else { "TCP" };
                    let sources: Vec<&str> =
                        endpoint.sources.iter().map(String::as_str).collect();
                    println!(
                        "  ✓ {:<16} {:>8} {} ({})",
                        endpoint.address.to_string().green(),
                        format_duration(endpoint.latency),
                        tier,
                        sources.join(", ")
                    );
                }
            }
            DomainStatus::Error => {
                if let Some(ref error) = result.error {
                    println!("  ✗ {}", error.to_string().red());
                }
            }
            status => {
                println!(
                    "  ✗ {} ({} candidates, {} unreachable)",
                    status.to_string().yellow(),
                    result.candidates,
                    result.unreachable.len()
                );
            }
        }
    }

    println!("{}", "-".repeat(80).blue());
    println!(
        "Summary: {} selected, {} of {} domains resolved",
        report.endpoints().count().to_string().green().bold(),
        report.succeeded().to_string().green().bold(),
        report.results.len().to_string().blue().bold()
    );
    if report.interrupted {
        println!("{}", "Run was interrupted before all domains finished".yellow());
    }
}

fn print_report_json(report: &RunReport) -> Result<()> {
    #[derive(serde::Serialize)]
    struct JsonDomain<'a> {
        domain: &'a str,
        status: DomainStatus,
        duration_ms: u128,
        candidates: usize,
        selected: &'a [RankedEndpoint],
        unreachable: &'a [Ipv4Addr],
        error: Option<String>,
    }

    #[derive(serde::Serialize)]
    struct JsonReport<'a> {
        interrupted: bool,
        domains: Vec<JsonDomain<'a>>,
    }

    let json = JsonReport {
        interrupted: report.interrupted,
        domains: report
            .results
            .iter()
            .map(|r| JsonDomain {
                domain: &r.domain,
                status: r.status,
                duration_ms: r.duration.as_millis(),
                candidates: r.candidates,
                selected: &r.selected,
                unreachable: &r.unreachable,
                error: r.error.as_ref().map(|e| e.to_string()),
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
