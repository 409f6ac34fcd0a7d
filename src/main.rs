use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod coordinator;
mod domain_resolver;
mod errors;
mod output;
mod scanner;

use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_OUTPUT, DEFAULT_PORT, DEFAULT_WORKERS, RunConfig};
use domain_resolver::DnsResolver;
use output::{ConsoleStatus, OutputFormat};
use scanner::{BannerProber, ProbeConfig};

#[derive(Parser, Debug)]
#[command(name = "domain_banner")]
#[command(about = "Retrieve CNAME, IP address, and banners for a list of domains.")]
#[command(version = "1.0")]
struct Args {
    /// File containing the list of domains, one per line
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Number of domains resolved in parallel
    #[arg(short = 't', long, default_value_t = DEFAULT_WORKERS)]
    threads: usize,

    /// Output file to save results
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Port the banner request is sent to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect and read timeout for banner grabbing, in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT)]
    timeout: u64,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase diagnostic logging on stderr (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl From<&Args> for RunConfig {
    fn from(args: &Args) -> Self {
        let mut config = RunConfig::new(&args.file, &args.output)
            .with_workers(args.threads)
            .with_format(args.format);
        config.port = args.port;
        config.connect_timeout = Duration::from_secs(args.timeout);
        config
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("domain_banner={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = RunConfig::from(&args);
    let resolver = Arc::new(DnsResolver::from_system_conf());
    let prober = Arc::new(BannerProber::new(ProbeConfig {
        port: config.port,
        timeout: config.connect_timeout,
        ..ProbeConfig::default()
    }));

    // Failures are already on the status stream; the exit status stays 0.
    let _ = coordinator::run(&config, resolver, prober, Box::new(ConsoleStatus)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["domain_banner", "-f", "domains.txt"]).unwrap();
        let config = RunConfig::from(&args);

        assert_eq!(config.domain_file, PathBuf::from("domains.txt"));
        assert_eq!(config.output, PathBuf::from("output.txt"));
        assert_eq!(config.workers, 10);
        assert_eq!(config.port, 80);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn test_file_is_required() {
        assert!(Args::try_parse_from(["domain_banner", "-t", "4"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "domain_banner",
            "--file",
            "list.txt",
            "--threads",
            "3",
            "--output",
            "report.jsonl",
            "--port",
            "8080",
            "--timeout",
            "2",
            "--format",
            "json",
        ])
        .unwrap();
        let config = RunConfig::from(&args);

        assert_eq!(config.pool_size(), 3);
        assert_eq!(config.port, 8080);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.output, PathBuf::from("report.jsonl"));
    }
}
