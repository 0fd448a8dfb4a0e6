//! flora-pac: generate a PAC file from the registry feed and a config file.

use clap::Parser;
use florapac::{Feed, FileFeed, PacConfig, PacGenerator, RegistryFeed, UserConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flora-pac")]
#[command(version)]
#[command(about = "Generate a proxy auto-config file from classified IP ranges", long_about = None)]
struct Cli {
    /// Path to a json/yaml config file; defaults to pac-config.json in the current dir
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PAC path, overrides the "file" option of the config file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Proxy directive, e.g. "SOCKS5 127.0.0.1:7070; SOCKS 127.0.0.1:7070"
    #[arg(short = 'x', long)]
    proxy: Option<String>,

    /// Internal proxy for in-country traffic; DIRECT when unset
    #[arg(short, long)]
    internal_proxy: Option<String>,

    /// Read the registry feed from this file instead of the cache or network
    #[arg(long)]
    feed_file: Option<PathBuf>,

    /// Log every range of the normalized partition
    #[arg(long)]
    dump_ips: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(cli.verbose || config.debug);

    if let Err(e) = run(config, cli.feed_file) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(cli: &Cli) -> florapac::Result<PacConfig> {
    let cwd = std::env::current_dir()?;
    let mut user = UserConfig::load(cli.config.as_deref(), &cwd)?;

    if cli.file.is_some() {
        user.file = cli.file.clone();
    }
    if cli.proxy.is_some() {
        user.proxy = cli.proxy.clone();
    }
    if cli.internal_proxy.is_some() {
        user.internal_proxy = cli.internal_proxy.clone();
    }
    if cli.dump_ips {
        user.dump_ips = Some(true);
    }

    Ok(PacConfig::default().layer(user))
}

fn run(config: PacConfig, feed_file: Option<PathBuf>) -> florapac::Result<()> {
    let feed: Box<dyn Feed> = match feed_file {
        Some(path) => Box::new(FileFeed::new(path)),
        None => Box::new(RegistryFeed::from_config(&config)),
    };

    let generator = PacGenerator::new(config)?;
    generator.write(feed.as_ref())?;
    Ok(())
}
