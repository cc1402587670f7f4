// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use latest_version::config::{PackageType, SourceListing};
use latest_version::{Config, HttpTransport, Resolver, VersionBound};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

/// Exit status when the registry has no version inside the requested range
const EXIT_NO_MATCH: u8 = 2;

#[derive(Parser)]
#[command(name = "latest-version")]
#[command(author, version, about = "Find the newest published version of a package", long_about = None)]
struct Cli {
    /// Registry kind: package-index (pypi), container-registry (oci, docker),
    /// rpm-repository (rpm) or source-host (github)
    ecosystem: String,

    /// Package name, image repository, or owner/repo
    identifier: String,

    /// Registry location overriding the configured or default one
    #[arg(short, long, value_name = "URL")]
    base_url: Option<String>,

    /// Only consider versions greater than or equal to this one
    #[arg(short = 'g', long, value_name = "VERSION")]
    greater_equal: Option<String>,

    /// Only consider versions strictly less than this one
    #[arg(short = 'l', long, value_name = "VERSION")]
    less_than: Option<String>,

    /// Configuration file (default: ~/.config/latest-version/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// List source host tags instead of releases
    #[arg(long, conflicts_with = "package_type")]
    tags: bool,

    /// List GitHub Packages versions of this type (container, docker, npm,
    /// maven, rubygems, nuget); the identifier is owner/package
    #[arg(long, value_name = "TYPE")]
    package_type: Option<PackageType>,

    /// RPM architecture to match besides noarch
    #[arg(long, value_name = "ARCH")]
    arch: Option<String>,

    /// RPM mirror list; the first mirror it names is used
    #[arg(long, value_name = "URL")]
    mirror_list: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_default().context("Failed to load default config")?,
    };

    if cli.tags {
        config.source_host.listing = SourceListing::Tags;
    }
    if let Some(package_type) = cli.package_type {
        config.source_host.listing = SourceListing::Packages;
        config.source_host.package_type = package_type;
    }
    if let Some(arch) = &cli.arch {
        config.rpm_repository.architecture = arch.clone();
    }
    if let Some(mirror_list) = &cli.mirror_list {
        config.rpm_repository.base_url = None;
        config.rpm_repository.mirror_list = Some(mirror_list.clone());
    }

    Ok(config.with_env_overrides())
}

fn run(cli: &Cli) -> Result<Option<String>> {
    let config = load_config(cli)?;
    debug!("Using configuration: {:?}", config.http);

    let transport = HttpTransport::new(&config.http).context("Failed to set up HTTP client")?;
    let resolver = Resolver::new(Arc::new(transport), &config);

    let bound = VersionBound::new(cli.greater_equal.as_deref(), cli.less_than.as_deref());
    let latest = resolver
        .resolve_latest_tag(&cli.ecosystem, &cli.identifier, cli.base_url.as_deref(), &bound)
        .with_context(|| format!("Failed to resolve latest version of {}", cli.identifier))?;

    Ok(latest)
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the version
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(Some(version)) => {
            println!("{}", version);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("No matching version of {} found", cli.identifier);
            ExitCode::from(EXIT_NO_MATCH)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
