mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use vidmirror::{config, lock, sync};
use vidmirror_av::{EncodeSettings, FfmpegEncoder};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidmirror=trace,vidmirror_av=debug,vidmirror_store=debug".to_string()
        } else {
            "vidmirror=info,vidmirror_av=info,vidmirror_store=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Sync { source, output } => run_sync(cli.config.as_deref(), source, output),
        Commands::Status => status(cli.config.as_deref()),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidmirror {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_sync(
    config_path: Option<&std::path::Path>,
    source: Option<std::path::PathBuf>,
    output: Option<std::path::PathBuf>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(source) = source {
        config.sync.source_root = source;
    }
    if let Some(output) = output {
        config.sync.output_root = output;
    }
    config::validate_config(&config)?;

    let encoder = FfmpegEncoder::new(EncodeSettings::from(&config.encoding));
    let report = sync::run_pass(&config, &encoder);

    std::process::exit(report.outcome.exit_code());
}

fn status(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    match lock::LockFile::new(&config.sync.state_dir).status() {
        lock::LockStatus::Free => println!("Lock: free"),
        lock::LockStatus::Held(record) => println!(
            "Lock: held by pid {} on {} since {}",
            record.pid, record.hostname, record.acquired_at
        ),
        lock::LockStatus::Stale(record) => println!(
            "Lock: STALE (held by pid {} since {}); next pass will clear it",
            record.pid, record.acquired_at
        ),
    }

    let sync = &config.sync;
    println!(
        "Source root: {:?} ({})",
        sync.source_root,
        if sync.source_root.exists() { "present" } else { "MISSING" }
    );
    println!(
        "Output root: {:?} ({})",
        sync.output_root,
        if sync.output_root.exists() { "present" } else { "missing (created on next pass)" }
    );

    Ok(())
}

fn check_tools() -> Result<()> {
    let mut all_available = true;

    println!("Checking external tools...\n");
    for info in vidmirror_av::check_tools() {
        if info.available {
            println!(
                "  [ok] {} - {}",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            println!("  [MISSING] {}", info.name);
            all_available = false;
        }
    }

    if !all_available {
        anyhow::bail!("Some required tools are missing");
    }
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(path)?;
    config::validate_config(&config)?;
    println!("Configuration is valid");
    println!("  source_root: {:?}", config.sync.source_root);
    println!("  output_root: {:?}", config.sync.output_root);
    println!("  state_dir:   {:?}", config.sync.state_dir);
    Ok(())
}
