use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use shmem_core::{CreateMode, Platform, ShmConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shmem_manager::commands::{demo, segment};

#[derive(Parser)]
#[command(name = "shmem")]
#[command(about = "Create, inspect and remove named shared memory segments")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (TOML or YAML). Defaults to $SHMEM_CONFIG or the standard search paths
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a segment and report its granted size
    Create {
        /// Segment name
        name: String,
        /// Requested size in bytes
        size: usize,
        /// create-only, open-or-create or open-always
        #[arg(short = 'm', long = "mode", default_value_t = CreateMode::CreateOnly)]
        mode: CreateMode,
        /// Map the segment read-only
        #[arg(long = "read-only")]
        read_only: bool,
    },

    /// Write a NUL-terminated string into a segment, creating it if needed
    Write {
        /// Segment name
        name: String,
        /// Text to store
        text: String,
        /// Size to create the segment with if it does not exist
        #[arg(short = 's', long = "size", default_value_t = segment::DEFAULT_WRITE_SIZE)]
        size: usize,
        /// Byte offset to write at
        #[arg(short = 'o', long = "offset", default_value_t = 0)]
        offset: usize,
        /// Keep the segment mapped for this many seconds after writing
        #[arg(long = "hold", value_name = "SECONDS")]
        hold: Option<u64>,
    },

    /// Print the NUL-terminated string stored in a segment
    Read {
        /// Segment name
        name: String,
        /// Byte offset to read from
        #[arg(short = 'o', long = "offset", default_value_t = 0)]
        offset: usize,
    },

    /// Show size, access mode and platform of an existing segment
    Info {
        /// Segment name
        name: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Exit with status 0 if the segment exists, 1 otherwise
    Exists {
        /// Segment name
        name: String,
    },

    /// Remove a segment's name (no-op on Windows)
    Remove {
        /// Segment name
        name: String,
    },

    /// Run a writer and a reader thread over one segment, synchronised by atomics
    Demo {
        /// Segment name (defaults to a per-process name)
        #[arg(long)]
        name: Option<String>,
        /// Number of counter updates the writer performs
        #[arg(short = 'n', long = "iterations", default_value_t = 100)]
        iterations: u32,
        /// Delay between updates in milliseconds
        #[arg(long = "interval-ms", default_value_t = 10)]
        interval_ms: u64,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run_command(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ShmConfig> {
    match path {
        Some(path) => ShmConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => ShmConfig::load().context("failed to load config"),
    }
}

fn run_command(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Create {
            name,
            size,
            mode,
            read_only,
        } => {
            let info = segment::create(&name, size, mode, read_only, &config)?;
            println!(
                "{} {} '{}': requested {} bytes, granted {} bytes, creator: {}",
                "✓".green(),
                mode,
                info.name.yellow(),
                size,
                info.size,
                info.creator
            );
            if !Platform::current().requires_manual_removal() {
                println!(
                    "  {} The segment is released when this process exits",
                    "Note:".dimmed()
                );
            }
            Ok(0)
        }

        Commands::Write {
            name,
            text,
            size,
            offset,
            hold,
        } => {
            let hold = hold.map(Duration::from_secs);
            let info = segment::write(&name, &text, size, offset, hold, &config)?;
            println!(
                "{} Wrote {} bytes to '{}' at offset {} ({} bytes, {})",
                "✓".green(),
                text.len() + 1,
                info.name.yellow(),
                offset,
                info.size,
                if info.creator { "created" } else { "existing" }
            );
            Ok(0)
        }

        Commands::Read { name, offset } => {
            // Plain output so it can be piped
            println!("{}", segment::read(&name, offset, &config)?);
            Ok(0)
        }

        Commands::Info { name, json } => {
            let info = segment::info(&name, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", info.name.yellow().bold());
                println!("  {:<10} {} bytes", "size:".dimmed(), info.size);
                println!("  {:<10} {}", "access:".dimmed(), info.access);
                println!("  {:<10} {}", "platform:".dimmed(), info.platform);
            }
            Ok(0)
        }

        Commands::Exists { name } => {
            if segment::exists(&name) {
                println!("{} '{}' exists", "✓".green(), name);
                Ok(0)
            } else {
                println!("{} '{}' does not exist", "✗".red(), name);
                Ok(1)
            }
        }

        Commands::Remove { name } => {
            if segment::remove(&name) {
                println!("{} Removed '{}'", "✓".green(), name);
                Ok(0)
            } else {
                println!("{} Could not remove '{}'", "✗".red(), name);
                Ok(1)
            }
        }

        Commands::Demo {
            name,
            iterations,
            interval_ms,
        } => {
            let name = name.unwrap_or_else(|| format!("shmem_demo_{}", std::process::id()));
            println!(
                "{} Running writer/reader demo on '{}' ({} iterations)...",
                "→".cyan(),
                name.yellow(),
                iterations
            );
            let report = demo::run(&name, iterations, Duration::from_millis(interval_ms))?;
            println!(
                "{} Reader saw counter {} of {}: \"{}\"",
                "✓".green(),
                report.observed,
                report.iterations,
                report.message
            );
            Ok(0)
        }
    }
}
