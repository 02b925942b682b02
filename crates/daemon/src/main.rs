//! Indexfo
//!
//! Command-line front end for browsing and transferring files below a
//! shared root.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexfo::config::{default_config_path, Config};
use indexfo::files::transfer::DEFAULT_CHUNK_SIZE;
use indexfo::logging;
use indexfo::protocol::{Entry, Listing, UploadReceipt};
use indexfo::{Browse, ByteRange, FileEngine};

/// Indexfo - browse, download and upload files below a shared root.
#[derive(Parser, Debug)]
#[command(name = "indexfo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List a directory
    Ls {
        /// Logical directory path (root when omitted)
        path: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a file
    Get {
        /// Logical file path
        path: String,

        /// Write to this file instead of stdout
        #[arg(long, short, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Byte range, e.g. "bytes=0-1023"
        #[arg(long)]
        range: Option<String>,
    },

    /// Upload a local file
    Put {
        /// Local file to upload
        local: PathBuf,

        /// Logical destination directory (root when omitted)
        dir: Option<String>,

        /// Name to store the file under (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();
    config.validate()?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let _guard = logging::init(level, config.server.log_file.as_deref())?;

    tracing::debug!(config = ?config_path, "Configuration loaded");

    match cli.command {
        Commands::Ls { path, json } => {
            let path = path.unwrap_or_default();
            let engine = open_engine(&config)?;
            tokio::task::spawn_blocking(move || list(&engine, &path, json)).await??;
        }
        Commands::Get {
            path,
            output,
            range,
        } => {
            let range = match range {
                Some(value) => Some(
                    ByteRange::parse(&value)
                        .with_context(|| format!("Invalid range: {}", value))?,
                ),
                None => None,
            };
            let engine = open_engine(&config)?;
            tokio::task::spawn_blocking(move || download(&engine, &path, range, output.as_deref()))
                .await??;
        }
        Commands::Put { local, dir, name } => {
            let name = match name {
                Some(name) => name,
                None => local
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("Cannot derive a file name from {}", local.display()))?,
            };
            let engine = open_engine(&config)?;
            let receipt = upload(engine, local, dir.unwrap_or_default(), name).await?;
            println!("Stored {} ({} bytes)", receipt.path, receipt.size);
            println!("  sha256: {}", receipt.sha256);
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.to_toml()?);
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(&config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
        }
    }

    Ok(())
}

fn open_engine(config: &Config) -> Result<FileEngine> {
    FileEngine::from_config(config)
        .with_context(|| format!("Cannot open root {}", config.server.root.display()))
}

/// Print a directory listing, streaming it if the directory is large.
fn list(engine: &FileEngine, path: &str, json: bool) -> Result<()> {
    match engine.browse(path)? {
        Browse::Listing(listing) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print_listing(&listing);
            }
        }
        Browse::Stream(stream) => {
            tracing::info!(path = %stream.path, "Large directory, listing unsorted");
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for entry in stream {
                if json {
                    writeln!(out, "{}", serde_json::to_string(&entry)?)?;
                } else {
                    writeln!(out, "{}", format_entry(&entry, 0))?;
                }
            }
        }
    }
    Ok(())
}

fn print_listing(listing: &Listing) {
    if listing.entries.is_empty() {
        println!("Empty directory.");
        return;
    }

    let name_width = listing
        .entries
        .iter()
        .map(|e| display_name(e).len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<name_width$}  {:>10}  {}",
        "NAME",
        "SIZE",
        "KIND",
        name_width = name_width
    );
    println!("{}", "-".repeat(name_width + 24));

    for entry in &listing.entries {
        println!("{}", format_entry(entry, name_width));
    }

    println!();
    println!(
        "{} directories, {} files, {} total",
        listing.summary.directory_count,
        listing.summary.file_count,
        listing.summary.total_size_label
    );
}

fn display_name(entry: &Entry) -> String {
    if entry.is_directory() {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    }
}

fn format_entry(entry: &Entry, name_width: usize) -> String {
    let size = entry.size_label.as_deref().unwrap_or("-");
    let kind = entry.kind.map(|k| k.icon()).unwrap_or("folder");
    format!(
        "{:<name_width$}  {:>10}  {}",
        display_name(entry),
        size,
        kind,
        name_width = name_width
    )
}

/// Stream a file to `output` or stdout.
fn download(
    engine: &FileEngine,
    path: &str,
    range: Option<ByteRange>,
    output: Option<&Path>,
) -> Result<()> {
    let mut download = engine.open_download(path, range)?;
    let header = &download.header;

    match output {
        Some(out_path) => {
            let mut file = File::create(out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            let copied = io::copy(&mut download.stream, &mut file)
                .with_context(|| format!("Download of {} failed", path))?;
            file.flush()?;

            match header.content_range() {
                Some(range) => eprintln!("{} -> {} ({})", header.file_name, out_path.display(), range),
                None => eprintln!(
                    "{} -> {} ({} bytes, {})",
                    header.file_name,
                    out_path.display(),
                    copied,
                    header.content_type
                ),
            }
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            io::copy(&mut download.stream, &mut out)
                .with_context(|| format!("Download of {} failed", path))?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Upload a local file, aborting cleanly on Ctrl-C.
async fn upload(engine: FileEngine, local: PathBuf, dir: String, name: String) -> Result<UploadReceipt> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut task = tokio::task::spawn_blocking({
        let cancelled = cancelled.clone();
        move || upload_file(&engine, &local, &dir, &name, &cancelled)
    });

    tokio::select! {
        result = &mut task => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling upload");
            cancelled.store(true, Ordering::SeqCst);
            task.await?
        }
    }
}

fn upload_file(
    engine: &FileEngine,
    local: &Path,
    dir: &str,
    name: &str,
    cancelled: &AtomicBool,
) -> Result<UploadReceipt> {
    let mut source =
        File::open(local).with_context(|| format!("Failed to open {}", local.display()))?;
    let mut sink = engine.open_upload(dir, name)?;
    let mut buffer = vec![0u8; DEFAULT_CHUNK_SIZE as usize];

    loop {
        if cancelled.load(Ordering::SeqCst) {
            sink.abort();
            anyhow::bail!("Upload cancelled");
        }

        let n = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                sink.abort();
                return Err(e).with_context(|| format!("Failed to read {}", local.display()));
            }
        };
        sink.write_chunk(&buffer[..n])?;
    }

    Ok(sink.commit()?)
}
