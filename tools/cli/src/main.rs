//! Stowage CLI - Command line interface for storage backends.
//!
//! This tool drives any registered backend: normalizing names, picking
//! collision-free names, uploading, inspecting and removing objects.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use stowage_common::Error;
use stowage_storage::{create_default_registry, LocalConfig, StorageBackend};

#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "Stowage - Pluggable file storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Backend configuration file (JSON: {"backend": "...", "config": {...}}).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for the local backend when no config file is given.
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the storage key a name maps to.
    Name {
        /// Logical name.
        name: String,
    },

    /// Print a name that does not collide with an existing object.
    Unique {
        /// Desired logical name.
        name: String,
    },

    /// Upload a file.
    Put {
        /// Source file to upload.
        source: PathBuf,

        /// Logical name to store under (default: source file name).
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite an existing object instead of picking a new name.
        #[arg(long)]
        overwrite: bool,
    },

    /// Write object content to stdout or a file.
    Cat {
        /// Logical name.
        name: String,

        /// Destination file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the URL or path an object is served from.
    Url {
        /// Logical name.
        name: String,
    },

    /// Print the object size in bytes.
    Size {
        /// Logical name.
        name: String,
    },

    /// Print object metadata as JSON.
    Stat {
        /// Logical name.
        name: String,
    },

    /// Remove an object.
    Rm {
        /// Logical name.
        name: String,
    },
}

/// Backend selection as read from a config file.
#[derive(Debug, Deserialize)]
struct BackendSpec {
    /// Registered backend name (e.g., "local", "memory").
    backend: String,
    /// Backend-specific configuration.
    #[serde(default)]
    config: Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let backend = open_backend(cli.config.as_deref(), cli.root)?;
    debug!("Using backend: {}", backend.name());

    match cli.command {
        Commands::Name { name } => cmd_name(backend.as_ref(), &name),
        Commands::Unique { name } => cmd_unique(backend.as_ref(), &name).await,
        Commands::Put {
            source,
            name,
            overwrite,
        } => cmd_put(backend.as_ref(), &source, name, overwrite).await,
        Commands::Cat { name, output } => cmd_cat(backend.as_ref(), &name, output).await,
        Commands::Url { name } => cmd_url(backend.as_ref(), &name).await,
        Commands::Size { name } => cmd_size(backend.as_ref(), &name).await,
        Commands::Stat { name } => cmd_stat(backend.as_ref(), &name).await,
        Commands::Rm { name } => cmd_rm(backend.as_ref(), &name).await,
    }
}

/// Build the backend from a config file, or a local backend otherwise.
fn open_backend(config: Option<&Path>, root: Option<PathBuf>) -> Result<Arc<dyn StorageBackend>> {
    let spec = match config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<BackendSpec>(&raw)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => {
            let root = match root {
                Some(root) => root,
                None => dirs::data_dir()
                    .context("Cannot determine data directory; pass --root")?
                    .join("stowage"),
            };
            BackendSpec {
                backend: "local".to_string(),
                config: serde_json::to_value(LocalConfig::new(root))?,
            }
        }
    };

    let registry = create_default_registry();
    registry
        .resolve(&spec.backend, spec.config)
        .with_context(|| format!("Failed to open '{}' backend", spec.backend))
}

/// Print the storage key for a name.
fn cmd_name(backend: &dyn StorageBackend, name: &str) -> Result<()> {
    let key = backend.get_name(name).context("Invalid name")?;
    println!("{}", key);
    Ok(())
}

/// Print a collision-free name.
async fn cmd_unique(backend: &dyn StorageBackend, name: &str) -> Result<()> {
    let unique = backend
        .generate_new_filename(name)
        .await
        .context("Failed to pick a free name")?;
    println!("{}", unique);
    Ok(())
}

/// Upload a file.
async fn cmd_put(
    backend: &dyn StorageBackend,
    source: &Path,
    name: Option<String>,
    overwrite: bool,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => source
            .file_name()
            .and_then(|n| n.to_str())
            .context("Source has no usable file name; pass --name")?
            .to_string(),
    };

    let name = if overwrite {
        name
    } else {
        backend
            .generate_new_filename(&name)
            .await
            .context("Failed to pick a free name")?
    };

    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("Failed to open {}", source.display()))?;
    let stream = ReaderStream::new(file)
        .map_ok(|chunk| chunk.to_vec())
        .map_err(Error::from);

    info!("Uploading {} as {}", source.display(), name);
    let key = backend
        .write_stream(&name, Box::pin(stream))
        .await
        .context("Upload failed")?;

    println!("{}", key);
    Ok(())
}

/// Write object content out.
async fn cmd_cat(backend: &dyn StorageBackend, name: &str, output: Option<PathBuf>) -> Result<()> {
    let data = backend.read(name).await.context("Failed to read object")?;

    match output {
        Some(path) => tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Print the retrieval locator.
async fn cmd_url(backend: &dyn StorageBackend, name: &str) -> Result<()> {
    let path = backend.get_path(name).await.context("Failed to build URL")?;
    println!("{}", path);
    Ok(())
}

/// Print the object size.
async fn cmd_size(backend: &dyn StorageBackend, name: &str) -> Result<()> {
    let size = backend.get_size(name).await.context("Failed to get size")?;
    println!("{}", size);
    Ok(())
}

/// Print object metadata.
async fn cmd_stat(backend: &dyn StorageBackend, name: &str) -> Result<()> {
    let metadata = backend
        .metadata(name)
        .await
        .context("Failed to get metadata")?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

/// Remove an object.
async fn cmd_rm(backend: &dyn StorageBackend, name: &str) -> Result<()> {
    let key = backend.get_name(name).context("Invalid name")?;
    backend.delete(name).await.context("Failed to remove object")?;
    info!("Removed {}", key);
    Ok(())
}
