//! dav-replica CLI - work with a replicated WebDAV pool from the shell
//!
//! # Usage
//!
//! ```bash
//! dav-replica push ./image.png /files/original/image.png
//! dav-replica fetch /files/original/image.png ./copy.png
//! dav-replica exists /files/original/image.png
//! dav-replica url /files/original/image.png
//! dav-replica remove /files/original/image.png /files/thumb/image.png
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dav_replica::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dav-replica")]
#[command(version)]
#[command(about = "Store files redundantly across a pool of WebDAV servers", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the XDG search path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file to every server
    Push {
        /// Local file to upload
        local: PathBuf,
        /// Storage path on the servers
        remote: String,
    },
    /// Download a file from the primary server
    Fetch {
        /// Storage path on the servers
        remote: String,
        /// Local destination
        local: PathBuf,
    },
    /// Delete files from every server
    Remove {
        /// Storage paths to delete
        #[arg(required = true)]
        remote: Vec<String>,
    },
    /// Check whether a file exists on the primary server
    Exists {
        /// Storage path on the servers
        remote: String,
    },
    /// Print the public URL of a file
    Url {
        /// Storage path on the servers
        remote: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<StorageConfig> {
    let config = match path {
        Some(path) => StorageConfig::load_from(&path.to_string_lossy())?,
        None => StorageConfig::load_for_service("dav-replica")?,
    };
    config.validate()?;
    Ok(config)
}

fn storage_for(config: &StorageConfig, pool: &Arc<ServerPool>, remote: &str) -> ReplicatedStorage {
    let host = Arc::new(StaticHost::for_path(remote));
    ReplicatedStorage::from_config(config, Arc::clone(pool), host)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dav_replica::observability::init()?;

    let config = load_config(cli.config.as_ref())?;
    let pool = Arc::new(ServerPool::from_config(&config)?);

    match cli.command {
        Commands::Push { local, remote } => {
            let file = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("Failed to open {}", local.display()))?;
            let mut storage = storage_for(&config, &pool, &remote);
            storage.queue_write(Style::original(), file);
            storage.flush_writes().await?;
            println!("{}", storage.public_url_default()?);
        }
        Commands::Fetch { remote, local } => {
            storage_for(&config, &pool, &remote)
                .copy_to_local_file(&Style::original(), &local)
                .await?;
        }
        Commands::Remove { remote } => {
            let mut storage = ReplicatedStorage::from_config(
                &config,
                Arc::clone(&pool),
                Arc::new(StaticHost::new()),
            );
            storage.queue_delete_all(remote);
            storage.flush_deletes().await?;
        }
        Commands::Exists { remote } => {
            let exists = storage_for(&config, &pool, &remote).exists_default().await?;
            println!("{exists}");
        }
        Commands::Url { remote } => {
            println!("{}", storage_for(&config, &pool, &remote).public_url_default()?);
        }
    }

    Ok(())
}
