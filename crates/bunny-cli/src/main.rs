//! bunny-secret CLI - resolve the BunnyCDN storage key and work with the zone
//!
//! Settings come from the environment (`BUNNYCDN_*`, `SECRET_*`,
//! `BUNNY_SECRET_*`, `AWS_*`, `IMAGEKIT_*`), optionally layered over a JSON
//! file passed with `--config`. Logs go to stderr; command output to stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use bunny_core::cdn::{build_public_url, DEFAULT_UPLOAD_DIR};
use bunny_core::{
    CdnManager, ImageKitRewriter, Resolution, SecretClient, SecretStore, Settings, UploadedFile,
    DEFAULT_RESOLUTION,
};

/// bunny-secret - BunnyCDN storage without a plaintext key in configuration
#[derive(Parser, Debug)]
#[command(name = "bunny-secret")]
#[command(version)]
#[command(about = "Resolve the BunnyCDN storage key from a secret service and manage zone files")]
struct Args {
    /// JSON settings file (environment variables take precedence)
    #[arg(long, env = "BUNNY_SECRET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the storage key and report where it came from (never prints the key)
    Resolve,

    /// Forget the cached storage key and fetch it again
    ForgetKey,

    /// Upload a local file to the storage zone
    Upload {
        /// Local file to upload
        file: PathBuf,

        /// Destination directory inside the zone
        #[arg(long, default_value = DEFAULT_UPLOAD_DIR)]
        path: String,

        /// Stored name without extension (a unique name is generated otherwise)
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a stored file
    Delete {
        /// Stored path, e.g. /gallery/cover.png
        path: String,
    },

    /// Print the public URL of a stored path
    Url {
        /// Stored path, e.g. /gallery/cover.png
        path: String,

        /// Do not prefix the CDN base URL
        #[arg(long)]
        no_zone: bool,
    },

    /// Rewrite an S3 image URL into an ImageKit URL
    Rewrite {
        url: String,

        /// Image height in pixels
        #[arg(long, default_value_t = DEFAULT_RESOLUTION)]
        resolution: u32,
    },

    /// Work with secrets directly
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand, Debug)]
enum SecretAction {
    /// Print a secret's value
    Get { key: String },
    /// Create or replace a secret
    Put { key: String, value: String },
    /// Delete a secret
    Delete { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = match &args.config {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;

    match args.command {
        Command::Resolve => {
            let (resolver, _) = CdnManager::resolver_from_settings(&settings)?;
            match resolver.resolve_backend_key().await {
                Resolution::Cached(_) => println!("cached"),
                Resolution::Fetched(_) => println!("fetched"),
                Resolution::Unavailable => bail!("storage key is unavailable"),
            }
        }

        Command::ForgetKey => {
            let (resolver, _) = CdnManager::resolver_from_settings(&settings)?;
            resolver.invalidate().await?;
            resolver
                .require_backend_key()
                .await
                .context("storage key could not be fetched again")?;
            println!("refreshed");
        }

        Command::Upload { file, path, name } => {
            let manager = CdnManager::new(settings).await?;
            let upload = UploadedFile::from_path(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let stored = manager.upload_cdn(&upload, &path, name.as_deref()).await?;
            info!("Stored {} as {}", file.display(), stored);

            println!("{}", stored);
            println!("{}", manager.show_cdn(&stored, true));
        }

        Command::Delete { path } => {
            let manager = CdnManager::new(settings).await?;
            if !manager.delete_cdn(&path).await {
                bail!("nothing deleted at {}", path);
            }
            println!("deleted {}", path);
        }

        Command::Url { path, no_zone } => {
            println!(
                "{}",
                build_public_url(settings.disk.cdn_url.as_deref(), &path, !no_zone)
            );
        }

        Command::Rewrite { url, resolution } => {
            let rewriter = ImageKitRewriter::from_settings(&settings.image_kit);
            println!("{}", rewriter.rewrite(&url, resolution));
        }

        Command::Secret { action } => {
            let Some(token) = &settings.secret.api_token else {
                bail!("SECRET_KEY is not set");
            };
            let client = SecretClient::new(&settings.secret.uri, token.expose())?;

            match action {
                SecretAction::Get { key } => match client.get(&key).await? {
                    Some(value) => println!("{}", value),
                    None => bail!("secret '{}' not found", key),
                },
                SecretAction::Put { key, value } => {
                    let ack = client.put(&key, &serde_json::Value::String(value)).await?;
                    println!("{}", serde_json::to_string_pretty(&ack)?);
                }
                SecretAction::Delete { key } => {
                    client.delete(&key).await?;
                    println!("deleted {}", key);
                }
            }
        }
    }

    Ok(())
}
