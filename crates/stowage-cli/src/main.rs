//! Stowage CLI: upload, inspect and serve files from the configured disks.
//!
//! Configuration comes from the environment (and `.env`), see `Config::from_env`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use stowage_cli::{init_tracing, parse_format, parse_thumbnail, read_input};
use stowage_core::{Config, ThumbnailSize};
use stowage_services::{
    OutputFormat, Stowage, ThumbnailSpec, TransformOptions, UploadRequest, ValidationRules,
};

#[derive(Parser)]
#[command(name = "stowage", about = "File ingestion and thumbnail CLI")]
struct Cli {
    /// Disk to operate on (defaults to STORAGE_DEFAULT_DISK)
    #[arg(long, global = true)]
    disk: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, scan, optionally process and store one or more files
    Upload {
        /// Local files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory prefix inside the disk
        #[arg(long, default_value = "uploads")]
        path: String,
        /// Stored file name (single file only)
        #[arg(long)]
        name: Option<String>,
        /// Accept common image formats only
        #[arg(long)]
        images_only: bool,
        /// Maximum file size in bytes
        #[arg(long)]
        max_size: Option<usize>,
        /// Skip the security scan
        #[arg(long)]
        no_scan: bool,
        /// Re-encode images to this format (jpeg, png, webp, avif)
        #[arg(long, value_parser = parse_format)]
        format: Option<OutputFormat>,
        /// Encoding quality
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
        /// Thumbnail to derive, as suffix=WxH (repeatable)
        #[arg(long = "thumbnail", value_parser = parse_thumbnail)]
        thumbnails: Vec<ThumbnailSpec>,
    },
    /// Delete a stored object
    Delete { path: String },
    /// Check whether an object exists
    Exists { path: String },
    /// Print the public URL of an object
    Url { path: String },
    /// Print object metadata
    Metadata { path: String },
    /// List objects under a prefix
    List {
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Fetch an image, or a cached thumbnail when a size is given
    Thumbnail {
        path: String,
        /// Thumbnail size as WxH
        #[arg(long)]
        size: Option<ThumbnailSize>,
        /// Write the bytes here instead of printing a summary
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show thumbnail cache statistics
    CacheStats,
    /// Remove expired thumbnails, or every thumbnail with --all
    CacheClear {
        #[arg(long)]
        all: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let stowage = Stowage::from_config(config)
        .await
        .context("Failed to initialize storage")?;
    let disk = cli.disk.as_deref();

    match cli.command {
        Commands::Upload {
            files,
            path,
            name,
            images_only,
            max_size,
            no_scan,
            format,
            quality,
            thumbnails,
        } => {
            if name.is_some() && files.len() > 1 {
                anyhow::bail!("--name can only be used with a single file");
            }

            let mut rules = if images_only {
                ValidationRules::images()
            } else {
                ValidationRules::default()
            };
            if let Some(max_size) = max_size {
                rules = rules.with_max_size(max_size);
            }

            let mut request = UploadRequest::new(path).with_rules(rules);
            if let Some(disk) = disk {
                request = request.on_disk(disk);
            }
            if let Some(name) = name {
                request = request.with_filename(name);
            }
            if no_scan {
                request = request.without_scan();
            }
            if format.is_some() || quality.is_some() || !thumbnails.is_empty() {
                let defaults = TransformOptions::default();
                request = request.with_processing(TransformOptions {
                    format,
                    quality: quality.unwrap_or(defaults.quality),
                    thumbnails,
                    ..defaults
                });
            }

            let mut inputs = Vec::with_capacity(files.len());
            for file in &files {
                inputs.push(read_input(file).await?);
            }

            let batch = stowage.upload_multiple(inputs, &request).await;
            for failure in &batch.errors {
                eprintln!("{}: {}", files[failure.index].display(), failure.error);
            }
            print_json(&batch.results)?;
            if !batch.success {
                anyhow::bail!("{} of {} uploads failed", batch.errors.len(), files.len());
            }
        }
        Commands::Delete { path } => {
            let deleted = stowage.delete(&path, disk).await?;
            print_json(&serde_json::json!({ "path": path, "deleted": deleted }))?;
        }
        Commands::Exists { path } => {
            let exists = stowage.exists(&path, disk).await?;
            print_json(&serde_json::json!({ "path": path, "exists": exists }))?;
        }
        Commands::Url { path } => {
            println!("{}", stowage.url(&path, disk)?);
        }
        Commands::Metadata { path } => {
            print_json(&stowage.get_metadata(&path, disk).await?)?;
        }
        Commands::List { prefix } => {
            print_json(&stowage.list_files(&prefix, disk).await?)?;
        }
        Commands::Thumbnail { path, size, output } => {
            let (width, height) = match size {
                Some(size) => (Some(size.width), Some(size.height)),
                None => (None, None),
            };
            let response = match disk {
                Some(disk) => stowage.get_image_from(disk, &path, width, height).await?,
                None => stowage.get_image(&path, width, height).await?,
            };

            if let Some(output) = output {
                tokio::fs::write(&output, &response.data)
                    .await
                    .with_context(|| format!("Failed to write {}", output.display()))?;
            }
            print_json(&serde_json::json!({
                "path": path,
                "content_type": response.content_type,
                "size": response.data.len(),
                "from_cache": response.from_cache,
            }))?;
        }
        Commands::CacheStats => {
            print_json(&stowage.get_cache_stats().await)?;
        }
        Commands::CacheClear { all } => {
            let removed = if all {
                stowage.clear_all_cache().await
            } else {
                stowage.clear_expired_cache().await
            };
            print_json(&serde_json::json!({ "removed": removed, "all": all }))?;
        }
    }

    Ok(())
}
