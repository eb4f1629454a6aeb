mod config;
mod report;
mod scan;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use skinscan_core::CaptureAngle;
use skinscan_storage::{FsArtifactStore, ScanRepository};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "skinscan", about = "SkinScan guided face scan and skin analysis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a three-angle scan from image files and save the analysis
    Scan {
        /// Image of the face looking straight at the camera
        #[arg(long)]
        front: PathBuf,
        /// Image with the head turned to show the left side
        #[arg(long)]
        left: PathBuf,
        /// Image with the head turned to show the right side
        #[arg(long)]
        right: PathBuf,
    },
    /// List saved scans, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one saved scan
    Show {
        /// Scan ID
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved scan and its images
    Delete {
        /// Scan ID
        id: String,
    },
    /// Delete every saved scan and its images
    Clear {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let repo = ScanRepository::open(&config.db_path)
        .await
        .with_context(|| format!("opening {}", config.db_path.display()))?;

    match cli.command {
        Commands::Scan { front, left, right } => {
            let images = vec![
                (CaptureAngle::Front, front),
                (CaptureAngle::Left, left),
                (CaptureAngle::Right, right),
            ];
            let record = scan::run_scan(&config, &repo, &images).await?;
            println!();
            print!("{}", report::detail(&record));
        }
        Commands::List { json } => {
            let records = repo.list().await?;
            if json {
                println!("{}", report::to_json(&records)?);
            } else if records.is_empty() {
                println!("No scans saved");
            } else {
                for record in &records {
                    println!("{}", report::summary_line(record));
                }
            }
        }
        Commands::Show { id, json } => {
            let Some(record) = repo.get(&id).await? else {
                bail!("no scan with id {id}");
            };
            if json {
                println!("{}", report::to_json(&record)?);
            } else {
                print!("{}", report::detail(&record));
            }
        }
        Commands::Delete { id } => {
            let Some(record) = repo.get(&id).await? else {
                bail!("no scan with id {id}");
            };
            let store = FsArtifactStore::new(&config.artifact_dir);
            for artifact in &record.image_paths {
                store.remove(artifact).await?;
            }
            repo.delete(&id).await?;
            println!("Deleted scan {id}");
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to delete all scans without --yes");
            }
            let store = FsArtifactStore::new(&config.artifact_dir);
            for record in repo.list().await? {
                for artifact in &record.image_paths {
                    store.remove(artifact).await?;
                }
            }
            let removed = repo.clear().await?;
            println!("Deleted {removed} scan(s)");
        }
    }

    Ok(())
}
