//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod combine;
mod crawl;
mod organize;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::ArchiveConfig;

#[derive(Parser)]
#[command(name = "archive-harvest")]
#[command(about = "Harvest documents from shadow-DOM search archives")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./archive-harvest.toml when present)
    #[arg(short, long, global = true, env = "ARCHIVE_HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for documents and metadata (overrides config file)
    #[arg(short, long, global = true, env = "ARCHIVE_HARVEST_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the results index and download linked documents
    Crawl {
        /// Limit number of results pages to crawl (0 = unlimited)
        #[arg(short = 'p', long, env = "ARCHIVE_HARVEST_MAX_PAGES")]
        max_pages: Option<u32>,
        /// First results page (overrides config file)
        #[arg(long)]
        start_url: Option<String>,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
        /// Connect to a running Chrome instead of launching one
        #[arg(long, env = "ARCHIVE_HARVEST_REMOTE_BROWSER")]
        remote_url: Option<String>,
        /// User agent ("impersonate" for a real browser agent)
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Concatenate per-page metadata files into one
    Combine,

    /// Move downloaded documents into per-year directories
    Organize {
        /// Metadata file to organize by (defaults to the combined metadata file)
        #[arg(short, long)]
        metadata: Option<PathBuf>,
    },

    /// Show the shadow-root structure and document links of one page
    Analyze {
        /// Page URL to capture
        url: String,
        /// Also count matches for this selector
        #[arg(long)]
        selector: Option<String>,
        /// Save the captured snapshot as JSON
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ArchiveConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(store_dir) = cli.store_dir {
        config.store_dir = store_dir;
    }

    match cli.command {
        Commands::Crawl {
            max_pages,
            start_url,
            headful,
            remote_url,
            user_agent,
        } => {
            if let Some(max_pages) = max_pages {
                config.max_pages = max_pages;
            }
            if let Some(start_url) = start_url {
                config.start_url = start_url;
            }
            if headful {
                config.browser.headless = false;
            }
            if remote_url.is_some() {
                config.browser.remote_url = remote_url;
            }
            if user_agent.is_some() {
                config.user_agent = user_agent;
            }
            crawl::cmd_crawl(&config).await
        }
        Commands::Combine => combine::cmd_combine(&config),
        Commands::Organize { metadata } => organize::cmd_organize(&config, metadata.as_deref()),
        Commands::Analyze {
            url,
            selector,
            save,
        } => analyze::cmd_analyze(&config, &url, selector.as_deref(), save.as_deref()).await,
    }
}
