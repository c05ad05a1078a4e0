pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rednote")]
#[command(about = "Browser automation for the xiaohongshu web UI", long_about = None)]
pub struct Cli {
    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    pub headed: bool,

    /// Path to the Chrome/Chromium executable
    #[arg(long, global = true)]
    pub bin: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether the stored login is still valid
    Status,
    /// Open the login page and wait for a QR code scan
    Login,
    /// Publish an image post
    Publish {
        /// Post title (at most 40 display units)
        #[arg(long)]
        title: String,

        /// Post body
        #[arg(long)]
        content: String,

        /// Image URL or local path; repeat for several images
        #[arg(long = "image", required = true)]
        images: Vec<String>,

        /// Topic tag, with or without a leading '#'; repeat for several tags
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List the home feed
    Feeds,
    /// Search notes by keyword
    Search {
        keyword: String,
    },
    /// Show a note with its comments
    Detail {
        feed_id: String,
        xsec_token: String,
    },
    /// Comment on a note
    Comment {
        feed_id: String,
        xsec_token: String,
        content: String,
    },
    /// Save home feed notes as Markdown files
    Archive {
        /// Number of notes to save
        #[arg(short, long)]
        limit: Option<usize>,

        /// Directory that receives the timestamped batch folder
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
