use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "podreader",
    version,
    about = "Turn interview transcripts into speaker-labeled, translated, paginated documents"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, label and render the transcript of a video
    Run {
        /// YouTube URL or video id
        url: String,

        /// Title printed at the top of the document
        #[arg(long, default_value = "Podcast Transcript")]
        title: String,

        /// Use the raw transcript if labeling fails
        #[arg(long)]
        allow_raw_fallback: bool,

        /// Minimum labeled/raw length ratio, in (0, 1]
        #[arg(long)]
        min_ratio: Option<f64>,
    },

    /// Show cached artifacts for a video and whether they would be reused
    Status {
        /// YouTube URL or video id
        url: String,
    },

    /// Delete cached artifacts for a video
    Clean {
        /// YouTube URL or video id
        url: String,
    },

    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
