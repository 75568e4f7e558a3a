//! Command-line definitions for the `postsearch` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "postsearch", about = "Build and query the blog search index", version)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read markdown posts and write the versioned search artifact
    Index {
        /// Directory of markdown posts
        #[arg(short, long)]
        content: PathBuf,

        /// Artifact file to write, e.g. public/search-index.json
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run a ranked search
    Query {
        query: String,

        /// Maximum number of results (invalid values fall back to the configured default)
        #[arg(short, long, allow_hyphen_values = true)]
        limit: Option<String>,

        /// Prebuilt artifact to load before falling back to the content directory
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Directory of markdown posts
        #[arg(short, long)]
        content: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List posts matching a text filter and a category
    Filter {
        #[arg(short, long, default_value = "")]
        query: String,

        /// Tag to restrict to; "all" disables the category filter
        #[arg(long, default_value = "all")]
        category: String,

        #[arg(short, long)]
        content: PathBuf,

        #[arg(long)]
        json: bool,
    },
}
