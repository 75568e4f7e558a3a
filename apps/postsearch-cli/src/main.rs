use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use postsearch_core::artifact::{JsonFileArtifact, SearchArtifact};
use postsearch_core::config::{Config, Settings};
use postsearch_core::content::MarkdownDirectory;
use postsearch_core::traits::ContentSource;
use postsearch_core::types::{Document, SearchResult};
use postsearch_service::IndexManager;
use postsearch_text::reject_reason;

mod cli;
use cli::{Cli, Commands};

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Keep the first valid record per id, as the index builder would.
fn accepted(documents: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|doc| match reject_reason(doc, &seen) {
            Some(reason) => {
                warn!(id = %doc.id, %reason, "leaving document out of the artifact");
                false
            }
            None => {
                seen.insert(doc.id.clone());
                true
            }
        })
        .collect()
}

async fn run_index(content: &Path, output: &Path) -> Result<usize> {
    let pb = spinner(&format!("Reading posts from {}", content.display()))?;
    let documents = MarkdownDirectory::new(content).list_documents().await;
    pb.finish_and_clear();
    let documents = accepted(documents?);

    let artifact = SearchArtifact::from_documents(&documents, chrono::Utc::now());
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(output, artifact.to_json_pretty()?)
        .await
        .with_context(|| format!("writing {}", output.display()))?;
    info!(documents = documents.len(), output = %output.display(), "search artifact written");
    Ok(documents.len())
}

fn manager(settings: Settings, artifact: Option<PathBuf>, content: Option<PathBuf>) -> Result<IndexManager> {
    let base = std::env::current_dir().context("reading the working directory")?;
    let mut manager = IndexManager::from_settings(settings, &base);
    if let Some(path) = artifact {
        manager = manager.with_artifact_source(Arc::new(JsonFileArtifact::new(path)));
    }
    if let Some(dir) = content {
        manager = manager.with_content_source(Arc::new(MarkdownDirectory::new(dir)));
    }
    Ok(manager)
}

fn print_results(query: &str, results: &[SearchResult]) {
    println!("{} result(s) for \"{}\"", results.len(), query);
    for (i, r) in results.iter().enumerate() {
        println!("\n  {}. {}  score={:.2}", i + 1, r.title, r.score);
        println!("     /{}  {}  [{}]", r.slug, r.formatted_date, r.tags.join(", "));
        if !r.excerpt.is_empty() {
            println!("     {}", r.excerpt);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Config::load()?.settings()?;

    match cli.command {
        Commands::Index { content, output } => {
            let count = run_index(&content, &output).await?;
            println!("Indexed {} post(s) into {}", count, output.display());
        }
        Commands::Query { query, limit, artifact, content, json } => {
            let limit = settings.search.parse_limit(limit.as_deref());
            let manager = manager(settings, artifact, content)?;
            let results = manager.search(&query, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&query, &results);
            }
        }
        Commands::Filter { query, category, content, json } => {
            let manager = manager(settings, None, Some(content))?;
            let posts = manager.filter(&query, &category).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
            } else {
                for p in &posts {
                    println!("{}  {}  [{}]", p.formatted_date, p.title, p.tags.join(", "));
                }
            }
        }
    }
    Ok(())
}
