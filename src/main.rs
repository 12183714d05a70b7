//! CourseScout CLI entry point.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use coursescout::answer::GeminiClient;
use coursescout::config::Config;
use coursescout::embedding::{Embedder, EmbeddingEngine};
use coursescout::index::build_index;
use coursescout::normalize::Normalizer;
use coursescout::retrieval::Retriever;
use coursescout::scrape::CatalogScraper;
use coursescout::server::{self, ServiceContext};
use coursescout::types::{CourseRecord, RawCourse};

#[derive(Parser)]
#[command(
    name = "coursescout",
    about = "Retrieval-augmented search and Q&A over a university course catalog"
)]
struct Cli {
    /// Override the data directory holding persisted artifacts.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the catalog into raw course records
    Scrape {
        /// Catalog page URL (defaults to the configured one)
        #[arg(long)]
        url: Option<String>,
    },
    /// Normalize raw records into structured course metadata
    Preprocess,
    /// Embed all course documents and persist the vector index
    BuildIndex,
    /// Run a retrieval query from the command line
    Query {
        question: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Serve the HTTP API
    Serve {
        /// Bind address (defaults to the configured one)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Scrape { url } => scrape(&config, url).await,
        Commands::Preprocess => preprocess(&config),
        Commands::BuildIndex => build(&config),
        Commands::Query { question, top_k } => query(&config, &question, top_k),
        Commands::Serve { bind } => serve(&config, bind).await,
    }
}

async fn scrape(config: &Config, url: Option<String>) -> Result<()> {
    let catalog_url = url.unwrap_or_else(|| config.catalog_url.clone());
    let scraper = CatalogScraper::new();
    let courses = scraper
        .scrape(&catalog_url)
        .await
        .context("catalog scrape failed")?;

    fs::create_dir_all(&config.data_dir)?;
    fs::write(config.raw_path(), serde_json::to_string_pretty(&courses)?)?;
    println!(
        "Saved {} raw courses to {}",
        courses.len(),
        config.raw_path().display()
    );
    Ok(())
}

fn preprocess(config: &Config) -> Result<()> {
    let raw: Vec<RawCourse> = read_json(&config.raw_path())
        .context("failed to read raw courses; run `coursescout scrape` first")?;

    let normalizer = Normalizer::new();
    let records: Vec<CourseRecord> = raw.iter().map(|r| normalizer.normalize(r)).collect();

    fs::write(
        config.metadata_path(),
        serde_json::to_string_pretty(&records)?,
    )?;
    println!(
        "Preprocessed {} courses into {}",
        records.len(),
        config.metadata_path().display()
    );
    Ok(())
}

fn build(config: &Config) -> Result<()> {
    let courses: Vec<CourseRecord> = read_json(&config.metadata_path())
        .context("failed to read course metadata; run `coursescout preprocess` first")?;

    println!("Loading embedding model {}", config.embed_model);
    let engine = EmbeddingEngine::load(&config.embed_model)?;

    let bar = ProgressBar::new(courses.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Generating embeddings");

    let index = build_index(&engine, &courses, |done| bar.inc(done as u64))?;
    bar.finish_and_clear();

    // Both artifacts are rewritten together so they stay one snapshot
    index.save(&config.index_path())?;
    fs::write(
        config.metadata_path(),
        serde_json::to_string_pretty(&courses)?,
    )?;

    println!(
        "Indexed {} courses with dimension {}",
        index.len(),
        index.dimension()
    );
    Ok(())
}

fn query(config: &Config, question: &str, top_k: usize) -> Result<()> {
    let engine = load_engine(config)?;
    let retriever = Retriever::load(engine, &config.index_path(), &config.metadata_path())?;
    let results = retriever.search(question, top_k)?;

    println!(
        "\nTop {} courses for query: '{}'\n",
        results.len(),
        question
    );
    for result in &results {
        let number = result.course_number.as_deref().unwrap_or("");
        let title = result.title.as_deref().unwrap_or("");
        let description = result.description.as_deref().unwrap_or("");
        let preview: String = description.chars().take(200).collect();

        println!(
            "{} | {} - {}",
            format!("Rank {}", result.rank).bold(),
            number.cyan(),
            title
        );
        println!("Score (cosine similarity): {:.4}", result.score);
        println!("Description: {preview}...");
        println!("{}", "-".repeat(80));
    }
    Ok(())
}

async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    // Startup-fatal checks: credential and both persisted artifacts
    let api_key = Config::gemini_api_key()?;
    if !config.index_path().exists() || !config.metadata_path().exists() {
        bail!(
            "missing vector index or metadata under {}; run `coursescout build-index` first",
            config.data_dir.display()
        );
    }

    let engine = load_engine(config)?;
    let retriever = Retriever::load(engine, &config.index_path(), &config.metadata_path())?;
    let client = GeminiClient::new(api_key, config.gemini_model.clone());
    let model_name = client.model_name().to_string();

    let ctx = Arc::new(ServiceContext {
        retriever,
        generator: Arc::new(client),
        model_name,
    });

    let bind = bind.unwrap_or_else(|| config.bind.clone());
    server::serve(ctx, &bind).await?;
    Ok(())
}

fn load_engine(config: &Config) -> Result<Arc<dyn Embedder>> {
    let engine = EmbeddingEngine::load(&config.embed_model)?;
    Ok(Arc::new(engine))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}
