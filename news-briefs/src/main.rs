use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use news_briefs::{Article, BriefsConfig, LoggingObserver, Pipeline, PipelineRun, SortOrder};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "news-briefs", about = "Deduplicated briefing of the configured RSS feeds")]
struct Args {
    /// JSON config file (defaults to $BRIEFS_CONFIG, then the built-in feed list)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Similarity threshold for treating two entries as the same story
    #[arg(short, long)]
    threshold: Option<f64>,

    /// recent, alphabetical or source
    #[arg(short, long)]
    sort: Option<SortOrder>,

    /// Show at most this many stories
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the full run as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BriefsConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BriefsConfig::from_env().context("Failed to load config")?,
    };
    if let Some(threshold) = args.threshold {
        config.similarity.threshold = threshold;
    }
    if let Some(sort) = args.sort {
        config.sort = sort;
    }

    let pipeline = Pipeline::new(config).context("Invalid configuration")?;

    info!("Fetching latest news (Ctrl-C to abort)");
    let mut run = pipeline
        .run_until(&LoggingObserver, tokio::signal::ctrl_c())
        .await
        .context("Pipeline run failed")?;

    for (name, failure) in &run.report.failures {
        error!("Source {} failed: {}", name, failure.message);
    }

    if let Some(limit) = args.limit {
        run.articles.truncate(limit);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_briefing(&run);
    }

    Ok(())
}

fn print_briefing(run: &PipelineRun) {
    let now = Utc::now();
    let report = &run.report;

    println!(
        "{} stories from {} entries ({}/{} sources ok)\n",
        run.articles.len(),
        report.entries_fetched,
        report.sources_ok,
        report.sources_total
    );

    for article in &run.articles {
        print_article(article, now);
    }
}

fn print_article(article: &Article, now: chrono::DateTime<Utc>) {
    let domain = article.domain.as_deref().unwrap_or("unknown");
    println!("{}", article.title);
    println!(
        "  {} · {} · {}",
        article.source.name,
        domain,
        article.published_at.age_label(now)
    );
    if !article.summary.is_empty() {
        println!("  {}", article.summary);
    }
    let others = article.also_reported_by();
    if !others.is_empty() {
        println!("  Also reported by: {}", others.join(", "));
    }
    println!("  {}\n", article.link);
}
