mod common;

use common::{init_tracing, source, RecordingObserver, Script, ScriptedClient};
use news_briefs::{
    BriefsConfig, BriefsError, CandidatePairs, FailureKind, NoopObserver, Pipeline, Published, RawArticle, RawEntry,
    SimilarityConfig, SimilarityGrouper, SortOrder, Stage,
};
use std::sync::Arc;
use std::time::Duration;

fn config_for(names: &[&str]) -> BriefsConfig {
    BriefsConfig::with_sources(names.iter().map(|name| source(name)).collect())
}

fn pipeline(config: BriefsConfig, client: ScriptedClient) -> Pipeline {
    Pipeline::with_client(config, Arc::new(client)).unwrap()
}

fn entry(title: &str, link: &str) -> RawEntry {
    RawEntry::new(title, "", link)
}

fn funding_client() -> ScriptedClient {
    ScriptedClient::new()
        .with(
            "Alpha",
            Script::Entries(vec![entry("Company X raises $50M in funding", "https://alpha.example.com/x-funding")
                .with_published("Tue, 10 Jun 2025 10:00:00 GMT")]),
        )
        .with(
            "Beta",
            Script::Entries(vec![entry("Company X raises 50 million dollars", "https://beta.example.com/x")
                .with_published("2025-06-10T12:00:00Z")]),
        )
        .with(
            "Gamma",
            Script::Entries(vec![entry("Totally unrelated story about weather", "https://gamma.example.com/weather")
                .with_published("not-a-date")]),
        )
}

#[tokio::test]
async fn test_duplicate_headlines_collapse_to_one_article() {
    init_tracing();

    let pipeline = pipeline(config_for(&["Alpha", "Beta", "Gamma"]), funding_client());
    let run = pipeline.run(&NoopObserver).await.unwrap();

    assert_eq!(run.articles.len(), 2);

    let first = &run.articles[0];
    assert_eq!(first.title, "Company X raises $50M in funding");
    assert_eq!(first.source.name, "Alpha");
    assert_eq!(first.also_reported_by(), vec!["Beta"]);
    assert_eq!(first.members.len(), 2);
    assert_eq!(first.domain.as_deref(), Some("alpha.example.com"));

    let last = &run.articles[1];
    assert_eq!(last.title, "Totally unrelated story about weather");
    assert_eq!(last.published_at, Published::Unknown);

    assert_eq!(run.report.sources_total, 3);
    assert_eq!(run.report.sources_ok, 3);
    assert_eq!(run.report.entries_fetched, 3);
    assert_eq!(run.report.raw_articles, 3);
    assert_eq!(run.report.clusters, 2);
    assert_eq!(run.report.articles, 2);
    assert_eq!(run.report.stage, Some(Stage::Done));
    assert!(run.report.failures.is_empty());
}

// Only ever compares articles from the same source
struct SameSourceOnly;

impl CandidatePairs for SameSourceOnly {
    fn candidate_pairs(&self, articles: &[&RawArticle]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..articles.len() {
            for j in (i + 1)..articles.len() {
                if articles[i].source.name == articles[j].source.name {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}

#[tokio::test]
async fn test_custom_grouper_replaces_pair_selection() {
    let grouper = SimilarityGrouper::with_candidates(SimilarityConfig::default(), Box::new(SameSourceOnly));
    let pipeline = pipeline(config_for(&["Alpha", "Beta", "Gamma"]), funding_client()).with_grouper(grouper);

    let run = pipeline.run(&NoopObserver).await.unwrap();

    assert_eq!(run.articles.len(), 3);
    assert!(run.articles.iter().all(|a| a.members.len() == 1));
}

#[tokio::test]
async fn test_slow_source_times_out_without_losing_others() {
    init_tracing();

    let client = ScriptedClient::new()
        .with(
            "Alpha",
            Script::Entries(vec![entry("Rust 2.0 roadmap announced by core team", "https://alpha.example.com/rust")]),
        )
        .with(
            "Beta",
            Script::Entries(vec![
                entry("Rust 2.0 roadmap announced by the core team", "https://beta.example.com/rust"),
                entry("Local bakery wins national bread award", "https://beta.example.com/bread"),
            ]),
        )
        .with("Gamma", Script::Hang);

    let mut config = config_for(&["Alpha", "Beta", "Gamma"]);
    config.fetch.source_timeout_ms = 200;

    let run = tokio::time::timeout(Duration::from_secs(10), pipeline(config, client).run(&NoopObserver))
        .await
        .expect("run should finish once the slow source times out")
        .unwrap();

    assert_eq!(run.articles.len(), 2);
    assert_eq!(run.report.failed_sources(), vec!["Gamma"]);
    assert_eq!(run.report.failures[0].1.kind, FailureKind::Timeout);
    assert_eq!(run.report.sources_ok, 2);

    let rust = run
        .articles
        .iter()
        .find(|a| a.title.starts_with("Rust 2.0"))
        .unwrap();
    assert_eq!(rust.members.len(), 2);
}

#[tokio::test]
async fn test_all_sources_failing_yields_empty_briefing() {
    let client = ScriptedClient::new()
        .with("Alpha", Script::Fail("connection refused".to_string()))
        .with("Beta", Script::Fail("dns error".to_string()))
        .with("Gamma", Script::Fail("reset by peer".to_string()));

    let run = pipeline(config_for(&["Alpha", "Beta", "Gamma"]), client)
        .run(&NoopObserver)
        .await
        .unwrap();

    assert!(run.articles.is_empty());
    assert_eq!(run.report.stage, Some(Stage::Done));
    assert_eq!(run.report.failed_sources(), vec!["Alpha", "Beta", "Gamma"]);
    assert!(run
        .report
        .failures
        .iter()
        .all(|(_, failure)| failure.kind == FailureKind::Transport));
}

#[tokio::test]
async fn test_same_entry_from_two_sources_is_collapsed_by_id() {
    let shared = entry("Shared wire story", "https://wire.example.com/shared");
    let client = ScriptedClient::new()
        .with("Alpha", Script::Entries(vec![shared.clone()]))
        .with("Beta", Script::Entries(vec![shared]));

    let run = pipeline(config_for(&["Alpha", "Beta"]), client)
        .run(&NoopObserver)
        .await
        .unwrap();

    assert_eq!(run.articles.len(), 1);
    assert_eq!(run.report.exact_duplicates, 1);
    assert_eq!(run.report.raw_articles, 1);
    assert_eq!(run.articles[0].source.name, "Alpha");
    assert_eq!(run.articles[0].also_reported_by(), vec!["Beta"]);
    assert_eq!(run.articles[0].members.len(), 2);
    assert_eq!(run.articles[0].member_links(), vec!["https://wire.example.com/shared"]);
}

#[tokio::test]
async fn test_observer_sees_every_source_once() {
    let observer = RecordingObserver::default();
    let client = ScriptedClient::new()
        .with("Alpha", Script::Entries(vec![entry("One story", "https://alpha.example.com/1")]))
        .with("Beta", Script::Fail("boom".to_string()))
        .with("Gamma", Script::Entries(Vec::new()));

    pipeline(config_for(&["Alpha", "Beta", "Gamma"]), client)
        .run(&observer)
        .await
        .unwrap();

    let events = observer.events.lock().unwrap();
    assert_eq!(events.len(), 3);

    let completed: Vec<usize> = events.iter().map(|(_, _, completed, _)| *completed).collect();
    assert_eq!(completed, vec![1, 2, 3]);
    assert!(events.iter().all(|(_, _, _, total)| *total == 3));

    let mut names: Vec<&str> = events.iter().map(|(name, _, _, _)| name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

    let beta = events.iter().find(|(name, _, _, _)| name == "Beta").unwrap();
    assert!(!beta.1);
}

#[tokio::test]
async fn test_cancelled_run_returns_nothing() {
    let client = ScriptedClient::new().with("Alpha", Script::Hang);

    let result = pipeline(config_for(&["Alpha"]), client)
        .run_until(&NoopObserver, tokio::time::sleep(Duration::from_millis(50)))
        .await;

    assert!(matches!(result, Err(BriefsError::Cancelled)));
}

#[tokio::test]
async fn test_entries_per_source_are_capped() {
    let client = ScriptedClient::new().with(
        "Alpha",
        Script::Entries(vec![
            entry("Mars rover finds signs of ancient lake", "https://alpha.example.com/mars"),
            entry("Stock markets close higher on tech rally", "https://alpha.example.com/stocks"),
            entry("Open source maintainers warn of burnout", "https://alpha.example.com/oss"),
            entry("Local bakery wins national bread award", "https://alpha.example.com/bread"),
        ]),
    );
    let mut config = config_for(&["Alpha"]);
    config.fetch.max_entries_per_source = Some(2);

    let run = pipeline(config, client).run(&NoopObserver).await.unwrap();

    assert_eq!(run.report.entries_fetched, 2);
    assert_eq!(run.articles.len(), 2);
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let client = ScriptedClient::new().with(
        "Alpha",
        Script::Entries(vec![
            entry("<p></p>", "https://alpha.example.com/empty"),
            entry("Mars rover finds signs of ancient lake", "https://alpha.example.com/mars"),
        ]),
    );

    let run = pipeline(config_for(&["Alpha"]), client)
        .run(&NoopObserver)
        .await
        .unwrap();

    assert_eq!(run.articles.len(), 1);
    assert_eq!(run.report.skipped.len(), 1);
    assert_eq!(run.report.skipped[0].source_name, "Alpha");
}

#[tokio::test]
async fn test_summaries_are_enhanced() {
    let client = ScriptedClient::new().with(
        "Alpha",
        Script::Entries(vec![RawEntry::new(
            "Company X raises $50M in funding",
            "<p>The round values the company at $1.2 billion.</p>",
            "https://alpha.example.com/x",
        )]),
    );

    let run = pipeline(config_for(&["Alpha"]), client)
        .run(&NoopObserver)
        .await
        .unwrap();

    assert_eq!(run.articles[0].summary, "The round values the company at **$1.2 billion**.");
    assert_eq!(run.articles[0].title, "Company X raises $50M in funding");
}

fn sorting_client() -> ScriptedClient {
    ScriptedClient::new()
        .with(
            "Alpha",
            Script::Entries(vec![entry("Stock markets close higher on tech rally", "https://alpha.example.com/s")]),
        )
        .with(
            "Beta",
            Script::Entries(vec![entry("Mars rover finds signs of ancient lake", "https://beta.example.com/m")
                .with_published("2025-06-10T12:00:00Z")]),
        )
        .with(
            "Gamma",
            Script::Entries(vec![entry("Local bakery wins national bread award", "https://gamma.example.com/b")
                .with_published("2025-06-10T08:00:00Z")]),
        )
}

async fn sources_in_order(order: SortOrder) -> Vec<String> {
    let mut config = config_for(&["Alpha", "Beta", "Gamma"]);
    config.sort = order;
    let run = pipeline(config, sorting_client()).run(&NoopObserver).await.unwrap();
    run.articles.into_iter().map(|a| a.source.name).collect()
}

#[tokio::test]
async fn test_sort_orders() {
    assert_eq!(sources_in_order(SortOrder::Recent).await, vec!["Beta", "Gamma", "Alpha"]);
    assert_eq!(sources_in_order(SortOrder::Alphabetical).await, vec!["Gamma", "Beta", "Alpha"]);
    assert_eq!(sources_in_order(SortOrder::Source).await, vec!["Alpha", "Beta", "Gamma"]);
}

#[tokio::test]
async fn test_run_serializes_unknown_timestamps() {
    let pipeline = pipeline(config_for(&["Alpha", "Beta", "Gamma"]), funding_client());
    let run = pipeline.run(&NoopObserver).await.unwrap();

    let json = serde_json::to_value(&run).unwrap();

    assert_eq!(json["articles"][1]["published_at"], "unknown");
    assert_eq!(json["articles"][0]["published_at"], "2025-06-10T10:00:00+00:00");
    assert_eq!(json["report"]["stage"], "done");
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = config_for(&["Alpha", "Alpha"]);

    let result = Pipeline::with_client(config, Arc::new(ScriptedClient::new()));

    assert!(matches!(result, Err(BriefsError::Config(_))));
}
