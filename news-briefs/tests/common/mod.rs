#![allow(dead_code)]

// Shared fixtures for the integration tests
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use news_briefs::{
    BriefsError, FeedClient, FeedSource, FetchObserver, Published, RawArticle, RawEntry, Result, SourceOutcome,
};
use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// How a scripted source behaves when fetched.
#[derive(Debug, Clone)]
pub enum Script {
    Entries(Vec<RawEntry>),
    Fail(String),
    Hang,
}

/// In-memory `FeedClient` keyed by source name. Unknown sources fail.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    scripts: HashMap<String, Script>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source_name: &str, script: Script) -> Self {
        self.scripts.insert(source_name.to_string(), script);
        self
    }
}

#[async_trait]
impl FeedClient for ScriptedClient {
    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<RawEntry>> {
        match self.scripts.get(&source.name) {
            Some(Script::Entries(entries)) => Ok(entries.clone()),
            Some(Script::Fail(message)) => Err(BriefsError::General(message.clone())),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
            None => Err(BriefsError::General(format!("no script for {}", source.name))),
        }
    }

    fn client_name(&self) -> String {
        "scripted".to_string()
    }
}

/// Records every progress notification.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<(String, bool, usize, usize)>>,
}

impl FetchObserver for RecordingObserver {
    fn on_source_complete(&self, outcome: &SourceOutcome, completed: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push((outcome.source.name.clone(), outcome.is_success(), completed, total));
    }
}

pub fn source(name: &str) -> FeedSource {
    let slug = name.to_lowercase().replace(' ', "-");
    FeedSource::new(name, &format!("https://{}.example.com/feed.xml", slug), "#123456")
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> Published {
    Published::At(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
}

pub fn raw_article(id: &str, title: &str, summary: &str, source_name: &str, published_at: Published) -> RawArticle {
    RawArticle {
        id: id.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        link: format!("https://{}.example.com/{}", source_name.to_lowercase(), id),
        source: source(source_name),
        published_at,
    }
}
