use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use postsearch_core::artifact::{JsonFileArtifact, SearchArtifact};
use postsearch_core::config::Settings;
use postsearch_core::traits::{ArtifactSource, ContentSource};
use postsearch_core::types::{Document, StrategyKind};
use postsearch_core::{Error, Result};
use postsearch_service::{IndexManager, LifecycleState};

/// Content source that counts calls, can be slowed down, and can be made to fail.
#[derive(Default)]
struct ScriptedSource {
    documents: Mutex<Vec<Document>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay_ms: u64,
}

impl ScriptedSource {
    fn new(documents: Vec<Document>) -> Arc<Self> {
        Arc::new(Self { documents: Mutex::new(documents), ..Self::default() })
    }

    fn slow(documents: Vec<Document>, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self { documents: Mutex::new(documents), delay_ms, ..Self::default() })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn replace(&self, documents: Vec<Document>) {
        *self.documents.lock() = documents;
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::ContentSource("backend down".into()));
        }
        Ok(self.documents.lock().clone())
    }
}

struct SlowArtifact;

#[async_trait]
impl ArtifactSource for SlowArtifact {
    async fn load(&self) -> Result<SearchArtifact> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(Error::Artifact("never".into()))
    }
}

fn blog() -> Vec<Document> {
    vec![
        Document::new("rode", "RØDE Wireless ME Review").with_tags(["audio"]).with_published_at("2024-05-01"),
        Document::new("echo", "Echo Dot Review").with_tags(["smart-home"]).with_published_at("2024-03-01"),
    ]
}

fn settings(timeout_ms: u64) -> Settings {
    let mut settings = Settings::default();
    settings.lifecycle.load_timeout_ms = timeout_ms;
    settings
}

fn manager(source: &Arc<ScriptedSource>) -> IndexManager {
    IndexManager::new(settings(2_000)).with_content_source(source.clone())
}

fn ids(results: &[postsearch_core::types::SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn concurrent_first_searches_share_one_build() {
    let source = ScriptedSource::slow(blog(), 50);
    let m = manager(&source);

    let results = join_all((0..16).map(|_| m.search("wireless", 10))).await;

    assert_eq!(m.build_count(), 1);
    assert_eq!(source.calls(), 1);
    for r in results {
        assert_eq!(ids(&r.expect("search")), vec!["rode"]);
    }
    assert_eq!(m.state(), LifecycleState::Ready);
}

#[tokio::test]
async fn concurrent_tasks_share_one_build() {
    let source = ScriptedSource::slow(blog(), 50);
    let m = Arc::new(manager(&source));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let m = m.clone();
            tokio::spawn(async move { m.search("echo", 10).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(m.state(), LifecycleState::Building);

    for h in handles {
        let results = h.await.expect("join").expect("search");
        assert_eq!(ids(&results), vec!["echo"]);
    }
    assert_eq!(m.build_count(), 1);
}

#[tokio::test]
async fn invalidate_forces_a_fresh_build() {
    let source = ScriptedSource::new(blog());
    let m = manager(&source);
    m.initialize().await.expect("init");

    source.replace(vec![Document::new("kindle", "Kindle Paperwhite")]);
    assert_eq!(ids(&m.search("kindle", 10).await.expect("search")), Vec::<&str>::new());

    m.invalidate();
    assert_eq!(m.state(), LifecycleState::Uninitialized);
    assert_eq!(ids(&m.search("kindle", 10).await.expect("search")), vec!["kindle"]);
    assert_eq!(m.build_count(), 2);
}

#[tokio::test]
async fn failed_rebuild_keeps_the_old_engine() {
    let source = ScriptedSource::new(blog());
    let m = manager(&source);
    m.initialize().await.expect("init");

    source.fail(true);
    let err = m.rebuild_index().await.expect_err("rebuild fails");
    assert!(matches!(err, Error::ContentSource(_)));
    assert_eq!(m.state(), LifecycleState::Ready);
    assert_eq!(ids(&m.search("echo", 10).await.expect("search")), vec!["echo"]);
    assert_eq!(m.build_count(), 2);
}

#[tokio::test]
async fn successful_rebuild_swaps_the_engine() {
    let source = ScriptedSource::new(blog());
    let m = manager(&source);
    m.initialize().await.expect("init");

    source.replace(vec![Document::new("kindle", "Kindle Paperwhite"), Document::new("", "broken")]);
    let report = m.rebuild_index().await.expect("rebuild");
    assert_eq!(report.indexed, 1);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(m.state(), LifecycleState::Ready);
    assert_eq!(ids(&m.search("kindle", 10).await.expect("search")), vec!["kindle"]);
    assert!(m.search("echo", 10).await.expect("search").is_empty());
}

#[tokio::test]
async fn failed_build_after_invalidate_serves_substring_results() {
    let source = ScriptedSource::new(blog());
    let m = manager(&source);
    m.initialize().await.expect("init");

    m.invalidate();
    source.fail(true);
    let results = m.search("Echo Dot", 10).await.expect("fallback");
    assert_eq!(ids(&results), vec!["echo"]);
    assert_eq!(results[0].score, 100.0);
    assert_eq!(m.state(), LifecycleState::Uninitialized);

    source.fail(false);
    m.search("echo", 10).await.expect("search");
    assert_eq!(m.state(), LifecycleState::Ready);
    assert_eq!(m.strategy(), Some(StrategyKind::Indexed));
}

#[tokio::test]
async fn failed_first_build_surfaces_the_error() {
    let source = ScriptedSource::new(blog());
    source.fail(true);
    let m = manager(&source);
    assert!(m.search("echo", 10).await.is_err());
    assert_eq!(m.state(), LifecycleState::Uninitialized);

    source.fail(false);
    assert_eq!(ids(&m.search("echo", 10).await.expect("search")), vec!["echo"]);
}

#[tokio::test]
async fn slow_content_source_times_out() {
    let source = ScriptedSource::slow(blog(), 500);
    let m = IndexManager::new(settings(20)).with_content_source(source.clone());
    let err = m.search("echo", 10).await.expect_err("timeout");
    assert!(matches!(err, Error::Timeout { after_ms: 20, .. }));
    assert_eq!(m.state(), LifecycleState::Uninitialized);
}

#[tokio::test]
async fn artifact_is_preferred_over_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("search-index.json");
    let artifact = SearchArtifact::from_documents(&blog(), chrono::Utc::now());
    std::fs::write(&path, artifact.to_json_pretty().expect("json")).expect("write");

    let source = ScriptedSource::new(Vec::new());
    let m = manager(&source).with_artifact_source(Arc::new(JsonFileArtifact::new(&path)));
    let results = m.search("wireless", 10).await.expect("search");
    assert_eq!(ids(&results), vec!["rode"]);
    assert_eq!(results[0].formatted_date, "May 1, 2024");
    assert_eq!(source.calls(), 0);
    assert_eq!(m.strategy(), Some(StrategyKind::Indexed));
}

#[tokio::test]
async fn unknown_artifact_version_rebuilds_from_content() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("search-index.json");
    std::fs::write(&path, r#"{"documents":[{"id":"old","title":"Old format"}],"updatedAt":"","version":"2.0.0"}"#)
        .expect("write");

    let source = ScriptedSource::new(blog());
    let m = manager(&source).with_artifact_source(Arc::new(JsonFileArtifact::new(&path)));
    assert_eq!(ids(&m.search("echo", 10).await.expect("search")), vec!["echo"]);
    assert!(m.search("old", 10).await.expect("search").is_empty());
    assert_eq!(source.calls(), 1);
    assert_eq!(m.strategy(), Some(StrategyKind::Indexed));
}

#[tokio::test]
async fn missing_artifact_falls_back_to_substring() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = ScriptedSource::new(blog());
    let m = manager(&source).with_artifact_source(Arc::new(JsonFileArtifact::new(dir.path().join("absent.json"))));

    let results = m.search("wireless", 10).await.expect("search");
    assert_eq!(ids(&results), vec!["rode"]);
    assert_eq!(m.strategy(), Some(StrategyKind::Substring));
    assert_eq!(m.filter("", "smart-home").await.expect("filter").len(), 1);
}

#[tokio::test]
async fn slow_artifact_falls_back_to_substring() {
    let source = ScriptedSource::new(blog());
    let m = IndexManager::new(settings(20))
        .with_content_source(source.clone())
        .with_artifact_source(Arc::new(SlowArtifact));
    assert_eq!(ids(&m.search("echo", 10).await.expect("search")), vec!["echo"]);
    assert_eq!(m.strategy(), Some(StrategyKind::Substring));
}

#[tokio::test]
async fn broken_artifact_without_content_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let m = IndexManager::new(Settings::default())
        .with_artifact_source(Arc::new(JsonFileArtifact::new(dir.path().join("absent.json"))));
    assert!(m.search("echo", 10).await.is_err());
    assert_eq!(m.state(), LifecycleState::Uninitialized);
}

#[tokio::test]
async fn refresh_rebuilds_only_on_change() {
    let source = ScriptedSource::new(blog());
    let m = manager(&source);
    m.initialize().await.expect("init");
    assert!(!m.refresh().await.expect("refresh"));
    assert_eq!(m.build_count(), 1);

    source.replace(vec![Document::new("kindle", "Kindle Paperwhite")]);
    assert!(m.refresh().await.expect("refresh"));
    assert_eq!(m.build_count(), 2);
    assert_eq!(ids(&m.search("kindle", 10).await.expect("search")), vec!["kindle"]);
}

#[tokio::test]
async fn browse_helpers_go_through_the_lifecycle() {
    let source = ScriptedSource::new(blog());
    let m = manager(&source);
    let recent = m.recent(1).await.expect("recent");
    assert_eq!(recent[0].id, "rode");
    assert!(m.related("echo", 5).await.expect("related").iter().all(|d| d.id != "echo"));
    assert_eq!(m.filter("review", "all").await.expect("filter").len(), 2);
    assert_eq!(m.build_count(), 1);
}
