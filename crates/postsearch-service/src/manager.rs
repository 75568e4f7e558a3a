//! Index lifecycle: lazy build on first use, a single in-flight build shared
//! by every concurrent caller, explicit invalidation and rebuild, and the
//! degraded paths taken when the artifact or the content source misbehaves.
//!
//! ```text
//! Uninitialized --first use--> Building --ok--> Ready --rebuild--> Ready
//!       ^                         |                |
//!       +---------- error --------+                |
//!       +---------------- invalidate --------------+
//! ```
//!
//! The state mutex is never held across an await. Builds are tagged with the
//! generation they started in; `invalidate` and `rebuild_index` bump the
//! generation so an older build can finish but never publish.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use postsearch_core::artifact::JsonFileArtifact;
use postsearch_core::config::{resolve_with_base, SearchSettings, Settings};
use postsearch_core::content::{fingerprint, MarkdownDirectory};
use postsearch_core::traits::{ArtifactSource, ContentSource};
use postsearch_core::types::{DisplayFields, Document, SearchResult, StrategyKind};
use postsearch_core::{Error, Result};
use postsearch_text::BuildReport;

use crate::strategy::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Building,
    Ready,
}

/// A finished build: the engine plus what went into it.
#[derive(Clone)]
struct Loaded {
    engine: Arc<Engine>,
    report: BuildReport,
    fingerprint: u64,
}

type SharedLoad = Shared<BoxFuture<'static, Result<Loaded>>>;

struct InFlight {
    id: u64,
    generation: u64,
    load: SharedLoad,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    ready: Option<Loaded>,
    in_flight: Option<InFlight>,
    /// Substring engine over the documents of the last invalidated engine.
    stale: Option<Arc<Engine>>,
}

/// Everything a build needs, owned so the build future is `'static`.
#[derive(Clone)]
struct LoadContext {
    content: Option<Arc<dyn ContentSource>>,
    artifact: Option<Arc<dyn ArtifactSource>>,
    search: SearchSettings,
    timeout: Duration,
    builds: Arc<AtomicUsize>,
}

async fn with_timeout<T>(limit: Duration, operation: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { operation, after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX) }),
    }
}

impl LoadContext {
    async fn fetch(&self) -> Result<Vec<Document>> {
        let Some(content) = &self.content else {
            return Err(Error::ContentSource("no content source configured".into()));
        };
        with_timeout(self.timeout, "listing documents", content.list_documents()).await
    }

    fn indexed(&self, documents: Vec<Document>) -> Loaded {
        let (engine, report) = Engine::indexed(&documents, &self.search);
        Loaded { engine: Arc::new(engine), report, fingerprint: fingerprint(&documents) }
    }

    fn substring(&self, documents: Vec<Document>) -> Loaded {
        let (engine, report) = Engine::substring(&documents, &self.search);
        Loaded { engine: Arc::new(engine), report, fingerprint: fingerprint(&documents) }
    }

    #[instrument(skip_all, fields(prefetched = prefetched.is_some()))]
    async fn load(self, prefetched: Option<Vec<Document>>) -> Result<Loaded> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(documents) = prefetched {
            return Ok(self.indexed(documents));
        }

        if let Some(artifact) = &self.artifact {
            match with_timeout(self.timeout, "loading the search artifact", artifact.load()).await {
                Ok(artifact) => {
                    debug!(version = %artifact.version, "search artifact loaded");
                    return Ok(self.indexed(artifact.into_documents()));
                }
                Err(e @ Error::ArtifactVersion { .. }) => {
                    warn!(error = %e, "rebuilding from the content source");
                }
                Err(e) => {
                    warn!(error = %e, "search artifact unavailable, using substring search");
                    return self.fetch().await.map(|documents| self.substring(documents));
                }
            }
        }

        let documents = self.fetch().await?;
        Ok(self.indexed(documents))
    }
}

/// Owns the published engine and every transition between states.
pub struct IndexManager {
    content: Option<Arc<dyn ContentSource>>,
    artifact: Option<Arc<dyn ArtifactSource>>,
    settings: Settings,
    inner: Mutex<Inner>,
    builds: Arc<AtomicUsize>,
    next_build: AtomicU64,
}

impl IndexManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            content: None,
            artifact: None,
            settings,
            inner: Mutex::new(Inner::default()),
            builds: Arc::new(AtomicUsize::new(0)),
            next_build: AtomicU64::new(0),
        }
    }

    /// Wire up the markdown directory and JSON artifact named in `settings`,
    /// resolving relative paths against `base`.
    pub fn from_settings(settings: Settings, base: &Path) -> Self {
        let content = settings.lifecycle.content_dir.as_ref().map(|dir| resolve_with_base(base, dir));
        let artifact = settings.lifecycle.artifact_path.as_ref().map(|p| resolve_with_base(base, p));
        let mut manager = Self::new(settings);
        if let Some(dir) = content {
            manager = manager.with_content_source(Arc::new(MarkdownDirectory::new(dir)));
        }
        if let Some(path) = artifact {
            manager = manager.with_artifact_source(Arc::new(JsonFileArtifact::new(path)));
        }
        manager
    }

    pub fn with_content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.content = Some(source);
        self
    }

    pub fn with_artifact_source(mut self, source: Arc<dyn ArtifactSource>) -> Self {
        self.artifact = Some(source);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> LifecycleState {
        let inner = self.inner.lock();
        if inner.ready.is_some() {
            LifecycleState::Ready
        } else if inner.in_flight.as_ref().is_some_and(|f| f.generation == inner.generation) {
            LifecycleState::Building
        } else {
            LifecycleState::Uninitialized
        }
    }

    /// Number of builds actually started since construction.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Strategy of the published engine, if any.
    pub fn strategy(&self) -> Option<StrategyKind> {
        self.inner.lock().ready.as_ref().map(|r| r.engine.kind())
    }

    /// Report of the build behind the published engine.
    pub fn last_report(&self) -> Option<BuildReport> {
        self.inner.lock().ready.as_ref().map(|r| r.report.clone())
    }

    fn context(&self) -> LoadContext {
        LoadContext {
            content: self.content.clone(),
            artifact: self.artifact.clone(),
            search: self.settings.search.clone(),
            timeout: Duration::from_millis(self.settings.lifecycle.load_timeout_ms),
            builds: self.builds.clone(),
        }
    }

    fn start(&self, inner: &mut Inner, prefetched: Option<Vec<Document>>) -> (u64, u64, SharedLoad) {
        let id = self.next_build.fetch_add(1, Ordering::SeqCst);
        let load = self.context().load(prefetched).boxed().shared();
        inner.in_flight = Some(InFlight { id, generation: inner.generation, load: load.clone() });
        (id, inner.generation, load)
    }

    fn join_or_start(&self, inner: &mut Inner) -> (u64, u64, SharedLoad) {
        if let Some(f) = inner.in_flight.as_ref().filter(|f| f.generation == inner.generation) {
            return (f.id, f.generation, f.load.clone());
        }
        self.start(inner, None)
    }

    /// Record the outcome of build `id`. Only a build from the current
    /// generation may publish.
    fn publish(&self, id: u64, generation: u64, result: &Result<Loaded>) {
        let mut inner = self.inner.lock();
        if inner.in_flight.as_ref().is_some_and(|f| f.id == id) {
            inner.in_flight = None;
        }
        if inner.generation != generation {
            debug!(build = id, "discarding superseded build");
            return;
        }
        match result {
            Ok(loaded) => {
                let fresh = !inner.ready.as_ref().is_some_and(|r| Arc::ptr_eq(&r.engine, &loaded.engine));
                if fresh {
                    info!(
                        build = id,
                        strategy = ?loaded.engine.kind(),
                        indexed = loaded.report.indexed,
                        skipped = loaded.report.skipped_count(),
                        "search engine ready"
                    );
                    inner.ready = Some(loaded.clone());
                    inner.stale = None;
                }
            }
            Err(e) => warn!(build = id, error = %e, "search engine build failed"),
        }
    }

    async fn await_build(&self, (id, generation, load): (u64, u64, SharedLoad)) -> Result<Loaded> {
        let result = load.await;
        self.publish(id, generation, &result);
        result
    }

    /// The published engine, building it first if necessary.
    pub async fn engine(&self) -> Result<Arc<Engine>> {
        let ticket = {
            let mut inner = self.inner.lock();
            if let Some(ready) = &inner.ready {
                return Ok(ready.engine.clone());
            }
            self.join_or_start(&mut inner)
        };
        self.await_build(ticket).await.map(|loaded| loaded.engine)
    }

    /// Build eagerly instead of on the first query.
    pub async fn initialize(&self) -> Result<BuildReport> {
        let ticket = {
            let mut inner = self.inner.lock();
            if let Some(ready) = &inner.ready {
                return Ok(ready.report.clone());
            }
            self.join_or_start(&mut inner)
        };
        self.await_build(ticket).await.map(|loaded| loaded.report)
    }

    /// The engine to answer from, or a substring engine over the last known
    /// documents when a build fails after an invalidation.
    async fn serving_engine(&self) -> Result<Arc<Engine>> {
        match self.engine().await {
            Ok(engine) => Ok(engine),
            Err(e) => {
                let stale = self.inner.lock().stale.clone();
                match stale {
                    Some(engine) => {
                        warn!(error = %e, documents = engine.len(), "serving substring results from the last known documents");
                        Ok(engine)
                    }
                    None => Err(e),
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        Ok(self.serving_engine().await?.search(query, limit))
    }

    pub async fn filter(&self, query: &str, category: &str) -> Result<Vec<DisplayFields>> {
        Ok(self.serving_engine().await?.filter(query, category))
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<DisplayFields>> {
        Ok(self.serving_engine().await?.recent(limit))
    }

    pub async fn related(&self, id: &str, limit: usize) -> Result<Vec<DisplayFields>> {
        Ok(self.serving_engine().await?.related(id, limit))
    }

    /// Drop the published engine. The next query builds again; until that
    /// succeeds, the old documents remain available to substring search.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if let Some(ready) = inner.ready.take() {
            inner.stale = Some(Arc::new(ready.engine.to_substring()));
        }
        info!(generation = inner.generation, "search engine invalidated");
    }

    async fn rebuild_with(&self, prefetched: Option<Vec<Document>>) -> Result<BuildReport> {
        let ticket = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            self.start(&mut inner, prefetched)
        };
        self.await_build(ticket).await.map(|loaded| loaded.report)
    }

    /// Build a fresh engine. The current one keeps serving meanwhile and
    /// stays published if the build fails.
    #[instrument(skip(self))]
    pub async fn rebuild_index(&self) -> Result<BuildReport> {
        self.rebuild_with(None).await
    }

    /// Rebuild only when the content source changed since the published
    /// build. Returns whether a rebuild happened.
    pub async fn refresh(&self) -> Result<bool> {
        let documents = self.context().fetch().await?;
        let current = fingerprint(&documents);
        let published = self.inner.lock().ready.as_ref().map(|r| r.fingerprint);
        if published == Some(current) {
            debug!(fingerprint = current, "content unchanged");
            return Ok(false);
        }
        self.rebuild_with(Some(documents)).await?;
        Ok(true)
    }
}
