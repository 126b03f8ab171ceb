use super::*;
use crate::{ManualClock, MemoryCache, RecordDb, SentimentLabel};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn posts() -> Vec<ScoredPost> {
    vec![
        ScoredPost { id: "1850000000000000001".into(), sentiment_label: SentimentLabel::Positive, sentiment_value: 3.0 },
        ScoredPost { id: "1850000000000000002".into(), sentiment_label: SentimentLabel::Neutral, sentiment_value: 0.0 },
        ScoredPost { id: "1850000000000000003".into(), sentiment_label: SentimentLabel::Negative, sentiment_value: -2.0 },
    ]
}

#[derive(Default)]
struct FakeSource {
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: Duration,
    posts: Vec<ScoredPost>,
}

impl FakeSource {
    fn with_posts(posts: Vec<ScoredPost>) -> Self {
        Self { posts, ..Default::default() }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchSource for FakeSource {
    async fn search(&self, _term: &str) -> Result<Vec<ScoredPost>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::UpstreamUnavailable("HTTP error: 503".into()));
        }
        Ok(self.posts.clone())
    }
}

struct CountingStore {
    db: RecordDb,
    exists: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.exists.fetch_add(1, Ordering::SeqCst);
        self.db.exists(key).await
    }

    async fn read(&self, key: &str) -> Result<Option<Snapshot>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.db.read(key).await
    }

    async fn write(&self, key: &str, snapshot: &Snapshot) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.db.write(key, snapshot).await
    }
}

struct CountingFast {
    cache: MemoryCache,
    writes: AtomicUsize,
}

#[async_trait]
impl FastCache for CountingFast {
    async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.cache.exists(key).await
    }

    async fn read(&self, key: &str) -> Result<Option<Snapshot>, Error> {
        self.cache.read(key).await
    }

    async fn write(&self, key: &str, snapshot: &Snapshot, ttl: Duration) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.cache.write(key, snapshot, ttl).await
    }
}

/// Tier that is always unreachable.
struct DownTier;

#[async_trait]
impl FastCache for DownTier {
    async fn exists(&self, _key: &str) -> Result<bool, Error> {
        Err(Error::StoreUnavailable("connection refused".into()))
    }

    async fn read(&self, _key: &str) -> Result<Option<Snapshot>, Error> {
        Err(Error::StoreUnavailable("connection refused".into()))
    }

    async fn write(&self, _key: &str, _snapshot: &Snapshot, _ttl: Duration) -> Result<(), Error> {
        Err(Error::StoreUnavailable("connection refused".into()))
    }
}

#[async_trait]
impl RecordStore for DownTier {
    async fn exists(&self, _key: &str) -> Result<bool, Error> {
        Err(Error::StoreUnavailable("connection refused".into()))
    }

    async fn read(&self, _key: &str) -> Result<Option<Snapshot>, Error> {
        Err(Error::StoreUnavailable("connection refused".into()))
    }

    async fn write(&self, _key: &str, _snapshot: &Snapshot) -> Result<(), Error> {
        Err(Error::StoreUnavailable("connection refused".into()))
    }
}

struct Harness {
    orchestrator: Arc<Orchestrator>,
    clock: ManualClock,
    fast: Arc<CountingFast>,
    durable: Arc<CountingStore>,
    source: Arc<FakeSource>,
}

impl Harness {
    async fn new(source: FakeSource) -> Self {
        Self::with_policy(source, FreshnessPolicy::default()).await
    }

    async fn with_policy(source: FakeSource, policy: FreshnessPolicy) -> Self {
        let clock = ManualClock::new(t0());
        let fast = Arc::new(CountingFast {
            cache: MemoryCache::new(NonZeroUsize::new(64).unwrap(), Arc::new(clock.clone())),
            writes: AtomicUsize::new(0),
        });
        let durable = Arc::new(CountingStore {
            db: RecordDb::open_in_memory().await.unwrap(),
            exists: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        });
        let source = Arc::new(source);
        let orchestrator = Arc::new(Orchestrator::new(
            fast.clone(),
            durable.clone(),
            source.clone(),
            Arc::new(clock.clone()),
            policy,
        ));
        Self { orchestrator, clock, fast, durable, source }
    }

    fn durable_reads(&self) -> usize {
        self.durable.reads.load(Ordering::SeqCst)
    }

    fn fast_writes(&self) -> usize {
        self.fast.writes.load(Ordering::SeqCst)
    }

    fn advance_hours(&self, hours: i64) {
        self.clock.advance(chrono::Duration::hours(hours));
    }
}

#[tokio::test]
async fn test_first_query_fetches_upstream_and_fills_both_tiers() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(resolution.origin, Origin::Upstream);
    assert_eq!(h.source.calls(), 1);
    assert_eq!(resolution.snapshot.key, "TWICE");
    assert_eq!(resolution.snapshot.timestamp, iso(t0()));
    assert_eq!(resolution.snapshot.data, posts());

    let durable = h.durable.db.read("TWICE-tracker").await.unwrap().unwrap();
    let fast = h.fast.cache.read("TWICE-tracker").await.unwrap().unwrap();
    assert_eq!(durable.data, posts());
    assert_eq!(fast, durable);
}

#[tokio::test]
async fn test_fresh_fast_entry_skips_durable_and_upstream() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;
    h.orchestrator.resolve("TWICE").await.unwrap();
    let exists_before = h.durable.exists.load(Ordering::SeqCst);
    let reads_before = h.durable_reads();

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(resolution.origin, Origin::FastCache);
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.durable_reads(), reads_before);
    assert_eq!(h.durable.exists.load(Ordering::SeqCst), exists_before);
}

#[tokio::test]
async fn test_expired_fast_entry_repopulated_from_durable() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;
    h.orchestrator.resolve("TWICE").await.unwrap();
    h.advance_hours(2);
    let reads_before = h.durable_reads();
    let writes_before = h.fast_writes();

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(resolution.origin, Origin::DurableStore);
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.durable_reads(), reads_before + 1);
    assert_eq!(h.fast_writes(), writes_before + 1);
    assert_eq!(resolution.snapshot.timestamp, iso(t0()));

    let fast = h.fast.cache.read("TWICE-tracker").await.unwrap().unwrap();
    assert_eq!(fast.timestamp, iso(t0()));
}

#[tokio::test]
async fn test_stale_durable_record_refetched() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;
    h.orchestrator.resolve("TWICE").await.unwrap();
    h.advance_hours(13);

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    let refetched_at = iso(t0() + chrono::Duration::hours(13));
    assert_eq!(resolution.origin, Origin::Upstream);
    assert_eq!(h.source.calls(), 2);
    assert_eq!(resolution.snapshot.timestamp, refetched_at);
    assert_eq!(h.durable.db.read("TWICE-tracker").await.unwrap().unwrap().timestamp, refetched_at);
    assert_eq!(h.fast.cache.read("TWICE-tracker").await.unwrap().unwrap().timestamp, refetched_at);
}

#[tokio::test]
async fn test_repeated_resolve_is_byte_identical() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;

    let first = h.orchestrator.resolve("TWICE").await.unwrap();
    let second = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(second.origin, Origin::FastCache);
    assert_eq!(serde_json::to_vec(&first.snapshot).unwrap(), serde_json::to_vec(&second.snapshot).unwrap());
}

#[tokio::test]
async fn test_age_equal_to_window_is_stale() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;
    h.orchestrator.resolve("TWICE").await.unwrap();
    h.advance_hours(12);

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(resolution.origin, Origin::Upstream);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_twelve_hour_window_one_hour_ttl_scenario() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;

    let at_t0 = h.orchestrator.resolve("TWICE").await.unwrap();
    assert_eq!(at_t0.snapshot.timestamp, iso(t0()));
    assert_eq!(h.source.calls(), 1);

    h.advance_hours(2);
    let at_t2 = h.orchestrator.resolve("TWICE").await.unwrap();
    assert_eq!(at_t2.origin, Origin::DurableStore);
    assert_eq!(h.source.calls(), 1);

    h.advance_hours(11);
    let at_t13 = h.orchestrator.resolve("TWICE").await.unwrap();
    assert_eq!(at_t13.origin, Origin::Upstream);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_equivalent_encodings_share_key() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;

    h.orchestrator.resolve("stray kids").await.unwrap();
    let resolution = h.orchestrator.resolve("stray%20kids").await.unwrap();

    assert_eq!(resolution.origin, Origin::FastCache);
    assert_eq!(resolution.snapshot.key, "stray kids");
    assert_eq!(h.source.calls(), 1);
    assert!(h.durable.db.exists("stray%20kids-tracker").await.unwrap());
}

#[tokio::test]
async fn test_invalid_query_never_touches_tiers() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;

    let result = h.orchestrator.resolve("   ").await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(h.source.calls(), 0);
    assert_eq!(h.durable.exists.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_upstream_result_is_cached_success() {
    let h = Harness::new(FakeSource::with_posts(vec![])).await;

    let resolution = h.orchestrator.resolve("nothing matches this").await.unwrap();

    assert_eq!(resolution.origin, Origin::Upstream);
    assert!(resolution.snapshot.data.is_empty());
    assert!(h.durable.db.exists("nothing%20matches%20this-tracker").await.unwrap());
}

#[tokio::test]
async fn test_upstream_failure_without_snapshot_is_error() {
    let source = FakeSource::with_posts(posts());
    source.fail.store(true, Ordering::SeqCst);
    let h = Harness::new(source).await;

    let result = h.orchestrator.resolve("TWICE").await;

    assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    assert!(!h.durable.db.exists("TWICE-tracker").await.unwrap());
    assert!(h.fast.cache.is_empty());
}

#[tokio::test]
async fn test_upstream_failure_serves_stale_snapshot() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;
    h.orchestrator.resolve("TWICE").await.unwrap();
    h.advance_hours(13);
    h.source.fail.store(true, Ordering::SeqCst);

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(resolution.origin, Origin::StaleFallback);
    assert!(resolution.is_degraded());
    assert_eq!(resolution.snapshot.timestamp, iso(t0()));
    assert_eq!(resolution.snapshot.data, posts());
    assert_eq!(h.durable.db.read("TWICE-tracker").await.unwrap().unwrap().timestamp, iso(t0()));
}

#[tokio::test(start_paused = true)]
async fn test_upstream_timeout_is_distinct() {
    let source = FakeSource { delay: Duration::from_secs(30), ..FakeSource::with_posts(posts()) };
    let policy = FreshnessPolicy { upstream_timeout: Duration::from_millis(500), ..Default::default() };
    let h = Harness::with_policy(source, policy).await;

    let result = h.orchestrator.resolve("TWICE").await;

    assert!(matches!(result, Err(Error::UpstreamTimeout(_))));
}

#[tokio::test]
async fn test_malformed_durable_record_refetched() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;
    h.durable.db.put_body("TWICE-tracker", "{\"key\": 12").await.unwrap();

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(resolution.origin, Origin::Upstream);
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.durable.db.read("TWICE-tracker").await.unwrap().unwrap().data, posts());
}

#[tokio::test]
async fn test_durable_record_without_timestamp_refetched() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;
    h.durable
        .db
        .put_body("TWICE-tracker", r#"{"key":"TWICE","data":[]}"#)
        .await
        .unwrap();

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(resolution.origin, Origin::Upstream);
    assert_eq!(resolution.snapshot.timestamp, iso(t0()));
}

#[tokio::test]
async fn test_fast_cache_outage_falls_through() {
    let clock = ManualClock::new(t0());
    let db = RecordDb::open_in_memory().await.unwrap();
    let source = Arc::new(FakeSource::with_posts(posts()));
    let orchestrator = Orchestrator::new(
        Arc::new(DownTier),
        Arc::new(db.clone()),
        source.clone(),
        Arc::new(clock),
        FreshnessPolicy::default(),
    );

    let first = orchestrator.resolve("TWICE").await.unwrap();
    let second = orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(first.origin, Origin::Upstream);
    assert_eq!(second.origin, Origin::DurableStore);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_durable_outage_still_returns_fetched_snapshot() {
    let clock = ManualClock::new(t0());
    let fast = Arc::new(MemoryCache::new(NonZeroUsize::new(8).unwrap(), Arc::new(clock.clone())));
    let source = Arc::new(FakeSource::with_posts(posts()));
    let orchestrator =
        Orchestrator::new(fast.clone(), Arc::new(DownTier), source.clone(), Arc::new(clock), FreshnessPolicy::default());

    let first = orchestrator.resolve("TWICE").await.unwrap();
    let second = orchestrator.resolve("TWICE").await.unwrap();

    assert_eq!(first.origin, Origin::Upstream);
    assert_eq!(first.snapshot.data, posts());
    assert_eq!(second.origin, Origin::FastCache);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_one_upstream_call() {
    let source = FakeSource { delay: Duration::from_millis(50), ..FakeSource::with_posts(posts()) };
    let h = Harness::new(source).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let orchestrator = h.orchestrator.clone();
        tasks.spawn(async move { orchestrator.resolve("TWICE").await });
    }

    let mut origins = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        origins.push(joined.unwrap().unwrap().origin);
    }

    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.durable.writes.load(Ordering::SeqCst), 1);
    assert_eq!(origins.iter().filter(|o| **o == Origin::Upstream).count(), 1);
    assert_eq!(h.orchestrator.inflight.len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_one_failure() {
    let source = FakeSource { delay: Duration::from_millis(50), ..FakeSource::with_posts(posts()) };
    source.fail.store(true, Ordering::SeqCst);
    let h = Harness::new(source).await;

    let start = std::time::Instant::now();
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let orchestrator = h.orchestrator.clone();
        tasks.spawn(async move { orchestrator.resolve("TWICE").await });
    }

    while let Some(joined) = tasks.join_next().await {
        assert!(matches!(joined.unwrap(), Err(Error::UpstreamUnavailable(_))));
    }

    assert_eq!(h.source.calls(), 1);
    assert!(start.elapsed() < Duration::from_millis(400));
    assert_eq!(h.orchestrator.inflight.len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_share_one_stale_fallback() {
    let source = FakeSource { delay: Duration::from_millis(50), ..FakeSource::with_posts(posts()) };
    let h = Harness::new(source).await;
    h.orchestrator.resolve("TWICE").await.unwrap();
    h.advance_hours(13);
    h.source.fail.store(true, Ordering::SeqCst);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let orchestrator = h.orchestrator.clone();
        tasks.spawn(async move { orchestrator.resolve("TWICE").await });
    }

    while let Some(joined) = tasks.join_next().await {
        let resolution = joined.unwrap().unwrap();
        assert_eq!(resolution.origin, Origin::StaleFallback);
        assert_eq!(resolution.snapshot.timestamp, iso(t0()));
    }

    assert_eq!(h.source.calls(), 2);
    assert_eq!(h.orchestrator.inflight.len(), 0);
}

#[tokio::test]
async fn test_failure_not_replayed_to_later_callers() {
    let source = FakeSource::with_posts(posts());
    source.fail.store(true, Ordering::SeqCst);
    let h = Harness::new(source).await;

    assert!(h.orchestrator.resolve("TWICE").await.is_err());
    h.source.fail.store(false, Ordering::SeqCst);

    let resolution = h.orchestrator.resolve("TWICE").await.unwrap();
    assert_eq!(resolution.origin, Origin::Upstream);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_resolve_query_keeps_literal_percent() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;

    let literal = Query::from_decoded("100%25").unwrap();
    let resolution = h.orchestrator.resolve_query(&literal).await.unwrap();

    assert_eq!(resolution.snapshot.key, "100%25");
    assert!(h.durable.db.exists("100%2525-tracker").await.unwrap());
}

#[tokio::test]
async fn test_different_keys_resolve_independently() {
    let h = Harness::new(FakeSource::with_posts(posts())).await;

    h.orchestrator.resolve("TWICE").await.unwrap();
    let other = h.orchestrator.resolve("Russia").await.unwrap();

    assert_eq!(other.origin, Origin::Upstream);
    assert_eq!(other.snapshot.key, "Russia");
    assert_eq!(h.source.calls(), 2);
}
