//! Scheduled refresh rounds across tenants.

use std::sync::Arc;

use integration_tests::fixtures;
use integration_tests::mocks::{
    MockActivityStore, MockCacheStore, MockClock, MockQueryBackend, RecordingExecutor,
};
use worker::{RefreshConfig, RefreshOrchestrator, RefreshScheduler};

fn scheduler(
    tenants: &[&str],
    activity: Arc<MockActivityStore>,
    cache: Arc<MockCacheStore>,
) -> RefreshScheduler<RecordingExecutor> {
    let orchestrator = RefreshOrchestrator::new(
        activity,
        Arc::new(MockQueryBackend::new()),
        cache,
        RecordingExecutor::default(),
    )
    .with_clock(Arc::new(MockClock::new(fixtures::t0())));

    let config = RefreshConfig {
        tenants: tenants.iter().map(|t| t.to_string()).collect(),
        ..RefreshConfig::default()
    };
    RefreshScheduler::new(config, Arc::new(orchestrator))
}

/// One failing tenant does not stop the others.
#[tokio::test]
async fn test_round_refreshes_tenants_independently() {
    let activity = Arc::new(MockActivityStore::new());
    let cache = Arc::new(MockCacheStore::new());
    activity.set_default_segment(fixtures::TENANT, fixtures::SEGMENT);
    activity.set_default_segment("tenant-beta", "segment-beta");
    activity.record_activity("segment-beta", "discord", fixtures::before_t0());

    let scheduler = scheduler(
        &[fixtures::TENANT, "tenant-unknown", "tenant-beta"],
        activity.clone(),
        cache.clone(),
    );

    let results = scheduler.run_round().await;

    assert_eq!(results.len(), 3);
    let (tenant, acme) = &results[0];
    assert_eq!(tenant, fixtures::TENANT);
    assert_eq!(acme.as_ref().unwrap().slices_written(), 3);

    let (tenant, unknown) = &results[1];
    assert_eq!(tenant, "tenant-unknown");
    assert!(unknown.is_err());

    let (_, beta) = &results[2];
    assert_eq!(beta.as_ref().unwrap().slices_written(), 6);

    assert_eq!(cache.write_count(), 9);
    assert_eq!(activity.watermark(fixtures::SEGMENT), Some(fixtures::t0()));
    assert_eq!(activity.watermark("segment-beta"), Some(fixtures::t0()));
}

/// A second round with no new activity skips every tenant.
#[tokio::test]
async fn test_second_round_skips() {
    let activity = Arc::new(MockActivityStore::new());
    let cache = Arc::new(MockCacheStore::new());
    activity.set_default_segment(fixtures::TENANT, fixtures::SEGMENT);

    let scheduler = scheduler(&[fixtures::TENANT], activity, cache.clone());

    scheduler.run_round().await;
    let results = scheduler.run_round().await;

    assert!(results[0].1.as_ref().unwrap().is_skipped());
    assert_eq!(cache.write_count(), 3);
}

#[tokio::test]
async fn test_empty_round() {
    let scheduler = scheduler(
        &[],
        Arc::new(MockActivityStore::new()),
        Arc::new(MockCacheStore::new()),
    );

    assert!(scheduler.run_round().await.is_empty());
}
