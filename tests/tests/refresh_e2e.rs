//! End-to-end tests for dashboard refresh runs.
//!
//! The orchestrator runs against in-memory stores and a mock query backend
//! that implement the production traits, so every code path except the
//! network transport is exercised.

use chrono::{Duration, NaiveDate};
use dashboard_core::family::members;
use dashboard_core::{CacheStore, MetricFamily, Platform, RefreshRequest, Timeframe};
use integration_tests::fixtures;
use integration_tests::mocks::{MockActivityStore, MockClock, MockQueryBackend};
use integration_tests::setup::{fast_retry_policy, TestContext};
use std::sync::Arc;
use worker::{MemoryCacheStore, ProcessWatermarkStore, RefreshOrchestrator, RetryExecutor};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

/// A segment that was never refreshed gets every active platform plus "all".
#[tokio::test]
async fn test_cold_start_refreshes_every_active_platform() {
    let ctx = TestContext::new();
    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());
    ctx.activity
        .record_activity(fixtures::SEGMENT, "slack", fixtures::before_t0());

    let outcome = ctx.refresh().await.expect("Refresh failed");

    assert!(!outcome.is_skipped());
    assert_eq!(outcome.slices_written(), 9);
    assert_eq!(outcome.watermark_before, None);
    assert_eq!(outcome.watermark_after, Some(fixtures::t0()));
    assert_eq!(outcome.scope.segment_id, fixtures::SEGMENT);

    assert_eq!(
        ctx.cache.writes(),
        fixtures::keys_for(&["all", "github", "slack"]),
        "Slices should be written timeframe by timeframe, all first"
    );
    assert_eq!(ctx.activity.watermark(fixtures::SEGMENT), Some(fixtures::t0()));

    let entry = ctx
        .cache
        .get(&fixtures::key(Timeframe::Last14Days, "github"))
        .expect("Missing github entry");
    assert_eq!(entry.refreshed_at, fixtures::t0());
    assert_eq!(entry.data.new_members.total, 3);
    assert_eq!(entry.data.activity.previous_period_total, 3);
}

/// Cold start with no recorded activity still refreshes the unfiltered view.
#[tokio::test]
async fn test_cold_start_without_activity_writes_all_only() {
    let ctx = TestContext::new();

    let outcome = ctx.refresh().await.expect("Refresh failed");

    assert_eq!(outcome.slices_written(), 3);
    assert_eq!(ctx.cache.writes(), fixtures::keys_for(&["all"]));
    assert_eq!(ctx.activity.watermark(fixtures::SEGMENT), Some(fixtures::t0()));
}

/// No activity after the watermark: no queries, no writes, watermark untouched.
#[tokio::test]
async fn test_no_new_activity_skips() {
    let ctx = TestContext::new();
    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());
    ctx.refresh().await.expect("Cold refresh failed");

    ctx.backend.clear();
    ctx.clock.set(fixtures::t1());
    let writes_before = ctx.cache.write_count();

    let outcome = ctx.refresh().await.expect("Refresh failed");

    assert!(outcome.is_skipped());
    assert_eq!(outcome.watermark_before, Some(fixtures::t0()));
    assert_eq!(outcome.watermark_after, None);
    assert_eq!(ctx.cache.write_count(), writes_before);
    assert_eq!(ctx.backend.request_count(), 0);
    assert_eq!(ctx.activity.watermark(fixtures::SEGMENT), Some(fixtures::t0()));
    assert_eq!(ctx.activity.watermark_writes().len(), 1);
}

/// Activity exactly at the watermark is not new.
#[tokio::test]
async fn test_activity_at_watermark_is_not_new() {
    let ctx = TestContext::new();
    ctx.refresh().await.expect("Cold refresh failed");

    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::t0());
    ctx.clock.set(fixtures::t1());

    let outcome = ctx.refresh().await.expect("Refresh failed");
    assert!(outcome.is_skipped());
}

/// Only platforms with new activity are recomputed; the rest keep their entries.
#[tokio::test]
async fn test_incremental_refresh_only_touches_active_platforms() {
    let ctx = TestContext::new();
    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());
    ctx.activity
        .record_activity(fixtures::SEGMENT, "slack", fixtures::before_t0());
    ctx.refresh().await.expect("Cold refresh failed");

    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::between_t0_t1());
    ctx.clock.set(fixtures::t1());
    ctx.backend.set_value(5);

    let outcome = ctx.refresh().await.expect("Refresh failed");

    assert_eq!(outcome.slices_written(), 6);
    assert_eq!(outcome.watermark_before, Some(fixtures::t0()));
    assert_eq!(outcome.watermark_after, Some(fixtures::t1()));
    assert_eq!(ctx.activity.watermark(fixtures::SEGMENT), Some(fixtures::t1()));

    let second_pass: Vec<_> = ctx.cache.writes().into_iter().skip(9).collect();
    assert_eq!(second_pass, fixtures::keys_for(&["all", "github"]));

    for timeframe in Timeframe::ALL {
        let github = ctx.cache.get(&fixtures::key(timeframe, "github")).unwrap();
        assert_eq!(github.refreshed_at, fixtures::t1());
        assert_eq!(github.data.active_members.total, 5);

        let slack = ctx.cache.get(&fixtures::key(timeframe, "slack")).unwrap();
        assert_eq!(slack.refreshed_at, fixtures::t0());
        assert_eq!(slack.data.active_members.total, 3);
    }
}

/// Recomputing over unchanged backend data produces identical entries.
#[tokio::test]
async fn test_refresh_is_idempotent() {
    let ctx = TestContext::new();
    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());
    ctx.refresh().await.expect("Cold refresh failed");
    let first = ctx.cache.entries();

    // New activity forces a second pass, but the clock stays put
    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::between_t0_t1());
    ctx.clock.set(fixtures::t0() + Duration::seconds(1));
    let outcome = ctx.refresh().await.expect("Refresh failed");
    assert_eq!(outcome.slices_written(), 6);

    let other = TestContext::new();
    other
        .activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());
    other.refresh().await.expect("Refresh failed");

    assert_eq!(first, other.cache.entries());
    assert_eq!(first.len(), ctx.cache.entries().len());
    for (key, entry) in ctx.cache.entries() {
        assert_eq!(entry.data, first[&key].data, "Data changed for {}", key);
    }
}

/// Steps run in a fixed order: resolve, watermark, plan, slices, advance.
#[tokio::test]
async fn test_step_order() {
    let ctx = TestContext::new();

    ctx.refresh().await.expect("Refresh failed");

    let mut expected = vec![
        "resolve-segment".to_string(),
        "read-watermark".to_string(),
        "plan-refresh".to_string(),
    ];
    for timeframe in Timeframe::ALL {
        let slice = format!("{}/{}/all", fixtures::SEGMENT, timeframe);
        for family in MetricFamily::ALL {
            expected.push(format!("compute:{}:{}", slice, family));
        }
        expected.push(format!("write:{}", slice));
    }
    expected.push("advance-watermark".to_string());

    assert_eq!(ctx.steps(), expected);
}

/// A skipped run stops right after planning.
#[tokio::test]
async fn test_skipped_run_steps() {
    let ctx = TestContext::new();
    ctx.refresh().await.expect("Cold refresh failed");
    ctx.orchestrator.executor().clear();

    ctx.refresh().await.expect("Refresh failed");

    assert_eq!(
        ctx.steps(),
        vec!["resolve-segment", "read-watermark", "plan-refresh"]
    );
}

/// An explicit segment with leaves is queried through its leaves.
#[tokio::test]
async fn test_explicit_segment_queries_leaves() {
    let ctx = TestContext::new();
    ctx.activity.record_activity("leaf-a", "discord", fixtures::before_t0());
    ctx.activity.record_activity("other", "slack", fixtures::before_t0());

    let request = RefreshRequest::for_tenant(fixtures::TENANT)
        .with_segment("parent", vec!["leaf-a".to_string(), "leaf-b".to_string()]);
    let outcome = ctx.orchestrator.run(&request).await.expect("Refresh failed");

    assert_eq!(outcome.scope.segment_id, "parent");
    assert_eq!(outcome.slices_written(), 6);
    assert!(!ctx.steps().contains(&"resolve-segment".to_string()));
    assert_eq!(ctx.activity.watermark("parent"), Some(fixtures::t0()));
    assert_eq!(ctx.activity.watermark(fixtures::SEGMENT), None);

    let requests = ctx.backend.requests();
    assert!(!requests.is_empty());
    for request in &requests {
        assert_eq!(
            request.filter_values(members::SEGMENTS_ID),
            Some(&["leaf-a".to_string(), "leaf-b".to_string()][..])
        );
    }

    let platforms: Vec<Platform> = ctx
        .cache
        .writes()
        .into_iter()
        .filter(|key| key.timeframe == Timeframe::Last7Days)
        .map(|key| key.platform)
        .collect();
    assert_eq!(platforms, vec![Platform::All, Platform::named("discord")]);
}

/// Totals query the current and previous periods; timeseries the full span.
#[tokio::test]
async fn test_query_windows() {
    let ctx = TestContext::new();

    ctx.refresh().await.expect("Refresh failed");

    let member_queries: Vec<_> = ctx
        .backend
        .requests()
        .into_iter()
        .filter(|r| r.measure == members::MEMBER_COUNT)
        .filter(|r| r.time_dimension == members::MEMBER_JOINED_AT)
        .take(3)
        .collect();

    assert_eq!(member_queries.len(), 3);
    assert_eq!(member_queries[0].date_range, (date(9), date(15)));
    assert!(!member_queries[0].raw_result);
    assert_eq!(member_queries[1].date_range, (date(2), date(8)));
    assert_eq!(member_queries[2].date_range, (date(2), date(15)));
    assert!(member_queries[2].raw_result);
    assert!(member_queries[2].granularity.is_some());
}

/// Breakdown timeseries stay inside the current period.
#[tokio::test]
async fn test_breakdown_windows() {
    let ctx = TestContext::new();

    ctx.refresh().await.expect("Refresh failed");

    let breakdowns: Vec<_> = ctx
        .backend
        .requests()
        .into_iter()
        .filter(|r| !r.dimensions.is_empty())
        .collect();

    // "all" of LAST_7_DAYS is refreshed first, one query per breakdown
    assert!(breakdowns.len() >= 2);
    for request in &breakdowns[..2] {
        assert_eq!(request.date_range, (date(9), date(15)));
        assert!(request.raw_result);
    }
    assert!(breakdowns.iter().all(|r| r.date_range.1 == date(15)));
}

/// Platform slices filter on the platform; the "all" slice does not.
#[tokio::test]
async fn test_platform_filter() {
    let ctx = TestContext::new();
    ctx.activity
        .record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());

    ctx.refresh().await.expect("Refresh failed");

    let requests = ctx.backend.requests();
    let filtered = requests
        .iter()
        .filter(|r| r.filter_values(members::ACTIVITY_PLATFORM).is_some())
        .count();
    let unfiltered = requests.len() - filtered;

    assert!(filtered > 0);
    assert_eq!(filtered, unfiltered, "Both slices issue the same queries");
    for request in &requests {
        assert_eq!(
            request.filter_values(members::IS_BOT),
            Some(&["false".to_string()][..])
        );
    }
}

/// The timeseries point lands on the backend's bucket date.
#[tokio::test]
async fn test_timeseries_is_stored() {
    let ctx = TestContext::new();

    ctx.refresh().await.expect("Refresh failed");

    let entry = ctx
        .cache
        .get(&fixtures::key(Timeframe::Last30Days, "all"))
        .unwrap();
    let series = &entry.data.new_organizations.timeseries;
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].date, date(15));
    assert_eq!(series[0].value, 3);
    assert_eq!(entry.data.activity.breakdowns.len(), 2);
}

/// Memory cache plus process watermarks: a restart loses both and starts cold.
#[tokio::test]
async fn test_restart_with_memory_backend_is_cold_start() {
    let backend = Arc::new(MockQueryBackend::new());
    let activity = Arc::new(MockActivityStore::new());
    let clock = Arc::new(MockClock::new(fixtures::t0()));
    activity.set_default_segment(fixtures::TENANT, fixtures::SEGMENT);
    activity.record_activity(fixtures::SEGMENT, "github", fixtures::before_t0());
    activity.record_activity(fixtures::SEGMENT, "slack", fixtures::before_t0());

    let start_process = || {
        let cache = Arc::new(MemoryCacheStore::new());
        let orchestrator = RefreshOrchestrator::new(
            Arc::new(ProcessWatermarkStore::new(activity.clone())),
            backend.clone(),
            cache.clone(),
            RetryExecutor::new(fast_retry_policy()),
        )
        .with_clock(clock.clone());
        (cache, orchestrator)
    };
    let request = RefreshRequest::for_tenant(fixtures::TENANT);

    let (_, first) = start_process();
    first.run(&request).await.expect("Refresh failed");
    clock.set(fixtures::t1());
    let outcome = first.run(&request).await.expect("Refresh failed");
    assert!(outcome.is_skipped());

    let (cache, restarted) = start_process();
    let outcome = restarted.run(&request).await.expect("Refresh failed");

    assert!(!outcome.is_skipped());
    assert_eq!(outcome.watermark_before, None);
    assert_eq!(outcome.slices_written(), 9);
    for key in fixtures::keys_for(&["all", "github", "slack"]) {
        assert!(
            cache.read(&key).await.unwrap().is_some(),
            "Missing {:?} after restart",
            key
        );
    }
    assert_eq!(
        activity.watermark(fixtures::SEGMENT),
        None,
        "The persistent watermark is never written"
    );
}
