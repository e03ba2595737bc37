//! Metric aggregation over the query backend.
//!
//! One family of one slice costs three queries (current total, previous
//! total, daily timeseries over both periods) plus one dimensioned
//! timeseries per breakdown. Breakdowns cover the current period only.

use chrono::NaiveDate;
use dashboard_core::family::members;
use dashboard_core::query::{read_count, read_date, read_label};
use dashboard_core::{
    DashboardData, DateWindow, Granularity, MetricFamily, MetricSnapshot, OrderDirection,
    Platform, QueryBackend, QueryFilter, QueryRequest, Result, SegmentScope, TimeseriesPoint,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Computes metric snapshots for a slice.
#[derive(Clone)]
pub struct MetricAggregator {
    backend: Arc<dyn QueryBackend>,
}

impl MetricAggregator {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    /// Compute one family's snapshot. Backend errors propagate unchanged.
    pub async fn compute_family(
        &self,
        family: MetricFamily,
        scope: &SegmentScope,
        window: &DateWindow,
        platform: &Platform,
    ) -> Result<MetricSnapshot> {
        let total = self
            .total(family, scope, platform, window.current_dates())
            .await?;
        let previous_period_total = self
            .total(family, scope, platform, window.previous_dates())
            .await?;
        let timeseries = self
            .timeseries(family, scope, platform, window.full_span_dates(), &[])
            .await?;

        let mut breakdowns = BTreeMap::new();
        for breakdown in family.breakdowns() {
            let points = self
                .timeseries(
                    family,
                    scope,
                    platform,
                    window.current_dates(),
                    breakdown.dimensions(),
                )
                .await?;
            breakdowns.insert(*breakdown, points);
        }

        debug!(
            family = %family,
            segment_id = %scope.segment_id,
            platform = %platform,
            total = total,
            previous_period_total = previous_period_total,
            "Computed metric family"
        );

        Ok(MetricSnapshot {
            total,
            previous_period_total,
            timeseries,
            breakdowns,
        })
    }

    /// Compute every family for a slice, in [`MetricFamily::ALL`] order.
    pub async fn compute_dashboard(
        &self,
        scope: &SegmentScope,
        window: &DateWindow,
        platform: &Platform,
    ) -> Result<DashboardData> {
        let mut data = DashboardData::default();
        for family in MetricFamily::ALL {
            let snapshot = self.compute_family(family, scope, window, platform).await?;
            data.set_family(family, snapshot);
        }
        Ok(data)
    }

    async fn total(
        &self,
        family: MetricFamily,
        scope: &SegmentScope,
        platform: &Platform,
        range: (NaiveDate, NaiveDate),
    ) -> Result<u64> {
        let request = build_request(family, scope, platform, range, None, &[]);
        let response = self.backend.load(&request).await?;

        match response.rows().first() {
            Some(row) => read_count(row, family.measure()),
            None => Ok(0),
        }
    }

    async fn timeseries(
        &self,
        family: MetricFamily,
        scope: &SegmentScope,
        platform: &Platform,
        range: (NaiveDate, NaiveDate),
        dimensions: &[&str],
    ) -> Result<Vec<TimeseriesPoint>> {
        let request = build_request(
            family,
            scope,
            platform,
            range,
            Some(Granularity::Day),
            dimensions,
        );
        let response = self.backend.load(&request).await?;
        let bucket = request.time_bucket_key();

        let mut points = response
            .rows()
            .iter()
            .map(|row| {
                Ok(TimeseriesPoint {
                    date: read_date(row, &bucket)?,
                    value: read_count(row, family.measure())?,
                    dimensions: dimensions
                        .iter()
                        .map(|dim| (dim.to_string(), read_label(row, dim)))
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Stable, so rows of one day keep backend order
        points.sort_by_key(|point| point.date);
        Ok(points)
    }
}

/// Build a query with the exclusion, platform, and segment filters attached.
pub fn build_request(
    family: MetricFamily,
    scope: &SegmentScope,
    platform: &Platform,
    date_range: (NaiveDate, NaiveDate),
    granularity: Option<Granularity>,
    dimensions: &[&str],
) -> QueryRequest {
    let mut filters = vec![
        QueryFilter::equals(members::IS_TEAM_MEMBER, vec!["false".to_string()]),
        QueryFilter::equals(members::IS_BOT, vec!["false".to_string()]),
        QueryFilter::equals(members::IS_ORGANIZATION, vec!["false".to_string()]),
    ];

    if let Some(name) = platform.filter_value() {
        filters.push(QueryFilter::equals(
            members::ACTIVITY_PLATFORM,
            vec![name.to_string()],
        ));
    }

    filters.push(QueryFilter::equals(
        members::SEGMENTS_ID,
        scope.leaf_segment_ids.clone(),
    ));

    QueryRequest {
        measure: family.measure().to_string(),
        time_dimension: family.time_dimension().to_string(),
        date_range,
        granularity,
        order_by: vec![(family.time_dimension().to_string(), OrderDirection::Asc)],
        filters,
        dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
        raw_result: granularity.is_some(),
    }
}
