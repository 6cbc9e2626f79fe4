//! Entry point for analytics callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use stockwise_inventory::Product;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::report::{ReportFormat, ReportRenderer};
use crate::stats::{Aggregator, StatsSummary};
use crate::store::{ProductFilter, ProductQuery, RecordStore};

/// A finished report, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub format: ReportFormat,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: &'static str,
    pub grand_total: Decimal,
    pub row_count: usize,
}

/// Read-only analytics over a [`RecordStore`].
#[derive(Debug, Clone)]
pub struct AnalyticsFacade<S> {
    store: S,
}

impl<S> AnalyticsFacade<S>
where
    S: RecordStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Dashboard statistics for the current month. Never fails; see
    /// [`StatsSummary::degraded_metrics`].
    pub fn compute_stats(&self) -> StatsSummary {
        self.compute_stats_at(Utc::now())
    }

    pub fn compute_stats_at(&self, now: DateTime<Utc>) -> StatsSummary {
        let summary = Aggregator::new(&self.store).compute_stats_at(now);
        if !summary.is_complete() {
            warn!(degraded = ?summary.degraded_metrics(), "stats served with defaulted metrics");
        }
        summary
    }

    /// Filtered product listing.
    #[instrument(skip(self, query), err)]
    pub fn list_products(&self, query: &ProductQuery) -> AnalyticsResult<Vec<Product>> {
        let filter = ProductFilter::from(query);
        Ok(self.store.list_products(&filter)?)
    }

    /// Report over every product, stamped with the current time. `format`
    /// defaults to PDF when absent or blank.
    pub fn generate_report(&self, format: Option<&str>) -> AnalyticsResult<GeneratedReport> {
        let format = ReportFormat::from_param(format)?;
        self.generate_report_at(format, Utc::now())
    }

    /// Report over every product, stamped with `generated_at`.
    #[instrument(skip(self, format), fields(format = %format), err)]
    pub fn generate_report_at(
        &self,
        format: ReportFormat,
        generated_at: DateTime<Utc>,
    ) -> AnalyticsResult<GeneratedReport> {
        let products = self
            .store
            .list_products(&ProductFilter::all())
            .map_err(AnalyticsError::DataUnavailable)?;

        let rendered = ReportRenderer::new(generated_at).render_as(&products, format)?;

        info!(
            rows = rendered.row_count,
            bytes = rendered.bytes.len(),
            grand_total = %rendered.grand_total,
            "report generated"
        );

        Ok(GeneratedReport {
            format,
            content_type: format.content_type(),
            file_name: format.file_name(),
            grand_total: rendered.grand_total,
            row_count: rendered.row_count,
            bytes: rendered.bytes,
        })
    }
}
