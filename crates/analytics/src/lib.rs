//! `stockwise-analytics`
//!
//! **Responsibility:** derived inventory analytics and exportable reports.
//!
//! - Reads products and stock movements through the [`RecordStore`] boundary only.
//! - Never mutates store state; every call recomputes from current data.
//! - [`Aggregator`] builds the dashboard [`StatsSummary`].
//! - [`ReportRenderer`] encodes a product listing as CSV or PDF with reconciled totals.
//! - [`AnalyticsFacade`] is the entrypoint callers (HTTP layer, CLI) use.

pub mod error;
pub mod facade;
pub mod report;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AnalyticsError, AnalyticsResult};
pub use facade::{AnalyticsFacade, GeneratedReport};
pub use report::{RenderedReport, ReportFormat, ReportRenderer, ReportRow, ReportTable};
pub use stats::{
    Aggregator, CategoryBreakdown, MonthlyMovement, StatsMetric, StatsSummary,
    LOW_STOCK_SAMPLE_LIMIT, MOVEMENT_WINDOW_MONTHS,
};
pub use store::{ProductFilter, ProductPredicate, ProductQuery, RecordStore, StoreError, StoreResult};
