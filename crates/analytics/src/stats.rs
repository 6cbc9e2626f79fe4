//! Dashboard statistics.
//!
//! [`Aggregator::compute_stats`] runs four independent metric queries against
//! the record store. A failing query does not abort the others: its value
//! falls back to zero/empty and the metric is listed in
//! [`StatsSummary::degraded_metrics`], so a caller can tell a real zero from a
//! missing one without the JSON payload changing shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use stockwise_core::MonthKey;
use stockwise_inventory::{MovementKind, Product};

use crate::store::{ProductPredicate, RecordStore, StoreResult};

/// Maximum number of low-stock products included in a summary.
pub const LOW_STOCK_SAMPLE_LIMIT: usize = 10;

/// Length of the movement histogram, in calendar months (current month included).
pub const MOVEMENT_WINDOW_MONTHS: usize = 6;

/// Inbound/outbound movement counts for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyMovement {
    /// Display label, e.g. `Jan 2006`.
    pub month: String,
    #[serde(rename = "entradas")]
    pub inbound: u64,
    #[serde(rename = "saidas")]
    pub outbound: u64,
    #[serde(skip)]
    pub key: MonthKey,
}

impl MonthlyMovement {
    pub fn empty(key: MonthKey) -> Self {
        Self {
            month: key.label(),
            inbound: 0,
            outbound: 0,
            key,
        }
    }
}

/// Product count and inventory value for one category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub count: u64,
    /// Σ price × quantity over the category. Serialized as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

impl CategoryBreakdown {
    /// Group `products` by exact category label, in label order. `None` if a
    /// line value or a category total overflows the decimal range.
    pub fn tally<'p>(products: impl IntoIterator<Item = &'p Product>) -> Option<Vec<Self>> {
        let mut groups: BTreeMap<&str, (u64, Decimal)> = BTreeMap::new();
        for p in products {
            let (count, value) = groups
                .entry(p.category.as_str())
                .or_insert((0, Decimal::ZERO));
            *count += 1;
            *value = value.checked_add(p.line_value()?)?;
        }
        Some(
            groups
                .into_iter()
                .map(|(category, (count, value))| CategoryBreakdown {
                    category: category.to_string(),
                    count,
                    value,
                })
                .collect(),
        )
    }
}

/// A metric of [`StatsSummary`] that could not be computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatsMetric {
    TotalProducts,
    LowStockCount,
    LowStockItems,
    MonthlyMovements,
    CategoryBreakdown,
}

impl StatsMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsMetric::TotalProducts => "total_products",
            StatsMetric::LowStockCount => "low_stock_products",
            StatsMetric::LowStockItems => "low_stock_items",
            StatsMetric::MonthlyMovements => "monthly_movements",
            StatsMetric::CategoryBreakdown => "category_breakdown",
        }
    }
}

impl core::fmt::Display for StatsMetric {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inventory dashboard snapshot. Recomputed per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub total_products: u64,
    pub low_stock_products: u64,
    /// Exactly [`MOVEMENT_WINDOW_MONTHS`] entries, oldest first.
    pub monthly_movements: Vec<MonthlyMovement>,
    /// One entry per distinct category; order is not significant.
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub low_stock_items: Vec<Product>,
    #[serde(skip)]
    degraded: Vec<StatsMetric>,
}

impl StatsSummary {
    /// Metrics that fell back to their default because the store failed.
    pub fn degraded_metrics(&self) -> &[StatsMetric] {
        &self.degraded
    }

    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Computes [`StatsSummary`] from a borrowed record store.
#[derive(Debug)]
pub struct Aggregator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> Aggregator<'a, S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Statistics anchored at the current UTC month.
    pub fn compute_stats(&self) -> StatsSummary {
        self.compute_stats_at(Utc::now())
    }

    /// Statistics anchored at the month containing `now`.
    #[instrument(skip(self), fields(anchor = %MonthKey::containing(&now)))]
    pub fn compute_stats_at(&self, now: DateTime<Utc>) -> StatsSummary {
        let mut degraded = Vec::new();

        let total_products = or_default(
            &mut degraded,
            StatsMetric::TotalProducts,
            self.store.count_products(ProductPredicate::All),
        );

        let low_stock_products = or_default(
            &mut degraded,
            StatsMetric::LowStockCount,
            self.store.count_products(ProductPredicate::LowStock),
        );

        let low_stock_items = or_default(
            &mut degraded,
            StatsMetric::LowStockItems,
            self.store.low_stock_products(LOW_STOCK_SAMPLE_LIMIT),
        );

        let monthly_movements = self.monthly_movements(now, &mut degraded);

        let category_breakdown = or_default(
            &mut degraded,
            StatsMetric::CategoryBreakdown,
            self.store.category_breakdown(),
        );

        debug!(
            total_products,
            low_stock_products,
            categories = category_breakdown.len(),
            degraded = degraded.len(),
            "stats computed"
        );

        StatsSummary {
            total_products,
            low_stock_products,
            monthly_movements,
            category_breakdown,
            low_stock_items,
            degraded,
        }
    }

    /// Zero-filled window of [`MOVEMENT_WINDOW_MONTHS`] months ending at `now`.
    fn monthly_movements(
        &self,
        now: DateTime<Utc>,
        degraded: &mut Vec<StatsMetric>,
    ) -> Vec<MonthlyMovement> {
        MonthKey::containing(&now)
            .trailing(MOVEMENT_WINDOW_MONTHS)
            .into_iter()
            .map(|key| {
                let mut entry = MonthlyMovement::empty(key);
                for kind in MovementKind::ALL {
                    let count = or_default(
                        degraded,
                        StatsMetric::MonthlyMovements,
                        self.store.count_movements(kind, key),
                    );
                    match kind {
                        MovementKind::Inbound => entry.inbound = count,
                        MovementKind::Outbound => entry.outbound = count,
                    }
                }
                entry
            })
            .collect()
    }
}

fn or_default<T: Default>(
    degraded: &mut Vec<StatsMetric>,
    metric: StatsMetric,
    result: StoreResult<T>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(metric = %metric, error = %e, "metric unavailable, using default");
            if !degraded.contains(&metric) {
                degraded.push(metric);
            }
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailOn, FakeStore};
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn single_low_stock_widget() {
        let store = FakeStore::new().with_product(1, "Widget", "Tools", 5, 10, dec!(2.50));
        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));

        assert_eq!(stats.total_products, 1);
        assert_eq!(stats.low_stock_products, 1);
        assert_eq!(stats.low_stock_items.len(), 1);
        assert_eq!(
            stats.category_breakdown,
            vec![CategoryBreakdown {
                category: "Tools".to_string(),
                count: 1,
                value: dec!(12.50),
            }]
        );
        assert_eq!(stats.monthly_movements.len(), MOVEMENT_WINDOW_MONTHS);
        assert!(stats.monthly_movements.iter().all(|m| m.inbound == 0 && m.outbound == 0));
        assert!(stats.is_complete());
    }

    #[test]
    fn empty_store_still_yields_full_window() {
        let store = FakeStore::new();
        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 1, 10));

        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.low_stock_products, 0);
        assert!(stats.category_breakdown.is_empty());
        assert!(stats.low_stock_items.is_empty());

        let labels: Vec<&str> = stats.monthly_movements.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Aug 2024", "Sep 2024", "Oct 2024", "Nov 2024", "Dec 2024", "Jan 2025"]
        );
    }

    #[test]
    fn movements_are_bucketed_by_calendar_month() {
        let store = FakeStore::new()
            .with_movement(MovementKind::Inbound, at(2025, 3, 1))
            .with_movement(MovementKind::Inbound, at(2025, 3, 31))
            .with_movement(MovementKind::Outbound, at(2025, 3, 2))
            .with_movement(MovementKind::Outbound, at(2024, 10, 5))
            // Outside the window (7 months back) and in the future.
            .with_movement(MovementKind::Inbound, at(2024, 9, 30))
            .with_movement(MovementKind::Inbound, at(2025, 4, 1));

        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));
        let m = &stats.monthly_movements;

        assert_eq!(m[0].key, MonthKey::new(2024, 10).unwrap());
        assert_eq!((m[0].inbound, m[0].outbound), (0, 1));
        assert_eq!((m[5].inbound, m[5].outbound), (2, 1));
        let total_in: u64 = m.iter().map(|e| e.inbound).sum();
        assert_eq!(total_in, 2);
    }

    #[test]
    fn low_stock_sample_is_capped() {
        let mut store = FakeStore::new();
        for i in 0..15 {
            store = store.with_product(i, "Bolt", "Hardware", 0, 1, dec!(0.10));
        }
        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));

        assert_eq!(stats.low_stock_products, 15);
        assert_eq!(stats.low_stock_items.len(), LOW_STOCK_SAMPLE_LIMIT);
    }

    #[test]
    fn categories_differing_in_case_stay_distinct() {
        let store = FakeStore::new()
            .with_product(1, "Hammer", "Tools", 2, 0, dec!(10))
            .with_product(2, "Saw", "tools", 1, 0, dec!(7.25));
        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));

        assert_eq!(stats.category_breakdown.len(), 2);
    }

    #[test]
    fn failed_metric_defaults_without_aborting_others() {
        let store = FakeStore::new()
            .with_product(1, "Widget", "Tools", 5, 10, dec!(2.50))
            .with_movement(MovementKind::Inbound, at(2025, 3, 2))
            .failing(FailOn::CountMovements)
            .failing(FailOn::CategoryBreakdown);

        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));

        assert_eq!(stats.total_products, 1);
        assert_eq!(stats.low_stock_products, 1);
        assert_eq!(stats.monthly_movements.len(), MOVEMENT_WINDOW_MONTHS);
        assert!(stats.monthly_movements.iter().all(|m| m.inbound == 0));
        assert!(stats.category_breakdown.is_empty());
        assert_eq!(
            stats.degraded_metrics(),
            &[StatsMetric::MonthlyMovements, StatsMetric::CategoryBreakdown]
        );
    }

    #[test]
    fn failed_counts_default_without_aborting_others() {
        let store = FakeStore::new()
            .with_product(1, "Widget", "Tools", 5, 10, dec!(2.50))
            .with_product(2, "Gadget", "Electronics", 20, 5, dec!(10))
            .with_movement(MovementKind::Outbound, at(2025, 3, 2))
            .failing(FailOn::CountProducts)
            .failing(FailOn::LowStockProducts);

        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));

        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.low_stock_products, 0);
        assert!(stats.low_stock_items.is_empty());

        assert_eq!(stats.monthly_movements.len(), MOVEMENT_WINDOW_MONTHS);
        assert_eq!(stats.monthly_movements[5].outbound, 1);
        assert_eq!(stats.category_breakdown.len(), 2);
        assert_eq!(
            stats.degraded_metrics(),
            &[
                StatsMetric::TotalProducts,
                StatsMetric::LowStockCount,
                StatsMetric::LowStockItems,
            ]
        );
    }

    #[test]
    fn overflowing_category_value_degrades_breakdown_only() {
        let big = Decimal::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);
        let store = FakeStore::new()
            .with_product(1, "Bulk", "Tools", 1, 0, big)
            .with_product(2, "Bulk", "Tools", 1, 0, big);

        assert!(CategoryBreakdown::tally(store.products()).is_none());

        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));
        assert_eq!(stats.total_products, 2);
        assert!(stats.category_breakdown.is_empty());
        assert_eq!(stats.degraded_metrics(), &[StatsMetric::CategoryBreakdown]);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let store = FakeStore::new().with_product(1, "Widget", "Tools", 5, 10, dec!(2.50));
        let stats = Aggregator::new(&store).compute_stats_at(at(2025, 3, 15));
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["total_products"], 1);
        assert_eq!(json["low_stock_products"], 1);
        assert_eq!(json["monthly_movements"][5]["month"], "Mar 2025");
        assert_eq!(json["monthly_movements"][5]["entradas"], 0);
        assert_eq!(json["monthly_movements"][5]["saidas"], 0);
        assert_eq!(json["category_breakdown"][0]["value"].as_f64(), Some(12.5));
        assert_eq!(json["low_stock_items"][0]["name"], "Widget");
        assert!(json.get("degraded").is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: counts and category values agree with a direct scan of the products.
        #[test]
        fn summary_agrees_with_product_scan(
            rows in prop::collection::vec(
                (0usize..4, 0i64..50, 0i64..50, 0i64..100_000),
                0..40,
            )
        ) {
            let categories = ["Tools", "tools", "Food", "Parts"];
            let mut store = FakeStore::new();
            for (i, (c, qty, min, cents)) in rows.iter().enumerate() {
                store = store.with_product(
                    i as i64,
                    "Item",
                    categories[*c],
                    *qty,
                    *min,
                    Decimal::new(*cents, 2),
                );
            }

            let stats = Aggregator::new(&store).compute_stats_at(at(2025, 6, 1));
            let products = store.products();

            prop_assert_eq!(stats.total_products, products.len() as u64);
            let low = products.iter().filter(|p| p.quantity <= p.min_stock).count() as u64;
            prop_assert_eq!(stats.low_stock_products, low);
            prop_assert!(stats.low_stock_items.len() <= LOW_STOCK_SAMPLE_LIMIT);
            prop_assert!(stats.low_stock_items.iter().all(|p| p.quantity <= p.min_stock));

            for entry in &stats.category_breakdown {
                let group: Vec<&Product> =
                    products.iter().filter(|p| p.category == entry.category).collect();
                prop_assert_eq!(entry.count, group.len() as u64);
                let value: Decimal = group.iter().map(|p| p.price * Decimal::from(p.quantity)).sum();
                prop_assert_eq!(entry.value, value);
            }
            let grouped: u64 = stats.category_breakdown.iter().map(|c| c.count).sum();
            prop_assert_eq!(grouped, products.len() as u64);
        }
    }
}
