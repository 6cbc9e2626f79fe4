//! Product listing reports.
//!
//! Both encodings are produced from one [`ReportTable`]: rows keep the input
//! order, each row carries its exact line value, and the grand total is the
//! exact sum of those line values. Rounding to cents happens only when a
//! number is written out, so every encoding reports the same total.

mod csv;
mod pdf;

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, instrument};

use stockwise_inventory::Product;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Supported report encodings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// Delimited text.
    Csv,
    /// Paginated document.
    Pdf,
}

impl ReportFormat {
    pub const DEFAULT: ReportFormat = ReportFormat::Pdf;

    /// Resolve an optional caller-supplied format: absent or blank means
    /// [`ReportFormat::DEFAULT`], anything else is parsed case-insensitively.
    pub fn from_param(param: Option<&str>) -> AnalyticsResult<Self> {
        match param.map(str::trim) {
            None | Some("") => Ok(Self::DEFAULT),
            Some(s) => s.parse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv",
            ReportFormat::Pdf => "application/pdf",
        }
    }

    /// Suggested download file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "relatorio_estoque.csv",
            ReportFormat::Pdf => "relatorio_estoque.pdf",
        }
    }
}

impl core::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "pdf" => Ok(ReportFormat::Pdf),
            _ => Err(AnalyticsError::InvalidFormat(s.to_string())),
        }
    }
}

/// One product row with its derived line value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow<'a> {
    pub product: &'a Product,
    /// `price × quantity`, unrounded.
    pub line_value: Decimal,
}

/// Shared source of truth for every encoding of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable<'a> {
    rows: Vec<ReportRow<'a>>,
    grand_total: Decimal,
}

impl<'a> ReportTable<'a> {
    /// Rows in the given order (no re-sorting). Fails with
    /// [`AnalyticsError::Render`] when a line value or the grand total leaves
    /// the decimal range.
    pub fn new(products: &'a [Product]) -> AnalyticsResult<Self> {
        let rows = products
            .iter()
            .map(|product| {
                let line_value = product.line_value().ok_or_else(|| {
                    AnalyticsError::Render(format!("product {}: line value overflows", product.id))
                })?;
                Ok(ReportRow {
                    product,
                    line_value,
                })
            })
            .collect::<AnalyticsResult<Vec<ReportRow<'a>>>>()?;

        let grand_total = rows
            .iter()
            .try_fold(Decimal::ZERO, |acc, row| acc.checked_add(row.line_value))
            .ok_or_else(|| AnalyticsError::Render("grand total overflows".to_string()))?;

        Ok(Self { rows, grand_total })
    }

    pub fn rows(&self) -> &[ReportRow<'a>] {
        &self.rows
    }

    /// Exact Σ line values.
    pub fn grand_total(&self) -> Decimal {
        self.grand_total
    }
}

/// Encoded report plus the exact total it reconciles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub format: ReportFormat,
    pub bytes: Vec<u8>,
    /// Exact grand total; the document prints it rounded with [`format_money`].
    pub grand_total: Decimal,
    pub row_count: usize,
}

/// Renders product listings. Holds the generation timestamp printed on
/// documents so output is reproducible for a fixed clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReportRenderer {
    generated_at: DateTime<Utc>,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl ReportRenderer {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }

    /// Render with a raw format name; unsupported names fail before any encoding.
    pub fn render(&self, products: &[Product], format: &str) -> AnalyticsResult<RenderedReport> {
        let format: ReportFormat = format.parse()?;
        self.render_as(products, format)
    }

    #[instrument(skip(self, products), fields(rows = products.len()))]
    pub fn render_as(
        &self,
        products: &[Product],
        format: ReportFormat,
    ) -> AnalyticsResult<RenderedReport> {
        let table = ReportTable::new(products)?;

        let bytes = match format {
            ReportFormat::Csv => csv::encode(&table),
            ReportFormat::Pdf => pdf::encode(&table, self.generated_at)
                .map_err(|e| AnalyticsError::Render(e.to_string()))?,
        };

        debug!(bytes = bytes.len(), grand_total = %table.grand_total(), "report rendered");

        Ok(RenderedReport {
            format,
            bytes,
            grand_total: table.grand_total(),
            row_count: table.rows().len(),
        })
    }
}

/// Two-decimal representation, rounding half away from zero.
pub fn format_money(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use stockwise_core::ProductId;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 14, 30, 0).unwrap()
    }

    fn product(id: i64, name: &str, quantity: i64, price: Decimal) -> Product {
        Product::new(ProductId::new(id), name, "Tools", quantity, 10, price, fixed_time()).unwrap()
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    #[test]
    fn format_param_defaults_and_normalizes() {
        assert_eq!(ReportFormat::from_param(None).unwrap(), ReportFormat::Pdf);
        assert_eq!(ReportFormat::from_param(Some("")).unwrap(), ReportFormat::Pdf);
        assert_eq!(ReportFormat::from_param(Some("  ")).unwrap(), ReportFormat::Pdf);
        assert_eq!(ReportFormat::from_param(Some("CSV")).unwrap(), ReportFormat::Csv);
        assert_eq!(
            ReportFormat::from_param(Some("xml")),
            Err(AnalyticsError::InvalidFormat("xml".to_string()))
        );
    }

    #[test]
    fn content_types_and_file_names() {
        assert_eq!(ReportFormat::Csv.content_type(), "text/csv");
        assert_eq!(ReportFormat::Pdf.content_type(), "application/pdf");
        assert_eq!(ReportFormat::Csv.file_name(), "relatorio_estoque.csv");
        assert_eq!(ReportFormat::Pdf.file_name(), "relatorio_estoque.pdf");
    }

    #[test]
    fn money_rounds_half_away_from_zero_and_pads() {
        assert_eq!(format_money(dec!(12.5)), "12.50");
        assert_eq!(format_money(dec!(12)), "12.00");
        assert_eq!(format_money(dec!(0.005)), "0.01");
        assert_eq!(format_money(dec!(0.0049)), "0.00");
        assert_eq!(format_money(dec!(1234.565)), "1234.57");
    }

    #[test]
    fn table_keeps_input_order() {
        let products = vec![
            product(3, "C", 1, dec!(1)),
            product(1, "A", 1, dec!(1)),
            product(2, "B", 1, dec!(1)),
        ];
        let table = ReportTable::new(&products).unwrap();
        let ids: Vec<i64> = table.rows().iter().map(|r| r.product.id.get()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn grand_total_is_rounded_only_at_output() {
        // Three rows of 0.005 each: rounding per row would give 0.03, exact sum is 0.015.
        let products = vec![
            product(1, "A", 1, dec!(0.005)),
            product(2, "B", 1, dec!(0.005)),
            product(3, "C", 1, dec!(0.005)),
        ];
        let table = ReportTable::new(&products).unwrap();
        assert_eq!(table.grand_total(), dec!(0.015));
        assert_eq!(format_money(table.grand_total()), "0.02");
    }

    #[test]
    fn overflowing_line_value_fails_instead_of_panicking() {
        // Valid at construction, then mutated past what the decimal range can hold.
        let price = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let mut huge = product(1, "Ingot", 1, price);
        huge.quantity = 1_000_000_000;
        let renderer = ReportRenderer::new(fixed_time());

        for format in ["csv", "pdf"] {
            let err = renderer.render(std::slice::from_ref(&huge), format).unwrap_err();
            assert!(matches!(err, AnalyticsError::Render(ref msg) if msg.contains("line value")));
        }
    }

    #[test]
    fn overflowing_grand_total_fails_instead_of_panicking() {
        // Each line value fits; their sum does not.
        let big = Decimal::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);
        let products = vec![product(1, "A", 1, big), product(2, "B", 1, big)];

        let err = ReportTable::new(&products).unwrap_err();
        assert_eq!(err, AnalyticsError::Render("grand total overflows".to_string()));
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let renderer = ReportRenderer::new(fixed_time());
        let err = renderer.render(&[], "xml").unwrap_err();
        assert_eq!(err, AnalyticsError::InvalidFormat("xml".to_string()));
    }

    #[test]
    fn widget_example_reconciles_to_12_50() {
        let products = vec![product(1, "Widget", 5, dec!(2.50))];
        let renderer = ReportRenderer::new(fixed_time());

        let csv = renderer.render(&products, "csv").unwrap();
        let pdf = renderer.render(&products, "pdf").unwrap();

        assert_eq!(csv.grand_total, dec!(12.50));
        assert_eq!(pdf.grand_total, dec!(12.50));
        assert!(contains(&csv.bytes, "1,Widget,Tools,5,10,2.50,12.50\n"));
        assert!(contains(&pdf.bytes, "(R$ 12.50) Tj"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: both encodings reconcile to the same total, which is Σ price × quantity.
        #[test]
        fn encodings_report_identical_grand_totals(
            rows in prop::collection::vec((0i64..10_000, 0i64..1_000_000), 0..30)
        ) {
            let products: Vec<Product> = rows
                .iter()
                .enumerate()
                .map(|(i, (qty, mills))| product(i as i64, "Item", *qty, Decimal::new(*mills, 3)))
                .collect();
            let renderer = ReportRenderer::new(fixed_time());

            let csv = renderer.render_as(&products, ReportFormat::Csv).unwrap();
            let pdf = renderer.render_as(&products, ReportFormat::Pdf).unwrap();

            let expected: Decimal = products.iter().map(|p| p.price * Decimal::from(p.quantity)).sum();
            prop_assert_eq!(csv.grand_total, expected);
            prop_assert_eq!(pdf.grand_total, expected);
            prop_assert_eq!(csv.row_count, products.len());

            let printed = format!("(R$ {}) Tj", format_money(expected));
            prop_assert!(contains(&pdf.bytes, &printed));
        }
    }
}
