//! Delimited-text encoding.
//!
//! Header plus one record per row; the grand total is not written (callers
//! get it out of band from [`RenderedReport`](super::RenderedReport)).

use super::{format_money, ReportTable};

const DELIMITER: char = ',';
const TERMINATOR: &str = "\n";

const HEADER: [&str; 7] = [
    "ID",
    "Nome",
    "Categoria",
    "Quantidade",
    "Estoque Mínimo",
    "Preço",
    "Valor Total",
];

pub(super) fn encode(table: &ReportTable<'_>) -> Vec<u8> {
    let mut out = String::new();
    push_record(&mut out, HEADER.iter().map(|h| h.to_string()));

    for row in table.rows() {
        let p = row.product;
        push_record(
            &mut out,
            [
                p.id.to_string(),
                p.name.clone(),
                p.category.clone(),
                p.quantity.to_string(),
                p.min_stock.to_string(),
                format_money(p.price),
                format_money(row.line_value),
            ],
        );
    }

    out.into_bytes()
}

fn push_record(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(DELIMITER);
        }
        first = false;
        out.push_str(&escape_field(&field));
    }
    out.push_str(TERMINATOR);
}

/// Quote fields containing the delimiter, a quote or a line break; embedded
/// quotes are doubled.
fn escape_field(value: &str) -> String {
    if value.contains(DELIMITER) || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
