//! Paginated-document encoding (PDF 1.4).
//!
//! Layout is computed in millimetres on an A4 portrait page and written with
//! the two standard Helvetica faces, so no font embedding is needed. Column
//! widths are fixed; text longer than its column is drawn as-is (neither
//! wrapped nor truncated). Rows that do not fit flow onto a new page with the
//! table header repeated; the grand-total line is printed once, after the
//! last row.

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use super::{format_money, ReportTable};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const BOTTOM_MARGIN_MM: f32 = 20.0;
const CELL_PADDING_MM: f32 = 1.0;

const TITLE: &str = "Relatório de Estoque - StockWise";
const CURRENCY: &str = "R$";

/// (label, width in mm). Sums to the 190 mm printable width.
const COLUMNS: [(&str, f32); 7] = [
    ("ID", 15.0),
    ("Nome", 50.0),
    ("Categoria", 30.0),
    ("Qtd", 20.0),
    ("Min", 20.0),
    ("Preço", 25.0),
    ("Total", 30.0),
];

const TITLE_SIZE: f32 = 16.0;
const DATE_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;
const TOTAL_SIZE: f32 = 10.0;

const HEADER_ROW_MM: f32 = 7.0;
const ROW_MM: f32 = 6.0;
const TOTAL_GAP_MM: f32 = 5.0;
const TOTAL_ROW_MM: f32 = 8.0;
const TOTAL_LABEL_WIDTH_MM: f32 = 160.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource(&self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

/// A single line of text placed on a page (millimetres from the top-left).
#[derive(Debug, Clone, PartialEq)]
struct TextRun {
    face: Face,
    size: f32,
    x: f32,
    baseline: f32,
    text: String,
}

#[derive(Debug, Default)]
struct Page {
    runs: Vec<TextRun>,
}

/// Cursor-based layout, one cell at a time, in the spirit of a report writer.
struct Layout {
    pages: Vec<Page>,
    x: f32,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            x: MARGIN_MM,
            y: MARGIN_MM,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.x = MARGIN_MM;
        self.y = MARGIN_MM;
    }

    fn fits(&self, height: f32) -> bool {
        self.y + height <= PAGE_HEIGHT_MM - BOTTOM_MARGIN_MM
    }

    /// Place `text` in a cell of `width` × `height` at the cursor and advance right.
    fn cell(&mut self, width: f32, height: f32, face: Face, size: f32, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            // Vertically centred, as a cell-based writer does.
            let baseline = self.y + height / 2.0 + 0.3 * pt_to_mm(size);
            let run = TextRun {
                face,
                size,
                x: self.x + CELL_PADDING_MM,
                baseline,
                text,
            };
            if let Some(page) = self.pages.last_mut() {
                page.runs.push(run);
            }
        }
        self.x += width;
    }

    fn line_break(&mut self, height: f32) {
        self.x = MARGIN_MM;
        self.y += height;
    }

    fn table_header(&mut self) {
        for (label, width) in COLUMNS {
            self.cell(width, HEADER_ROW_MM, Face::Bold, TABLE_SIZE, label);
        }
        self.line_break(HEADER_ROW_MM);
    }
}

fn lay_out(table: &ReportTable<'_>, generated_at: DateTime<Utc>) -> Vec<Page> {
    let mut layout = Layout::new();
    let printable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

    layout.cell(printable, 10.0, Face::Bold, TITLE_SIZE, TITLE);
    layout.line_break(15.0);

    layout.cell(
        printable,
        5.0,
        Face::Regular,
        DATE_SIZE,
        format!("Gerado em: {}", generated_at.format("%d/%m/%Y %H:%M")),
    );
    layout.line_break(10.0);

    layout.table_header();

    for row in table.rows() {
        if !layout.fits(ROW_MM) {
            layout.new_page();
            layout.table_header();
        }

        let p = row.product;
        let cells = [
            p.id.to_string(),
            p.name.clone(),
            p.category.clone(),
            p.quantity.to_string(),
            p.min_stock.to_string(),
            format!("{CURRENCY} {}", format_money(p.price)),
            format!("{CURRENCY} {}", format_money(row.line_value)),
        ];
        for ((_, width), text) in COLUMNS.iter().zip(cells) {
            layout.cell(*width, ROW_MM, Face::Regular, TABLE_SIZE, text);
        }
        layout.line_break(ROW_MM);
    }

    if !layout.fits(TOTAL_GAP_MM + TOTAL_ROW_MM) {
        layout.new_page();
    } else {
        layout.line_break(TOTAL_GAP_MM);
    }
    layout.cell(TOTAL_LABEL_WIDTH_MM, TOTAL_ROW_MM, Face::Bold, TOTAL_SIZE, "Total Geral:");
    layout.cell(
        printable - TOTAL_LABEL_WIDTH_MM,
        TOTAL_ROW_MM,
        Face::Bold,
        TOTAL_SIZE,
        format!("{CURRENCY} {}", format_money(table.grand_total())),
    );

    layout.pages
}

pub(super) fn encode(table: &ReportTable<'_>, generated_at: DateTime<Utc>) -> io::Result<Vec<u8>> {
    let pages = lay_out(table, generated_at);
    write_document(&pages, generated_at)
}

// Object numbers: 1 catalog, 2 page tree, 3-4 fonts, then a (page, content)
// pair per page, then the info dictionary.
const CATALOG: usize = 1;
const PAGE_TREE: usize = 2;
const FONT_REGULAR: usize = 3;
const FONT_BOLD: usize = 4;
const FIRST_PAGE: usize = 5;

fn write_document(pages: &[Page], generated_at: DateTime<Utc>) -> io::Result<Vec<u8>> {
    let info = FIRST_PAGE + 2 * pages.len();
    let mut w = ObjectWriter::new(info + 1);

    w.buf.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

    w.begin(CATALOG)?;
    write!(w.buf, "<< /Type /Catalog /Pages {PAGE_TREE} 0 R >>")?;
    w.end()?;

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE + 2 * i))
        .collect();
    w.begin(PAGE_TREE)?;
    write!(
        w.buf,
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    )?;
    w.end()?;

    for (id, base_font) in [(FONT_REGULAR, "Helvetica"), (FONT_BOLD, "Helvetica-Bold")] {
        w.begin(id)?;
        write!(
            w.buf,
            "<< /Type /Font /Subtype /Type1 /BaseFont /{base_font} /Encoding /WinAnsiEncoding >>"
        )?;
        w.end()?;
    }

    for (i, page) in pages.iter().enumerate() {
        let page_id = FIRST_PAGE + 2 * i;
        let content_id = page_id + 1;
        let content = content_stream(page)?;

        w.begin(page_id)?;
        write!(
            w.buf,
            "<< /Type /Page /Parent {PAGE_TREE} 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << /F1 {FONT_REGULAR} 0 R /F2 {FONT_BOLD} 0 R >> >> \
             /Contents {content_id} 0 R >>",
            mm_to_pt(PAGE_WIDTH_MM),
            mm_to_pt(PAGE_HEIGHT_MM),
        )?;
        w.end()?;

        w.begin(content_id)?;
        write!(w.buf, "<< /Length {} >>\nstream\n", content.len())?;
        w.buf.write_all(&content)?;
        w.buf.write_all(b"\nendstream")?;
        w.end()?;
    }

    w.begin(info)?;
    w.buf.write_all(b"<< /Title ")?;
    write_string(&mut w.buf, TITLE)?;
    write!(
        w.buf,
        " /Producer (StockWise) /CreationDate (D:{}Z) >>",
        generated_at.format("%Y%m%d%H%M%S")
    )?;
    w.end()?;

    w.finish(CATALOG, info)
}

fn content_stream(page: &Page) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    for run in &page.runs {
        write!(
            out,
            "BT /{} {:.1} Tf {:.2} {:.2} Td ",
            run.face.resource(),
            run.size,
            mm_to_pt(run.x),
            mm_to_pt(PAGE_HEIGHT_MM - run.baseline),
        )?;
        write_string(&mut out, &run.text)?;
        out.write_all(b" Tj ET\n")?;
    }
    Ok(out)
}

/// Tracks byte offsets of indirect objects for the cross-reference table.
struct ObjectWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new(object_count: usize) -> Self {
        Self {
            buf: Vec::new(),
            offsets: vec![0; object_count],
        }
    }

    fn begin(&mut self, id: usize) -> io::Result<()> {
        if let Some(slot) = self.offsets.get_mut(id) {
            *slot = self.buf.len();
        }
        write!(self.buf, "{id} 0 obj\n")
    }

    fn end(&mut self) -> io::Result<()> {
        self.buf.write_all(b"\nendobj\n")
    }

    fn finish(mut self, root: usize, info: usize) -> io::Result<Vec<u8>> {
        let xref_at = self.buf.len();
        let size = self.offsets.len();
        write!(self.buf, "xref\n0 {size}\n0000000000 65535 f \n")?;
        for offset in &self.offsets[1..] {
            write!(self.buf, "{offset:010} 00000 n \n")?;
        }
        write!(
            self.buf,
            "trailer\n<< /Size {size} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        )?;
        Ok(self.buf)
    }
}

/// Write a PDF literal string in WinAnsi encoding.
fn write_string(out: &mut Vec<u8>, text: &str) -> io::Result<()> {
    out.push(b'(');
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            _ => out.push(win_ansi(ch)),
        }
    }
    out.write_all(b")")
}

fn win_ansi(ch: char) -> u8 {
    match ch {
        ' '..='~' => ch as u8,
        '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '\t' | '\n' | '\r' => b' ',
        '€' => 0x80,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        _ => b'?',
    }
}

fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

fn pt_to_mm(pt: f32) -> f32 {
    pt * 25.4 / 72.0
}
