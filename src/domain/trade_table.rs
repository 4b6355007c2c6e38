use itertools::Itertools;
use scraper::{ElementRef, Html};

const MAX_SPAN: usize = 1000;

/// Rectangular table of cell strings. The first row is the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradeTable {
    rows: Vec<Vec<String>>,
}

impl TradeTable {
    /// Pads ragged rows with empty cells up to the widest row.
    pub fn new(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, String::new());
        }
        TradeTable { rows }
    }

    /// Materialises the first `<table>` of `html`. `None` when the page has no table.
    pub fn from_html(html: &str) -> Option<Self> {
        let document = Html::parse_document(html);
        let table = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "table")?;

        Some(TradeTable::new(expand_spans(table_rows(table))))
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header.
    pub fn records(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// True when there is nothing beyond the header.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// UTF-8, comma-delimited, header row first.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(vec![]);

        for row in &self.rows {
            writer.write_record(row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush csv writer: {}", e.error()))?;

        Ok(String::from_utf8(bytes)?)
    }
}

struct RawCell {
    text: String,
    colspan: usize,
    rowspan: usize,
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Rows owned by `table` itself: head first, then body, then foot. Rows of nested tables are skipped.
fn table_rows(table: ElementRef) -> Vec<Vec<RawCell>> {
    let mut head = vec![];
    let mut body = vec![];
    let mut foot = vec![];

    for child in child_elements(table) {
        match child.value().name() {
            "thead" => head.extend(child_elements(child).filter(is_row)),
            "tbody" => body.extend(child_elements(child).filter(is_row)),
            "tfoot" => foot.extend(child_elements(child).filter(is_row)),
            "tr" => body.push(child),
            _ => {}
        }
    }

    head.into_iter()
        .chain(body)
        .chain(foot)
        .map(row_cells)
        .filter(|cells| !cells.is_empty())
        .collect()
}

fn is_row(el: &ElementRef) -> bool {
    el.value().name() == "tr"
}

fn row_cells(row: ElementRef) -> Vec<RawCell> {
    child_elements(row)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| RawCell {
            text: cell.text().flat_map(str::split_whitespace).join(" "),
            colspan: span_attr(&cell, "colspan"),
            rowspan: span_attr(&cell, "rowspan"),
        })
        .collect()
}

fn span_attr(cell: &ElementRef, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

/// Lays cells out on a grid, repeating spanned values across columns and down rows.
fn expand_spans(rows: Vec<Vec<RawCell>>) -> Vec<Vec<String>> {
    // Per column: rows still covered by a rowspan from above, and its value.
    let mut carried: Vec<(usize, String)> = vec![];
    let mut grid = Vec::with_capacity(rows.len());

    for cells in rows {
        let mut out: Vec<String> = vec![];
        let mut cells = cells.into_iter();

        loop {
            let col = out.len();
            if let Some((remaining, text)) = carried.get_mut(col).filter(|(r, _)| *r > 0) {
                *remaining -= 1;
                out.push(text.clone());
                continue;
            }

            let Some(cell) = cells.next() else { break };
            for _ in 0..cell.colspan {
                let col = out.len();
                if carried.len() <= col {
                    carried.resize(col + 1, (0, String::new()));
                }
                // A cell spanning into a carried column ends that rowspan.
                carried[col] = match cell.rowspan > 1 {
                    true => (cell.rowspan - 1, cell.text.clone()),
                    false => (0, String::new()),
                };
                out.push(cell.text.clone());
            }
        }

        // Rowspans reaching past the last cell of this row.
        if let Some(last) = carried.iter().rposition(|(r, _)| *r > 0) {
            while out.len() <= last {
                let col = out.len();
                match carried.get_mut(col) {
                    Some((remaining, text)) if *remaining > 0 => {
                        *remaining -= 1;
                        out.push(text.clone());
                    }
                    _ => out.push(String::new()),
                }
            }
        }

        grid.push(out);
    }

    grid
}
