// src/process/html_table.rs

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use crate::error::PanelError;
use crate::process::raw_table::RawTable;
use crate::process::utils::normalize_ws;

/// Placeholder in a contract header that matches the requested year.
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Expected shape of a scraped table: where it is and what its header says.
#[derive(Debug, Clone, Copy)]
pub struct TableContract {
    pub measure: &'static str,
    /// CSS selector for candidate `<table>` elements.
    pub selector: &'static str,
    /// Header labels, compared trimmed and case-insensitively.
    pub headers: &'static [&'static str],
}

impl TableContract {
    pub fn expected_headers(&self, year: i32) -> Vec<String> {
        self.headers
            .iter()
            .map(|h| h.replace(YEAR_PLACEHOLDER, &year.to_string()))
            .collect()
    }

    fn header_matches(&self, found: &[String], year: i32) -> bool {
        let expected = self.expected_headers(year);
        expected.len() == found.len()
            && expected
                .iter()
                .zip(found)
                .all(|(e, f)| e.to_lowercase() == f.to_lowercase())
    }
}

fn cell_text(cell: &ElementRef) -> String {
    normalize_ws(&cell.text().collect::<String>())
}

/// `th`/`td` children of a row, in document order.
fn row_cells<'a>(tr: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "th" | "td"))
        .collect()
}

/// Rows that belong to `table` itself, not to a table nested inside it.
fn own_rows<'a>(table: &ElementRef<'a>, tr_sel: &Selector) -> Vec<ElementRef<'a>> {
    table
        .select(tr_sel)
        .filter(|tr| {
            tr.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "table")
                .map(|a| a.id() == table.id())
                .unwrap_or(false)
        })
        .collect()
}

/// First row made only of `th` cells.
fn header_of(rows: &[ElementRef]) -> Option<(usize, Vec<String>)> {
    rows.iter().enumerate().find_map(|(i, tr)| {
        let cells = row_cells(tr);
        let all_th = !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th");
        all_th.then(|| (i, cells.iter().map(cell_text).collect()))
    })
}

/// Extract the first table matching `contract` from `html`.
///
/// Single-cell rows (notes, banners) are skipped; any other row whose width
/// differs from the header is a [`PanelError::TableShape`].
pub fn parse_table(html: &str, contract: &TableContract, year: i32) -> Result<RawTable> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse(contract.selector)
        .map_err(|e| anyhow!("invalid selector `{}`: {:?}", contract.selector, e))?;
    let tr_sel = Selector::parse("tr").map_err(|e| anyhow!("invalid selector `tr`: {:?}", e))?;

    let mut first_header: Option<Vec<String>> = None;

    for table in doc.select(&table_sel) {
        let rows = own_rows(&table, &tr_sel);
        let Some((header_idx, headers)) = header_of(&rows) else {
            continue;
        };
        if !contract.header_matches(&headers, year) {
            trace!(measure = contract.measure, ?headers, "skipping table with other header");
            first_header.get_or_insert(headers);
            continue;
        }

        let width = headers.len();
        let mut data = Vec::new();
        for (i, tr) in rows.iter().enumerate().skip(header_idx + 1) {
            let cells = row_cells(tr);
            if !cells.iter().any(|c| c.value().name() == "td") {
                continue;
            }
            if cells.len() == 1 {
                debug!(measure = contract.measure, year, row = i, "skipping annotation row");
                continue;
            }
            if cells.len() != width {
                return Err(PanelError::TableShape {
                    measure: contract.measure,
                    year,
                    row: i,
                    expected: width,
                    found: cells.len(),
                }
                .into());
            }
            data.push(cells.iter().map(cell_text).collect());
        }

        debug!(measure = contract.measure, year, rows = data.len(), "parsed table");
        return Ok(RawTable {
            headers,
            rows: data,
        });
    }

    match first_header {
        Some(found) => Err(PanelError::TableHeader {
            measure: contract.measure,
            year,
            expected: contract.expected_headers(year),
            found,
        }
        .into()),
        None => Err(PanelError::TableNotFound {
            measure: contract.measure,
            year,
            selector: contract.selector.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIRTHS: TableContract = TableContract {
        measure: "births",
        selector: "table.tabdados",
        headers: &["Município", "Nascim p/resid.mãe"],
    };

    const SPEND: TableContract = TableContract {
        measure: "spending",
        selector: "table",
        headers: &["Munic-BR", "{year}", "Total"],
    };

    #[test]
    fn parses_tabnet_table() -> Result<()> {
        let html = r#"<html><body>
            <table class="tabdados">
              <thead><tr><th>Município</th><th>Nascim p/resid.mãe</th></tr></thead>
              <tbody>
                <tr><td>Total</td><td>3.206.761</td></tr>
                <tr><td>110001 Alta Floresta D'Oeste</td><td>  412 </td></tr>
                <tr><td>110002 Ariquemes</td><td>1.502</td></tr>
              </tbody>
            </table></body></html>"#;
        let t = parse_table(html, &BIRTHS, 2000)?;
        assert_eq!(t.headers, vec!["Município", "Nascim p/resid.mãe"]);
        assert_eq!(t.rows.len(), 3);
        assert_eq!(t.rows[1], vec!["110001 Alta Floresta D'Oeste", "412"]);
        Ok(())
    }

    #[test]
    fn row_labels_in_th_and_notes_skipped() -> Result<()> {
        let html = r#"<table><tr><td>layout</td></tr></table>
            <table>
              <tr><th>Munic-BR</th><th>2005</th><th>Total</th></tr>
              <tr><th>Total</th><td>250,10</td><td>250,10</td></tr>
              <tr><th>110001 ALTA FLORESTA D'OESTE</th><td>1.201,55</td><td>1.201,55</td></tr>
              <tr><td colspan="3">Fonte: SIOPS</td></tr>
            </table>"#;
        let t = parse_table(html, &SPEND, 2005)?;
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1][0], "110001 ALTA FLORESTA D'OESTE");
        assert_eq!(t.rows[1][1], "1.201,55");
        Ok(())
    }

    #[test]
    fn header_mismatch_is_descriptive() {
        let html = r#"<table><tr><th>Munic-BR</th><th>2004</th><th>Total</th></tr>
            <tr><th>Total</th><td>1</td><td>1</td></tr></table>"#;
        let err = parse_table(html, &SPEND, 2005).unwrap_err();
        match err.downcast_ref::<PanelError>() {
            Some(PanelError::TableHeader { expected, found, .. }) => {
                assert_eq!(expected[1], "2005");
                assert_eq!(found[1], "2004");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn ragged_row_fails_fast() {
        let html = r#"<table class="tabdados">
            <tr><th>Município</th><th>Nascim p/resid.mãe</th></tr>
            <tr><td>110001 A</td><td>1</td><td>extra</td></tr></table>"#;
        let err = parse_table(html, &BIRTHS, 2001).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PanelError>(),
            Some(PanelError::TableShape { row: 1, expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn missing_table() {
        let err = parse_table("<p>manutenção</p>", &BIRTHS, 2001).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PanelError>(),
            Some(PanelError::TableNotFound { .. })
        ));
    }
}
