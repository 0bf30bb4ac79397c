//! Target table discovery and body-row population.

use letterkit_text::normalize_header_text;

use crate::package::DocxDocument;
use crate::spec::{EnumTableFallback, SpecTableLocateOptions};
use crate::wordml::{derive_row_texts, derive_table_column_count, derive_table_rows, write_run_text};
use crate::xml::{XmlElement, XmlNode};

////////////////////////////////////////////////////////////////////////////////
// #region Locate

/// Indices of body tables whose grid has exactly `n_cols_expected` columns.
pub fn list_candidate_tables(document: &DocxDocument, n_cols_expected: usize) -> Vec<usize> {
    document
        .body_table_column_counts()
        .into_iter()
        .enumerate()
        .filter_map(|(n_idx, n_cols)| (n_cols == n_cols_expected).then_some(n_idx))
        .collect()
}

/// Whether a table's first row names every expected column.
///
/// Each expected column is satisfied when some header cell equals or contains
/// one of its phrases after normalization; cell position does not matter.
pub fn is_header_match(table: &XmlElement, headers_expected: &[Vec<String>]) -> bool {
    let Some(row_header) = derive_table_rows(table).into_iter().next() else {
        return false;
    };
    let l_headers: Vec<String> = derive_row_texts(row_header)
        .iter()
        .map(|c| normalize_header_text(c))
        .collect();

    headers_expected.iter().all(|l_phrases| {
        l_phrases.iter().any(|c_phrase| {
            let c_phrase = normalize_header_text(c_phrase);
            !c_phrase.is_empty()
                && l_headers
                    .iter()
                    .any(|c_header| *c_header == c_phrase || c_header.contains(&c_phrase))
        })
    })
}

/// Pick the body table that receives the letter rows.
///
/// 1. A preferred index wins when that table has the expected column count.
/// 2. Otherwise the first table whose header row matches.
/// 3. Otherwise the fallback candidate with the expected column count, chosen
///    per [`EnumTableFallback`] (last one by default).
pub fn locate_target_table(
    document: &DocxDocument,
    n_idx_preferred: Option<usize>,
    options: &SpecTableLocateOptions,
) -> Option<usize> {
    let l_tables = document.body_tables();

    if let Some(n_idx) = n_idx_preferred
        && let Some(table) = l_tables.get(n_idx)
        && derive_table_column_count(table) == options.n_cols_expected
    {
        tracing::debug!(table = n_idx, "using preferred table");
        return Some(n_idx);
    }

    let mut n_idx_first = None;
    let mut n_idx_last = None;
    for (n_idx, table) in l_tables.iter().enumerate() {
        if is_header_match(table, &options.headers_expected) {
            tracing::debug!(table = n_idx, "table header matches");
            return Some(n_idx);
        }
        if derive_table_column_count(table) == options.n_cols_expected {
            n_idx_first.get_or_insert(n_idx);
            n_idx_last = Some(n_idx);
        }
    }

    let n_idx_fallback = match options.rule_fallback {
        EnumTableFallback::Last => n_idx_last,
        EnumTableFallback::First => n_idx_first,
        EnumTableFallback::None => None,
    };
    tracing::debug!(table = ?n_idx_fallback, rule = ?options.rule_fallback, "table fallback");
    n_idx_fallback
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Populate

/// Remove every `w:tr` except the first (header) row.
///
/// Returns the removed rows in order.
pub fn clear_table_keep_header(table: &mut XmlElement) -> Vec<XmlElement> {
    let mut if_header_seen = false;
    let mut l_removed = Vec::new();
    let l_children = std::mem::take(&mut table.children);
    for node in l_children {
        match node {
            XmlNode::Element(el) if el.is("tr") => {
                if if_header_seen {
                    l_removed.push(el);
                } else {
                    if_header_seen = true;
                    table.children.push(XmlNode::Element(el));
                }
            }
            other => table.children.push(other),
        }
    }
    l_removed
}

/// Replace the body rows of `table` with `rows`.
///
/// The header row is left untouched. New rows copy the cell structure of the
/// first existing body row or, when the table has none, of the header row with
/// header-only shading and repeat flags stripped. At most `n_values_max`
/// values are written per row; cells without a value stay empty.
pub fn populate_table(table: &mut XmlElement, rows: &[Vec<String>], n_values_max: usize) {
    let n_cols = derive_table_column_count(table);
    let l_removed = clear_table_keep_header(table);
    let row_proto = match l_removed.into_iter().next() {
        Some(row) => derive_row_prototype(&row, false),
        None => match derive_table_rows(table).into_iter().next() {
            Some(row_header) => derive_row_prototype(row_header, true),
            None => derive_row_default(table, n_cols),
        },
    };

    for l_values in rows {
        let mut row = row_proto.clone();
        let n_values = usize::min(l_values.len(), n_values_max);
        for (n_idx_cell, cell) in row.child_elements_mut().filter(|el| el.is("tc")).enumerate() {
            if n_idx_cell < n_values {
                write_cell_text(cell, &l_values[n_idx_cell]);
            }
        }
        table.children.push(XmlNode::Element(row));
    }
}

/// Strip a row down to formatting only: row/cell properties plus one empty
/// paragraph per cell that keeps its paragraph and first-run properties.
fn derive_row_prototype(row: &XmlElement, if_from_header: bool) -> XmlElement {
    let mut row_proto = XmlElement {
        name: row.name.clone(),
        attributes: row
            .attributes
            .iter()
            .filter(|(c_key, _)| !c_key.ends_with("paraId") && !c_key.ends_with("textId"))
            .cloned()
            .collect(),
        children: Vec::new(),
    };

    for el in row.child_elements() {
        if el.is("trPr") {
            let mut tr_pr = el.clone();
            if if_from_header {
                tr_pr.children.retain(|node| {
                    !matches!(node, XmlNode::Element(child) if child.is("tblHeader"))
                });
            }
            row_proto.children.push(XmlNode::Element(tr_pr));
        } else if el.is("tblPrEx") {
            row_proto.children.push(XmlNode::Element(el.clone()));
        } else if el.is("tc") {
            row_proto
                .children
                .push(XmlNode::Element(derive_cell_prototype(el, if_from_header)));
        }
    }
    row_proto
}

fn derive_cell_prototype(cell: &XmlElement, if_from_header: bool) -> XmlElement {
    let mut cell_proto = XmlElement::new(cell.name.clone());
    if let Some(tc_pr) = cell.find_child("tcPr") {
        let mut tc_pr = tc_pr.clone();
        if if_from_header {
            tc_pr
                .children
                .retain(|node| !matches!(node, XmlNode::Element(child) if child.is("shd")));
        }
        cell_proto.children.push(XmlNode::Element(tc_pr));
    }

    let mut paragraph = XmlElement::new(cell.qualify("p"));
    let paragraph_src = cell.find_child("p");
    if let Some(p_pr) = paragraph_src.and_then(|p| p.find_child("pPr")) {
        paragraph.children.push(XmlNode::Element(p_pr.clone()));
    }
    let mut run = XmlElement::new(cell.qualify("r"));
    if !if_from_header
        && let Some(r_pr) = paragraph_src
            .and_then(|p| p.find_child("r"))
            .and_then(|r| r.find_child("rPr"))
    {
        run.children.push(XmlNode::Element(r_pr.clone()));
    }
    paragraph.children.push(XmlNode::Element(run));
    cell_proto.children.push(XmlNode::Element(paragraph));
    cell_proto
}

fn derive_row_default(table: &XmlElement, n_cols: usize) -> XmlElement {
    let mut row = XmlElement::new(table.qualify("tr"));
    for _ in 0..n_cols.max(1) {
        let paragraph = XmlElement::new(table.qualify("p")).with_child(XmlElement::new(table.qualify("r")));
        row.children.push(XmlNode::Element(
            XmlElement::new(table.qualify("tc")).with_child(paragraph),
        ));
    }
    row
}

/// Write `text` into the first run of the cell's first paragraph.
fn write_cell_text(cell: &mut XmlElement, text: &str) {
    let Some(paragraph) = cell.find_child_mut("p") else {
        return;
    };
    if paragraph.find_child("r").is_none() {
        let run = XmlElement::new(paragraph.qualify("r"));
        paragraph.children.push(XmlNode::Element(run));
    }
    if let Some(run) = paragraph.find_child_mut("r") {
        write_run_text(run, text);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
