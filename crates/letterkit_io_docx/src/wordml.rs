//! WordprocessingML helpers over [`XmlElement`]: runs, paragraphs, tables.

use crate::conf::TUP_BREAK_TYPES_SILENT;
use crate::xml::{XmlElement, XmlNode};

/// Inline containers whose runs still belong to the enclosing paragraph's visible text.
const TUP_INLINE_RUN_CONTAINERS: [&str; 4] = ["hyperlink", "ins", "smartTag", "fldSimple"];

/// Run children that carry text; everything else (`w:rPr`, drawings) is kept on rewrite.
const TUP_RUN_TEXT_CHILDREN: [&str; 6] = ["t", "tab", "br", "cr", "noBreakHyphen", "softHyphen"];

////////////////////////////////////////////////////////////////////////////////
// #region Runs

/// Visible text of one `w:r`, with `w:tab` as `\t` and line breaks as `\n`.
pub fn derive_run_text(run: &XmlElement) -> String {
    let mut c_out = String::new();
    for el in run.child_elements() {
        match crate::xml::local_name(&el.name) {
            "t" => c_out.push_str(&el.text()),
            "tab" => c_out.push('\t'),
            "br" => {
                let if_silent = el
                    .attribute("type")
                    .is_some_and(|c_type| TUP_BREAK_TYPES_SILENT.contains(&c_type));
                if !if_silent {
                    c_out.push('\n');
                }
            }
            "cr" => c_out.push('\n'),
            "noBreakHyphen" => c_out.push('-'),
            _ => {}
        }
    }
    c_out
}

/// Replace the text content of a run, keeping `w:rPr` and non-text children.
///
/// Tabs become `w:tab`, line breaks become `w:br`; empty text leaves only the
/// preserved children.
pub fn write_run_text(run: &mut XmlElement, text: &str) {
    run.children.retain(|node| match node {
        XmlNode::Element(el) => !TUP_RUN_TEXT_CHILDREN.contains(&crate::xml::local_name(&el.name)),
        _ => false,
    });

    let c_text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut c_chunk = String::new();
    for chr in c_text.chars() {
        match chr {
            '\t' | '\n' => {
                push_text_chunk(run, &mut c_chunk);
                let c_local = if chr == '\t' { "tab" } else { "br" };
                let el = XmlElement::new(run.qualify(c_local));
                run.children.push(XmlNode::Element(el));
            }
            _ => c_chunk.push(chr),
        }
    }
    push_text_chunk(run, &mut c_chunk);
}

fn push_text_chunk(run: &mut XmlElement, c_chunk: &mut String) {
    if c_chunk.is_empty() {
        return;
    }
    let mut el_t = XmlElement::new(run.qualify("t"));
    if c_chunk.starts_with(char::is_whitespace) || c_chunk.ends_with(char::is_whitespace) {
        el_t = el_t.with_attribute("xml:space", "preserve");
    }
    el_t.children.push(XmlNode::Text(std::mem::take(c_chunk)));
    run.children.push(XmlNode::Element(el_t));
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Paragraphs

/// Positions of the direct `w:r` children of a paragraph.
///
/// These are the runs the placeholder engine rewrites.
pub fn derive_direct_run_positions(paragraph: &XmlElement) -> Vec<usize> {
    paragraph
        .children
        .iter()
        .enumerate()
        .filter_map(|(n_idx, node)| match node {
            XmlNode::Element(el) if el.is("r") => Some(n_idx),
            _ => None,
        })
        .collect()
}

/// Visible text of a paragraph, including runs nested in hyperlinks and insertions.
pub fn derive_paragraph_text(paragraph: &XmlElement) -> String {
    let mut c_out = String::new();
    for el in paragraph.child_elements() {
        if el.is("r") {
            c_out.push_str(&derive_run_text(el));
        } else if TUP_INLINE_RUN_CONTAINERS
            .iter()
            .any(|c_local| el.is(c_local))
        {
            c_out.push_str(&derive_paragraph_text(el));
        }
    }
    c_out
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Tables

/// Direct `w:tr` children of a table.
pub fn derive_table_rows(table: &XmlElement) -> Vec<&XmlElement> {
    table.children_named("tr").collect()
}

/// Cell text: paragraph texts joined by `\n`.
pub fn derive_cell_text(cell: &XmlElement) -> String {
    cell.children_named("p")
        .map(derive_paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cell texts of one row, in order.
pub fn derive_row_texts(row: &XmlElement) -> Vec<String> {
    row.children_named("tc").map(derive_cell_text).collect()
}

/// Grid column count of a table.
///
/// Uses `w:tblGrid/w:gridCol`; tables without a grid fall back to the widest
/// row, counting `w:gridSpan`.
pub fn derive_table_column_count(table: &XmlElement) -> usize {
    let n_grid = table
        .find_child("tblGrid")
        .map(|grid| grid.children_named("gridCol").count())
        .unwrap_or(0);
    if n_grid > 0 {
        return n_grid;
    }
    derive_table_rows(table)
        .into_iter()
        .map(|row| row.children_named("tc").map(derive_cell_span).sum::<usize>())
        .max()
        .unwrap_or(0)
}

fn derive_cell_span(cell: &XmlElement) -> usize {
    cell.find_child("tcPr")
        .and_then(|tc_pr| tc_pr.find_child("gridSpan"))
        .and_then(|span| span.attribute("val"))
        .and_then(|c_val| c_val.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
