//! Run-safe `{{KEY}}` substitution.
//!
//! Word splits visible text across runs at arbitrary points, so a token such
//! as `{{NAME}}` may live in three runs. Each paragraph's direct runs are read
//! as one string, substituted once, and written back: the full result goes to
//! the first run and the remaining runs are emptied. Paragraphs without a
//! resolved token are never touched.

use std::collections::BTreeMap;

use regex::Regex;

use crate::package::DocxDocument;
use crate::spec::{DocxError, SpecPlaceholderOptions, SpecPlaceholderReport};
use crate::wordml::{derive_direct_run_positions, derive_run_text, write_run_text};
use crate::xml::{XmlElement, XmlNode};

/// Compile the token pattern for a delimiter pair and a set of known keys.
///
/// Only `open + key + close` for a key in `dict_tokens` matches, so a stray
/// opening delimiter never hides a real token that follows it.
pub fn derive_token_pattern(
    options: &SpecPlaceholderOptions,
    dict_tokens: &BTreeMap<String, String>,
) -> Result<Regex, DocxError> {
    if options.token_open.is_empty() || options.token_close.is_empty() {
        return Err(DocxError::InvalidPattern(
            "placeholder delimiters must not be empty".to_string(),
        ));
    }
    let c_keys = dict_tokens
        .keys()
        .map(|c_key| regex::escape(c_key))
        .collect::<Vec<_>>()
        .join("|");
    let c_pattern = format!(
        "{}({}){}",
        regex::escape(&options.token_open),
        c_keys,
        regex::escape(&options.token_close)
    );
    Regex::new(&c_pattern).map_err(|err| DocxError::InvalidPattern(err.to_string()))
}

/// Replace every known token in `text` in a single left-to-right pass.
///
/// Unknown tokens stay verbatim and replacement values are never re-scanned.
/// Returns `None` when nothing was replaced.
pub fn substitute_text(
    text: &str,
    dict_tokens: &BTreeMap<String, String>,
    pattern: &Regex,
) -> Option<(String, usize)> {
    let mut cnt_replacements = 0;
    let c_out = pattern.replace_all(text, |caps: &regex::Captures<'_>| {
        match dict_tokens.get(&caps[1]) {
            Some(c_value) => {
                cnt_replacements += 1;
                c_value.clone()
            }
            None => caps[0].to_string(),
        }
    });
    (cnt_replacements > 0).then(|| (c_out.into_owned(), cnt_replacements))
}

/// Substitute tokens in every paragraph of the document.
///
/// Covers body paragraphs at any nesting depth (table cells, nested tables,
/// text boxes) and, unless disabled, header and footer parts. An empty
/// dictionary leaves the document unchanged.
pub fn substitute_placeholders(
    document: &mut DocxDocument,
    dict_tokens: &BTreeMap<String, String>,
    options: &SpecPlaceholderOptions,
) -> Result<SpecPlaceholderReport, DocxError> {
    let mut report = SpecPlaceholderReport::default();
    if dict_tokens.is_empty() {
        return Ok(report);
    }
    let pattern = derive_token_pattern(options, dict_tokens)?;

    for (c_part, root) in document.part_roots_mut(options.if_include_headers_footers) {
        let report_before = report;
        substitute_in_element(root, dict_tokens, &pattern, &mut report);
        tracing::debug!(
            part = c_part,
            paragraphs_changed = report.cnt_paragraphs_changed - report_before.cnt_paragraphs_changed,
            replacements = report.cnt_replacements - report_before.cnt_replacements,
            "substituted placeholders"
        );
    }
    Ok(report)
}

fn substitute_in_element(
    el: &mut XmlElement,
    dict_tokens: &BTreeMap<String, String>,
    pattern: &Regex,
    report: &mut SpecPlaceholderReport,
) {
    if el.is("p") {
        report.cnt_paragraphs += 1;
        if let Some(cnt) = substitute_in_paragraph(el, dict_tokens, pattern) {
            report.cnt_paragraphs_changed += 1;
            report.cnt_replacements += cnt;
        }
    }
    // Text boxes and nested tables carry their own paragraphs.
    for child in el.child_elements_mut() {
        substitute_in_element(child, dict_tokens, pattern, report);
    }
}

fn substitute_in_paragraph(
    paragraph: &mut XmlElement,
    dict_tokens: &BTreeMap<String, String>,
    pattern: &Regex,
) -> Option<usize> {
    let l_positions = derive_direct_run_positions(paragraph);
    let c_full: String = l_positions
        .iter()
        .filter_map(|n_pos| match &paragraph.children[*n_pos] {
            XmlNode::Element(run) => Some(derive_run_text(run)),
            _ => None,
        })
        .collect();

    let (c_new, cnt) = substitute_text(&c_full, dict_tokens, pattern)?;

    for (n_order, n_pos) in l_positions.iter().enumerate() {
        if let XmlNode::Element(run) = &mut paragraph.children[*n_pos] {
            write_run_text(run, if n_order == 0 { &c_new } else { "" });
        }
    }
    Some(cnt)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{derive_token_pattern, substitute_placeholders, substitute_text};
    use crate::package::DocxDocument;
    use crate::package::tests::{C_NS_W, build_docx, build_table_xml};
    use crate::spec::{DocxError, SpecPlaceholderOptions};
    use crate::wordml::{derive_paragraph_text, derive_run_text};
    use crate::xml::XmlElement;

    fn derive_dict(l_pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        l_pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn collect_paragraph_texts(el: &XmlElement, l_out: &mut Vec<String>) {
        if el.is("p") {
            l_out.push(derive_paragraph_text(el));
        }
        for child in el.child_elements() {
            collect_paragraph_texts(child, l_out);
        }
    }

    fn derive_body_paragraphs(document: &DocxDocument) -> Vec<String> {
        let mut l_out = Vec::new();
        if let Some(body) = document.body() {
            collect_paragraph_texts(body, &mut l_out);
        }
        l_out
    }

    #[test]
    fn substitute_placeholders_joins_split_runs() {
        let c_body = r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Dear {{NA</w:t></w:r><w:r><w:t>ME}},</w:t></w:r><w:r><w:t> hi</w:t></w:r></w:p>"#;
        let mut document = DocxDocument::from_bytes(&build_docx(c_body, &[])).expect("load");
        let report = substitute_placeholders(
            &mut document,
            &derive_dict(&[("NAME", "Alice")]),
            &SpecPlaceholderOptions::default(),
        )
        .expect("substitute");

        assert_eq!(report.cnt_replacements, 1);
        assert_eq!(report.cnt_paragraphs_changed, 1);
        let paragraph = document.body().and_then(|b| b.find_child("p")).expect("p");
        assert_eq!(derive_paragraph_text(paragraph), "Dear Alice, hi");
        let l_runs: Vec<String> = paragraph.children_named("r").map(derive_run_text).collect();
        assert_eq!(l_runs, vec!["Dear Alice, hi", "", ""]);
        let run_first = paragraph.find_child("r").expect("run");
        assert!(run_first.find_child("rPr").is_some());
    }

    #[test]
    fn substitute_placeholders_leaves_unknown_tokens_and_untouched_paragraphs() {
        let c_body = r#"<w:p><w:r><w:t>{{A}} and {{B}}</w:t></w:r></w:p><w:p><w:r><w:t>plain</w:t></w:r><w:r><w:t> text</w:t></w:r></w:p>"#;
        let mut document = DocxDocument::from_bytes(&build_docx(c_body, &[])).expect("load");
        let root_before = document.document_root().cloned();
        substitute_placeholders(
            &mut document,
            &derive_dict(&[("C", "x")]),
            &SpecPlaceholderOptions::default(),
        )
        .expect("substitute");
        assert_eq!(document.document_root().cloned(), root_before);

        substitute_placeholders(
            &mut document,
            &derive_dict(&[("A", "1")]),
            &SpecPlaceholderOptions::default(),
        )
        .expect("substitute");
        assert_eq!(derive_body_paragraphs(&document), vec!["1 and {{B}}", "plain text"]);
        let paragraph_plain = document
            .body()
            .and_then(|b| b.children_named("p").nth(1))
            .expect("second p");
        assert_eq!(paragraph_plain.children_named("r").count(), 2);
        assert_eq!(
            paragraph_plain.children_named("r").map(derive_run_text).collect::<Vec<_>>(),
            vec!["plain", " text"]
        );
    }

    #[test]
    fn substitute_placeholders_reaches_table_cells_and_headers() {
        let c_table = build_table_xml(&["{{WHO}}", "b", "c", "d"], &[]);
        let c_header = format!(
            r#"<w:hdr xmlns:w="{C_NS_W}"><w:p><w:r><w:t>Ref {{{{WHO}}}}</w:t></w:r></w:p></w:hdr>"#
        );
        let v_docx = build_docx(&c_table, &[("word/header1.xml", c_header.as_str())]);

        let mut document = DocxDocument::from_bytes(&v_docx).expect("load");
        let report = substitute_placeholders(
            &mut document,
            &derive_dict(&[("WHO", "Ops")]),
            &SpecPlaceholderOptions::default(),
        )
        .expect("substitute");
        assert_eq!(report.cnt_replacements, 2);
        assert_eq!(derive_body_paragraphs(&document)[0], "Ops");

        let mut document_body_only = DocxDocument::from_bytes(&v_docx).expect("load");
        let options = SpecPlaceholderOptions {
            if_include_headers_footers: false,
            ..SpecPlaceholderOptions::default()
        };
        let report = substitute_placeholders(
            &mut document_body_only,
            &derive_dict(&[("WHO", "Ops")]),
            &options,
        )
        .expect("substitute");
        assert_eq!(report.cnt_replacements, 1);
    }

    #[test]
    fn substitute_text_is_single_pass() {
        let dict_tokens = derive_dict(&[("A", "{{B}}"), ("B", "x")]);
        let pattern =
            derive_token_pattern(&SpecPlaceholderOptions::default(), &dict_tokens).expect("pattern");
        let (c_out, cnt) = substitute_text("{{A}}-{{B}}", &dict_tokens, &pattern).expect("changed");
        assert_eq!(c_out, "{{B}}-x");
        assert_eq!(cnt, 2);
        assert!(substitute_text("no tokens", &dict_tokens, &pattern).is_none());
    }

    #[test]
    fn substitute_text_keeps_tabs_and_breaks() {
        let dict_tokens = derive_dict(&[("K", "v")]);
        let pattern =
            derive_token_pattern(&SpecPlaceholderOptions::default(), &dict_tokens).expect("pattern");
        let (c_out, _) = substitute_text("a\t{{K}}\nb", &dict_tokens, &pattern).expect("changed");
        assert_eq!(c_out, "a\tv\nb");
    }

    #[test]
    fn derive_token_pattern_supports_custom_delimiters() {
        let options = SpecPlaceholderOptions {
            token_open: "[[".to_string(),
            token_close: "]]".to_string(),
            ..SpecPlaceholderOptions::default()
        };
        let dict_tokens = derive_dict(&[("X", "1")]);
        let pattern = derive_token_pattern(&options, &dict_tokens).expect("pattern");
        assert_eq!(
            substitute_text("[[X]] {{X}}", &dict_tokens, &pattern).map(|(c, _)| c),
            Some("1 {{X}}".to_string())
        );

        let options_bad = SpecPlaceholderOptions {
            token_open: String::new(),
            ..SpecPlaceholderOptions::default()
        };
        assert!(matches!(
            derive_token_pattern(&options_bad, &dict_tokens),
            Err(DocxError::InvalidPattern(_))
        ));
    }

    #[test]
    fn substitute_text_finds_token_after_stray_delimiter() {
        let dict_tokens = derive_dict(&[("NAME", "Alice")]);
        let pattern =
            derive_token_pattern(&SpecPlaceholderOptions::default(), &dict_tokens).expect("pattern");
        assert_eq!(
            substitute_text("Ref {{ draft; Dear {{NAME}}", &dict_tokens, &pattern),
            Some(("Ref {{ draft; Dear Alice".to_string(), 1))
        );
        assert_eq!(
            substitute_text("{{{NAME}}}", &dict_tokens, &pattern),
            Some(("{Alice}".to_string(), 1))
        );
        assert!(substitute_text("{{NAMES}} {{ NAME}}", &dict_tokens, &pattern).is_none());
    }

    #[test]
    fn substitute_text_prefers_full_key_over_prefix_key() {
        let dict_tokens = derive_dict(&[("A", "1"), ("AB", "2"), ("a.b", "3")]);
        let pattern =
            derive_token_pattern(&SpecPlaceholderOptions::default(), &dict_tokens).expect("pattern");
        assert_eq!(
            substitute_text("{{AB}} {{A}} {{a.b}} {{axb}}", &dict_tokens, &pattern),
            Some(("2 1 3 {{axb}}".to_string(), 3))
        );
    }
}
