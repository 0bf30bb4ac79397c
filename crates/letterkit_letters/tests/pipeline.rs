use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use letterkit_io_docx::{DocxDocument, derive_paragraph_text, derive_row_texts, derive_table_rows};
use letterkit_io_xlsx::{SpecXlsxWriteOptions, read_dataset};
use letterkit_letters::{
    DictPlaceholders, DocxLetterRender, EnumGroupField, GroupLetterRender, LetterError,
    SpecColumnMapperOptions, SpecLetterBatchOptions, SpecNormalizedRow, SpecRowFilterOptions,
    build_index_workbook, bundle_letters_zip, filter_rows, generate_letters_per_group,
    generate_letters_with, map_columns, normalize_dataset, read_placeholders, validate_mapping,
};
use rust_xlsxwriter::{Format, Workbook};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

struct TestDir {
    path: PathBuf,
}

impl TestDir {
    fn new() -> Self {
        let n = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("letterkit_letters_test_{n}"));
        std::fs::create_dir_all(&path).expect("create test dir");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

const C_NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn build_docx(c_body_inner: &str) -> Vec<u8> {
    let c_document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{C_NS_W}"><w:body>{c_body_inner}<w:sectPr/></w:body></w:document>"#
    );
    let c_rels = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;
    let c_types = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (c_name, c_xml) in [
        ("[Content_Types].xml", c_types.to_string()),
        ("_rels/.rels", c_rels.to_string()),
        ("word/document.xml", c_document),
    ] {
        writer.start_file(c_name, options).expect("start file");
        writer.write_all(c_xml.as_bytes()).expect("write part");
    }
    writer.finish().expect("finish").into_inner()
}

fn build_table_xml(l_header: &[&str]) -> String {
    let c_grid: String = l_header.iter().map(|_| "<w:gridCol w:w=\"2000\"/>").collect();
    let c_cells: String = l_header
        .iter()
        .map(|c| format!("<w:tc><w:p><w:r><w:t>{c}</w:t></w:r></w:p></w:tc>"))
        .collect();
    format!("<w:tbl><w:tblGrid>{c_grid}</w:tblGrid><w:tr>{c_cells}</w:tr></w:tbl>")
}

fn build_template() -> Vec<u8> {
    build_docx(&format!(
        "<w:p><w:r><w:t xml:space=\"preserve\">Dear {{{{NA</w:t></w:r><w:r><w:t>ME}}}}</w:t></w:r></w:p>{}",
        build_table_xml(&["Nombre de la Mesa", "Nivel", "Fecha", "Dato transformador"])
    ))
}

/// Dataset sheet `Datos` plus a `Placeholders` sheet, saved under `dir`.
fn write_dataset_workbook(dir: &Path) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let fmt_date = Format::new().set_num_format("dd/mm/yyyy");

    let sheet = workbook.add_worksheet();
    sheet.set_name("Datos").expect("name");
    let l_headers = [
        "ACTOR",
        "Secretaría",
        "Nombre de la Mesa",
        "Nivel",
        "Fecha",
        "Dato Transformador",
    ];
    for (n_col, c) in l_headers.iter().enumerate() {
        sheet.write_string(0, n_col as u16, *c).expect("header");
    }
    let l_rows: [[&str; 6]; 5] = [
        ["Ana", "Secretaría de Hábitat", "Mesa A1", "Alto", "", "R1"],
        ["Bea", "Secretaría de Salud", "Mesa B1", "Bajo", "01/03/2024", "R2"],
        ["Ana", "Secretaría de Hábitat", "Mesa A2", "Medio", "", "R3"],
        ["Cruz", "", "Mesa C1", "Alto", "sin fecha", "R4"],
        ["Ana", "Secretaría de Hábitat", "Mesa A2", "Medio", "", "R3"],
    ];
    for (n_idx, l_row) in l_rows.iter().enumerate() {
        let n_row = n_idx as u32 + 1;
        for (n_col, c) in l_row.iter().enumerate() {
            if !c.is_empty() {
                sheet.write_string(n_row, n_col as u16, *c).expect("cell");
            }
        }
    }
    // 2024-01-01 as a formatted date cell, 2024-03-01 as a bare serial.
    sheet
        .write_number_with_format(1, 4, 45292.0, &fmt_date)
        .expect("date");
    sheet.write_number(3, 4, 45352.0).expect("serial");
    sheet.write_number(5, 4, 45352.0).expect("serial");

    let sheet_ph = workbook.add_worksheet();
    sheet_ph.set_name("Placeholders").expect("name");
    for (n_col, c) in ["Grupo", "Llave", "Valor"].iter().enumerate() {
        sheet_ph.write_string(0, n_col as u16, *c).expect("header");
    }
    sheet_ph.write_string(1, 0, "Ana").expect("cell");
    sheet_ph.write_string(1, 1, "NAME").expect("cell");
    sheet_ph.write_string(1, 2, "Ana Pérez").expect("cell");

    let path_xlsx = dir.join("dataset.xlsx");
    workbook.save(&path_xlsx).expect("save");
    std::fs::read(&path_xlsx).expect("read back")
}

fn load_rows(v_xlsx: &[u8]) -> Vec<SpecNormalizedRow> {
    let table = read_dataset(v_xlsx, Some("datos")).expect("dataset");
    let mapping = map_columns(&table.headers, &SpecColumnMapperOptions::default());
    validate_mapping(&mapping).expect("mapping");
    normalize_dataset(&table, &mapping).expect("normalize")
}

fn derive_table_texts(v_docx: &[u8]) -> Vec<Vec<String>> {
    let document = DocxDocument::from_bytes(v_docx).expect("load");
    let l_tables = document.body_tables();
    derive_table_rows(l_tables[0])
        .into_iter()
        .map(derive_row_texts)
        .collect()
}

fn derive_greeting(v_docx: &[u8]) -> String {
    let document = DocxDocument::from_bytes(v_docx).expect("load");
    let paragraph = document
        .body()
        .and_then(|body| body.find_child("p"))
        .expect("paragraph");
    derive_paragraph_text(paragraph)
}

#[test]
fn pipeline_generates_one_letter_per_actor() {
    let dir = TestDir::new();
    let v_xlsx = write_dataset_workbook(dir.path());

    let rows = load_rows(&v_xlsx);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].date_display, "01/01/2024");
    assert_eq!(rows[3].date_display, "");

    let options_filter = SpecRowFilterOptions {
        if_drop_duplicates: true,
        ..SpecRowFilterOptions::default()
    };
    let rows = filter_rows(rows, &options_filter);
    assert_eq!(rows.len(), 4);

    let placeholders = read_placeholders(&v_xlsx);
    let options = SpecLetterBatchOptions {
        if_newest_first: true,
        ..SpecLetterBatchOptions::default()
    };
    let report = generate_letters_per_group(&rows, &build_template(), Some(&placeholders), &options)
        .expect("batch");

    assert_eq!(report.error_count(), 0);
    let l_files: Vec<&str> = report.outputs.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(l_files, vec!["LETTER_Ana.docx", "LETTER_Bea.docx", "LETTER_Cruz.docx"]);

    let l_texts_ana = derive_table_texts(&report.outputs[0].v_bytes);
    assert_eq!(l_texts_ana.len(), 3);
    assert_eq!(l_texts_ana[1], vec!["Mesa A2", "Medio", "01/03/2024", "R3"]);
    assert_eq!(l_texts_ana[2], vec!["Mesa A1", "Alto", "01/01/2024", "R1"]);
    assert_eq!(derive_greeting(&report.outputs[0].v_bytes), "Dear Ana Pérez");
    assert_eq!(derive_greeting(&report.outputs[1].v_bytes), "Dear {{NAME}}");

    let l_index: Vec<(&str, usize)> = report
        .index
        .iter()
        .map(|entry| (entry.group.as_str(), entry.n_rows))
        .collect();
    assert_eq!(l_index, vec![("Ana", 2), ("Bea", 1), ("Cruz", 1)]);

    let v_index = build_index_workbook(&report, &SpecXlsxWriteOptions::default()).expect("index");
    let table_index = read_dataset(&v_index, Some("Summary")).expect("summary");
    assert_eq!(table_index.rows.len(), 3);

    let v_zip = bundle_letters_zip(&report.outputs).expect("zip");
    let archive = ZipArchive::new(Cursor::new(v_zip)).expect("archive");
    assert_eq!(archive.len(), 3);
}

#[test]
fn pipeline_groups_by_institution_with_sentinel() {
    let dir = TestDir::new();
    let rows = load_rows(&write_dataset_workbook(dir.path()));
    let options = SpecLetterBatchOptions {
        rule_group_field: EnumGroupField::Group,
        ..SpecLetterBatchOptions::default()
    };
    let report = generate_letters_per_group(&rows, &build_template(), None, &options).expect("batch");

    let l_files: Vec<(&str, &str)> = report
        .outputs
        .iter()
        .map(|o| (o.group.as_str(), o.file_name.as_str()))
        .collect();
    assert_eq!(
        l_files,
        vec![
            ("(no group)", "LETTER_no_group.docx"),
            ("Secretaría de Hábitat", "LETTER_Secretaria_de_Habitat.docx"),
            ("Secretaría de Salud", "LETTER_Secretaria_de_Salud.docx"),
        ]
    );
    assert_eq!(report.outputs[1].n_rows, 3);
}

/// Sends one group to a template without a four-column table.
struct SplitRender {
    render_ok: DocxLetterRender,
    render_broken: DocxLetterRender,
    group_broken: &'static str,
}

impl GroupLetterRender for SplitRender {
    fn render(
        &self,
        group: &str,
        rows: &[Vec<String>],
        placeholders: Option<&DictPlaceholders>,
    ) -> Result<Vec<u8>, LetterError> {
        if group == self.group_broken {
            self.render_broken.render(group, rows, placeholders)
        } else {
            self.render_ok.render(group, rows, placeholders)
        }
    }
}

#[test]
fn pipeline_partial_failure_keeps_other_groups() {
    let dir = TestDir::new();
    let rows = load_rows(&write_dataset_workbook(dir.path()));
    let options = SpecLetterBatchOptions {
        num_workers_max: Some(2),
        ..SpecLetterBatchOptions::default()
    };
    let render = SplitRender {
        render_ok: DocxLetterRender::from_template_bytes(&build_template(), &options)
            .expect("template"),
        render_broken: DocxLetterRender::from_template_bytes(
            &build_docx(&build_table_xml(&["a", "b", "c"])),
            &options,
        )
        .expect("template"),
        group_broken: "Bea",
    };

    let report = generate_letters_with(&rows, &render, None, &options);
    assert_eq!(report.output_count(), 2);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.index.len(), 2);
    assert_eq!(report.errors[0].group, "Bea");
    assert_eq!(
        report.errors[0].message,
        LetterError::NoTargetTable { n_tables: 1 }.to_string()
    );

    let v_index = build_index_workbook(&report, &SpecXlsxWriteOptions::default()).expect("index");
    let table_errors = read_dataset(&v_index, Some("Errors")).expect("errors sheet");
    assert_eq!(table_errors.rows.len(), 1);
}
