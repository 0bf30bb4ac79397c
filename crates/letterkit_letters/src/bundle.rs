//! ZIP bundle of generated letters.

use std::io::{Cursor, Write};

use zip::result::ZipResult;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::spec::SpecLetterOutput;

/// Deflate every output into one archive, entries in file-name order.
pub fn bundle_letters_zip(outputs: &[SpecLetterOutput]) -> ZipResult<Vec<u8>> {
    let mut l_outputs: Vec<&SpecLetterOutput> = outputs.iter().collect();
    l_outputs.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for output in l_outputs {
        writer.start_file(output.file_name.as_str(), options)?;
        writer.write_all(&output.v_bytes)?;
    }
    let cursor = writer.finish()?;
    tracing::debug!(entries = outputs.len(), "bundled letters");
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use super::bundle_letters_zip;
    use crate::spec::SpecLetterOutput;

    fn derive_output(file_name: &str, c_body: &str) -> SpecLetterOutput {
        SpecLetterOutput {
            group: file_name.to_string(),
            file_name: file_name.to_string(),
            n_rows: 1,
            v_bytes: c_body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn bundle_letters_zip_orders_entries_by_name() {
        let outputs = vec![
            derive_output("LETTER_b.docx", "second"),
            derive_output("LETTER_a.docx", "first"),
        ];
        let v_zip = bundle_letters_zip(&outputs).expect("bundle");

        let mut archive = ZipArchive::new(Cursor::new(v_zip)).expect("archive");
        assert_eq!(archive.len(), 2);
        let l_names: Vec<String> = (0..archive.len())
            .map(|n_idx| archive.by_index(n_idx).expect("entry").name().to_string())
            .collect();
        assert_eq!(l_names, vec!["LETTER_a.docx", "LETTER_b.docx"]);

        let mut c_body = String::new();
        archive
            .by_name("LETTER_b.docx")
            .expect("entry")
            .read_to_string(&mut c_body)
            .expect("read");
        assert_eq!(c_body, "second");
    }

    #[test]
    fn bundle_letters_zip_empty_is_valid_archive() {
        let v_zip = bundle_letters_zip(&[]).expect("bundle");
        let archive = ZipArchive::new(Cursor::new(v_zip)).expect("archive");
        assert_eq!(archive.len(), 0);
    }
}
