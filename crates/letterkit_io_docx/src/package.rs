//! DOCX package model: ZIP entries plus parsed XML for the parts we edit.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::conf::{
    C_PART_DOCUMENT_DEFAULT, C_PART_PACKAGE_RELS, C_REL_TYPE_OFFICE_DOCUMENT_SUFFIX,
    TUP_PART_PREFIXES_HEADER_FOOTER,
};
use crate::spec::DocxError;
use crate::wordml::derive_table_column_count;
use crate::xml::{XmlElement, XmlTree, parse_xml_part, write_xml_part};

/// Raw package entry kept byte-for-byte unless its part is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SpecZipEntry {
    name: String,
    data: Vec<u8>,
    if_is_dir: bool,
    if_stored: bool,
}

/// In-memory DOCX document.
///
/// Cloning yields a fully independent copy; per-group letter builds each work
/// on their own clone of the loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxDocument {
    l_entries: Vec<SpecZipEntry>,
    name_part_document: String,
    dict_parts_xml: BTreeMap<String, XmlTree>,
}

impl DocxDocument {
    /// Load a package from bytes.
    ///
    /// Parses the main document part and every header/footer part.
    pub fn from_bytes(v_bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(v_bytes))
            .map_err(|err| DocxError::InvalidPackage(err.to_string()))?;

        let mut l_entries = Vec::with_capacity(archive.len());
        for n_idx in 0..archive.len() {
            let mut entry = archive
                .by_index(n_idx)
                .map_err(|err| DocxError::InvalidPackage(err.to_string()))?;
            let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry
                .read_to_end(&mut data)
                .map_err(|err| DocxError::Io(format!("{}: {err}", entry.name())))?;
            l_entries.push(SpecZipEntry {
                name: entry.name().to_string(),
                data,
                if_is_dir: entry.is_dir(),
                if_stored: entry.compression() == CompressionMethod::Stored,
            });
        }

        let name_part_document = derive_main_document_part(&l_entries);
        let mut dict_parts_xml = BTreeMap::new();
        for entry in &l_entries {
            if entry.if_is_dir {
                continue;
            }
            let if_is_editable = entry.name == name_part_document
                || TUP_PART_PREFIXES_HEADER_FOOTER
                    .iter()
                    .any(|c_prefix| entry.name.starts_with(c_prefix) && entry.name.ends_with(".xml"));
            if if_is_editable {
                dict_parts_xml.insert(entry.name.clone(), parse_xml_part(&entry.name, &entry.data)?);
            }
        }
        if !dict_parts_xml.contains_key(&name_part_document) {
            return Err(DocxError::MissingPart(name_part_document));
        }

        tracing::debug!(
            entries = l_entries.len(),
            parts_xml = dict_parts_xml.len(),
            main = %name_part_document,
            "loaded docx package"
        );

        Ok(Self {
            l_entries,
            name_part_document,
            dict_parts_xml,
        })
    }

    /// Serialize the package, re-encoding edited XML parts.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.l_entries {
            if entry.if_is_dir {
                writer
                    .add_directory(entry.name.clone(), FileOptions::default())
                    .map_err(|err| DocxError::Io(err.to_string()))?;
                continue;
            }
            let options = FileOptions::default().compression_method(if entry.if_stored {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            });
            writer
                .start_file(entry.name.clone(), options)
                .map_err(|err| DocxError::Io(err.to_string()))?;
            let res_write = match self.dict_parts_xml.get(&entry.name) {
                Some(tree) => writer.write_all(&write_xml_part(&entry.name, tree)?),
                None => writer.write_all(&entry.data),
            };
            res_write.map_err(|err| DocxError::Io(format!("{}: {err}", entry.name)))?;
        }
        let cursor = writer
            .finish()
            .map_err(|err| DocxError::Io(err.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Main document part name, usually `word/document.xml`.
    pub fn document_part_name(&self) -> &str {
        &self.name_part_document
    }

    /// Root element of the main document part.
    pub fn document_root(&self) -> Option<&XmlElement> {
        self.dict_parts_xml
            .get(&self.name_part_document)
            .map(|tree| &tree.root)
    }

    /// `w:body` of the main document.
    pub fn body(&self) -> Option<&XmlElement> {
        self.document_root().and_then(|root| root.find_child("body"))
    }

    fn body_mut(&mut self) -> Option<&mut XmlElement> {
        self.dict_parts_xml
            .get_mut(&self.name_part_document)
            .and_then(|tree| tree.root.find_child_mut("body"))
    }

    /// Tables that are direct children of the body, in document order.
    pub fn body_tables(&self) -> Vec<&XmlElement> {
        match self.body() {
            Some(body) => body.children_named("tbl").collect(),
            None => Vec::new(),
        }
    }

    /// Mutable body table by index.
    pub fn body_table_mut(&mut self, n_idx: usize) -> Result<&mut XmlElement, DocxError> {
        let n_tables = self.body_tables().len();
        self.body_mut()
            .and_then(|body| body.child_elements_mut().filter(|el| el.is("tbl")).nth(n_idx))
            .ok_or(DocxError::TableIndexOutOfRange { n_idx, n_tables })
    }

    /// Grid column count of every body table.
    pub fn body_table_column_counts(&self) -> Vec<usize> {
        self.body_tables()
            .into_iter()
            .map(derive_table_column_count)
            .collect()
    }

    /// Roots of every parsed part: main document first, then headers/footers.
    pub(crate) fn part_roots_mut(
        &mut self,
        if_include_headers_footers: bool,
    ) -> Vec<(&str, &mut XmlElement)> {
        let name_main = self.name_part_document.as_str();
        let mut l_roots: Vec<(&str, &mut XmlElement)> = Vec::new();
        for (c_name, tree) in self.dict_parts_xml.iter_mut() {
            if c_name == name_main || if_include_headers_footers {
                l_roots.push((c_name.as_str(), &mut tree.root));
            }
        }
        l_roots.sort_by_key(|(c_name, _)| *c_name != name_main);
        l_roots
    }
}

fn derive_main_document_part(l_entries: &[SpecZipEntry]) -> String {
    let Some(entry_rels) = l_entries.iter().find(|e| e.name == C_PART_PACKAGE_RELS) else {
        return C_PART_DOCUMENT_DEFAULT.to_string();
    };
    let Ok(tree) = parse_xml_part(&entry_rels.name, &entry_rels.data) else {
        return C_PART_DOCUMENT_DEFAULT.to_string();
    };
    tree.root
        .children_named("Relationship")
        .find(|rel| {
            rel.attribute("Type")
                .is_some_and(|c_type| c_type.ends_with(C_REL_TYPE_OFFICE_DOCUMENT_SUFFIX))
        })
        .and_then(|rel| rel.attribute("Target"))
        .map(|c_target| c_target.trim_start_matches('/').to_string())
        .filter(|c_target| l_entries.iter().any(|e| &e.name == c_target))
        .unwrap_or_else(|| C_PART_DOCUMENT_DEFAULT.to_string())
}
