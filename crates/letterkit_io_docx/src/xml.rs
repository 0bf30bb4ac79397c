//! Owned XML tree for package parts, parsed and written with `quick-xml`.
//!
//! The tree keeps qualified names (`w:tbl`) and attribute order so that
//! untouched content round-trips with the same meaning.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::spec::DocxError;

/// One XML node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Element with attributes and children.
    Element(XmlElement),
    /// Unescaped character data.
    Text(String),
    /// CDATA section content.
    CData(String),
    /// Raw comment content.
    Comment(String),
    /// Raw processing instruction content.
    ProcessingInstruction(String),
    /// Raw doctype content.
    DocType(String),
}

/// XML element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Qualified name, e.g. `w:p`.
    pub name: String,
    /// Attributes in document order, values unescaped.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

/// `<?xml ...?>` declaration fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXmlDeclaration {
    /// XML version.
    pub version: String,
    /// Declared encoding.
    pub encoding: Option<String>,
    /// Declared standalone flag.
    pub standalone: Option<String>,
}

/// Parsed XML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTree {
    /// Optional declaration.
    pub declaration: Option<SpecXmlDeclaration>,
    /// Comments/PIs appearing before the root element.
    pub prolog: Vec<XmlNode>,
    /// Root element.
    pub root: XmlElement,
}

/// Local part of a qualified name (`w:tbl` -> `tbl`).
pub fn local_name(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, c_local)) => c_local,
        None => name,
    }
}

impl XmlElement {
    /// New element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute append.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder-style child element append.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Whether this element's local name equals `local`.
    pub fn is(&self, local: &str) -> bool {
        local_name(&self.name) == local
    }

    /// Namespace prefix of this element (`w` for `w:p`), empty when unprefixed.
    pub fn prefix(&self) -> &str {
        match self.name.split_once(':') {
            Some((c_prefix, _)) => c_prefix,
            None => "",
        }
    }

    /// Qualified name sharing this element's prefix.
    pub fn qualify(&self, local: &str) -> String {
        let c_prefix = self.prefix();
        if c_prefix.is_empty() {
            local.to_string()
        } else {
            format!("{c_prefix}:{local}")
        }
    }

    /// Attribute value by local name.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(c_key, _)| local_name(c_key) == local)
            .map(|(_, c_value)| c_value.as_str())
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Direct child elements, mutable.
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First direct child element with local name `local`.
    pub fn find_child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.is(local))
    }

    /// First direct child element with local name `local`, mutable.
    pub fn find_child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.child_elements_mut().find(|el| el.is(local))
    }

    /// Direct child elements with local name `local`.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.child_elements().filter(move |el| el.is(local))
    }

    /// Concatenated text of direct text/CDATA children.
    pub fn text(&self) -> String {
        let mut c_out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(c) | XmlNode::CData(c) => c_out.push_str(c),
                _ => {}
            }
        }
        c_out
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Parse

/// Parse one package part into an owned tree.
pub fn parse_xml_part(part: &str, v_bytes: &[u8]) -> Result<XmlTree, DocxError> {
    let derive_err = |message: String| DocxError::Xml {
        part: part.to_string(),
        message,
    };

    let mut reader = Reader::from_reader(v_bytes);
    reader.trim_text(false);
    reader.expand_empty_elements(false);

    let mut buf = Vec::new();
    let mut declaration = None;
    let mut l_prolog = Vec::new();
    let mut l_stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| derive_err(format!("{err} at byte {}", reader.buffer_position())))?;
        match event {
            Event::Decl(e) => declaration = Some(derive_declaration(&e)),
            Event::Start(e) => l_stack.push(derive_element(&e, &reader).map_err(&derive_err)?),
            Event::Empty(e) => {
                let el = derive_element(&e, &reader).map_err(&derive_err)?;
                attach_node(&mut l_stack, &mut l_prolog, &mut root, XmlNode::Element(el))
                    .map_err(&derive_err)?;
            }
            Event::End(_) => {
                let Some(el) = l_stack.pop() else {
                    return Err(derive_err("unbalanced end tag".to_string()));
                };
                attach_node(&mut l_stack, &mut l_prolog, &mut root, XmlNode::Element(el))
                    .map_err(&derive_err)?;
            }
            Event::Text(e) => {
                if let Some(parent) = l_stack.last_mut() {
                    let c_text = e
                        .unescape()
                        .map_err(|err| derive_err(format!("bad text content: {err}")))?;
                    parent.children.push(XmlNode::Text(c_text.into_owned()));
                }
            }
            Event::CData(e) => {
                if let Some(parent) = l_stack.last_mut() {
                    let c_text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    parent.children.push(XmlNode::CData(c_text));
                }
            }
            Event::Comment(e) => {
                let node = XmlNode::Comment(String::from_utf8_lossy(&e).into_owned());
                attach_node(&mut l_stack, &mut l_prolog, &mut root, node).map_err(&derive_err)?;
            }
            Event::PI(e) => {
                let node = XmlNode::ProcessingInstruction(String::from_utf8_lossy(&e).into_owned());
                attach_node(&mut l_stack, &mut l_prolog, &mut root, node).map_err(&derive_err)?;
            }
            Event::DocType(e) => {
                l_prolog.push(XmlNode::DocType(String::from_utf8_lossy(&e).into_owned()));
            }
            Event::Eof => break,
        }
        buf.clear();
    }

    if !l_stack.is_empty() {
        return Err(derive_err(format!(
            "unclosed element `{}`",
            l_stack.last().map(|el| el.name.as_str()).unwrap_or_default()
        )));
    }
    let Some(root) = root else {
        return Err(derive_err("no root element".to_string()));
    };

    Ok(XmlTree {
        declaration,
        prolog: l_prolog,
        root,
    })
}

fn attach_node(
    l_stack: &mut [XmlElement],
    l_prolog: &mut Vec<XmlNode>,
    root: &mut Option<XmlElement>,
    node: XmlNode,
) -> Result<(), String> {
    if let Some(parent) = l_stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(el) => {
            if root.is_some() {
                return Err(format!("second root element `{}`", el.name));
            }
            *root = Some(el);
        }
        // Trailing comments/PIs after the root are dropped.
        other => {
            if root.is_none() {
                l_prolog.push(other);
            }
        }
    }
    Ok(())
}

fn derive_element<R>(e: &BytesStart<'_>, reader: &Reader<R>) -> Result<XmlElement, String> {
    let mut el = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr_res in e.attributes() {
        let attr = attr_res.map_err(|err| format!("bad attribute in `{}`: {err}", el.name))?;
        let c_key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let c_value = attr
            .decode_and_unescape_value(reader)
            .map_err(|err| format!("bad attribute value `{c_key}`: {err}"))?
            .into_owned();
        el.attributes.push((c_key, c_value));
    }
    Ok(el)
}

fn derive_declaration(e: &BytesDecl<'_>) -> SpecXmlDeclaration {
    SpecXmlDeclaration {
        version: e
            .version()
            .map(derive_text_from_bytes)
            .unwrap_or_else(|_| "1.0".to_string()),
        encoding: e.encoding().and_then(Result::ok).map(derive_text_from_bytes),
        standalone: e.standalone().and_then(Result::ok).map(derive_text_from_bytes),
    }
}

fn derive_text_from_bytes(v: Cow<'_, [u8]>) -> String {
    String::from_utf8_lossy(&v).into_owned()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Write

/// Serialize a tree back to bytes.
pub fn write_xml_part(part: &str, tree: &XmlTree) -> Result<Vec<u8>, DocxError> {
    let mut writer = Writer::new(Vec::new());
    let derive_err = |err: quick_xml::Error| DocxError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    };

    if let Some(decl) = &tree.declaration {
        writer
            .write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))
            .map_err(derive_err)?;
        writer
            .write_event(Event::Text(BytesText::from_escaped("\r\n")))
            .map_err(derive_err)?;
    }
    for node in &tree.prolog {
        write_node(&mut writer, node).map_err(derive_err)?;
    }
    write_element(&mut writer, &tree.root).map_err(derive_err)?;

    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> Result<(), quick_xml::Error> {
    let mut start = BytesStart::new(el.name.as_str());
    for (c_key, c_value) in &el.attributes {
        start.push_attribute((c_key.as_str(), c_value.as_str()));
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for node in &el.children {
        write_node(writer, node)?;
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), quick_xml::Error> {
    match node {
        XmlNode::Element(el) => write_element(writer, el),
        XmlNode::Text(c) => writer.write_event(Event::Text(BytesText::new(c))),
        XmlNode::CData(c) => writer.write_event(Event::CData(BytesCData::new(c.as_str()))),
        XmlNode::Comment(c) => writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str()))),
        XmlNode::ProcessingInstruction(c) => {
            writer.write_event(Event::PI(BytesText::from_escaped(c.as_str())))
        }
        XmlNode::DocType(c) => writer.write_event(Event::DocType(BytesText::from_escaped(c.as_str()))),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
