//! Ordered XML document model
//!
//! Serialization indents nested elements by two spaces and separates lines
//! with CRLF. Text is escaped for `<`, `>` and `&`; an element with neither
//! text nor children renders as `<name />`.

use std::fmt;
use std::io;

use oraexec_core::{ExecError, Result};
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

const LINE_BREAK: &str = "\r\n";
const INDENT: &str = "  ";

/// An element with optional text and ordered children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create an empty element. Fails with [`ExecError::ResultProcessing`]
    /// if `name` is not a valid XML element name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            text: None,
            children: Vec::new(),
        })
    }

    /// Create an element holding `text`
    pub fn with_text(name: impl Into<String>, text: Option<String>) -> Result<Self> {
        let mut element = Self::new(name)?;
        element.text = text;
        Ok(element)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// First child named `name`
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// An XML document with a single root element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    pub const ROOT: &'static str = "Root";

    /// A document with an empty `Root` element
    pub fn new() -> Self {
        Self {
            root: XmlElement {
                name: Self::ROOT.to_string(),
                text: None,
                children: Vec::new(),
            },
        }
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.root
    }

    /// Names of the root's children, in document order
    pub fn element_names(&self) -> Vec<&str> {
        self.root.children.iter().map(|c| c.name.as_str()).collect()
    }

    /// Serialize the document
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, &self.root, 0)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| ExecError::ResultProcessing(format!("serialized XML is not UTF-8: {}", e)))
    }
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_xml_string().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement, depth: usize) -> io::Result<()> {
    let name = element.name.as_str();

    if element.text.is_none() && element.children.is_empty() {
        // renders as `<name />`
        let content = format!("{} ", name);
        writer.write_event(Event::Empty(BytesStart::from_content(content, name.len())))?;
        return Ok(());
    }

    writer.write_event(Event::Start(BytesStart::new(name)))?;
    if let Some(text) = &element.text {
        writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text.as_str()))))?;
    }
    if !element.children.is_empty() {
        for child in &element.children {
            write_line_break(writer, depth + 1)?;
            write_element(writer, child, depth + 1)?;
        }
        write_line_break(writer, depth)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_line_break(writer: &mut Writer<Vec<u8>>, depth: usize) -> io::Result<()> {
    let whitespace = format!("{}{}", LINE_BREAK, INDENT.repeat(depth));
    writer.write_event(Event::Text(BytesText::from_escaped(whitespace)))
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ExecError::ResultProcessing(format!(
            "'{}' is not a valid XML element name",
            name
        )))
    }
}
