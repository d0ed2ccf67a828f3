//! Parser for Cobertura-style XML coverage reports.
//!
//! Expected structure:
//!   <coverage>
//!     <packages>
//!       <package>
//!         <classes>
//!           <class name="..." filename="dir/sub/file.py">
//!             <lines>
//!               <line number="..." hits="0|1|..." branch="true|false"
//!                     condition-coverage="75% (3/4)" />
//!             </lines>
//!           </class>
//!         </classes>
//!       </package>
//!     </packages>
//!   </coverage>

use std::collections::HashMap;
use std::path::Path;
use std::str;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::error::{CovcheckError, Result};
use crate::model::{CoverageNode, CoverageNodeType, CoverageSummary};

/// Pre-compiled pattern for condition-coverage attributes like "75% (3/4)".
/// Anchored at both ends: anything else is rejected outright.
static CONDITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+% \((\d+)/(\d+)\)$").unwrap());

/// An XML element with its attributes and child elements in document order.
/// Text content is discarded; coverage reports carry everything in attributes.
#[derive(Debug)]
pub struct XmlElement {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(e: &BytesStart) -> Self {
        Self {
            tag: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attributes: attr_map(e),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Required attribute lookup; failure names the element and attribute.
    fn require_attr(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| CovcheckError::MissingAttribute {
            tag: self.tag.clone(),
            attr: name.to_string(),
        })
    }
}

/// First direct child with the given tag, in document order.
pub fn try_get_child<'a>(element: &'a XmlElement, tag: &str) -> Result<&'a XmlElement> {
    element
        .children
        .iter()
        .find(|child| child.tag == tag)
        .ok_or_else(|| CovcheckError::MissingElement(tag.to_string()))
}

pub struct CoverageXmlParser;

impl CoverageXmlParser {
    /// Parse an XML coverage file into a coverage tree rooted at a directory
    /// node named "root".
    pub fn parse_file(path: &Path) -> Result<CoverageNode> {
        let content = std::fs::read(path)?;
        Self::parse(&content)
    }

    pub fn parse(input: &[u8]) -> Result<CoverageNode> {
        let document = read_document(input)?;
        let xml_root = document
            .children
            .first()
            .ok_or_else(|| CovcheckError::MissingElement("coverage".to_string()))?;

        let mut root = CoverageNode::new("root", CoverageNodeType::Dir);

        let packages = try_get_child(xml_root, "packages")?;
        for package in &packages.children {
            let classes = try_get_child(package, "classes")?;
            for class in &classes.children {
                let name = class.require_attr("name")?;
                let filename = class.require_attr("filename")?;
                // The directory chain is everything before the final path
                // segment; a bare filename attaches directly under root.
                let dirpath = filename.rsplit_once('/').map(|(dir, _)| dir);

                let summary = class_summary(class)?;
                let node = CoverageNode::with_summary(name, CoverageNodeType::File, summary);
                root.add_child(node, dirpath)?;
            }
        }

        Ok(root)
    }
}

/// Accumulate line and branch counters from a class's <lines> element.
fn class_summary(class: &XmlElement) -> Result<CoverageSummary> {
    let mut summary = CoverageSummary::default();

    let lines = try_get_child(class, "lines")?;
    for line in &lines.children {
        summary.n_lines += 1;

        // Exact string match: hits="2" does not count as covered.
        if line.require_attr("hits")? == "1" {
            summary.n_lines_covered += 1;
        }

        // Any non-empty branch attribute marks a branch line, in which case
        // condition-coverage must be present and well-formed.
        if line.attr("branch").is_some_and(|b| !b.is_empty()) {
            let condition = line.require_attr("condition-coverage")?;
            let (covered, total) = parse_condition_coverage(condition)?;
            summary.n_branches_covered += covered;
            summary.n_branches += total;
        }
    }

    Ok(summary)
}

/// Parse a condition-coverage fraction like "75% (3/4)" into (covered, total).
/// Malformed text is a hard error carrying the offending value.
pub fn parse_condition_coverage(text: &str) -> Result<(u64, u64)> {
    let caps = CONDITION_RE
        .captures(text)
        .ok_or_else(|| CovcheckError::ConditionCoverage(text.to_string()))?;
    let covered = caps[1]
        .parse()
        .map_err(|_| CovcheckError::ConditionCoverage(text.to_string()))?;
    let total = caps[2]
        .parse()
        .map_err(|_| CovcheckError::ConditionCoverage(text.to_string()))?;
    Ok((covered, total))
}

/// Read a whole XML document into an element tree. The returned element is a
/// synthetic container whose children are the document's top-level elements.
fn read_document(input: &[u8]) -> Result<XmlElement> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut document = XmlElement {
        tag: String::new(),
        attributes: HashMap::new(),
        children: Vec::new(),
    };
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => stack.push(XmlElement::from_start(e)),
            Event::Empty(ref e) => {
                let element = XmlElement::from_start(e);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => document.children.push(element),
                }
            }
            Event::End(_) => {
                // The reader validates tag nesting, so an End event always
                // matches the element on top of the stack.
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => document.children.push(element),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(document)
}

/// Extract attributes from an XML element into a HashMap.
fn attr_map(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|a| {
            let attr = a.ok()?;
            let key = str::from_utf8(attr.key.local_name().into_inner())
                .ok()?
                .to_string();
            let value = attr.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}
