//! Owned XML tree that survives a read-modify-write cycle.
//!
//! `roxmltree` parses into a borrowed, read-only tree. CXL saving has to edit
//! the loaded document in place while keeping comments, processing
//! instructions, namespace declarations and attributes it does not model, so
//! the parsed tree is copied into [`XmlElement`]s that can be mutated and
//! written back out.

use std::fmt::Write;

use crate::{MapError, MapResult};

/// The `xml:` namespace, bound implicitly in every document.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Indentation unit for elements written without source whitespace.
const INDENT: &str = "    ";

/// A node inside an element or at document level.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),
    /// Character data, unescaped.
    Text(String),
    /// A comment body.
    Comment(String),
    /// A processing instruction.
    Instruction {
        /// Target name.
        target: String,
        /// Instruction content.
        value: Option<String>,
    },
}

impl XmlNode {
    fn is_whitespace(&self) -> bool {
        matches!(self, Self::Text(t) if t.trim().is_empty())
    }
}

/// An attribute with its name as written (`prefix:local` or `local`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified name.
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

/// A mutable XML element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Local name.
    pub name: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Prefix used when writing the name.
    pub prefix: Option<String>,
    /// Namespace declarations made on this element (`None` prefix = default).
    pub namespace_decls: Vec<(Option<String>, String)>,
    /// Attributes in document order.
    pub attributes: Vec<XmlAttribute>,
    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
    /// Lay children out with generated indentation on write.
    ///
    /// Set for elements built in memory and for parsed elements that were
    /// empty; parsed content is otherwise written back as it was read.
    pub pretty: bool,
}

impl XmlElement {
    /// Create an element without namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            prefix: None,
            namespace_decls: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            pretty: true,
        }
    }

    /// Create an element in the same namespace (and with the same prefix).
    #[must_use]
    pub fn sibling_kind(&self, name: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            prefix: self.prefix.clone(),
            ..Self::new(name)
        }
    }

    /// Qualified name as written.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Unprefixed attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an unprefixed attribute, keeping its position if present.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Remove an unprefixed attribute.
    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }

    /// Set the attribute when `value` is `Some`, remove it otherwise.
    pub fn set_or_remove_attr(&mut self, name: &str, value: Option<String>) {
        match value {
            Some(v) => self.set_attr(name, v),
            None => self.remove_attr(name),
        }
    }

    /// Child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements with the given local name.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    /// First child element with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// First child element with the given local name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|c| match c {
            XmlNode::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Elements reached by a `/`-separated path of local names.
    #[must_use]
    pub fn select(&self, path: &str) -> Vec<&XmlElement> {
        let mut current = vec![self];
        for step in path.split('/') {
            current = current
                .into_iter()
                .flat_map(|e| e.elements().filter(move |c| c.name == step))
                .collect();
        }
        current
    }

    /// First child with the given name, appended (same namespace) if missing.
    pub fn ensure_child(&mut self, name: &str) -> &mut XmlElement {
        let index = self
            .children
            .iter()
            .position(|c| matches!(c, XmlNode::Element(e) if e.name == name));
        let index = match index {
            Some(i) => i,
            None => {
                let child = self.sibling_kind(name);
                self.append_element(child)
            }
        };
        match &mut self.children[index] {
            XmlNode::Element(e) => e,
            _ => unreachable!("index points at an element"),
        }
    }

    /// Append a child element, copying the indentation of existing children.
    ///
    /// Returns the child's position in `children`.
    pub fn append_element(&mut self, child: XmlElement) -> usize {
        if self.children.iter().all(XmlNode::is_whitespace) {
            self.children.clear();
        }
        let indent = self.children.iter().enumerate().find_map(|(i, c)| {
            if !matches!(c, XmlNode::Element(_)) || i == 0 {
                return None;
            }
            match &self.children[i - 1] {
                XmlNode::Text(t) if t.trim().is_empty() => Some(t.clone()),
                _ => None,
            }
        });
        match indent {
            Some(ws) => {
                let at = match self.children.last() {
                    Some(last) if last.is_whitespace() => self.children.len() - 1,
                    _ => self.children.len(),
                };
                self.children.insert(at, XmlNode::Text(ws));
                self.children.insert(at + 1, XmlNode::Element(child));
                at + 1
            }
            None => {
                self.children.push(XmlNode::Element(child));
                self.children.len() - 1
            }
        }
    }

    /// Keep only child elements for which `keep` returns true.
    ///
    /// Whitespace directly before a removed element goes with it.
    pub fn retain_elements(&mut self, mut keep: impl FnMut(&XmlElement) -> bool) {
        let mut out: Vec<XmlNode> = Vec::with_capacity(self.children.len());
        for node in self.children.drain(..) {
            if let XmlNode::Element(e) = &node {
                if !keep(e) {
                    if out.last().is_some_and(XmlNode::is_whitespace) {
                        out.pop();
                    }
                    continue;
                }
            }
            out.push(node);
        }
        self.children = out;
    }

    /// Mutable child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    fn write_to(&self, out: &mut String, depth: usize) {
        let _ = write!(out, "<{}", self.qualified_name());
        for (prefix, uri) in &self.namespace_decls {
            match prefix {
                Some(p) => {
                    let _ = write!(out, " xmlns:{p}=\"{}\"", escape_attr(uri));
                }
                None => {
                    let _ = write!(out, " xmlns=\"{}\"", escape_attr(uri));
                }
            }
        }
        for attr in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", attr.name, escape_attr(&attr.value));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        let pretty =
            self.pretty && !self.children.iter().any(|c| matches!(c, XmlNode::Text(_)));
        for child in &self.children {
            if pretty {
                out.push('\n');
                push_indent(out, depth + 1);
            }
            child.write_to(out, depth + 1);
        }
        if pretty {
            out.push('\n');
            push_indent(out, depth);
        }
        let _ = write!(out, "</{}>", self.qualified_name());
    }
}

impl XmlNode {
    fn write_to(&self, out: &mut String, depth: usize) {
        match self {
            Self::Element(e) => e.write_to(out, depth),
            Self::Text(t) => out.push_str(&escape_text(t)),
            Self::Comment(c) => {
                let _ = write!(out, "<!--{c}-->");
            }
            Self::Instruction { target, value } => match value {
                Some(v) => {
                    let _ = write!(out, "<?{target} {v}?>");
                }
                None => {
                    let _ = write!(out, "<?{target}?>");
                }
            },
        }
    }
}

/// A whole XML document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// Comments and instructions before the root element.
    pub prolog: Vec<XmlNode>,
    /// The root element.
    pub root: XmlElement,
    /// Comments and instructions after the root element.
    pub epilog: Vec<XmlNode>,
}

impl XmlDocument {
    /// Wrap a root element.
    #[must_use]
    pub fn new(root: XmlElement) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse XML text.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Parse`] if the text is not well-formed XML.
    pub fn parse(text: &str) -> MapResult<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| MapError::Parse(e.to_string()))?;
        let root_node = doc.root_element();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut seen_root = false;
        for child in doc.root().children() {
            if child == root_node {
                seen_root = true;
                continue;
            }
            let Some(node) = convert_leaf(child) else {
                continue;
            };
            if seen_root {
                epilog.push(node);
            } else {
                prolog.push(node);
            }
        }
        Ok(Self {
            prolog,
            root: convert_element(root_node),
            epilog,
        })
    }

    /// Serialize with an XML declaration.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        for node in &self.prolog {
            node.write_to(&mut out, 0);
            out.push('\n');
        }
        self.root.write_to(&mut out, 0);
        out.push('\n');
        for node in &self.epilog {
            node.write_to(&mut out, 0);
            out.push('\n');
        }
        out
    }
}

fn convert_leaf(node: roxmltree::Node<'_, '_>) -> Option<XmlNode> {
    if node.is_comment() {
        return node.text().map(|t| XmlNode::Comment(t.to_string()));
    }
    if let Some(pi) = node.pi() {
        return Some(XmlNode::Instruction {
            target: pi.target.to_string(),
            value: pi.value.map(str::to_string),
        });
    }
    if node.is_text() {
        return node.text().map(|t| XmlNode::Text(t.to_string()));
    }
    None
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> XmlElement {
    let tag = node.tag_name();
    let namespace = tag.namespace().map(str::to_string);
    let prefix = namespace
        .as_deref()
        .and_then(|uri| element_prefix(node, uri));

    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    let namespace_decls = node
        .namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect();

    let attributes = node
        .attributes()
        .map(|attr| {
            let name = match attr.namespace().and_then(|uri| attribute_prefix(node, uri)) {
                Some(prefix) => format!("{prefix}:{}", attr.name()),
                None => attr.name().to_string(),
            };
            XmlAttribute {
                name,
                value: attr.value().to_string(),
            }
        })
        .collect();

    let children: Vec<XmlNode> = node
        .children()
        .filter_map(|child| {
            if child.is_element() {
                Some(XmlNode::Element(convert_element(child)))
            } else {
                convert_leaf(child)
            }
        })
        .collect();

    XmlElement {
        name: tag.name().to_string(),
        namespace,
        prefix,
        namespace_decls,
        attributes,
        pretty: children.is_empty(),
        children,
    }
}

/// Prefix for an element name: the default namespace wins when it matches.
fn element_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NAMESPACE {
        return Some("xml".to_string());
    }
    if node
        .namespaces()
        .any(|ns| ns.name().is_none() && ns.uri() == uri)
    {
        return None;
    }
    attribute_prefix(node, uri)
}

/// Prefix for a namespaced attribute (never the default namespace).
fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NAMESPACE {
        return Some("xml".to_string());
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name().map(str::to_string))
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Escape character data.
fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for double quotes.
fn escape_attr(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- generated by a tool -->
<cmap xmlns="http://cmap.ihmc.us/xml/cmap/" xmlns:dc="http://purl.org/dc/elements/1.1/">
    <res-meta><dc:title>Plants</dc:title></res-meta>
    <map width="800" height="600">
        <concept-list>
            <concept id="c1" label="Sun &amp; Sky" extra="kept"/>
        </concept-list>
    </map>
</cmap>
"#;

    #[test]
    fn test_parse_resolves_names_and_namespaces() {
        let doc = XmlDocument::parse(SAMPLE).expect("parse");
        assert_eq!(doc.root.name, "cmap");
        assert_eq!(doc.root.prefix, None);
        assert_eq!(doc.root.namespace_decls.len(), 2);
        assert_eq!(doc.prolog.len(), 1);
        let concepts = doc.root.select("map/concept-list/concept");
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].attr("label"), Some("Sun & Sky"));
        let title = doc.root.select("res-meta/title");
        assert_eq!(title[0].prefix.as_deref(), Some("dc"));
    }

    #[test]
    fn test_round_trip_preserves_unknown_content() {
        let doc = XmlDocument::parse(SAMPLE).expect("parse");
        let text = doc.to_xml_string();
        assert!(text.contains("<!-- generated by a tool -->"));
        assert!(text.contains("<dc:title>Plants</dc:title>"));
        assert!(text.contains("extra=\"kept\""));
        assert!(text.contains("label=\"Sun &amp; Sky\""));
        let again = XmlDocument::parse(&text).expect("reparse");
        assert_eq!(again, doc);
    }

    #[test]
    fn test_compact_markup_is_not_reformatted() {
        let compact = r#"<cmap><res-meta><title>A</title></res-meta><map><concept-list><concept id="c1"/></concept-list></map></cmap>"#;
        let doc = XmlDocument::parse(compact).expect("parse");
        let text = doc.to_xml_string();
        assert!(text.contains(compact));
        assert_eq!(XmlDocument::parse(&text).expect("reparse"), doc);
    }

    #[test]
    fn test_empty_parsed_element_formats_new_children() {
        let mut doc = XmlDocument::parse("<map><concept-list/></map>").expect("parse");
        let list = doc.root.child_mut("concept-list").expect("list");
        let concept = list.sibling_kind("concept");
        list.append_element(concept);
        assert!(doc
            .to_xml_string()
            .contains("<concept-list>\n        <concept/>\n    </concept-list>"));
    }

    #[test]
    fn test_child_outlives_name_argument() {
        let doc = XmlDocument::parse(SAMPLE).expect("parse");
        let found = {
            let name = String::from("map");
            doc.root.child(&name)
        };
        assert_eq!(found.and_then(|m| m.attr("width")), Some("800"));
        let steps = String::from("map/concept-list");
        let lists = doc.root.select(&steps);
        drop(steps);
        assert_eq!(lists.len(), 1);
    }

    #[test]
    fn test_append_copies_indentation() {
        let mut doc = XmlDocument::parse(SAMPLE).expect("parse");
        let map = doc.root.child_mut("map").expect("map");
        let list = map.child_mut("concept-list").expect("list");
        let mut concept = list.sibling_kind("concept");
        concept.set_attr("id", "c2");
        list.append_element(concept);
        let text = doc.to_xml_string();
        assert!(text.contains(
            "<concept id=\"c1\" label=\"Sun &amp; Sky\" extra=\"kept\"/>\n            <concept id=\"c2\"/>\n        </concept-list>"
        ));
    }

    #[test]
    fn test_retain_drops_leading_whitespace() {
        let mut doc = XmlDocument::parse(SAMPLE).expect("parse");
        let map = doc.root.child_mut("map").expect("map");
        let list = map.child_mut("concept-list").expect("list");
        list.retain_elements(|_| false);
        assert!(list.elements().next().is_none());
        assert!(doc.to_xml_string().contains("<concept-list>\n        </concept-list>"));
    }

    #[test]
    fn test_new_elements_are_indented() {
        let mut root = XmlElement::new("map");
        root.ensure_child("concept-list").set_attr("x", "1");
        root.ensure_child("concept-list").set_attr("y", "2");
        let doc = XmlDocument::new(root);
        assert!(doc
            .to_xml_string()
            .ends_with("<map>\n    <concept-list x=\"1\" y=\"2\"/>\n</map>\n"));
    }

    #[test]
    fn test_malformed_is_parse_error() {
        assert!(matches!(
            XmlDocument::parse("<cmap><map></cmap>"),
            Err(MapError::Parse(_))
        ));
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(escape_attr("a\"b\nc"), "a&quot;b&#10;c");
        assert_eq!(escape_text("x < y"), "x &lt; y");
    }
}
