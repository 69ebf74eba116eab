//! Namespace-aware XML documents.
//!
//! AtomPub responses mix elements from several namespaces (Atom, the
//! publishing protocol, Hatena's own extensions), so lookups resolve
//! prefixes against the in-scope `xmlns` declarations rather than
//! comparing raw tag names. Parsed documents keep every element and
//! attribute, including ones this crate does not interpret, and
//! serialize back without losing them.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Error from parsing or serializing an XML document.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(String),

    #[error("failed to serialize XML: {0}")]
    Serialize(String),
}

impl XmlError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        XmlError::Parse(message.into())
    }

    fn serialize(err: impl std::fmt::Display) -> Self {
        XmlError::Serialize(err.to_string())
    }
}

/// A child of an [`Element`]: either a nested element or a run of
/// character data.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its resolved namespace, attributes, and children.
///
/// `name` is the qualified name as written in the document (for example
/// `app:control`); `namespace` is the URI the prefix resolved to at
/// parse time, or `None` when no binding was in scope. Attribute names
/// are kept verbatim, which means `xmlns` declarations survive a
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub namespace: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element with no namespace, attributes, or children.
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            namespace: None,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets the resolved namespace URI.
    ///
    /// Serialization ignores this field; emit the matching `xmlns`
    /// attribute on the element (or an ancestor) as well.
    pub fn with_ns(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }

    /// Appends an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Appends a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a text node.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// The local part of the qualified name (`control` for `app:control`).
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Whether this element has the given namespace URI and local name.
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local
    }

    /// The first child element matching the namespace URI and local name.
    pub fn child(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.children(namespace, local).next()
    }

    /// All child elements matching the namespace URI and local name.
    pub fn children<'a>(
        &'a self,
        namespace: &str,
        local: &str,
    ) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(elem) if elem.is(namespace, local) => Some(elem),
            _ => None,
        })
    }

    /// The value of the named attribute, matched on the name as written.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The concatenated direct text content of this element.
    ///
    /// CDATA sections were already folded into text at parse time.
    /// Whitespace is preserved exactly as it appeared in the document.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(text) = node {
                out.push_str(text);
            }
        }
        out
    }

    /// Serializes this element as a standalone document with an XML
    /// declaration.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(XmlError::serialize)?;
        self.write_into(&mut writer)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(XmlError::serialize)
    }

    fn write_into(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attrs {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(XmlError::serialize);
        }

        writer
            .write_event(Event::Start(start))
            .map_err(XmlError::serialize)?;
        for node in &self.children {
            match node {
                Node::Element(elem) => elem.write_into(writer)?,
                Node::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(XmlError::serialize)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(XmlError::serialize)
    }
}

/// Parses a complete XML document into its root [`Element`].
pub fn parse(input: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(input);
    // Innermost binding last; each frame remembers how many bindings its
    // start tag introduced so they can be dropped at the matching end tag.
    let mut bindings: Vec<(String, String)> = Vec::new();
    let mut stack: Vec<(Element, usize)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(|e| XmlError::parse(e.to_string()))? {
            Event::Start(start) => {
                let opened = open_element(&start, &mut bindings)?;
                stack.push(opened);
            }
            Event::Empty(start) => {
                let (elem, introduced) = open_element(&start, &mut bindings)?;
                bindings.truncate(bindings.len() - introduced);
                close_element(elem, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // The reader has already verified the end tag matches.
                let (elem, introduced) = match stack.pop() {
                    Some(frame) => frame,
                    None => return Err(XmlError::parse("end tag with no open element")),
                };
                bindings.truncate(bindings.len() - introduced);
                close_element(elem, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlError::parse(e.to_string()))?
                    .into_owned();
                if let Some((parent, _)) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                if let Some((parent, _)) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::parse("unexpected end of document"));
    }
    root.ok_or_else(|| XmlError::parse("no root element"))
}

/// Builds an element from a start tag, pushing any `xmlns` bindings it
/// declares. Returns the element and the number of bindings pushed.
fn open_element(
    start: &BytesStart<'_>,
    bindings: &mut Vec<(String, String)>,
) -> Result<(Element, usize), XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attrs = Vec::new();
    let mut introduced = 0;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::parse(format!("bad attribute in <{name}>: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::parse(e.to_string()))?
            .into_owned();

        if key == "xmlns" {
            bindings.push((String::new(), value.clone()));
            introduced += 1;
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.push((prefix.to_owned(), value.clone()));
            introduced += 1;
        }
        attrs.push((key, value));
    }

    let prefix = match name.split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    };
    // Unbound prefixes resolve to no namespace rather than failing:
    // feeds in the wild are not always strictly namespace-well-formed.
    let namespace = bindings
        .iter()
        .rev()
        .find(|(bound, _)| bound == prefix)
        .map(|(_, uri)| uri.clone());

    Ok((
        Element {
            name,
            namespace,
            attrs,
            children: Vec::new(),
        },
        introduced,
    ))
}

fn close_element(
    elem: Element,
    stack: &mut Vec<(Element, usize)>,
    root: &mut Option<Element>,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some((parent, _)) => parent.children.push(Node::Element(elem)),
        None if root.is_some() => {
            return Err(XmlError::parse("multiple root elements"));
        }
        None => *root = Some(elem),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const ATOM: &str = "http://www.w3.org/2005/Atom";
    const APP: &str = "http://www.w3.org/2007/app";

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse(
            r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>diary</title>
  <entry><title>first</title></entry>
  <entry><title>second</title></entry>
</feed>"#,
        )
        .unwrap();

        assert!(doc.is(ATOM, "feed"));
        assert_eq!(doc.child(ATOM, "title").unwrap().text(), "diary");

        let titles: Vec<String> = doc
            .children(ATOM, "entry")
            .map(|entry| entry.child(ATOM, "title").unwrap().text())
            .collect();
        assert_eq!(titles, vec!["first".to_owned(), "second".to_owned()]);
    }

    #[test]
    fn test_child_lookup_outlives_the_query_strings() {
        let doc = parse(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>diary</title></feed>"#)
            .unwrap();

        // The returned reference borrows the element, not the query
        // strings, so it survives them.
        let title = {
            let ns = String::from(ATOM);
            let local = String::from("title");
            doc.child(&ns, &local)
        };
        assert_eq!(title.unwrap().text(), "diary");
    }

    #[test]
    fn test_prefixed_namespace_resolution() {
        let doc = parse(
            r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app">
  <app:control><app:draft>yes</app:draft></app:control>
</entry>"#,
        )
        .unwrap();

        let control = doc.child(APP, "control").unwrap();
        assert_eq!(control.name, "app:control");
        assert_eq!(control.child(APP, "draft").unwrap().text(), "yes");
        assert!(doc.child(ATOM, "control").is_none());
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let doc = parse(
            r#"<a xmlns="urn:outer"><b xmlns="urn:inner"><c/></b><d/></a>"#,
        )
        .unwrap();

        let b = doc.child("urn:inner", "b").unwrap();
        assert!(b.child("urn:inner", "c").is_some());
        // The inner default namespace goes out of scope with </b>.
        assert!(doc.child("urn:outer", "d").is_some());
    }

    #[test]
    fn test_unbound_prefix_has_no_namespace() {
        let doc = parse("<app:control><app:draft>no</app:draft></app:control>").unwrap();
        assert_eq!(doc.namespace, None);
        assert_eq!(doc.local_name(), "control");
    }

    #[test]
    fn test_attributes_and_entities() {
        let doc = parse(r#"<link rel="next" href="https://example.com/feed?page=2&amp;n=5"/>"#)
            .unwrap();
        assert_eq!(doc.attr("rel"), Some("next"));
        assert_eq!(doc.attr("href"), Some("https://example.com/feed?page=2&n=5"));
        assert_eq!(doc.attr("hreflang"), None);
    }

    #[test]
    fn test_cdata_folded_into_text() {
        let doc = parse("<content><![CDATA[<p>not markup</p>]]> tail</content>").unwrap();
        assert_eq!(doc.text(), "<p>not markup</p> tail");
    }

    #[test]
    fn test_whitespace_preserved() {
        let doc = parse("<content>line one\n  line two  </content>").unwrap();
        assert_eq!(doc.text(), "line one\n  line two  ");
    }

    #[test]
    fn test_escaping_on_write() {
        let xml = Element::new("title")
            .with_text("a < b & c")
            .to_xml()
            .unwrap();
        assert!(xml.contains("a &lt; b &amp; c"), "got: {xml}");

        let reparsed = parse(&xml).unwrap();
        assert_eq!(reparsed.text(), "a < b & c");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let input = r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app">
  <title>draft &amp; ready</title>
  <app:control><app:draft>yes</app:draft></app:control>
  <link rel="edit" href="https://example.com/entry/1"/>
</entry>"#;

        let first = parse(input).unwrap();
        let second = parse(&first.to_xml().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_element_serialization() {
        let xml = Element::new("category")
            .with_attr("term", "rust")
            .to_xml()
            .unwrap();
        assert!(xml.ends_with(r#"<category term="rust"/>"#), "got: {xml}");
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    }

    #[test]
    fn test_malformed_documents_rejected() {
        for input in ["", "<feed>", "<a></b>", "not xml at all", "<a/><b/>"] {
            let err = parse(input).unwrap_err();
            assert!(matches!(err, XmlError::Parse(_)), "input: {input:?}");
        }
    }
}
