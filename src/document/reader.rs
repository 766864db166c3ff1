//! Build a [`Document`] from XML text using `quick-xml` events.

use crate::document::node::{Attribute, Document, Element, Node, NodeId};
use crate::error::DocumentError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse UTF-8 bytes into a document
pub fn parse_bytes(bytes: &[u8]) -> Result<Document, DocumentError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| DocumentError::Encoding(e.to_string()))?;
    parse_str(text)
}

/// Parse XML text into a document
pub fn parse_str(text: &str) -> Result<Document, DocumentError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut builder = Builder::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            DocumentError::Malformed(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;
        match event {
            Event::Start(start) => {
                let id = builder.push_element(element_from(&start)?)?;
                builder.open.push(id);
            }
            Event::Empty(start) => {
                builder.push_element(element_from(&start)?)?;
            }
            Event::End(_) => {
                let Some(closed) = builder.open.pop() else {
                    return Err(DocumentError::Malformed(
                        "closing tag without an open element".to_string(),
                    ));
                };
                builder.mark_closed(closed);
            }
            Event::Text(text) => builder.push_misc(Node::Text(utf8(&text)?))?,
            Event::CData(data) => builder.push_misc(Node::CData(utf8(&data)?))?,
            Event::Comment(comment) => builder.push_misc(Node::Comment(utf8(&comment)?))?,
            Event::Decl(decl) => builder.push_misc(Node::Declaration(utf8(&decl)?))?,
            Event::PI(pi) => {
                builder.push_misc(Node::ProcessingInstruction(utf8(&pi)?))?
            }
            Event::DocType(doctype) => builder.push_misc(Node::DocType(utf8(&doctype)?))?,
            Event::Eof => break,
        }
    }

    builder.finish()
}

fn utf8(bytes: &[u8]) -> Result<String, DocumentError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DocumentError::Encoding(e.to_string()))
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute
            .map_err(|e| DocumentError::Malformed(format!("bad attribute on <{}>: {}", name, e)))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| DocumentError::Malformed(format!("bad attribute value on <{}>: {}", name, e)))?;
        let value = value.into_owned();
        attributes.push(Attribute {
            name: utf8(attribute.key.as_ref())?,
            raw: Some(utf8(&attribute.value)?),
            value,
        });
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        explicit_close: false,
    })
}

#[derive(Default)]
struct Builder {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
    prolog: Vec<NodeId>,
    root: Option<NodeId>,
    epilog: Vec<NodeId>,
}

impl Builder {
    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(Node::Element(element)) = self.nodes.get_mut(parent.index()) {
            element.children.push(child);
        }
    }

    /// A start tag closed with no children in between was written `<X></X>`
    fn mark_closed(&mut self, id: NodeId) {
        if let Some(Node::Element(element)) = self.nodes.get_mut(id.index()) {
            element.explicit_close = element.children.is_empty();
        }
    }

    fn push_element(&mut self, element: Element) -> Result<NodeId, DocumentError> {
        let name = element.name.clone();
        let id = self.alloc(Node::Element(element));
        match self.open.last().copied() {
            Some(parent) => self.attach(parent, id),
            None if self.root.is_none() => self.root = Some(id),
            None => {
                return Err(DocumentError::Malformed(format!(
                    "second root element <{}>",
                    name
                )))
            }
        }
        Ok(id)
    }

    fn push_misc(&mut self, node: Node) -> Result<(), DocumentError> {
        if let Node::Text(raw) = &node {
            if self.open.is_empty() && !raw.trim().is_empty() {
                return Err(DocumentError::Malformed(
                    "text outside the root element".to_string(),
                ));
            }
        }
        let id = self.alloc(node);
        match self.open.last().copied() {
            Some(parent) => self.attach(parent, id),
            None if self.root.is_none() => self.prolog.push(id),
            None => self.epilog.push(id),
        }
        Ok(())
    }

    fn finish(self) -> Result<Document, DocumentError> {
        if let Some(unclosed) = self.open.last() {
            let name = match &self.nodes[unclosed.index()] {
                Node::Element(element) => element.name.clone(),
                _ => String::new(),
            };
            return Err(DocumentError::Malformed(format!("unclosed element <{}>", name)));
        }
        let root = self
            .root
            .ok_or_else(|| DocumentError::Malformed("document has no root element".to_string()))?;
        Ok(Document {
            nodes: self.nodes,
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Ableton Creator="Ableton Live 11.3.4">
	<LiveSet>
		<Tracks />
	</LiveSet>
</Ableton>
"#,
        )
        .unwrap();

        assert_eq!(doc.tag(doc.root()), Some("Ableton"));
        assert_eq!(doc.attribute(doc.root(), "Creator"), Some("Ableton Live 11.3.4"));
        assert!(doc.find_path(doc.root(), &["LiveSet", "Tracks"]).is_some());
        assert!(matches!(doc.node(doc.prolog[0]), Node::Declaration(_)));
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let doc = parse_str(r#"<Name Value="Drums &amp; Bass &quot;Live&quot;"/>"#).unwrap();
        assert_eq!(doc.attribute(doc.root(), "Value"), Some("Drums & Bass \"Live\""));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_str("<Ableton><LiveSet></Ableton>"),
            Err(DocumentError::Malformed(_))
        ));
        assert!(matches!(parse_str("<Ableton>"), Err(DocumentError::Malformed(_))));
        assert!(matches!(parse_str(""), Err(DocumentError::Malformed(_))));
        assert!(matches!(parse_str("<A/><B/>"), Err(DocumentError::Malformed(_))));
        assert!(matches!(parse_str("junk<A/>"), Err(DocumentError::Malformed(_))));
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let bytes = b"<Ableton Creator=\"\xFF\xFE\"/>";
        assert!(matches!(parse_bytes(bytes), Err(DocumentError::Encoding(_))));
    }

    #[test]
    fn test_bom_is_skipped() {
        let doc = parse_bytes(b"\xEF\xBB\xBF<Ableton/>").unwrap();
        assert_eq!(doc.tag(doc.root()), Some("Ableton"));
    }
}
