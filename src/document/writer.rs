//! Serialize a [`Document`] back to XML text.
//!
//! Only nodes reachable from the prolog, root and epilog are written.
//! Childless elements keep the form they had in the source; new ones are
//! written self-closing with a space before `/>`, matching what Live itself
//! emits. Attribute values that were never rewritten keep their source
//! escaping.

use crate::document::node::{Document, Node, NodeId};
use quick_xml::escape::escape;
use std::io::{self, Write};

/// Write the document to any byte sink
pub fn write_document<W: Write>(doc: &Document, out: &mut W) -> io::Result<()> {
    for id in &doc.prolog {
        write_node(doc, *id, out)?;
    }
    write_node(doc, doc.root, out)?;
    for id in &doc.epilog {
        write_node(doc, *id, out)?;
    }
    Ok(())
}

/// Serialize the document into a byte buffer
pub fn to_bytes(doc: &Document) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(doc.arena_len() * 32);
    write_document(doc, &mut buffer)?;
    Ok(buffer)
}

fn write_node<W: Write>(doc: &Document, id: NodeId, out: &mut W) -> io::Result<()> {
    match doc.node(id) {
        Node::Element(element) => {
            write!(out, "<{}", element.name)?;
            for attribute in &element.attributes {
                match attribute.raw.as_deref() {
                    Some(raw) if !raw.contains('"') => {
                        write!(out, " {}=\"{}\"", attribute.name, raw)?
                    }
                    _ => write!(out, " {}=\"{}\"", attribute.name, escape(attribute.value.as_str()))?,
                }
            }
            if element.children.is_empty() && element.explicit_close {
                write!(out, "></{}>", element.name)?;
            } else if element.children.is_empty() {
                out.write_all(b" />")?;
            } else {
                out.write_all(b">")?;
                for child in &element.children {
                    write_node(doc, *child, out)?;
                }
                write!(out, "</{}>", element.name)?;
            }
        }
        Node::Text(raw) => out.write_all(raw.as_bytes())?,
        Node::CData(raw) => write!(out, "<![CDATA[{}]]>", raw)?,
        Node::Comment(raw) => write!(out, "<!--{}-->", raw)?,
        Node::Declaration(raw) | Node::ProcessingInstruction(raw) => write!(out, "<?{}?>", raw)?,
        Node::DocType(raw) => write!(out, "<!DOCTYPE {}>", raw)?,
    }
    Ok(())
}
