use quick_xml::escape::{escape, partial_escape};

use crate::dom::{Element, Node};

/// Serializes output nodes to markup text.
///
/// Escaping happens here and only here: element text escapes `&`, `<` and
/// `>`, attribute values additionally escape quotes. Nodes spliced in
/// structurally (by `v-html` or fragment-valued interpolations) were never
/// turned back into text, so they are not re-escaped.
pub fn write(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(e) => write_element(e, out),
        Node::Text(t) => out.push_str(&partial_escape(t.as_str())),
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
    }
}

fn write_element(e: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&e.tag);
    for attr in &e.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }

    if e.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &e.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&e.tag);
    out.push('>');
}
