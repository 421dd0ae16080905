use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};

use crate::dom::{Attr, Element, Node};
use crate::error::Error;

/// Parses markup source into a list of root nodes.
///
/// The input is treated as a fragment: multiple root elements and top-level
/// text are allowed, which is what raw content spliced by `v-html` looks
/// like. Whitespace-only text at the root is dropped; text inside elements
/// is kept verbatim.
pub fn parse(source: &str) -> Result<Vec<Node>, Error> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let mut roots: Vec<Node> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| Error::Parse(e.to_string()))? {
            Event::Start(e) => {
                stack.push(open_element(&e)?);
            }
            Event::Empty(e) => {
                let element = open_element(&e)?;
                push_node(&mut stack, &mut roots, Node::Element(element));
            }
            Event::End(_) => {
                // Name balance is checked by the reader.
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Parse("unexpected closing tag".to_string()))?;
                push_node(&mut stack, &mut roots, Node::Element(element));
            }
            Event::Text(t) => {
                let text = t.decode().map_err(|e| Error::Parse(e.to_string()))?;
                push_text(&mut stack, &mut roots, &text);
            }
            Event::GeneralRef(e) => {
                // Entity references arrive as separate events; fold them back
                // into the surrounding text.
                let raw = e.decode().map_err(|e| Error::Parse(e.to_string()))?;
                let resolved = resolve_reference(&raw)?;
                push_text(&mut stack, &mut roots, &resolved);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_text(&mut stack, &mut roots, &text);
            }
            Event::Comment(t) => {
                let text = t.decode().map_err(|e| Error::Parse(e.to_string()))?;
                push_node(&mut stack, &mut roots, Node::Comment(text.into_owned()));
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Parse(format!("unclosed element <{}>", open.tag)));
    }

    roots.retain(|n| match n {
        Node::Text(t) => !t.trim().is_empty(),
        _ => true,
    });
    Ok(roots)
}

fn open_element(e: &BytesStart<'_>) -> Result<Element, Error> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = Element::new(tag);

    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Parse(e.to_string()))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Parse(e.to_string()))?
            .into_owned();
        element.attrs.push(Attr { name, value });
    }
    Ok(element)
}

fn push_node(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        roots.push(node);
    }
}

fn push_text(stack: &mut [Element], roots: &mut Vec<Node>, text: &str) {
    let siblings = if let Some(parent) = stack.last_mut() {
        &mut parent.children
    } else {
        roots
    };
    // Adjacent text runs (text + resolved references) merge into one node.
    if let Some(Node::Text(last)) = siblings.last_mut() {
        last.push_str(text);
    } else {
        siblings.push(Node::Text(text.to_string()));
    }
}

fn resolve_reference(raw: &str) -> Result<String, Error> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.to_string());
    }

    if let Some(rest) = raw.strip_prefix('#') {
        let code = if let Some(hex) = rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            u32::from_str_radix(hex, 16)
                .map_err(|_| Error::Parse(format!("invalid numeric reference: &#{rest};")))?
        } else {
            rest.parse::<u32>()
                .map_err(|_| Error::Parse(format!("invalid numeric reference: &#{rest};")))?
        };
        let ch = char::from_u32(code)
            .ok_or_else(|| Error::Parse(format!("invalid code point: {code}")))?;
        return Ok(ch.to_string());
    }

    Err(Error::Parse(format!("unknown entity reference: &{raw};")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_with_text() {
        let nodes = parse("<div>hello</div>").unwrap();
        assert_eq!(nodes.len(), 1);
        let e = nodes[0].as_element().unwrap();
        assert_eq!(e.tag, "div");
        assert_eq!(e.children, vec![Node::Text("hello".to_string())]);
    }

    #[test]
    fn test_parse_attribute_order() {
        let nodes = parse(r#"<a href="x" class="y" id="z"/>"#).unwrap();
        let e = nodes[0].as_element().unwrap();
        let names: Vec<&str> = e.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["href", "class", "id"]);
    }

    #[test]
    fn test_parse_directive_attributes_kept_raw() {
        let nodes = parse(r#"<p v-for="n in names" :name="n"></p>"#).unwrap();
        let e = nodes[0].as_element().unwrap();
        assert_eq!(e.attr("v-for"), Some("n in names"));
        assert_eq!(e.attr(":name"), Some("n"));
    }

    #[test]
    fn test_parse_nested_elements() {
        let nodes = parse("<ul><li>a</li><li>b</li></ul>").unwrap();
        let ul = nodes[0].as_element().unwrap();
        assert_eq!(ul.children.len(), 2);
        assert_eq!(ul.children[0].as_element().unwrap().tag, "li");
    }

    #[test]
    fn test_parse_fragment_with_multiple_roots() {
        let nodes = parse("Hi <b>there</b>!").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], Node::Text("Hi ".to_string()));
        assert_eq!(nodes[1].as_element().unwrap().tag, "b");
        assert_eq!(nodes[2], Node::Text("!".to_string()));
    }

    #[test]
    fn test_parse_entity_references_merge_into_text() {
        let nodes = parse("<p>a &amp; b &lt; c</p>").unwrap();
        let e = nodes[0].as_element().unwrap();
        assert_eq!(e.children, vec![Node::Text("a & b < c".to_string())]);
    }

    #[test]
    fn test_parse_numeric_reference() {
        let nodes = parse("<p>&#65;&#x42;</p>").unwrap();
        let e = nodes[0].as_element().unwrap();
        assert_eq!(e.children, vec![Node::Text("AB".to_string())]);
    }

    #[test]
    fn test_parse_comment() {
        let nodes = parse("<div><!-- note --></div>").unwrap();
        let e = nodes[0].as_element().unwrap();
        assert_eq!(e.children, vec![Node::Comment(" note ".to_string())]);
    }

    #[test]
    fn test_parse_root_whitespace_dropped() {
        let nodes = parse("\n<div/>\n").unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_parse_unclosed_element() {
        assert!(matches!(parse("<div><p>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_mismatched_close() {
        assert!(matches!(parse("<div></p>"), Err(Error::Parse(_))));
    }
}
