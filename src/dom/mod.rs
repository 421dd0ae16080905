pub mod parser;
pub mod writer;

use serde::Serialize;

/// A markup node. The same shape serves as the raw template tree produced by
/// the parser and as the output tree produced by evaluation; compiled
/// templates live in a separate structure (`tpl::compile::CompiledNode`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub tag: String,
    /// Attributes in declaration order.
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Looks up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }
}
