use crate::dom::{Element, Node};
use crate::error::Error;
use crate::expr::{Expr, ExprEngine};

/// A template node annotated with precompiled expression handles.
///
/// This is a parallel structure, not metadata hung on the raw parse tree:
/// once built it is immutable and safe to evaluate from any number of
/// threads at once.
#[derive(Debug, Clone)]
pub enum CompiledNode {
    Element(CompiledElement),
    Text(Vec<TextPiece>),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct CompiledElement {
    pub tag: String,
    /// `v-if` condition.
    pub cond: Option<Expr>,
    /// `v-for` loop spec.
    pub repeat: Option<LoopSpec>,
    /// `v-html` raw body.
    pub raw_body: Option<Expr>,
    /// Remaining attributes in declaration order; directives are stripped
    /// here so evaluation emits exactly the source order minus directives.
    pub attrs: Vec<CompiledAttr>,
    pub children: Vec<CompiledNode>,
}

#[derive(Debug, Clone)]
pub struct LoopSpec {
    pub var: String,
    pub source: Expr,
}

#[derive(Debug, Clone)]
pub enum CompiledAttr {
    Static { name: String, value: String },
    Bound { name: String, expr: Expr },
}

/// One piece of a text node: a literal span or a `{{ ... }}` interpolation.
#[derive(Debug, Clone)]
pub enum TextPiece {
    Literal(String),
    Interp(Expr),
}

/// Compiles a raw tree. Compilation is total: every node is visited and
/// every expression compiled, even under a `v-if` that can never be true.
pub fn compile_nodes(exprs: &ExprEngine, nodes: &[Node]) -> Result<Vec<CompiledNode>, Error> {
    nodes
        .iter()
        .map(|node| match node {
            Node::Element(e) => Ok(CompiledNode::Element(compile_element(exprs, e)?)),
            Node::Text(t) => Ok(CompiledNode::Text(compile_text(exprs, t)?)),
            Node::Comment(c) => Ok(CompiledNode::Comment(c.clone())),
        })
        .collect()
}

fn compile_element(exprs: &ExprEngine, element: &Element) -> Result<CompiledElement, Error> {
    let mut compiled = CompiledElement {
        tag: element.tag.clone(),
        cond: None,
        repeat: None,
        raw_body: None,
        attrs: Vec::new(),
        children: Vec::new(),
    };

    for attr in &element.attrs {
        match attr.name.as_str() {
            "v-if" => compiled.cond = Some(exprs.compile(&attr.value)?),
            "v-for" => compiled.repeat = Some(compile_loop(exprs, &attr.value)?),
            "v-html" => compiled.raw_body = Some(exprs.compile(&attr.value)?),
            name => {
                if let Some(bound) = name.strip_prefix(':') {
                    compiled.attrs.push(CompiledAttr::Bound {
                        name: bound.to_string(),
                        expr: exprs.compile(&attr.value)?,
                    });
                } else {
                    compiled.attrs.push(CompiledAttr::Static {
                        name: attr.name.clone(),
                        value: attr.value.clone(),
                    });
                }
            }
        }
    }

    compiled.children = compile_nodes(exprs, &element.children)?;
    Ok(compiled)
}

fn compile_loop(exprs: &ExprEngine, value: &str) -> Result<LoopSpec, Error> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 3 || parts[1] != "in" {
        return Err(Error::DirectiveSyntax(format!(
            "expected `<var> in <list>`, got `{value}`"
        )));
    }
    Ok(LoopSpec {
        var: parts[0].to_string(),
        source: exprs.compile(parts[2])?,
    })
}

/// Splits text into literal and interpolation pieces. Spans are delimited by
/// `{{` and `}}`, may not contain brace characters, and match left-to-right
/// without overlapping.
fn compile_text(exprs: &ExprEngine, text: &str) -> Result<Vec<TextPiece>, Error> {
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut search = 0;

    while let Some(found) = text[search..].find("{{") {
        let open = search + found;
        let inner_start = open + 2;
        let stop = text[inner_start..]
            .find(['{', '}'])
            .map(|j| inner_start + j);

        match stop {
            Some(close) if text[close..].starts_with("}}") => {
                if open > literal_start {
                    pieces.push(TextPiece::Literal(text[literal_start..open].to_string()));
                }
                pieces.push(TextPiece::Interp(
                    exprs.compile(text[inner_start..close].trim())?,
                ));
                literal_start = close + 2;
                search = literal_start;
            }
            // Not a span (embedded brace or no closer); keep it as literal
            // text and look for the next candidate.
            _ => search = open + 1,
        }
    }

    if literal_start < text.len() {
        pieces.push(TextPiece::Literal(text[literal_start..].to_string()));
    }
    Ok(pieces)
}
