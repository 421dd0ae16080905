use crate::dom::{self, Attr, Element, Node};
use crate::error::Error;
use crate::expr::context::Context;
use crate::tpl::compile::{CompiledAttr, CompiledElement, CompiledNode, TextPiece};
use crate::value::Value;

/// Evaluates compiled nodes against a context, producing a fresh output
/// tree. The compiled tree is never touched; any failure propagates with no
/// partial output.
pub fn evaluate(nodes: &[CompiledNode], ctx: &mut Context) -> Result<Vec<Node>, Error> {
    let mut out = Vec::new();
    for node in nodes {
        eval_node(node, ctx, &mut out, true)?;
    }
    Ok(out)
}

fn eval_node(
    node: &CompiledNode,
    ctx: &mut Context,
    out: &mut Vec<Node>,
    can_start_loop: bool,
) -> Result<(), Error> {
    match node {
        CompiledNode::Element(e) => eval_element(e, ctx, out, can_start_loop),
        CompiledNode::Text(pieces) => eval_text(pieces, ctx, out),
        CompiledNode::Comment(c) => {
            out.push(Node::Comment(c.clone()));
            Ok(())
        }
    }
}

/// Renders one element. `can_start_loop` is threaded explicitly through the
/// recursion: a loop starts at most once per visit to its owning node, and
/// each iteration re-enters this function with the flag cleared so the same
/// `v-for` is not reinterpreted as a new nested loop.
fn eval_element(
    element: &CompiledElement,
    ctx: &mut Context,
    out: &mut Vec<Node>,
    can_start_loop: bool,
) -> Result<(), Error> {
    // v-for resolves before v-if: an empty collection skips the node before
    // the condition is ever evaluated, while a non-empty one lets v-if
    // filter each iteration individually.
    if can_start_loop {
        if let Some(spec) = &element.repeat {
            let items = match spec.source.evaluate(ctx)? {
                Value::List(items) => items,
                _ => {
                    return Err(Error::NotIterable {
                        expr: spec.source.source().to_string(),
                    });
                }
            };
            for item in items {
                ctx.set(spec.var.clone(), item);
                eval_element(element, ctx, out, false)?;
            }
            return Ok(());
        }
    }

    if let Some(cond) = &element.cond {
        if !cond.evaluate(ctx)?.is_truthy() {
            return Ok(());
        }
    }

    let mut output = Element::new(element.tag.clone());
    output.attrs.reserve(element.attrs.len());
    for attr in &element.attrs {
        match attr {
            CompiledAttr::Static { name, value } => output.attrs.push(Attr {
                name: name.clone(),
                value: value.clone(),
            }),
            CompiledAttr::Bound { name, expr } => output.attrs.push(Attr {
                name: name.clone(),
                value: expr.evaluate(ctx)?.to_string(),
            }),
        }
    }

    if let Some(raw) = &element.raw_body {
        splice_raw(raw.evaluate(ctx)?, &mut output.children)?;
    } else {
        for child in &element.children {
            eval_node(child, ctx, &mut output.children, true)?;
        }
    }

    out.push(Node::Element(output));
    Ok(())
}

/// Splices a `v-html` result in as element content. Fragments enter as
/// structure; anything else stringifies and is parsed as raw markup, not
/// escaped into text.
fn splice_raw(value: Value, children: &mut Vec<Node>) -> Result<(), Error> {
    match value {
        Value::Null => Ok(()),
        Value::Fragment(nodes) => {
            children.extend(nodes);
            Ok(())
        }
        other => {
            children.extend(dom::parser::parse(&other.to_string())?);
            Ok(())
        }
    }
}

/// Renders a compiled text node: literal spans verbatim, interpolations
/// stringified. Null contributes nothing, and fragment values are spliced
/// as sibling nodes instead of being stringified.
fn eval_text(pieces: &[TextPiece], ctx: &Context, out: &mut Vec<Node>) -> Result<(), Error> {
    let mut text = String::new();
    for piece in pieces {
        match piece {
            TextPiece::Literal(s) => text.push_str(s),
            TextPiece::Interp(expr) => match expr.evaluate(ctx)? {
                Value::Null => {}
                Value::Fragment(nodes) => {
                    if !text.is_empty() {
                        out.push(Node::Text(std::mem::take(&mut text)));
                    }
                    out.extend(nodes);
                }
                value => {
                    let rendered = value.to_string();
                    text.push_str(&rendered);
                }
            },
        }
    }
    if !text.is_empty() {
        out.push(Node::Text(text));
    }
    Ok(())
}
