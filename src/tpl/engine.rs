use std::time::Instant;

use tracing::debug;

use crate::dom::{self, Node};
use crate::error::Error;
use crate::expr::ExprEngine;
use crate::expr::context::Context;
use crate::tpl::compile::{self, CompiledNode};
use crate::tpl::eval;
use crate::value::Value;

/// Compiles templates. Owns the expression engine, which is injected at
/// construction so different dialect configurations can coexist.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    exprs: ExprEngine,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exprs(exprs: ExprEngine) -> Self {
        Self { exprs }
    }

    /// Compiles template source. All directive grammar and every expression
    /// is checked here; a failed compile returns no partial template.
    pub fn compile(&self, source: &str) -> Result<Template, Error> {
        let start = Instant::now();
        let raw = dom::parser::parse(source)?;
        let roots = compile::compile_nodes(&self.exprs, &raw)?;
        debug!(
            "compiled template: roots={}, elapsed_ms={}",
            roots.len(),
            start.elapsed().as_millis()
        );
        Ok(Template { roots })
    }
}

/// A compiled template. Immutable once built, so one instance can be
/// evaluated from any number of threads at the same time; every evaluation
/// allocates its own output.
#[derive(Debug, Clone)]
pub struct Template {
    roots: Vec<CompiledNode>,
}

impl Template {
    /// Evaluates against a context, producing a fresh output tree.
    pub fn evaluate(&self, ctx: &mut Context) -> Result<Vec<Node>, Error> {
        let start = Instant::now();
        let out = eval::evaluate(&self.roots, ctx)?;
        debug!(
            "evaluated template: nodes={}, elapsed_ms={}",
            out.len(),
            start.elapsed().as_millis()
        );
        Ok(out)
    }

    /// Evaluates and serializes the output tree to text.
    pub fn render(&self, ctx: &mut Context) -> Result<String, Error> {
        Ok(dom::writer::write(&self.evaluate(ctx)?))
    }

    /// Evaluates into a fragment value, ready to be bound in another
    /// context and spliced into an outer template.
    pub fn to_fragment(&self, ctx: &mut Context) -> Result<Value, Error> {
        Ok(Value::Fragment(self.evaluate(ctx)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_render() {
        let engine = Engine::new();
        let template = engine.compile("<div>Hello {{name}}!</div>").unwrap();

        let mut ctx = Context::new();
        ctx.set("name", "Daffy");
        assert_eq!(template.render(&mut ctx).unwrap(), "<div>Hello Daffy!</div>");
    }

    #[test]
    fn test_template_reused_across_contexts() {
        let template = Engine::new()
            .compile(r#"<p v-if="vip">Welcome back</p>"#)
            .unwrap();

        let mut vip = Context::new();
        vip.set("vip", true);
        assert_eq!(template.render(&mut vip).unwrap(), "<p>Welcome back</p>");

        let mut regular = Context::new();
        regular.set("vip", false);
        assert_eq!(template.render(&mut regular).unwrap(), "");
    }

    #[test]
    fn test_fragment_composition() {
        let engine = Engine::new();
        let inner = engine.compile("<b>{{word}}</b>").unwrap();
        let outer = engine.compile("<p>{{content}}</p>").unwrap();

        let mut inner_ctx = Context::new();
        inner_ctx.set("word", "nested");
        let fragment = inner.to_fragment(&mut inner_ctx).unwrap();

        let mut ctx = Context::new();
        ctx.set("content", fragment);
        assert_eq!(outer.render(&mut ctx).unwrap(), "<p><b>nested</b></p>");
    }
}
