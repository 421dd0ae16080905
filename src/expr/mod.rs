pub mod context;

use rust_decimal::prelude::ToPrimitive;

use crate::error::Error;
use crate::expr::context::Context;
use crate::value::Value;

/// Compiles expression text into reusable [`Expr`] handles.
///
/// Engines are plain values constructed by the caller and passed to the
/// template compiler, so independent configurations can coexist; nothing in
/// this module is process-global.
///
/// The dialect: literals (`null`, `true`, `false`, integers, floats, quoted
/// strings), dotted variable paths, comparisons (`==`, `!=`, `>`, `>=`, `<`,
/// `<=`) and `and`/`or`, with `and` binding tighter than `or`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEngine;

impl ExprEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, source: &str) -> Result<Expr, Error> {
        let trimmed = source.trim();
        let compile_err = |message: String| Error::ExpressionCompile {
            expr: trimmed.to_string(),
            message,
        };

        let tokens = tokenize(trimmed).map_err(compile_err)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or().map_err(compile_err)?;
        if parser.pos != parser.tokens.len() {
            return Err(compile_err("unexpected trailing input".to_string()));
        }
        Ok(Expr {
            source: trimmed.to_string(),
            root,
        })
    }
}

/// A precompiled expression. Opaque to the compiler and evaluator, which only
/// ever call [`Expr::evaluate`].
#[derive(Debug, Clone)]
pub struct Expr {
    source: String,
    root: ExprNode,
}

impl Expr {
    /// The trimmed source text, used in error reports.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, ctx: &Context) -> Result<Value, Error> {
        self.root.eval(ctx).map_err(|message| Error::ExpressionEval {
            expr: self.source.clone(),
            message,
        })
    }
}

#[derive(Debug, Clone)]
enum ExprNode {
    Literal(Value),
    Path(Vec<String>),
    Compare {
        op: CmpOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    And(Vec<ExprNode>),
    Or(Vec<ExprNode>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug)]
enum Token {
    Literal(Value),
    Path(Vec<String>),
    Cmp(CmpOp),
    And,
    Or,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            i += 1;
        } else if c == '\'' || c == '"' {
            let start = i + 1;
            let end = source[start..]
                .find(c)
                .map(|j| start + j)
                .ok_or_else(|| format!("unterminated string starting at {i}"))?;
            tokens.push(Token::Literal(Value::Str(source[start..end].to_string())));
            i = end + 1;
        } else if c == '=' || c == '!' || c == '>' || c == '<' {
            let two = source.get(i..i + 2);
            let (op, len) = match two {
                Some("==") => (CmpOp::Eq, 2),
                Some("!=") => (CmpOp::Ne, 2),
                Some(">=") => (CmpOp::Ge, 2),
                Some("<=") => (CmpOp::Le, 2),
                _ if c == '>' => (CmpOp::Gt, 1),
                _ if c == '<' => (CmpOp::Lt, 1),
                _ => return Err(format!("unexpected `{c}`")),
            };
            tokens.push(Token::Cmp(op));
            i += len;
        } else if c.is_ascii_digit() || c == '-' {
            let start = i;
            i += 1;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let text = &source[start..i];
            let literal = if text.contains('.') {
                text.parse::<f64>().ok().map(Value::F64)
            } else {
                text.parse::<i64>().ok().map(Value::I64)
            };
            match literal {
                Some(v) => tokens.push(Token::Literal(v)),
                None => return Err(format!("invalid number `{text}`")),
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() {
                let c = bytes[i] as char;
                if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                    i += 1;
                } else {
                    break;
                }
            }
            let word = &source[start..i];
            match word {
                "and" => tokens.push(Token::And),
                "or" => tokens.push(Token::Or),
                "null" => tokens.push(Token::Literal(Value::Null)),
                "true" => tokens.push(Token::Literal(Value::Bool(true))),
                "false" => tokens.push(Token::Literal(Value::Bool(false))),
                _ => {
                    let segments: Vec<String> =
                        word.split('.').map(|s| s.to_string()).collect();
                    if segments.iter().any(|s| s.is_empty()) {
                        return Err(format!("invalid variable path `{word}`"));
                    }
                    tokens.push(Token::Path(segments));
                }
            }
        } else {
            return Err(format!("unexpected character `{c}`"));
        }
    }

    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_or(&mut self) -> Result<ExprNode, String> {
        let mut parts = vec![self.parse_and()?];
        while matches!(self.tokens.get(self.pos), Some(Token::Or)) {
            self.pos += 1;
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            ExprNode::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<ExprNode, String> {
        let mut parts = vec![self.parse_comparison()?];
        while matches!(self.tokens.get(self.pos), Some(Token::And)) {
            self.pos += 1;
            parts.push(self.parse_comparison()?);
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            ExprNode::And(parts)
        })
    }

    fn parse_comparison(&mut self) -> Result<ExprNode, String> {
        let left = self.parse_operand()?;
        if let Some(Token::Cmp(op)) = self.tokens.get(self.pos) {
            let op = *op;
            self.pos += 1;
            let right = self.parse_operand()?;
            return Ok(ExprNode::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<ExprNode, String> {
        match self.tokens.get(self.pos) {
            Some(Token::Literal(v)) => {
                let node = ExprNode::Literal(v.clone());
                self.pos += 1;
                Ok(node)
            }
            Some(Token::Path(segments)) => {
                let node = ExprNode::Path(segments.clone());
                self.pos += 1;
                Ok(node)
            }
            _ => Err("expected a literal or variable".to_string()),
        }
    }
}

impl ExprNode {
    fn eval(&self, ctx: &Context) -> Result<Value, String> {
        match self {
            ExprNode::Literal(v) => Ok(v.clone()),
            ExprNode::Path(segments) => Ok(resolve_path(ctx, segments).clone()),
            ExprNode::Compare { op, left, right } => {
                let l = left.eval(ctx)?;
                let r = right.eval(ctx)?;
                compare(*op, &l, &r).map(Value::Bool)
            }
            ExprNode::And(parts) => {
                for part in parts {
                    if !part.eval(ctx)?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            ExprNode::Or(parts) => {
                for part in parts {
                    if part.eval(ctx)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
        }
    }
}

/// Unknown variables and unmatched path segments resolve to Null.
fn resolve_path<'a>(ctx: &'a Context, segments: &[String]) -> &'a Value {
    static NULL: Value = Value::Null;

    let mut current = match ctx.get(&segments[0]) {
        Some(v) => v,
        None => return &NULL,
    };
    for segment in &segments[1..] {
        current = match current {
            Value::Map(entries) => match entries.get(segment) {
                Some(v) => v,
                None => return &NULL,
            },
            _ => return &NULL,
        };
    }
    current
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, String> {
    match op {
        CmpOp::Eq => Ok(loose_eq(left, right)),
        CmpOp::Ne => Ok(!loose_eq(left, right)),
        _ => {
            let ordering = if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
                a.partial_cmp(&b)
                    .ok_or_else(|| "cannot order NaN".to_string())?
            } else if let (Value::Str(a), Value::Str(b)) = (left, right) {
                a.cmp(b)
            } else {
                return Err(format!(
                    "cannot order {} and {}",
                    left.type_name(),
                    right.type_name()
                ));
            };
            Ok(match op {
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            })
        }
    }
}

/// Equality compares across numeric types; otherwise values must match
/// structurally.
fn loose_eq(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
        return a == b;
    }
    left == right
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::I64(v) => Some(*v as f64),
        Value::F64(v) => Some(*v),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    }
}
