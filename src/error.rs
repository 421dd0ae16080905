use thiserror::Error;

/// Represents errors that can occur while parsing, compiling or evaluating
/// templates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid v-for directive: {0}")]
    DirectiveSyntax(String),
    #[error("Failed to compile expression `{expr}`: {message}")]
    ExpressionCompile { expr: String, message: String },
    #[error("Failed to evaluate expression `{expr}`: {message}")]
    ExpressionEval { expr: String, message: String },
    #[error("v-for source `{expr}` did not evaluate to a list")]
    NotIterable { expr: String },
    #[error("Value error: {0}")]
    Value(String),
}

impl serde::ser::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::Value(msg.to_string())
    }
}
