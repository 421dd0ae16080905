pub mod dom;
pub mod error;
pub mod expr;
pub mod store;
pub mod tpl;
pub mod value;

pub use error::Error;
pub use expr::ExprEngine;
pub use expr::context::Context;
pub use store::TemplateStore;
pub use tpl::engine::{Engine, Template};
pub use value::Value;
