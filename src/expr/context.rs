use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Error;
use crate::value::{self, Value};

/// Named-variable store read by expressions during evaluation.
///
/// Loop variables are bound with plain [`Context::set`]: a binding shadows
/// any existing value of the same name and is not restored when the loop
/// finishes. The binding is only meaningful while its owning node renders,
/// so nothing depends on the old value coming back.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from any serializable value. The value must
    /// serialize to a map or struct; its fields become the variables.
    pub fn from_serialize<T: Serialize>(data: &T) -> Result<Self, Error> {
        match value::to_value(data)? {
            Value::Map(entries) => Ok(Self { vars: entries }),
            other => Err(Error::Value(format!(
                "context data must serialize to a map, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }
}
