//! The `Value` and `Join` objects.

use crate::common::{self, ObjectBase};
use fusion_runtime::{FusionObject, Runtime};
use fusion_types::{FusionResult, Value};

/// Renders its `value` property.
pub struct ValueImplementation {
    base: ObjectBase,
}

impl ValueImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            base: ObjectBase::new(path, object_type),
        }
    }
}

impl FusionObject for ValueImplementation {
    fn path(&self) -> &str {
        self.base.path()
    }

    fn object_type(&self) -> &str {
        self.base.object_type()
    }

    fn evaluate(&self, runtime: &mut Runtime) -> FusionResult<Value> {
        common::fusion_value(runtime, self, "value")
    }
}

/// Concatenates the rendered non-ignored properties in insertion order.
pub struct JoinImplementation {
    base: ObjectBase,
    properties: Vec<String>,
    ignore_properties: Vec<String>,
}

impl JoinImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            base: ObjectBase::new(path, object_type),
            properties: Vec::new(),
            ignore_properties: Vec::new(),
        }
    }
}

impl FusionObject for JoinImplementation {
    fn path(&self) -> &str {
        self.base.path()
    }

    fn object_type(&self) -> &str {
        self.base.object_type()
    }

    fn set_properties(&mut self, names: Vec<String>) {
        self.properties = names;
    }

    fn set_ignore_properties(&mut self, names: Vec<String>) {
        self.ignore_properties = names;
    }

    fn evaluate(&self, runtime: &mut Runtime) -> FusionResult<Value> {
        let mut output = String::new();
        for property in &self.properties {
            if self.ignore_properties.contains(property) {
                continue;
            }
            let value = runtime.evaluate(&format!("{}/{}", self.base.path(), property))?;
            output.push_str(&value.to_string());
        }
        Ok(Value::String(output))
    }
}
