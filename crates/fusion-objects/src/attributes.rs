//! The `Attributes` object: renders HTML attribute lists.

use crate::common::{self, ObjectBase};
use fusion_runtime::{FusionObject, Runtime};
use fusion_types::{FusionResult, Value};

/// Renders ` name="value"` pairs for every non-ignored property in
/// insertion order. Null and `false` attributes are skipped; `true`
/// attributes render bare when `@allowEmpty` is set.
pub struct AttributesImplementation {
    base: ObjectBase,
    properties: Vec<String>,
    ignore_properties: Vec<String>,
}

impl AttributesImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            base: ObjectBase::new(path, object_type),
            properties: Vec::new(),
            ignore_properties: Vec::new(),
        }
    }
}

impl FusionObject for AttributesImplementation {
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
        let allow_empty = common::fusion_bool(runtime, self, "__meta/allowEmpty", true)?;
        let mut output = String::new();
        for name in &self.properties {
            if self.ignore_properties.contains(name) {
                continue;
            }
            let value = common::fusion_value(runtime, self, name)?;
            match value {
                Value::Null | Value::Bool(false) => continue,
                Value::Bool(true) if allow_empty => {
                    output.push(' ');
                    output.push_str(name);
                }
                other => {
                    output.push(' ');
                    output.push_str(name);
                    output.push_str("=\"");
                    output.push_str(&other.to_string());
                    output.push('"');
                }
            }
        }
        Ok(Value::String(output))
    }
}
