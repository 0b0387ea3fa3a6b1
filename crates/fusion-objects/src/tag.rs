//! The `Tag` object: renders one markup tag.

use crate::common::{self, ObjectBase};
use fusion_runtime::{FusionObject, Runtime};
use fusion_types::{FusionError, FusionResult, Value};

/// Renders `<tagName attributes>content</tagName>`, honoring
/// `selfClosingTag` and `omitClosingTag`.
pub struct TagImplementation {
    base: ObjectBase,
}

impl TagImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            base: ObjectBase::new(path, object_type),
        }
    }
}

impl FusionObject for TagImplementation {
    fn path(&self) -> &str {
        self.base.path()
    }

    fn object_type(&self) -> &str {
        self.base.object_type()
    }

    fn evaluate(&self, runtime: &mut Runtime) -> FusionResult<Value> {
        let tag_name = common::fusion_string(runtime, self, "tagName")?.ok_or_else(|| {
            FusionError::Evaluation(format!(
                "missing property `tagName` at {}",
                self.base.path()
            ))
        })?;
        let self_closing = common::fusion_bool(runtime, self, "selfClosingTag", false)?;
        let omit_closing = common::fusion_bool(runtime, self, "omitClosingTag", false)?;
        let attributes = common::fusion_string(runtime, self, "attributes")?.unwrap_or_default();

        let mut output = String::new();
        output.push('<');
        output.push_str(&tag_name);
        output.push_str(&attributes);
        if self_closing {
            if !omit_closing {
                output.push('/');
            }
            output.push('>');
            return Ok(Value::String(output));
        }
        output.push('>');
        if let Some(content) = common::fusion_string(runtime, self, "content")? {
            output.push_str(&content);
        }
        if !omit_closing {
            output.push_str("</");
            output.push_str(&tag_name);
            output.push('>');
        }
        Ok(Value::String(output))
    }
}
