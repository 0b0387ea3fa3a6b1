//! Shared plumbing for the standard object implementations.

use fusion_runtime::{FusionObject, Runtime};
use fusion_types::{FusionResult, Value};

/// The path/type pair every implementation closes over.
pub(crate) struct ObjectBase {
    path: String,
    object_type: String,
}

impl ObjectBase {
    pub(crate) fn new(path: String, object_type: String) -> Self {
        Self { path, object_type }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn object_type(&self) -> &str {
        &self.object_type
    }
}

/// Evaluate a property of `this` relative to its path.
pub(crate) fn fusion_value(
    runtime: &mut Runtime,
    this: &dyn FusionObject,
    name: &str,
) -> FusionResult<Value> {
    runtime.evaluate_with(&format!("{}/{}", this.path(), name), this)
}

/// Evaluate a property into text; null stays `None`.
pub(crate) fn fusion_string(
    runtime: &mut Runtime,
    this: &dyn FusionObject,
    name: &str,
) -> FusionResult<Option<String>> {
    let value = fusion_value(runtime, this, name)?;
    Ok(match value {
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

/// Evaluate a boolean property, falling back to `default` for anything
/// that is not a boolean.
pub(crate) fn fusion_bool(
    runtime: &mut Runtime,
    this: &dyn FusionObject,
    name: &str,
    default: bool,
) -> FusionResult<bool> {
    Ok(fusion_value(runtime, this, name)?.as_bool().unwrap_or(default))
}
