//! Fusion object (renderer) contract and registry.
//!
//! Renderer implementations are registered under the class names that
//! `@class` properties refer to; instantiation goes through an explicit
//! factory registry, and an unregistered name is a configuration error.

use crate::runtime::Runtime;
use fusion_types::{FusionError, FusionResult, Value};
use std::collections::BTreeMap;

/// A renderer for a typed Fusion object.
///
/// Implementations close over the path and type they were constructed for
/// and recurse into the runtime for their sub-paths.
pub trait FusionObject {
    /// The typed Fusion path this object renders.
    fn path(&self) -> &str;

    /// The Fusion object type this object was instantiated for.
    fn object_type(&self) -> &str;

    /// Render this object.
    fn evaluate(&self, runtime: &mut Runtime) -> FusionResult<Value>;

    /// Array-like objects receive the node's non-reserved child names in
    /// insertion order before evaluation.
    fn set_properties(&mut self, _names: Vec<String>) {}

    /// Array-like objects receive the evaluated `@ignoreProperties` names
    /// before evaluation.
    fn set_ignore_properties(&mut self, _names: Vec<String>) {}
}

/// Constructs a renderer for a (typed path, object type) pair.
pub type ObjectFactory = Box<dyn Fn(String, String) -> Box<dyn FusionObject>>;

/// Registry mapping configured `@class` names to renderer factories.
#[derive(Default)]
pub struct ObjectRegistry {
    factories: BTreeMap<String, ObjectFactory>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_name: impl Into<String>, factory: ObjectFactory) {
        self.factories.insert(class_name.into(), factory);
    }

    /// Instantiate the renderer registered for `class_name`.
    pub fn create(
        &self,
        class_name: &str,
        fusion_path: String,
        object_type: String,
    ) -> FusionResult<Box<dyn FusionObject>> {
        let factory = self.factories.get(class_name).ok_or_else(|| {
            FusionError::Configuration(format!(
                "the implementation class `{class_name}` defined for Fusion object of type \
                 `{object_type}` is not registered; maybe a typo in the @class property"
            ))
        })?;
        Ok(factory(fusion_path, object_type))
    }
}
