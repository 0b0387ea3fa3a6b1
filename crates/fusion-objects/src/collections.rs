//! The `DataStructure`, `Map` and `Loop` objects.

use crate::common::{self, ObjectBase};
use fusion_runtime::{FusionObject, Runtime};
use fusion_types::{FusionError, FusionResult, Value};
use indexmap::IndexMap;

/// Evaluates every non-ignored property into a map, insertion order
/// preserved.
pub struct DataStructureImplementation {
    base: ObjectBase,
    properties: Vec<String>,
    ignore_properties: Vec<String>,
}

impl DataStructureImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            base: ObjectBase::new(path, object_type),
            properties: Vec::new(),
            ignore_properties: Vec::new(),
        }
    }
}

impl FusionObject for DataStructureImplementation {
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
        let mut result = IndexMap::new();
        for property in &self.properties {
            if self.ignore_properties.contains(property) {
                continue;
            }
            let value = runtime.evaluate(&format!("{}/{}", self.base.path(), property))?;
            result.insert(property.clone(), value);
        }
        Ok(Value::Map(result))
    }
}

/// Iterates `items`, rendering `itemRenderer` once per entry with the item
/// bound into the context.
pub struct MapImplementation {
    base: ObjectBase,
}

impl MapImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            base: ObjectBase::new(path, object_type),
        }
    }

    pub(crate) fn render_items(
        &self,
        runtime: &mut Runtime,
    ) -> FusionResult<IndexMap<String, Value>> {
        let items = common::fusion_value(runtime, self, "items")?;
        let mut result = IndexMap::new();
        if items.is_null() {
            return Ok(result);
        }
        let item_name = common::fusion_string(runtime, self, "itemName")?
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                FusionError::Evaluation(format!(
                    "the collection at {} needs an itemName to be set",
                    self.base.path()
                ))
            })?;
        let item_key =
            common::fusion_string(runtime, self, "itemKey")?.filter(|name| !name.is_empty());
        let iteration_name = common::fusion_string(runtime, self, "iterationName")?
            .filter(|name| !name.is_empty());

        match items {
            Value::List(entries) => {
                let total = entries.len();
                for (index, item) in entries.into_iter().enumerate() {
                    let key_binding = item_key
                        .as_deref()
                        .map(|name| (name.to_string(), Value::Int(index as i64)));
                    let rendered = self.render_item(
                        runtime,
                        &item_name,
                        item,
                        key_binding,
                        iteration_name.as_deref(),
                        index,
                        total,
                    )?;
                    result.insert(index.to_string(), rendered);
                }
            }
            Value::Map(entries) => {
                let total = entries.len();
                for (index, (key, item)) in entries.into_iter().enumerate() {
                    let key_binding = item_key
                        .as_deref()
                        .map(|name| (name.to_string(), Value::String(key.clone())));
                    let rendered = self.render_item(
                        runtime,
                        &item_name,
                        item,
                        key_binding,
                        iteration_name.as_deref(),
                        index,
                        total,
                    )?;
                    result.insert(key, rendered);
                }
            }
            other => {
                return Err(FusionError::Evaluation(format!(
                    "cannot iterate {} at {}/items",
                    other.type_name(),
                    self.base.path()
                )));
            }
        }
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_item(
        &self,
        runtime: &mut Runtime,
        item_name: &str,
        item: Value,
        key_binding: Option<(String, Value)>,
        iteration_name: Option<&str>,
        index: usize,
        total: usize,
    ) -> FusionResult<Value> {
        let mut frame = runtime.current_context().clone();
        frame.insert(item_name.to_string(), item);
        if let Some((name, key_value)) = key_binding {
            frame.insert(name, key_value);
        }
        if let Some(name) = iteration_name {
            frame.insert(name.to_string(), iteration_information(index, total));
        }
        runtime.push_context_map(frame);
        let rendered = runtime.evaluate(&format!("{}/itemRenderer", self.base.path()));
        runtime.pop_context();
        rendered
    }
}

impl FusionObject for MapImplementation {
    fn path(&self) -> &str {
        self.base.path()
    }

    fn object_type(&self) -> &str {
        self.base.object_type()
    }

    fn evaluate(&self, runtime: &mut Runtime) -> FusionResult<Value> {
        Ok(Value::Map(self.render_items(runtime)?))
    }
}

/// A `Map` whose rendered items are joined into one string with `@glue`.
pub struct LoopImplementation {
    inner: MapImplementation,
}

impl LoopImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            inner: MapImplementation::new(path, object_type),
        }
    }
}

impl FusionObject for LoopImplementation {
    fn path(&self) -> &str {
        self.inner.path()
    }

    fn object_type(&self) -> &str {
        self.inner.object_type()
    }

    fn evaluate(&self, runtime: &mut Runtime) -> FusionResult<Value> {
        let glue = common::fusion_string(runtime, self, "__meta/glue")?.unwrap_or_default();
        let collection = self.inner.render_items(runtime)?;
        let joined = collection
            .values()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(&glue);
        Ok(Value::String(joined))
    }
}

fn iteration_information(index: usize, total: usize) -> Value {
    let cycle = index + 1;
    let mut info = IndexMap::new();
    info.insert("index".to_string(), Value::Int(index as i64));
    info.insert("cycle".to_string(), Value::Int(cycle as i64));
    info.insert("isFirst".to_string(), Value::Bool(index == 0));
    info.insert("isLast".to_string(), Value::Bool(cycle == total));
    info.insert("isEven".to_string(), Value::Bool(cycle % 2 == 0));
    info.insert("isOdd".to_string(), Value::Bool(cycle % 2 == 1));
    Value::Map(info)
}
