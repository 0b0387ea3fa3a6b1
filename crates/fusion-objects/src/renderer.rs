//! The `Renderer` object: delegates rendering to another path or type.

use crate::common::{self, ObjectBase};
use fusion_runtime::{FusionObject, Runtime};
use fusion_types::{FusionError, FusionResult, Value};

/// Delegates to its `renderer` property when renderable, else to
/// `renderPath` (absolute with a leading `/`, relative otherwise), else to
/// `element<type>`.
pub struct RendererImplementation {
    base: ObjectBase,
}

impl RendererImplementation {
    pub fn new(path: String, object_type: String) -> Self {
        Self {
            base: ObjectBase::new(path, object_type),
        }
    }
}

impl FusionObject for RendererImplementation {
    fn path(&self) -> &str {
        self.base.path()
    }

    fn object_type(&self) -> &str {
        self.base.object_type()
    }

    fn evaluate(&self, runtime: &mut Runtime) -> FusionResult<Value> {
        let renderer_path = format!("{}/renderer", self.base.path());
        if runtime.is_configured(&renderer_path) {
            return runtime.evaluate_with(&renderer_path, self);
        }
        if let Some(render_path) =
            common::fusion_string(runtime, self, "renderPath")?.filter(|path| !path.is_empty())
        {
            let output = match render_path.strip_prefix('/') {
                Some(absolute) => runtime.render(absolute)?,
                None => runtime.render(&format!(
                    "{}/{}",
                    self.base.path(),
                    render_path.replace('.', "/")
                ))?,
            };
            return Ok(Value::String(output));
        }
        let object_type = common::fusion_string(runtime, self, "type")?
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                FusionError::Evaluation(format!(
                    "the Renderer at {} needs either a renderer, a renderPath or a type",
                    self.base.path()
                ))
            })?;
        let output = runtime.render(&format!("{}/element<{object_type}>", self.base.path()))?;
        Ok(Value::String(output))
    }
}
