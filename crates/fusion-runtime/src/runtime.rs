//! The evaluation session: drives guards, override spreads, renderer
//! instantiation, context scoping, post-processing and error funneling.

use crate::cache::{CacheAttributes, ContentCache};
use crate::context::{ContextMap, ContextStack};
use crate::expression::ExpressionEvaluator;
use crate::handlers::HandlerRegistry;
use crate::objects::{FusionObject, ObjectRegistry};
use crate::resolver::resolve;
use fusion_types::{keys, FusionError, FusionNode, FusionResult, TreeValue, Value};
use indexmap::IndexMap;
use tracing::{trace, warn};

/// Whether the last `evaluate` call actually executed its path or skipped
/// an unconfigured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStatus {
    Executed,
    Skipped,
}

#[derive(Clone, Copy)]
enum FailureBehavior {
    Exception,
    ReturnNull,
}

/// `@apply`-spread values keyed by the synthetic override path.
type ApplyFrame = IndexMap<String, Value>;

/// Runtime settings chosen by the embedder.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Wrap rendered output in path marker comments.
    pub debug_mode: bool,
    /// Default exception handler for top-level `render()` calls.
    pub exception_handler: String,
    /// Default exception handler for nested `render()` calls issued while
    /// another path is being evaluated.
    pub inner_exception_handler: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            exception_handler: "plaintext".to_string(),
            inner_exception_handler: "plaintext".to_string(),
        }
    }
}

/// A single evaluation session over one configuration tree.
///
/// The context and apply-override stacks are session state; a session is
/// driven through `&mut self` and therefore never evaluated concurrently.
/// Independent sessions are independent values.
pub struct Runtime {
    configuration: FusionNode,
    context: ContextStack,
    apply_values: Vec<ApplyFrame>,
    last_evaluation_status: EvaluationStatus,
    cache: ContentCache,
    objects: ObjectRegistry,
    handlers: HandlerRegistry,
    expression_evaluator: Option<Box<dyn ExpressionEvaluator>>,
    settings: RuntimeSettings,
    depth: usize,
}

impl Runtime {
    pub fn new(configuration: FusionNode) -> Self {
        Self {
            configuration,
            context: ContextStack::new(),
            apply_values: vec![ApplyFrame::new()],
            last_evaluation_status: EvaluationStatus::Executed,
            cache: ContentCache::new(),
            objects: ObjectRegistry::new(),
            handlers: HandlerRegistry::with_defaults(),
            expression_evaluator: None,
            settings: RuntimeSettings::default(),
            depth: 0,
        }
    }

    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn objects_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.objects
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    pub fn set_expression_evaluator(&mut self, evaluator: Box<dyn ExpressionEvaluator>) {
        self.expression_evaluator = Some(evaluator);
    }

    pub fn last_evaluation_status(&self) -> EvaluationStatus {
        self.last_evaluation_status
    }

    // ── Context stack ─────────────────────────────────────────────────────

    /// Push one binding onto the rendering context.
    pub fn push_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.push(key, value);
    }

    /// Replace the visible context with the given bindings.
    pub fn push_context_map(&mut self, bindings: ContextMap) {
        self.context.push_map(bindings);
    }

    pub fn pop_context(&mut self) -> Option<ContextMap> {
        self.context.pop()
    }

    pub fn current_context(&self) -> &ContextMap {
        self.context.current()
    }

    // ── Cache coordination ────────────────────────────────────────────────

    /// Add a tag to the current cache segment. Ignored while content
    /// caching is disabled.
    pub fn add_cache_tag(&mut self, key: &str, value: &str) -> FusionResult<()> {
        if !self.cache.is_enabled() {
            return Ok(());
        }
        self.cache.add_tag(key, value)
    }

    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Drain the tags accumulated for the current cache segment.
    pub fn flush_cache_tags(&mut self) -> Vec<String> {
        self.cache.flush_tags()
    }

    /// Evaluate a path with a given context and content caching switched
    /// off — used to render uncached segments out of band from within an
    /// otherwise cached ancestor.
    pub fn evaluate_uncached(
        &mut self,
        fusion_path: &str,
        bindings: ContextMap,
    ) -> FusionResult<Value> {
        let previously_enabled = self.cache.is_enabled();
        self.cache.set_enabled(false);
        self.context.push_map(bindings);
        let result = self.evaluate(fusion_path);
        self.context.pop();
        self.cache.set_enabled(previously_enabled);
        result
    }

    // ── Public evaluation entry points ────────────────────────────────────

    /// Evaluate an absolute Fusion path. Lenient: an unconfigured path
    /// yields `Value::Null` and sets the status to `Skipped`.
    pub fn evaluate(&mut self, fusion_path: &str) -> FusionResult<Value> {
        self.evaluate_internal(fusion_path, FailureBehavior::ReturnNull, None)
    }

    /// Like [`Self::evaluate`], with a `this` object for embedded
    /// expressions. Used by renderer implementations for their sub-paths.
    pub fn evaluate_with(
        &mut self,
        fusion_path: &str,
        this_object: &dyn FusionObject,
    ) -> FusionResult<Value> {
        self.evaluate_internal(fusion_path, FailureBehavior::ReturnNull, Some(this_object))
    }

    /// Render an absolute Fusion path into output text. Strict: failures
    /// are funneled to the exception handler selected for the path, whose
    /// text substitutes for the output unless the handler rethrows.
    pub fn render(&mut self, fusion_path: &str) -> FusionResult<String> {
        let nested = self.depth > 0;
        match self.evaluate_internal(fusion_path, FailureBehavior::Exception, None) {
            Ok(value) => {
                let output = value.to_string();
                if self.settings.debug_mode {
                    let context_keys = self
                        .current_context()
                        .keys()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Ok(format!(
                        "\n<!-- Beginning to render path \"{fusion_path}\" (Context: {context_keys}) -->\
                         {output}\n\
                         <!-- End to render path \"{fusion_path}\" (Context: {context_keys}) -->"
                    ));
                }
                Ok(output)
            }
            Err(error) => self.handle_rendering_exception(fusion_path, error, nested),
        }
    }

    /// Whether the path exists and has an implementation — a value, an
    /// expression, or a typed object with a `@class`.
    pub fn can_render(&self, fusion_path: &str) -> bool {
        resolve(&self.configuration, fusion_path)
            .map(|configuration| can_render_with(&configuration))
            .unwrap_or(false)
    }

    /// Whether the path resolves to explicit configuration. The resolver's
    /// render-as-nothing default for unconfigured leaves does not count.
    pub fn is_configured(&self, fusion_path: &str) -> bool {
        let Ok(configuration) = resolve(&self.configuration, fusion_path) else {
            return false;
        };
        configuration.value != Some(TreeValue::String(String::new()))
            || !configuration.expression.is_empty()
            || !configuration.object_type.is_empty()
            || !configuration.children.is_empty()
    }

    // ── Internal evaluation ───────────────────────────────────────────────

    fn evaluate_internal(
        &mut self,
        fusion_path: &str,
        behavior: FailureBehavior,
        this_object: Option<&dyn FusionObject>,
    ) -> FusionResult<Value> {
        trace!(path = fusion_path, "evaluate");
        self.last_evaluation_status = EvaluationStatus::Executed;
        let configuration = resolve(&self.configuration, fusion_path)?;
        let attributes = CacheAttributes::from_node(configuration.meta("cache"));
        let cache_context = self.cache.enter(&attributes, fusion_path)?;
        self.depth += 1;
        let result = self.evaluate_resolved(fusion_path, &configuration, behavior, this_object);
        self.depth -= 1;
        self.cache.leave(cache_context);
        result
    }

    fn evaluate_resolved(
        &mut self,
        fusion_path: &str,
        configuration: &FusionNode,
        behavior: FailureBehavior,
        this_object: Option<&dyn FusionObject>,
    ) -> FusionResult<Value> {
        // a pending @apply override for this exact path bypasses normal
        // evaluation entirely; the node's own renderer is never constructed
        let pending = self.current_apply_values().get(fusion_path).cloned();
        if let Some(value) = pending {
            if !self.evaluate_if_condition(configuration, fusion_path, this_object)? {
                return Ok(Value::Null);
            }
            return self.evaluate_processors(value, configuration, fusion_path, this_object);
        }

        if !can_render_with(configuration) {
            self.last_evaluation_status = EvaluationStatus::Skipped;
            return match behavior {
                FailureBehavior::Exception => Err(unrenderable_error(fusion_path, configuration)),
                FailureBehavior::ReturnNull => Ok(Value::Null),
            };
        }

        if has_expression_or_value(configuration) {
            if !self.evaluate_if_condition(configuration, fusion_path, this_object)? {
                return Ok(Value::Null);
            }
            let value = self.evaluate_expression_or_value(configuration, this_object)?;
            return self.evaluate_processors(value, configuration, fusion_path, this_object);
        }

        self.evaluate_object(fusion_path, configuration)
    }

    fn evaluate_object(
        &mut self,
        fusion_path: &str,
        configuration: &FusionNode,
    ) -> FusionResult<Value> {
        // @apply values are not inherited: every object evaluation pushes
        // its own frame, empty when nothing is declared
        let spread = self.evaluate_apply_values(configuration, fusion_path)?;
        self.apply_values.push(spread);
        let result = self.evaluate_object_inner(fusion_path, configuration);
        self.apply_values.pop();
        result
    }

    fn evaluate_object_inner(
        &mut self,
        fusion_path: &str,
        configuration: &FusionNode,
    ) -> FusionResult<Value> {
        let typed_path = typed_fusion_path(fusion_path, &configuration.object_type);
        let mut fusion_object = self.instantiate_object(&typed_path, configuration)?;
        self.configure_properties(fusion_object.as_mut(), &typed_path, configuration)?;

        let pushed_context = !configuration.meta("context").children.is_empty();
        if pushed_context {
            let frame = self.context.current().clone();
            self.context.push_map(frame);
        }
        let result =
            self.evaluate_object_guarded(&typed_path, configuration, fusion_object.as_ref());
        if pushed_context {
            self.context.pop();
        }
        result
    }

    fn evaluate_object_guarded(
        &mut self,
        typed_path: &str,
        configuration: &FusionNode,
        fusion_object: &dyn FusionObject,
    ) -> FusionResult<Value> {
        // @context entries are evaluated in declaration order; entries
        // declared earlier are visible to the ones after them
        let context_keys: Vec<String> = configuration
            .meta("context")
            .children
            .keys()
            .cloned()
            .collect();
        for key in context_keys {
            let context_path = format!("{typed_path}/__meta/context/{key}");
            let value =
                self.evaluate_internal(&context_path, FailureBehavior::Exception, Some(fusion_object))?;
            self.context.current_mut().insert(key, value);
        }

        if !self.evaluate_if_condition(configuration, typed_path, Some(fusion_object))? {
            self.last_evaluation_status = EvaluationStatus::Skipped;
            return Ok(Value::Null);
        }
        let output = fusion_object.evaluate(self)?;
        self.last_evaluation_status = EvaluationStatus::Executed;
        self.evaluate_processors(output, configuration, typed_path, Some(fusion_object))
    }

    fn instantiate_object(
        &self,
        typed_path: &str,
        configuration: &FusionNode,
    ) -> FusionResult<Box<dyn FusionObject>> {
        let Some(class_name) = configuration.meta("class").string_value() else {
            return Err(FusionError::Configuration(format!(
                "the Fusion object at path \"{typed_path}\" declares no usable @class property"
            )));
        };
        self.objects.create(
            class_name,
            typed_path.to_string(),
            configuration.object_type.clone(),
        )
    }

    /// Hand array-like objects their `@ignoreProperties` and the node's
    /// non-reserved child names in insertion order.
    fn configure_properties(
        &mut self,
        fusion_object: &mut dyn FusionObject,
        typed_path: &str,
        configuration: &FusionNode,
    ) -> FusionResult<()> {
        if !configuration.meta("ignoreProperties").is_empty() {
            let ignore_path = format!("{typed_path}/__meta/ignoreProperties");
            let evaluated = self.evaluate_internal(
                &ignore_path,
                FailureBehavior::ReturnNull,
                Some(&*fusion_object),
            )?;
            let names = match evaluated {
                Value::List(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
            fusion_object.set_ignore_properties(names);
        }
        let properties: Vec<String> = configuration
            .children
            .keys()
            .filter(|key| !keys::is_reserved(key))
            .cloned()
            .collect();
        fusion_object.set_properties(properties);
        Ok(())
    }

    fn current_apply_values(&self) -> &ApplyFrame {
        self.apply_values
            .last()
            .expect("apply stack keeps a root frame")
    }

    /// Evaluate the node's `@apply` block into the override frame for its
    /// subtree: entries in declaration order, reserved keys skipped, each
    /// entry guarded by its own `@if`, map results spread under
    /// `<typed path>/<key>`.
    fn evaluate_apply_values(
        &mut self,
        configuration: &FusionNode,
        fusion_path: &str,
    ) -> FusionResult<ApplyFrame> {
        let mut frame = ApplyFrame::new();
        let apply_block = configuration.meta("apply");
        if apply_block.children.is_empty() {
            return Ok(frame);
        }
        let typed_path = typed_fusion_path(fusion_path, &configuration.object_type);
        let entry_keys: Vec<String> = apply_block.children.keys().cloned().collect();
        for key in entry_keys {
            if keys::is_reserved(&key) {
                continue;
            }
            let entry = apply_block.child(&key);
            let mut entry_path = format!("{typed_path}/__meta/apply/{key}");
            if !self.evaluate_if_condition(entry, &entry_path, None)? {
                continue;
            }
            if entry.children.contains_key("expression") {
                entry_path.push_str("/expression");
            }
            let value = self.evaluate_internal(&entry_path, FailureBehavior::Exception, None)?;
            if self.last_evaluation_status == EvaluationStatus::Skipped {
                continue;
            }
            if let Value::Map(entries) = value {
                for (spread_key, spread_value) in entries {
                    if keys::is_reserved(&spread_key) {
                        continue;
                    }
                    frame.insert(format!("{typed_path}/{spread_key}"), spread_value);
                }
            }
        }
        Ok(frame)
    }

    fn evaluate_expression_or_value(
        &mut self,
        configuration: &FusionNode,
        this_object: Option<&dyn FusionObject>,
    ) -> FusionResult<Value> {
        if !configuration.expression.is_empty() {
            let Some(evaluator) = &self.expression_evaluator else {
                return Err(FusionError::Evaluation(format!(
                    "no expression evaluator configured; cannot evaluate {:?}",
                    configuration.expression
                )));
            };
            return evaluator.evaluate(
                &configuration.expression,
                self.context.current(),
                this_object,
            );
        }
        Ok(configuration
            .value
            .as_ref()
            .map(Value::from)
            .unwrap_or(Value::Null))
    }

    /// Run a value through the node's `@process` pipeline: entries in
    /// declaration order, reserved keys skipped, each entry guarded by its
    /// own `@if`; the running value is bound as context `value` and only
    /// non-skipped evaluations replace it.
    fn evaluate_processors(
        &mut self,
        value: Value,
        configuration: &FusionNode,
        fusion_path: &str,
        this_object: Option<&dyn FusionObject>,
    ) -> FusionResult<Value> {
        let process_block = configuration.meta("process");
        if process_block.children.is_empty() {
            return Ok(value);
        }
        let mut running = value;
        let entry_keys: Vec<String> = process_block.children.keys().cloned().collect();
        for key in entry_keys {
            if keys::is_reserved(&key) {
                continue;
            }
            let entry = process_block.child(&key);
            let mut processor_path = format!("{fusion_path}/__meta/process/{key}");
            if !self.evaluate_if_condition(entry, &processor_path, this_object)? {
                continue;
            }
            if entry.children.contains_key("expression") {
                processor_path.push_str("/expression");
            }
            self.context.push("value", running.clone());
            let result =
                self.evaluate_internal(&processor_path, FailureBehavior::Exception, this_object);
            self.context.pop();
            let result = result?;
            if self.last_evaluation_status != EvaluationStatus::Skipped {
                running = result;
            }
        }
        Ok(running)
    }

    /// Evaluate the node's `@if` guard. Every entry must produce a boolean
    /// and any false short-circuits; guard failures are never suppressed.
    fn evaluate_if_condition(
        &mut self,
        configuration: &FusionNode,
        fusion_path: &str,
        this_object: Option<&dyn FusionObject>,
    ) -> FusionResult<bool> {
        let guard_block = configuration.meta("if");
        if guard_block.children.is_empty() {
            return Ok(true);
        }
        let entry_keys: Vec<String> = guard_block.children.keys().cloned().collect();
        for key in entry_keys {
            let condition_path = format!("{fusion_path}/__meta/if/{key}");
            let value =
                self.evaluate_internal(&condition_path, FailureBehavior::Exception, this_object)?;
            match value {
                Value::Bool(true) => {}
                Value::Bool(false) => return Ok(false),
                other => {
                    return Err(FusionError::Evaluation(format!(
                        "@if condition `{condition_path}` must evaluate to a boolean, got {}",
                        other.type_name()
                    )));
                }
            }
        }
        Ok(true)
    }

    // ── Exception funneling ───────────────────────────────────────────────

    fn handle_rendering_exception(
        &mut self,
        fusion_path: &str,
        error: FusionError,
        nested: bool,
    ) -> FusionResult<String> {
        let configuration = resolve(&self.configuration, fusion_path).unwrap_or_default();
        let handler_name = match configuration.meta("exceptionHandler").string_value() {
            Some(name) => name.to_string(),
            None if nested => self.settings.inner_exception_handler.clone(),
            None => self.settings.exception_handler.clone(),
        };
        let reported_path = if configuration.object_type.is_empty() {
            fusion_path.to_string()
        } else {
            format!("{fusion_path}<{}>", configuration.object_type)
        };
        warn!(
            path = %reported_path,
            handler = %handler_name,
            %error,
            "rendering failed; delegating to exception handler"
        );
        if self.handlers.get(&handler_name)?.disables_cache(&reported_path, &error) {
            self.cache.set_enabled(false);
        }
        self.handlers.get(&handler_name)?.handle(&reported_path, &error)
    }
}

fn can_render_with(configuration: &FusionNode) -> bool {
    has_expression_or_value(configuration)
        || (!configuration.object_type.is_empty()
            && configuration.meta("class").string_value().is_some())
}

fn has_expression_or_value(configuration: &FusionNode) -> bool {
    configuration.value.is_some() || !configuration.expression.is_empty()
}

/// Append the `<Type>` annotation unless the path already carries one.
fn typed_fusion_path(fusion_path: &str, object_type: &str) -> String {
    let already_typed = fusion_path.ends_with('>')
        && fusion_path
            .rsplit('/')
            .next()
            .is_some_and(|segment| segment.contains('<'));
    if already_typed || object_type.is_empty() {
        fusion_path.to_string()
    } else {
        format!("{fusion_path}<{object_type}>")
    }
}

fn unrenderable_error(fusion_path: &str, configuration: &FusionNode) -> FusionError {
    if configuration.object_type.is_empty() {
        FusionError::Configuration(format!(
            "no Fusion object found at path \"{fusion_path}\"; please make sure to define \
             one in your configuration"
        ))
    } else {
        FusionError::Configuration(format!(
            "the Fusion object at path \"{fusion_path}\" could not be rendered: the object \
             type `{}` is not completely defined (missing property @class); most likely it \
             does not inherit from a basic object",
            configuration.object_type
        ))
    }
}
