//! Exception display strategies for rendering failures.
//!
//! `render()` funnels evaluation failures into a strategy chosen per path;
//! the strategy either produces substitute output text or rethrows.

use fusion_types::{FusionError, FusionResult};
use std::collections::BTreeMap;

/// A display strategy for exceptions raised while rendering a path.
pub trait ExceptionHandler {
    /// Produce substitute output for the failed path, or return the error
    /// to propagate it to the caller.
    fn handle(&self, fusion_path: &str, error: &FusionError) -> FusionResult<String>;

    /// Whether handling this error should disable content caching for the
    /// rest of the session.
    fn disables_cache(&self, _fusion_path: &str, _error: &FusionError) -> bool {
        true
    }
}

/// Swallows the error and renders nothing.
pub struct AbsorbingHandler;

impl ExceptionHandler for AbsorbingHandler {
    fn handle(&self, _fusion_path: &str, _error: &FusionError) -> FusionResult<String> {
        Ok(String::new())
    }

    fn disables_cache(&self, _fusion_path: &str, _error: &FusionError) -> bool {
        false
    }
}

/// Renders a human-readable message in place of the failed output.
pub struct PlainTextHandler;

impl ExceptionHandler for PlainTextHandler {
    fn handle(&self, fusion_path: &str, error: &FusionError) -> FusionResult<String> {
        Ok(format!(
            "Exception while rendering {}: {}",
            format_script_path(fusion_path, "\n\t"),
            strip_markup(&error.to_string())
        ))
    }

    fn disables_cache(&self, _fusion_path: &str, _error: &FusionError) -> bool {
        false
    }
}

/// Propagates the error instead of substituting output.
pub struct ThrowingHandler;

impl ExceptionHandler for ThrowingHandler {
    fn handle(&self, _fusion_path: &str, error: &FusionError) -> FusionResult<String> {
        Err(error.clone())
    }
}

/// Registry of exception handlers keyed by configured name.
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Box<dyn ExceptionHandler>>,
}

impl HandlerRegistry {
    /// A registry with the built-in handlers (`absorbing`, `plaintext`,
    /// `throwing`) registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            handlers: BTreeMap::new(),
        };
        registry.register("absorbing", Box::new(AbsorbingHandler));
        registry.register("plaintext", Box::new(PlainTextHandler));
        registry.register("throwing", Box::new(ThrowingHandler));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Box<dyn ExceptionHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> FusionResult<&dyn ExceptionHandler> {
        self.handlers
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| {
                FusionError::Configuration(format!("unknown exception handler \"{name}\""))
            })
    }
}

/// Break a Fusion path across lines for readable messages.
fn format_script_path(fusion_path: &str, delimiter: &str) -> String {
    let elements: Vec<&str> = fusion_path.split('/').collect();
    elements.join(&format!("/{delimiter}"))
}

/// Remove `<…>` markup spans from an error message.
fn strip_markup(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut depth = 0usize;
    for ch in message.chars() {
        match ch {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}
