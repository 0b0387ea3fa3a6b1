//! DSL transpiler registry.
//!
//! A DSL literal `` identifier`code` `` hands its code block to the
//! transpiler registered for the identifier; the transpiled Fusion source
//! is parsed recursively and the resulting value replaces the literal.

use fusion_types::FusionResult;
use std::collections::BTreeMap;

/// Transpiles a DSL code block into Fusion source text.
pub trait DslTranspiler {
    fn transpile(&self, code: &str) -> FusionResult<String>;
}

/// Registry of DSL transpilers keyed by identifier.
#[derive(Default)]
pub struct DslRegistry {
    transpilers: BTreeMap<String, Box<dyn DslTranspiler>>,
}

impl DslRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        transpiler: Box<dyn DslTranspiler>,
    ) {
        self.transpilers.insert(identifier.into(), transpiler);
    }

    pub fn get(&self, identifier: &str) -> Option<&dyn DslTranspiler> {
        self.transpilers.get(identifier).map(Box::as_ref)
    }
}
