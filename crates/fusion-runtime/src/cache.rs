//! Cache coordination: entry-point bracketing and tag accumulation.
//!
//! The coordinator does not read or write cached artifacts — storage stays
//! external. It enforces the enter/leave bracketing around every path
//! evaluation, validates uncached segments, and collects tags for the
//! current cache segment.

use fusion_types::{keys, FusionError, FusionNode, FusionResult};
use std::collections::BTreeSet;
use tracing::debug;

/// Cache mode of a path, from `@cache.mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    Cached,
    Uncached,
    Dynamic,
    /// No own cache segment; the path embeds into the enclosing one.
    #[default]
    Embed,
}

impl CacheMode {
    fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("cached") => CacheMode::Cached,
            Some("uncached") => CacheMode::Uncached,
            Some("dynamic") => CacheMode::Dynamic,
            _ => CacheMode::Embed,
        }
    }
}

/// The `@cache` configuration of a resolved node.
#[derive(Debug, Clone, Default)]
pub struct CacheAttributes {
    pub mode: CacheMode,
    pub maximum_lifetime: i64,
    /// Context variable names an uncached/dynamic segment depends on.
    pub context: Vec<String>,
    pub entry_identifier: FusionNode,
}

impl CacheAttributes {
    /// Read the attributes from a node's `@cache` block.
    pub fn from_node(node: &FusionNode) -> Self {
        let mode = CacheMode::from_name(node.child("mode").string_value());
        let maximum_lifetime = match node.child("maximumLifetime").value {
            Some(fusion_types::TreeValue::Int(seconds)) => seconds,
            _ => 0,
        };
        let context = node
            .child("context")
            .children
            .keys()
            .filter(|key| !keys::is_reserved(key))
            .cloned()
            .collect();
        Self {
            mode,
            maximum_lifetime,
            context,
            entry_identifier: node.child("entryIdentifier").clone(),
        }
    }
}

/// The bracketing token returned by [`ContentCache::enter`] and consumed by
/// [`ContentCache::leave`].
#[derive(Debug)]
pub struct CacheContext {
    pub fusion_path: String,
    pub enabled_for_path: bool,
    pub disabled_for_path: bool,
    is_entry_point: bool,
}

/// Session-scoped cache coordination state.
///
/// The entry-point flag and tag set belong to one evaluation session; they
/// are never process-global.
#[derive(Debug, Default)]
pub struct ContentCache {
    enabled: bool,
    in_entry_point: bool,
    tags: BTreeSet<String>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Enter the evaluation of a path.
    ///
    /// Must be called right before a path evaluation starts; the returned
    /// context must be passed to [`Self::leave`] on every exit path. An
    /// uncached segment that declares no context dependencies is a
    /// configuration error.
    pub fn enter(
        &mut self,
        attributes: &CacheAttributes,
        fusion_path: &str,
    ) -> FusionResult<CacheContext> {
        let enabled_for_path =
            matches!(attributes.mode, CacheMode::Cached | CacheMode::Dynamic);
        let disabled_for_path =
            matches!(attributes.mode, CacheMode::Uncached | CacheMode::Dynamic);
        if disabled_for_path && attributes.context.is_empty() {
            return Err(FusionError::Configuration(format!(
                "missing @cache.context configuration for path \"{fusion_path}\"; an uncached \
                 segment must have one or more context variable names configured"
            )));
        }
        let mut is_entry_point = false;
        if (self.enabled || enabled_for_path) && !self.in_entry_point {
            self.in_entry_point = true;
            is_entry_point = true;
            debug!(path = fusion_path, "cache entry point");
        }
        Ok(CacheContext {
            fusion_path: fusion_path.to_string(),
            enabled_for_path,
            disabled_for_path,
            is_entry_point,
        })
    }

    /// Leave the evaluation of a path, releasing the entry point if this
    /// context claimed it.
    pub fn leave(&mut self, context: CacheContext) {
        if context.is_entry_point {
            self.in_entry_point = false;
        }
    }

    /// Accumulate a normalized tag for the current cache segment. Only
    /// effective while caching is globally enabled.
    pub fn add_tag(&mut self, key: &str, value: &str) -> FusionResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(FusionError::Configuration(
                "cache tag key must not be empty".to_string(),
            ));
        }
        let value = value.trim();
        if value.is_empty() {
            return Err(FusionError::Configuration(
                "cache tag value must not be empty".to_string(),
            ));
        }
        let mut tag = String::with_capacity(key.len() + value.len() + 11);
        let mut chars = key.chars();
        if let Some(first) = chars.next() {
            tag.extend(first.to_uppercase());
            tag.push_str(chars.as_str());
        }
        tag.push_str("DynamicTag_");
        tag.push_str(value);
        self.tags.insert(tag);
        Ok(())
    }

    /// Drain and return the accumulated tags.
    pub fn flush_tags(&mut self) -> Vec<String> {
        std::mem::take(&mut self.tags).into_iter().collect()
    }
}
