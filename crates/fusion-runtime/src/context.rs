//! Scoped context bindings for the Fusion runtime.

use fusion_types::Value;
use indexmap::IndexMap;

/// One frame of named context bindings.
pub type ContextMap = IndexMap<String, Value>;

/// Stack of context frames with copy-on-push semantics.
///
/// Each pushed frame is a full copy of the bindings visible below it, so a
/// lookup only ever consults the top frame and never sees writes made to
/// frames pushed later.
#[derive(Debug, Clone)]
pub struct ContextStack {
    frames: Vec<ContextMap>,
}

impl ContextStack {
    /// Create a stack with one empty root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![ContextMap::new()],
        }
    }

    /// Push a copy of the current frame extended with one binding.
    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        let mut frame = self.current().clone();
        frame.insert(key.into(), value);
        self.frames.push(frame);
    }

    /// Push the given bindings as a whole frame, replacing visibility of
    /// everything below it.
    pub fn push_map(&mut self, frame: ContextMap) {
        self.frames.push(frame);
    }

    /// Pop the topmost frame. The root frame is never removed.
    pub fn pop(&mut self) -> Option<ContextMap> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// The currently visible bindings.
    pub fn current(&self) -> &ContextMap {
        self.frames.last().expect("context stack keeps a root frame")
    }

    pub(crate) fn current_mut(&mut self) -> &mut ContextMap {
        self.frames
            .last_mut()
            .expect("context stack keeps a root frame")
    }

    /// Look up a binding in the current frame.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.current().get(name)
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}
