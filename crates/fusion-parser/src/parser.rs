//! Core parser: line dispatch, confinement tracking, operators, and the
//! prototype-chain linearization post-pass.

use crate::dsl::DslRegistry;
use crate::lines::LineCursor;
use crate::paths::{as_str_slice, is_prototype_path, parse_object_path, PrefixMode};
use fusion_types::{keys, Assignment, FusionError, FusionNode, FusionResult, TreeValue};

/// The Fusion parser.
///
/// Consumes source text line by line and builds a configuration tree. A
/// mutable scan state tracks the stack of open confinement blocks and the
/// block-comment flag; the line cursor is shared with the value parsers so
/// multi-line literals can pull lines on demand.
pub struct Parser<'src, 'dsl> {
    pub(crate) cursor: LineCursor<'src>,
    pub(crate) dsl: Option<&'dsl DslRegistry>,
    in_block_comment: bool,
    path_stack: Vec<String>,
    tree: FusionNode,
}

impl<'src, 'dsl> Parser<'src, 'dsl> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: LineCursor::new(source),
            dsl: None,
            in_block_comment: false,
            path_stack: Vec::new(),
            tree: FusionNode::new(),
        }
    }

    /// Attach a DSL transpiler registry, shared with nested parsers spawned
    /// for transpiled DSL literals.
    pub fn with_dsl_registry(mut self, registry: &'dsl DslRegistry) -> Self {
        self.dsl = Some(registry);
        self
    }

    /// Parse the source into a configuration tree.
    ///
    /// Confinement blocks still open at end of input are closed implicitly.
    pub fn parse(mut self) -> FusionResult<FusionNode> {
        while let Some(line) = self.cursor.next_line() {
            self.parse_line(line)?;
        }
        self.build_prototype_hierarchy()?;
        Ok(self.tree)
    }

    // ── Line dispatch ─────────────────────────────────────────────────────

    fn parse_line(&mut self, line: &str) -> FusionResult<()> {
        let line = line.trim();
        if self.in_block_comment {
            return self.parse_comment(line);
        }
        if line.is_empty() {
            return Ok(());
        }
        if line.starts_with('#') || line.starts_with("//") || line.starts_with("/*") {
            return self.parse_comment(line);
        }
        if line == "}" {
            return self.close_confinement();
        }
        self.parse_object_line(line)
    }

    fn parse_comment(&mut self, line: &str) -> FusionResult<()> {
        if self.in_block_comment {
            if let Some(idx) = line.find("*/") {
                self.in_block_comment = false;
                let rest = line[idx + 2..].trim();
                if !rest.is_empty() {
                    return self.parse_line(rest);
                }
            }
            return Ok(());
        }
        if let Some(after_open) = line.strip_prefix("/*") {
            match after_open.find("*/") {
                Some(idx) => {
                    let rest = after_open[idx + 2..].trim();
                    if !rest.is_empty() {
                        return self.parse_line(rest);
                    }
                }
                None => self.in_block_comment = true,
            }
        }
        // `#` and `//` comment out the rest of the line
        Ok(())
    }

    // ── Confinement blocks ────────────────────────────────────────────────

    fn open_confinement(&mut self, path: &str) {
        let path = path.strip_prefix('.').unwrap_or(path);
        let combined = match self.path_stack.last() {
            Some(top) => format!("{top}.{path}"),
            None => path.to_string(),
        };
        self.path_stack.push(combined);
    }

    fn close_confinement(&mut self) -> FusionResult<()> {
        if self.path_stack.pop().is_none() {
            return Err(FusionError::syntax(
                self.cursor.line_number(),
                "unexpected closing confinement without matching opening confinement; \
                 check the number of your curly braces",
            ));
        }
        Ok(())
    }

    fn current_prefix(&self) -> String {
        self.path_stack.last().cloned().unwrap_or_default()
    }

    // ── Object definitions ────────────────────────────────────────────────

    fn parse_object_line(&mut self, line: &str) -> FusionResult<()> {
        let (path_text, rest) = split_leading_path(line)
            .ok_or_else(|| self.syntax_error(format!("invalid object definition \"{line}\"")))?;
        let rest = rest.trim();
        if rest == "{" {
            self.open_confinement(path_text);
            return Ok(());
        }
        let Some(operator) = rest.chars().next().filter(|op| matches!(op, '=' | '<' | '>'))
        else {
            return Err(self.syntax_error(format!("invalid object definition \"{line}\"")));
        };
        let mut value_text = rest[1..].trim();
        let mut opens_block = false;
        if let Some(stripped) = strip_trailing_confinement(value_text) {
            opens_block = true;
            value_text = stripped;
        }
        match operator {
            '=' => self.parse_value_assignment(path_text, value_text)?,
            '>' => self.parse_value_unassignment(path_text)?,
            '<' => self.parse_value_copy(value_text, path_text)?,
            _ => unreachable!("operator is filtered above"),
        }
        if opens_block {
            self.open_confinement(path_text);
        }
        Ok(())
    }

    fn parse_value_assignment(&mut self, path_text: &str, value_text: &str) -> FusionResult<()> {
        // the value parser may pull continuation lines before the path is resolved
        let assignment = self.parse_value(value_text)?;
        let segments = self.target_path(path_text)?;
        self.tree.set(&segments, assignment);
        Ok(())
    }

    fn parse_value_unassignment(&mut self, path_text: &str) -> FusionResult<()> {
        let segments = self.target_path(path_text)?;
        self.tree.set(&segments, Assignment::Unset);
        Ok(())
    }

    /// `target < source`: prototype-inheritance declaration when both sides
    /// are top-level prototype paths, a structural subtree copy otherwise.
    fn parse_value_copy(&mut self, source_text: &str, target_text: &str) -> FusionResult<()> {
        let line = self.cursor.line_number();
        let prefix = self.current_prefix();
        let source = parse_object_path(source_text, &prefix, PrefixMode::RelativeOnly, line)?;
        let target = parse_object_path(target_text, &prefix, PrefixMode::Always, line)?;

        let source_is_prototype = is_prototype_path(&source);
        let target_is_prototype = is_prototype_path(&target);
        if source_is_prototype || target_is_prototype {
            if source_is_prototype && target_is_prototype {
                if source.len() != 2 || target.len() != 2 {
                    return Err(FusionError::Configuration(format!(
                        "tried to parse \"{target_text}\" < \"{source_text}\", however one of \
                         the sides is a nested prototype (e.g. foo.prototype(Bar)); prototype \
                         inheritance is only supported at the top level: \
                         prototype(Foo) < prototype(Bar)"
                    )));
                }
                let mut inheritance = target;
                inheritance.push(keys::PROTOTYPE_OBJECT_NAME.to_string());
                self.tree.set(
                    &inheritance,
                    Assignment::Scalar(TreeValue::String(source[1].clone())),
                );
            } else {
                return Err(FusionError::Configuration(format!(
                    "tried to parse \"{target_text}\" < \"{source_text}\", however one of the \
                     sides is no prototype definition of the form prototype(Foo); inheritance \
                     chains can only be built between prototype objects"
                )));
            }
        } else {
            match self.tree.get(&as_str_slice(&source)) {
                Some(original) => {
                    let copy = original.clone();
                    self.tree.set(&target, Assignment::Subtree(copy));
                }
                None => self.tree.set(&target, Assignment::Unset),
            }
        }
        Ok(())
    }

    fn target_path(&self, path_text: &str) -> FusionResult<Vec<String>> {
        parse_object_path(
            path_text,
            &self.current_prefix(),
            PrefixMode::Always,
            self.cursor.line_number(),
        )
    }

    pub(crate) fn syntax_error(&self, message: String) -> FusionError {
        FusionError::syntax(self.cursor.line_number(), message)
    }

    // ── Prototype-chain linearization ─────────────────────────────────────

    /// Follow `__prototypeObjectName` links for every declared prototype and
    /// store the linearized ancestor chain, furthest ancestor first, at
    /// `__prototypes.<Name>.__prototypeChain`. Any repeated name in the walk
    /// is a cycle.
    fn build_prototype_hierarchy(&mut self) -> FusionResult<()> {
        let chains = {
            let prototypes = self.tree.child(keys::PROTOTYPES);
            if prototypes.children.is_empty() {
                return Ok(());
            }
            let mut chains: Vec<(String, Vec<String>)> = Vec::new();
            for name in prototypes.children.keys() {
                let mut chain: Vec<String> = Vec::new();
                let mut current: &str = name;
                while let Some(parent) = prototypes
                    .child(current)
                    .child(keys::PROTOTYPE_OBJECT_NAME)
                    .string_value()
                {
                    if parent == name || chain.iter().any(|seen| seen == parent) {
                        let mut trace = chain;
                        trace.push(parent.to_string());
                        return Err(FusionError::Configuration(format!(
                            "recursive inheritance found for prototype `{name}`; \
                             prototype chain: {}",
                            trace.join(" < ")
                        )));
                    }
                    chain.push(parent.to_string());
                    current = parent;
                }
                if !chain.is_empty() {
                    chain.reverse();
                    chains.push((name.clone(), chain));
                }
            }
            chains
        };
        for (name, chain) in chains {
            self.tree.set(
                &[
                    keys::PROTOTYPES.to_string(),
                    name,
                    keys::PROTOTYPE_CHAIN.to_string(),
                ],
                Assignment::Scalar(TreeValue::Strings(chain)),
            );
        }
        Ok(())
    }
}

/// Split the leading object path off a definition line, honoring quoted
/// segments. Returns `None` when the line carries no leading path.
fn split_leading_path(line: &str) -> Option<(&str, &str)> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut end = line.len();
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if quote.is_some() => escaped = true,
            '"' | '\'' => match quote {
                Some(q) if q == ch => quote = None,
                None => quote = Some(ch),
                _ => {}
            },
            c if quote.is_none()
                && (c.is_whitespace() || matches!(c, '=' | '<' | '>' | '{')) =>
            {
                end = idx;
                break;
            }
            _ => {}
        }
    }
    let (path, rest) = line.split_at(end);
    if path.is_empty() {
        return None;
    }
    Some((path, rest))
}

/// Strip a trailing `{` that opens a block at the assigned path; `${` and
/// `{{` endings belong to the value instead.
fn strip_trailing_confinement(value: &str) -> Option<&str> {
    let stripped = value.strip_suffix('{')?;
    let trimmed = stripped.trim_end();
    if trimmed.ends_with('$') || trimmed.ends_with('{') {
        return None;
    }
    Some(trimmed)
}
