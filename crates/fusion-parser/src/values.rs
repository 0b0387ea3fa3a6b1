//! Value-literal parsing, including multi-line continuation for string,
//! expression and DSL literals.

use crate::parser::Parser;
use fusion_types::{Assignment, FusionError, FusionResult, TreeValue};

/// Namespace assumed for unqualified object-type references.
const DEFAULT_NAMESPACE: &str = "Neos.Fusion";

impl Parser<'_, '_> {
    /// Parse the right-hand side of a `=` assignment. Literal kinds are
    /// tried in a fixed priority order; anything unrecognized falls back to
    /// a plain string token.
    pub(crate) fn parse_value(&mut self, text: &str) -> FusionResult<Assignment> {
        if text.is_empty() {
            return Ok(Assignment::Scalar(TreeValue::String(String::new())));
        }
        if let Some(value) = parse_integer(text) {
            return Ok(Assignment::Scalar(TreeValue::Int(value)));
        }
        if let Some(value) = parse_float(text) {
            return Ok(Assignment::Scalar(TreeValue::Float(value)));
        }
        if text.starts_with('"') || text.starts_with('\'') {
            return self.parse_string_literal(text);
        }
        if text.eq_ignore_ascii_case("true") {
            return Ok(Assignment::Scalar(TreeValue::Bool(true)));
        }
        if text.eq_ignore_ascii_case("false") {
            return Ok(Assignment::Scalar(TreeValue::Bool(false)));
        }
        if text == "null" || text == "NULL" {
            return Ok(Assignment::Scalar(TreeValue::Null));
        }
        if let Some(object_type) = parse_object_type(text) {
            return Ok(Assignment::ObjectType(object_type));
        }
        if text.starts_with('$') {
            return self.parse_expression_literal(text);
        }
        if dsl_identifier(text).is_some() {
            return self.parse_dsl_literal(text);
        }
        Ok(Assignment::Scalar(TreeValue::String(text.to_string())))
    }

    /// A quoted literal. When the closing quote is missing on this line,
    /// subsequent raw lines are consumed verbatim until one carries the
    /// matching terminator.
    fn parse_string_literal(&mut self, text: &str) -> FusionResult<Assignment> {
        let quote = text.as_bytes()[0] as char;
        let body = &text[1..];
        match find_unescaped(body, quote) {
            Some(idx) if idx == body.len() - 1 => {
                return Ok(Assignment::Scalar(TreeValue::String(unescape(
                    &body[..idx],
                    quote,
                ))));
            }
            // a closing quote mid-token is not a string literal; keep the raw token
            Some(_) => return Ok(Assignment::Scalar(TreeValue::String(text.to_string()))),
            None => {}
        }
        let mut value = unescape(body, quote);
        loop {
            let Some(line) = self.cursor.next_line() else {
                return Err(self.syntax_error(format!(
                    "unterminated string literal starting with {text:?}"
                )));
            };
            value.push('\n');
            match find_unescaped(line, quote) {
                Some(idx) => {
                    value.push_str(&line[..idx]);
                    break;
                }
                None => value.push_str(line),
            }
        }
        Ok(Assignment::Scalar(TreeValue::String(value)))
    }

    /// A `$`-led embedded expression, consuming lines until one ends with
    /// `}`. The stored expression text has its newlines stripped.
    fn parse_expression_literal(&mut self, text: &str) -> FusionResult<Assignment> {
        let mut expression = text.to_string();
        while !expression.trim_end().ends_with('}') {
            let Some(line) = self.cursor.next_line() else {
                return Err(self.syntax_error(format!(
                    "unterminated expression starting with {text:?}"
                )));
            };
            expression.push('\n');
            expression.push_str(line);
        }
        Ok(Assignment::Expression(expression.replace('\n', "")))
    }

    /// A `` identifier`code` `` literal, possibly spanning lines until the
    /// closing backtick, transpiled through the DSL registry and re-parsed.
    fn parse_dsl_literal(&mut self, text: &str) -> FusionResult<Assignment> {
        let identifier = dsl_identifier(text)
            .ok_or_else(|| self.syntax_error(format!("invalid dsl literal {text:?}")))?
            .to_string();
        let mut literal = text.to_string();
        loop {
            let code_area = &literal[identifier.len() + 1..];
            if let Some(code) = code_area.strip_suffix('`') {
                let code = code.to_string();
                return self.invoke_dsl(&identifier, &code);
            }
            let Some(line) = self.cursor.next_line() else {
                return Err(self.syntax_error(format!(
                    "a multi-line dsl expression starting with {text:?} was not closed"
                )));
            };
            literal.push('\n');
            literal.push_str(line);
        }
    }

    fn invoke_dsl(&mut self, identifier: &str, code: &str) -> FusionResult<Assignment> {
        let Some(registry) = self.dsl else {
            return Err(FusionError::Dsl(format!(
                "no DSL registry configured; cannot transpile `{identifier}`"
            )));
        };
        let Some(transpiler) = registry.get(identifier) else {
            return Err(FusionError::Dsl(format!(
                "no DSL registered for identifier \"{identifier}\""
            )));
        };
        let fusion_source = transpiler.transpile(code)?;
        let wrapped = format!("value = {fusion_source}\n");
        let tree = Parser::new(&wrapped).with_dsl_registry(registry).parse()?;
        let node = tree.children.get("value").cloned().ok_or_else(|| {
            FusionError::Dsl(format!(
                "the DSL `{identifier}` transpiled to source that assigns no value"
            ))
        })?;
        Ok(Assignment::Subtree(node))
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let body = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = body.split_once('.')?;
    let all_digits =
        |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }
    text.parse().ok()
}

/// `[Namespace:]UnqualifiedType` object-type reference; bare references get
/// the default namespace.
fn parse_object_type(text: &str) -> Option<String> {
    let valid = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
    };
    match text.split_once(':') {
        Some((namespace, unqualified)) => (valid(namespace) && valid(unqualified))
            .then(|| format!("{namespace}:{unqualified}")),
        None => valid(text).then(|| format!("{DEFAULT_NAMESPACE}:{text}")),
    }
}

/// The identifier of a DSL literal `` identifier`…``, if the text is one.
fn dsl_identifier(text: &str) -> Option<&str> {
    let idx = text.find('`')?;
    let identifier = &text[..idx];
    let valid = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.');
    valid.then_some(identifier)
}

/// Byte index of the first unescaped `quote` in `s`.
fn find_unescaped(s: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(idx);
        }
    }
    None
}

fn unescape(raw: &str, quote: char) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) if next == quote || next == '\\' => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
