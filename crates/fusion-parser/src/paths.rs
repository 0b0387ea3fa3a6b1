//! Object-path grammar: dot splitting, quoted segments, sugar expansion.
//!
//! Paths are dot-separated; dots inside quotes and inside `prototype(…)`
//! do not split. `@name` expands to `__meta.name` and `prototype(Name)`
//! to `__prototypes.Name`.

use fusion_types::{keys, FusionError, FusionResult};

/// How an open-block prefix combines with a path.
#[derive(Clone, Copy)]
pub(crate) enum PrefixMode {
    /// The path is always confined to the open block (assignment targets).
    Always,
    /// Only a leading `.` confines to the open block (copy sources).
    RelativeOnly,
}

/// Parse a raw path under the current block prefix into expanded segments.
pub(crate) fn parse_object_path(
    raw: &str,
    prefix: &str,
    mode: PrefixMode,
    line: usize,
) -> FusionResult<Vec<String>> {
    let (relative, path) = match raw.strip_prefix('.') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let confined = relative || matches!(mode, PrefixMode::Always);
    let full = if confined && !prefix.is_empty() {
        format!("{prefix}.{path}")
    } else {
        path.to_string()
    };
    let mut segments = Vec::new();
    for part in split_path(&full, line)? {
        expand_segment(&part, &mut segments, line)?;
    }
    if segments.is_empty() {
        return Err(FusionError::syntax(
            line,
            format!("invalid object path \"{raw}\""),
        ));
    }
    Ok(segments)
}

/// True for paths addressing a prototype definition (`…__prototypes.Name`).
pub(crate) fn is_prototype_path(segments: &[String]) -> bool {
    segments.len() >= 2 && segments[segments.len() - 2] == keys::PROTOTYPES
}

pub(crate) fn as_str_slice(segments: &[String]) -> Vec<&str> {
    segments.iter().map(String::as_str).collect()
}

fn split_path(path: &str, line: usize) -> FusionResult<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut parens = 0usize;
    let mut escaped = false;
    for ch in path.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if quote.is_some() => {
                current.push(ch);
                escaped = true;
            }
            '"' | '\'' => {
                current.push(ch);
                match quote {
                    Some(q) if q == ch => quote = None,
                    None => quote = Some(ch),
                    _ => {}
                }
            }
            '(' if quote.is_none() => {
                parens += 1;
                current.push(ch);
            }
            ')' if quote.is_none() => {
                parens = parens.saturating_sub(1);
                current.push(ch);
            }
            '.' if quote.is_none() && parens == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if quote.is_some() {
        return Err(FusionError::syntax(
            line,
            format!("unterminated quoted segment in object path \"{path}\""),
        ));
    }
    parts.push(current);
    Ok(parts)
}

fn expand_segment(segment: &str, out: &mut Vec<String>, line: usize) -> FusionResult<()> {
    if let Some(meta) = segment.strip_prefix('@') {
        if !is_valid_key(meta) {
            return Err(invalid_segment(segment, line));
        }
        out.push(keys::META.to_string());
        out.push(meta.to_string());
    } else if let Some(name) = prototype_name(segment) {
        out.push(keys::PROTOTYPES.to_string());
        out.push(name.to_string());
    } else if segment.starts_with('"') || segment.starts_with('\'') {
        out.push(unquote(segment, line)?);
    } else if is_valid_key(segment) {
        out.push(segment.to_string());
    } else {
        return Err(invalid_segment(segment, line));
    }
    Ok(())
}

fn invalid_segment(segment: &str, line: usize) -> FusionError {
    FusionError::syntax(line, format!("invalid object path segment \"{segment}\""))
}

fn is_valid_key(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-'))
}

/// The `Name` of a `prototype(Name)` segment, if it is one.
fn prototype_name(segment: &str) -> Option<&str> {
    let name = segment.strip_prefix("prototype(")?.strip_suffix(')')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':'));
    valid.then_some(name)
}

fn unquote(segment: &str, line: usize) -> FusionResult<String> {
    let mut chars = segment.chars();
    let quote = chars.next().unwrap_or('"');
    let inner: String = chars.collect();
    let Some(inner) = inner.strip_suffix(quote) else {
        return Err(invalid_segment(segment, line));
    };
    let mut out = String::with_capacity(inner.len());
    let mut iter = inner.chars();
    while let Some(ch) = iter.next() {
        if ch == '\\' {
            match iter.next() {
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
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Vec<String> {
        parse_object_path(raw, "", PrefixMode::Always, 1).expect("path should parse")
    }

    #[test]
    fn splits_on_dots() {
        assert_eq!(parse("a.b.c"), ["a", "b", "c"]);
    }

    #[test]
    fn meta_sugar_expands() {
        assert_eq!(parse("a.@process"), ["a", "__meta", "process"]);
    }

    #[test]
    fn prototype_sugar_expands_and_keeps_inner_dots() {
        assert_eq!(
            parse("prototype(Neos.Fusion:Tag).tagName"),
            ["__prototypes", "Neos.Fusion:Tag", "tagName"]
        );
    }

    #[test]
    fn quoted_segments_unquote() {
        assert_eq!(parse(r#""with.dot".x"#), ["with.dot", "x"]);
        assert_eq!(parse(r#"'it\'s'"#), ["it's"]);
    }

    #[test]
    fn prefix_applies_to_plain_and_relative_paths() {
        assert_eq!(
            parse_object_path("b", "a", PrefixMode::Always, 1).unwrap(),
            ["a", "b"]
        );
        assert_eq!(
            parse_object_path(".b", "a", PrefixMode::Always, 1).unwrap(),
            ["a", "b"]
        );
        // copy sources stay absolute unless they lead with a dot
        assert_eq!(
            parse_object_path("b", "a", PrefixMode::RelativeOnly, 1).unwrap(),
            ["b"]
        );
        assert_eq!(
            parse_object_path(".b", "a", PrefixMode::RelativeOnly, 1).unwrap(),
            ["a", "b"]
        );
    }

    #[test]
    fn rejects_malformed_segments() {
        assert!(parse_object_path("a..b", "", PrefixMode::Always, 3).is_err());
        assert!(parse_object_path("a b", "", PrefixMode::Always, 3).is_err());
        assert!(parse_object_path("'open", "", PrefixMode::Always, 3).is_err());
    }

    #[test]
    fn detects_prototype_paths() {
        let top = parse("prototype(Foo)");
        assert!(is_prototype_path(&top));
        let nested = parse("a.prototype(Foo)");
        assert!(is_prototype_path(&nested));
        let plain = parse("a.b");
        assert!(!is_prototype_path(&plain));
    }
}
