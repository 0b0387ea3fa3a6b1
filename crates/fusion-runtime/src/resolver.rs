//! Absolute-path resolution with per-segment prototype cascade.

use fusion_types::{keys, FusionError, FusionNode, FusionResult, TreeValue};
use indexmap::IndexMap;

/// Resolve an absolute `/`-delimited Fusion path against the root tree.
///
/// Pure with respect to the stored tree: every segment clones the matched
/// child before prototype data is merged into it, so evaluation never
/// mutates the configuration. Paths that match nothing resolve to an empty
/// node (defaulted to the empty string), mirroring the empty-node
/// invariant; only broken configuration (missing chain ancestors,
/// malformed segments) fails.
pub fn resolve(root: &FusionNode, fusion_path: &str) -> FusionResult<FusionNode> {
    let mut visible: IndexMap<String, FusionNode> =
        root.child(keys::PROTOTYPES).children.clone();
    let mut configuration: Option<FusionNode> = None;
    for raw_segment in fusion_path.split('/') {
        let base = configuration.as_ref().unwrap_or(root);
        let next = match_path_segment(raw_segment, base, &mut visible)?;
        configuration = Some(next);
    }
    Ok(configuration.unwrap_or_default())
}

fn match_path_segment(
    raw_segment: &str,
    previous: &FusionNode,
    visible: &mut IndexMap<String, FusionNode>,
) -> FusionResult<FusionNode> {
    let (segment, type_override) = split_type_override(raw_segment)?;
    let mut configuration = previous.children.get(segment).cloned().unwrap_or_default();

    // scope-local prototype definitions become visible for this segment and
    // everything below it; nested definitions win where both set a field
    if !configuration.child(keys::PROTOTYPES).is_empty() {
        let nested = configuration.child(keys::PROTOTYPES).children.clone();
        for (name, definition) in nested {
            match visible.get(&name) {
                Some(enclosing) => {
                    let mut merged = definition;
                    merged.merge(enclosing);
                    visible.insert(name, merged);
                }
                None => {
                    visible.insert(name, definition);
                }
            }
        }
    }

    let effective_type = type_override
        .map(str::to_string)
        .or_else(|| (!configuration.object_type.is_empty()).then(|| configuration.object_type.clone()));
    if let Some(object_type) = effective_type {
        configuration.object_type = object_type;
        merge_prototype_chain(&mut configuration, visible)?;
    }

    // leaf paths with no configuration at all render as nothing
    if !has_expression_or_value(&configuration)
        && configuration.object_type.is_empty()
        && configuration.meta("class").is_empty()
        && configuration.meta("process").is_empty()
    {
        configuration.value = Some(TreeValue::String(String::new()));
    }
    Ok(configuration)
}

/// Fold the prototype cascade for the node's effective type into it.
///
/// Merging order is the type itself, then its ancestors nearest first;
/// under the additive merge this makes own values beat every ancestor and
/// nearer ancestors beat farther ones.
fn merge_prototype_chain(
    configuration: &mut FusionNode,
    visible: &IndexMap<String, FusionNode>,
) -> FusionResult<()> {
    let type_name = configuration.object_type.clone();
    let Some(definition) = visible.get(&type_name) else {
        return Ok(());
    };
    let mut merging_order = vec![type_name.clone()];
    if let Some(TreeValue::Strings(chain)) = &definition.child(keys::PROTOTYPE_CHAIN).value {
        // the stored chain lists the furthest ancestor first
        merging_order.extend(chain.iter().rev().cloned());
    }
    let mut cascade = FusionNode::new();
    for prototype_name in &merging_order {
        let Some(prototype) = visible.get(prototype_name) else {
            return Err(FusionError::Configuration(format!(
                "the Fusion prototype `{prototype_name}` which `{type_name}` inherits from \
                 does not exist; maybe a typo on the right hand side of the inheritance \
                 statement"
            )));
        };
        cascade.merge(prototype);
    }
    configuration.merge(&cascade);
    Ok(())
}

fn has_expression_or_value(configuration: &FusionNode) -> bool {
    configuration.value.is_some() || !configuration.expression.is_empty()
}

/// Split `name<Type>` into the plain segment and the optional override.
fn split_type_override(raw_segment: &str) -> FusionResult<(&str, Option<&str>)> {
    let Some(open) = raw_segment.find('<') else {
        if raw_segment.contains('>') {
            return Err(malformed(raw_segment));
        }
        return Ok((raw_segment, None));
    };
    let Some(inner) = raw_segment[open..].strip_prefix('<').and_then(|r| r.strip_suffix('>'))
    else {
        return Err(malformed(raw_segment));
    };
    if inner.contains('<') || inner.contains('>') {
        return Err(malformed(raw_segment));
    }
    Ok((&raw_segment[..open], Some(inner)))
}

fn malformed(raw_segment: &str) -> FusionError {
    FusionError::Configuration(format!("path part `{raw_segment}` is not well-formed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_types::Assignment;

    fn set(tree: &mut FusionNode, path: &[&str], value: TreeValue) {
        let segments: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        tree.set(&segments, Assignment::Scalar(value));
    }

    fn set_type(tree: &mut FusionNode, path: &[&str], object_type: &str) {
        let segments: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        tree.set(&segments, Assignment::ObjectType(object_type.to_string()));
    }

    #[test]
    fn unknown_paths_default_to_the_empty_string() {
        let root = FusionNode::new();
        let resolved = resolve(&root, "nothing/here").unwrap();
        assert_eq!(resolved.value, Some(TreeValue::String(String::new())));
        assert!(resolved.children.is_empty());
    }

    #[test]
    fn own_values_beat_every_ancestor() {
        let mut root = FusionNode::new();
        set(&mut root, &["__prototypes", "A", "foo"], TreeValue::Int(2));
        set(
            &mut root,
            &["__prototypes", "C", "__prototypeObjectName"],
            TreeValue::String("A".into()),
        );
        set(
            &mut root,
            &["__prototypes", "C", "__prototypeChain"],
            TreeValue::Strings(vec!["A".into()]),
        );
        set_type(&mut root, &["node"], "C");
        set(&mut root, &["node", "foo"], TreeValue::Int(1));
        let resolved = resolve(&root, "node").unwrap();
        assert_eq!(resolved.child("foo").value, Some(TreeValue::Int(1)));
    }

    #[test]
    fn nearer_ancestors_beat_farther_ones() {
        let mut root = FusionNode::new();
        set(&mut root, &["__prototypes", "A", "foo"], TreeValue::Int(2));
        set(&mut root, &["__prototypes", "B", "foo"], TreeValue::Int(3));
        set(&mut root, &["__prototypes", "B", "bar"], TreeValue::Int(4));
        set(
            &mut root,
            &["__prototypes", "C", "__prototypeChain"],
            TreeValue::Strings(vec!["A".into(), "B".into()]),
        );
        set(&mut root, &["__prototypes", "C", "own"], TreeValue::Int(5));
        set_type(&mut root, &["node"], "C");
        let resolved = resolve(&root, "node").unwrap();
        // B is the nearer ancestor: its foo wins over A's
        assert_eq!(resolved.child("foo").value, Some(TreeValue::Int(3)));
        assert_eq!(resolved.child("bar").value, Some(TreeValue::Int(4)));
        assert_eq!(resolved.child("own").value, Some(TreeValue::Int(5)));
    }

    #[test]
    fn missing_chain_ancestor_is_a_configuration_error() {
        let mut root = FusionNode::new();
        set(
            &mut root,
            &["__prototypes", "C", "__prototypeChain"],
            TreeValue::Strings(vec!["Ghost".into()]),
        );
        set_type(&mut root, &["node"], "C");
        let err = resolve(&root, "node").unwrap_err();
        assert!(matches!(err, FusionError::Configuration(_)));
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn type_override_suffix_wins_over_the_declared_type() {
        let mut root = FusionNode::new();
        set(
            &mut root,
            &["__prototypes", "Declared", "foo"],
            TreeValue::Int(1),
        );
        set(
            &mut root,
            &["__prototypes", "Override", "foo"],
            TreeValue::Int(2),
        );
        set_type(&mut root, &["node"], "Declared");
        let resolved = resolve(&root, "node<Override>").unwrap();
        assert_eq!(resolved.object_type, "Override");
        assert_eq!(resolved.child("foo").value, Some(TreeValue::Int(2)));
    }

    #[test]
    fn nested_prototype_definitions_apply_below_their_scope() {
        let mut root = FusionNode::new();
        set(
            &mut root,
            &["__prototypes", "Widget", "label"],
            TreeValue::String("outer".into()),
        );
        set(
            &mut root,
            &["page", "__prototypes", "Widget", "label"],
            TreeValue::String("inner".into()),
        );
        set_type(&mut root, &["page", "content"], "Widget");
        set_type(&mut root, &["standalone"], "Widget");
        let inner = resolve(&root, "page/content").unwrap();
        assert_eq!(
            inner.child("label").value,
            Some(TreeValue::String("inner".into()))
        );
        let outer = resolve(&root, "standalone").unwrap();
        assert_eq!(
            outer.child("label").value,
            Some(TreeValue::String("outer".into()))
        );
    }

    #[test]
    fn nested_definitions_inherit_unset_fields_from_enclosing_scope() {
        let mut root = FusionNode::new();
        set(
            &mut root,
            &["__prototypes", "Widget", "size"],
            TreeValue::Int(10),
        );
        set(
            &mut root,
            &["__prototypes", "Widget", "label"],
            TreeValue::String("outer".into()),
        );
        set(
            &mut root,
            &["page", "__prototypes", "Widget", "label"],
            TreeValue::String("inner".into()),
        );
        set_type(&mut root, &["page", "content"], "Widget");
        let resolved = resolve(&root, "page/content").unwrap();
        assert_eq!(
            resolved.child("label").value,
            Some(TreeValue::String("inner".into()))
        );
        assert_eq!(resolved.child("size").value, Some(TreeValue::Int(10)));
    }

    #[test]
    fn malformed_segments_are_rejected() {
        let root = FusionNode::new();
        assert!(resolve(&root, "a<b<c>").is_err());
        assert!(resolve(&root, "a>b").is_err());
    }

    #[test]
    fn typed_nodes_are_not_defaulted_to_a_value() {
        let mut root = FusionNode::new();
        set_type(&mut root, &["node"], "Anything");
        let resolved = resolve(&root, "node").unwrap();
        assert!(resolved.value.is_none());
    }
}
