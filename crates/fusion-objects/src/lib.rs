//! Standard Fusion object implementations and the prototype definitions
//! wiring them up.
//!
//! Each implementation is a renderer registered under the class name its
//! prototype's `@class` property refers to; [`register_standard_objects`]
//! fills an [`ObjectRegistry`] with all of them, and
//! [`STANDARD_PROTOTYPES`] carries the matching Fusion source.

mod attributes;
mod collections;
mod common;
mod renderer;
mod tag;
mod value;

pub use attributes::AttributesImplementation;
pub use collections::{DataStructureImplementation, LoopImplementation, MapImplementation};
pub use renderer::RendererImplementation;
pub use tag::TagImplementation;
pub use value::{JoinImplementation, ValueImplementation};

use fusion_parser::Parser;
use fusion_runtime::ObjectRegistry;
use fusion_types::{FusionNode, FusionResult};

/// Fusion source declaring the standard prototypes and their `@class`
/// wiring.
pub const STANDARD_PROTOTYPES: &str = r#"
prototype(Neos.Fusion:Value) {
    @class = 'Value'
}
prototype(Neos.Fusion:Join) {
    @class = 'Join'
}
prototype(Neos.Fusion:Array) < prototype(Neos.Fusion:Join)
prototype(Neos.Fusion:Attributes) {
    @class = 'Attributes'
    @allowEmpty = true
}
prototype(Neos.Fusion:Tag) {
    @class = 'Tag'
    tagName = 'div'
    omitClosingTag = false
    selfClosingTag = false
    attributes = Neos.Fusion:Attributes
}
prototype(Neos.Fusion:DataStructure) {
    @class = 'DataStructure'
}
prototype(Neos.Fusion:Map) {
    @class = 'Map'
    itemName = 'item'
}
prototype(Neos.Fusion:Loop) < prototype(Neos.Fusion:Map) {
    @class = 'Loop'
    @glue = ''
}
prototype(Neos.Fusion:Renderer) {
    @class = 'Renderer'
}
"#;

/// Register every standard implementation under its `@class` name.
pub fn register_standard_objects(registry: &mut ObjectRegistry) {
    registry.register(
        "Value",
        Box::new(|path, object_type| Box::new(ValueImplementation::new(path, object_type))),
    );
    registry.register(
        "Join",
        Box::new(|path, object_type| Box::new(JoinImplementation::new(path, object_type))),
    );
    registry.register(
        "Attributes",
        Box::new(|path, object_type| Box::new(AttributesImplementation::new(path, object_type))),
    );
    registry.register(
        "Tag",
        Box::new(|path, object_type| Box::new(TagImplementation::new(path, object_type))),
    );
    registry.register(
        "DataStructure",
        Box::new(|path, object_type| {
            Box::new(DataStructureImplementation::new(path, object_type))
        }),
    );
    registry.register(
        "Map",
        Box::new(|path, object_type| Box::new(MapImplementation::new(path, object_type))),
    );
    registry.register(
        "Loop",
        Box::new(|path, object_type| Box::new(LoopImplementation::new(path, object_type))),
    );
    registry.register(
        "Renderer",
        Box::new(|path, object_type| Box::new(RendererImplementation::new(path, object_type))),
    );
}

/// Parse user source together with the standard prototype definitions.
pub fn parse_with_standard_prototypes(source: &str) -> FusionResult<FusionNode> {
    let combined = format!("{STANDARD_PROTOTYPES}\n{source}");
    Parser::new(&combined).parse()
}
