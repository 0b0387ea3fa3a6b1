//! Fusion parser: converts line-oriented source text into a configuration
//! tree, resolving nested confinement blocks, multi-line literals, embedded
//! expressions and DSL literals, and linearizing prototype inheritance.

mod dsl;
mod lines;
mod parser;
mod paths;
mod values;

pub use dsl::{DslRegistry, DslTranspiler};
pub use parser::Parser;
