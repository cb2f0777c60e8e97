//! Component arena: slotmap-backed component tree, definitions and symbol
//! links.

pub mod node;
pub mod symbol;
pub mod tree;

pub use node::{
    Component, ComponentDef, ComponentId, SymbolOverride, TraitDef, TraitProps, DATA_COLLECTION_TYPE, DEFAULT_TYPE,
    WRAPPER_TYPE,
};
pub use symbol::should_propagate;
pub use tree::ComponentTree;
