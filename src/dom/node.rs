//! Component types: ComponentId, Component, and their serializable
//! definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use slotmap::new_key_type;

use crate::collection::DataCollectionDef;

new_key_type! {
    /// Unique identifier for a component. Copy, lightweight (u64).
    pub struct ComponentId;
}

/// Component type of the root wrapper.
pub const WRAPPER_TYPE: &str = "wrapper";
/// Component type used when a definition names none.
pub const DEFAULT_TYPE: &str = "default";
/// Component type of collection components.
pub const DATA_COLLECTION_TYPE: &str = "data-collection";

// ---------------------------------------------------------------------------
// Symbol override
// ---------------------------------------------------------------------------

/// Which properties of a symbol instance ignore upstream propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymbolOverride {
    /// `true` overrides everything; `false` nothing.
    All(bool),
    /// Overridden property names. `"attributes"` covers every attribute,
    /// and `"components"` covers structural changes.
    Props(Vec<String>),
}

impl SymbolOverride {
    /// Whether `prop` is overridden. A name like `components:add` also
    /// matches the entry `components`.
    pub fn covers(&self, prop: &str) -> bool {
        match self {
            SymbolOverride::All(all) => *all,
            SymbolOverride::Props(props) => {
                let base = prop.split(':').next().unwrap_or(prop);
                props.iter().any(|p| p == prop || p == base)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SymbolOverride::All(all) => !*all,
            SymbolOverride::Props(props) => props.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A trait declaration: either a bare name or a full definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitDef {
    Name(String),
    Full(TraitProps),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitProps {
    pub name: String,
    /// Target a component prop instead of an attribute.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub change_prop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TraitDef {
    pub fn name(&self) -> &str {
        match self {
            TraitDef::Name(name) => name,
            TraitDef::Full(props) => &props.name,
        }
    }

    pub fn changes_prop(&self) -> bool {
        matches!(self, TraitDef::Full(TraitProps { change_prop: true, .. }))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            TraitDef::Name(_) => None,
            TraitDef::Full(props) => props.value.as_ref(),
        }
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        match self {
            TraitDef::Name(name) => {
                *self = TraitDef::Full(TraitProps {
                    name: std::mem::take(name),
                    change_prop: false,
                    value: Some(value),
                    extra: Map::new(),
                });
            }
            TraitDef::Full(props) => props.value = Some(value),
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentDef
// ---------------------------------------------------------------------------

/// Serializable component definition.
///
/// Known keys map to fields; everything else lands in `props`. Values in
/// `props`, `attributes`, `style` and trait values may be resolver
/// definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentDef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(rename = "tagName", default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub style: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<TraitDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub droppable: Option<bool>,
    #[serde(rename = "collectionDef", default, skip_serializing_if = "Option::is_none")]
    pub collection_def: Option<DataCollectionDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentDef>,
    #[serde(rename = "__id", default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(rename = "__symbol", default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(rename = "__symbols", default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(rename = "__symbol_ovrd", default, skip_serializing_if = "Option::is_none")]
    pub symbol_override: Option<SymbolOverride>,
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl ComponentDef {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: Some(component_type.into()),
            ..Self::default()
        }
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Set a prop (builder).
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Set an attribute (builder).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set a style property (builder).
    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }

    /// Append a child (builder).
    pub fn with_child(mut self, child: ComponentDef) -> Self {
        self.components.push(child);
        self
    }

    /// Declare a trait (builder).
    pub fn with_trait(mut self, def: TraitDef) -> Self {
        self.traits.push(def);
        self
    }

    /// Drop symbol bookkeeping from this definition and all descendants.
    pub fn strip_symbol_refs(&mut self) {
        self.uid = None;
        self.symbol = None;
        self.symbols.clear();
        self.symbol_override = None;
        for child in &mut self.components {
            child.strip_symbol_refs();
        }
        if let Some(template) = self
            .collection_def
            .as_mut()
            .and_then(|def| def.component_def.as_deref_mut())
        {
            template.strip_symbol_refs();
        }
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A live component in the tree.
///
/// Field values are resolved: a prop bound to a data variable holds the
/// variable's current value. Resolver definitions live in the editor's
/// binding side-tables and come back on serialization.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) component_type: String,
    pub(crate) tag_name: Option<String>,
    pub(crate) props: Map<String, Value>,
    pub(crate) attributes: Map<String, Value>,
    pub(crate) style: Map<String, Value>,
    pub(crate) classes: Vec<String>,
    pub(crate) traits: Vec<TraitDef>,
    pub(crate) draggable: Option<bool>,
    pub(crate) droppable: Option<bool>,
    pub(crate) collection_def: Option<DataCollectionDef>,
    /// Rendered value of resolver components.
    pub(crate) content: Option<Value>,
    pub(crate) uid: String,
    pub(crate) symbol: Option<ComponentId>,
    pub(crate) symbols: Vec<ComponentId>,
    pub(crate) symbol_override: Option<SymbolOverride>,
}

impl Component {
    /// Create a component with the given type and sensible defaults.
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            tag_name: None,
            props: Map::new(),
            attributes: Map::new(),
            style: Map::new(),
            classes: Vec::new(),
            traits: Vec::new(),
            draggable: None,
            droppable: None,
            collection_def: None,
            content: None,
            uid: String::new(),
            symbol: None,
            symbols: Vec::new(),
            symbol_override: None,
        }
    }

    pub fn component_type(&self) -> &str {
        &self.component_type
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.tag_name.as_deref()
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn style(&self) -> &Map<String, Value> {
        &self.style
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn traits(&self) -> &[TraitDef] {
        &self.traits
    }

    pub fn trait_def(&self, name: &str) -> Option<&TraitDef> {
        self.traits.iter().find(|t| t.name() == name)
    }

    pub fn draggable(&self) -> Option<bool> {
        self.draggable
    }

    pub fn droppable(&self) -> Option<bool> {
        self.droppable
    }

    pub fn collection_def(&self) -> Option<&DataCollectionDef> {
        self.collection_def.as_ref()
    }

    pub fn is_collection(&self) -> bool {
        self.component_type == DATA_COLLECTION_TYPE
    }

    /// Rendered value of a resolver component.
    pub fn content(&self) -> Option<&Value> {
        self.content.as_ref()
    }

    /// Stable string id, used for symbol references in saved data.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn symbol_override(&self) -> Option<&SymbolOverride> {
        self.symbol_override.as_ref()
    }

    /// Whether `prop` is overridden on this component.
    pub fn is_symbol_override(&self, prop: &str) -> bool {
        self.symbol_override.as_ref().is_some_and(|o| o.covers(prop))
    }

    /// Value of a field addressed by trait target rules: the prop when the
    /// trait changes a prop, the attribute otherwise.
    pub(crate) fn trait_target_value(&self, def: &TraitDef) -> Option<&Value> {
        if def.changes_prop() {
            self.props.get(def.name())
        } else {
            self.attributes.get(def.name())
        }
    }
}
