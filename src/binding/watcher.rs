//! Resolver watchers: which component fields are driven by which resolver
//! listener, and the write-back path from resolver to component.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::collection::CollectionStateMap;
use crate::condition::operators::stringify;
use crate::dom::{ComponentDef, ComponentId};
use crate::editor::{Editor, SetOptions};
use crate::error::{ResolverError, Result};
use crate::event::{EventKind, Topic};
use crate::logging::{targets, Channel};
use crate::resolver::{
    ListenerId, Resolver, ResolverId, ResolverProps, DATA_COLLECTION_VARIABLE_TYPE, DATA_CONDITION_TYPE,
    DATA_VARIABLE_TYPE, LEGACY_CONDITION_TYPE,
};

/// Key under which a resolver component's own resolver is watched.
pub(crate) const CONTENT_KEY: &str = "content";

/// A bindable part of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Prop,
    Attribute,
    Style,
    /// A trait value; written to the trait's target attribute or prop.
    Trait,
    /// The rendered value of a resolver component.
    Content,
}

/// Listeners driving the keys of one field.
#[derive(Debug, Default, Clone)]
pub struct ResolverWatcher {
    listeners: HashMap<String, ListenerId>,
}

impl ResolverWatcher {
    pub fn get(&self, key: &str) -> Option<ListenerId> {
        self.listeners.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn insert(&mut self, key: String, listener: ListenerId) -> Option<ListenerId> {
        self.listeners.insert(key, listener)
    }

    fn remove(&mut self, key: &str) -> Option<ListenerId> {
        self.listeners.remove(key)
    }

    fn drain(&mut self) -> Vec<ListenerId> {
        self.listeners.drain().map(|(_, listener)| listener).collect()
    }
}

/// All watchers of one component.
#[derive(Debug, Default, Clone)]
pub struct ComponentWatchers {
    props: ResolverWatcher,
    attributes: ResolverWatcher,
    style: ResolverWatcher,
    traits: ResolverWatcher,
    content: ResolverWatcher,
}

impl ComponentWatchers {
    pub fn field(&self, field: Field) -> &ResolverWatcher {
        match field {
            Field::Prop => &self.props,
            Field::Attribute => &self.attributes,
            Field::Style => &self.style,
            Field::Trait => &self.traits,
            Field::Content => &self.content,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut ResolverWatcher {
        match field {
            Field::Prop => &mut self.props,
            Field::Attribute => &mut self.attributes,
            Field::Style => &mut self.style,
            Field::Trait => &mut self.traits,
            Field::Content => &mut self.content,
        }
    }

    /// Every `(field, key, listener)` triple.
    pub fn entries(&self) -> Vec<(Field, String, ListenerId)> {
        [Field::Prop, Field::Attribute, Field::Style, Field::Trait, Field::Content]
            .into_iter()
            .flat_map(move |field| {
                self.field(field)
                    .listeners
                    .iter()
                    .map(move |(key, &listener)| (field, key.clone(), listener))
            })
            .collect()
    }

    pub(crate) fn take_all(&mut self) -> Vec<ListenerId> {
        let mut all = Vec::new();
        for field in [Field::Prop, Field::Attribute, Field::Style, Field::Trait, Field::Content] {
            all.extend(self.field_mut(field).drain());
        }
        all
    }
}

/// Whether components of this type render a resolver.
pub fn is_resolver_component(component_type: &str) -> bool {
    !resolver_component_keys(component_type).is_empty()
}

/// Props holding the resolver definition of a resolver component. They are
/// stored as written and never bound themselves.
pub(crate) fn resolver_component_keys(component_type: &str) -> &'static [&'static str] {
    match component_type {
        DATA_VARIABLE_TYPE => &["path", "defaultValue"],
        DATA_COLLECTION_VARIABLE_TYPE => &["variableType", "collectionId", "path"],
        DATA_CONDITION_TYPE | LEGACY_CONDITION_TYPE => &["condition", "ifTrue", "ifFalse"],
        _ => &[],
    }
}

fn is_condition_component(component_type: &str) -> bool {
    matches!(component_type, DATA_CONDITION_TYPE | LEGACY_CONDITION_TYPE)
}

/// Child definitions for a condition branch value.
fn branch_to_defs(value: Value) -> Vec<ComponentDef> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().flat_map(branch_to_defs).collect(),
        Value::Object(_) => match ComponentDef::from_value(value.clone()) {
            Ok(def) => vec![def],
            Err(_) => vec![text_node(stringify(&value))],
        },
        other => vec![text_node(stringify(&other))],
    }
}

fn text_node(content: String) -> ComponentDef {
    ComponentDef::new("textnode").with_prop("content", content)
}

impl Editor {
    /// Bind `value` to `key` of `field`. A resolver definition gets a live
    /// resolver and listener, and its current value is returned; anything
    /// else drops a previous binding and comes back unchanged.
    pub(crate) fn bind_value(&mut self, id: ComponentId, field: Field, key: &str, value: Value) -> Result<Value> {
        match ResolverProps::from_value(&value)? {
            Some(props) => self.bind_resolver(id, field, key, props),
            None => {
                self.unbind_value(id, field, key);
                Ok(value)
            }
        }
    }

    pub(crate) fn bind_resolver(
        &mut self,
        id: ComponentId,
        field: Field,
        key: &str,
        props: ResolverProps,
    ) -> Result<Value> {
        self.unbind_value(id, field, key);
        let scope = self.bindings.state_maps.get(id).cloned();
        let resolver = self.create_resolver(props, scope)?;
        let value = self.resolver_value(resolver);
        let owned_key = key.to_owned();
        let listener = self.listen(
            resolver,
            true,
            Rc::new(move |editor: &mut Editor, value| editor.write_back(id, field, &owned_key, value)),
        );
        if let Some(watchers) = self.bindings.watchers.get_mut(id) {
            watchers.field_mut(field).insert(key.to_owned(), listener);
        }
        tracing::trace!(target: targets::RESOLVER, ?id, ?field, key, "bound");
        Ok(value)
    }

    /// Drop the binding of `key`, destroying its listener.
    pub(crate) fn unbind_value(&mut self, id: ComponentId, field: Field, key: &str) -> bool {
        let listener = self
            .bindings
            .watchers
            .get_mut(id)
            .and_then(|watchers| watchers.field_mut(field).remove(key));
        match listener {
            Some(listener) => {
                self.destroy_listener(listener);
                true
            }
            None => false,
        }
    }

    pub(crate) fn unbind_field(&mut self, id: ComponentId, field: Field) {
        let listeners = self
            .bindings
            .watchers
            .get_mut(id)
            .map(|watchers| watchers.field_mut(field).drain())
            .unwrap_or_default();
        for listener in listeners {
            self.destroy_listener(listener);
        }
    }

    /// Resolver driving `key` of `field`, if any.
    pub fn bound_resolver(&self, id: ComponentId, field: Field, key: &str) -> Option<ResolverId> {
        let listener = self.bindings.watchers.get(id)?.field(field).get(key)?;
        self.listeners.get(listener).map(|l| l.resolver())
    }

    /// The definition to save for `key`: the resolver definition when bound.
    pub(crate) fn serializable(&self, id: ComponentId, field: Field, key: &str) -> Option<Value> {
        let resolver = self.bound_resolver(id, field, key)?;
        self.resolvers.get(resolver).map(|r| r.props().to_value())
    }

    /// The saved form of a whole field.
    pub(crate) fn field_defs(&self, id: ComponentId, field: Field) -> Map<String, Value> {
        let Some(component) = self.tree.get(id) else {
            return Map::new();
        };
        let values = match field {
            Field::Prop => &component.props,
            Field::Attribute => &component.attributes,
            Field::Style => &component.style,
            Field::Trait | Field::Content => return Map::new(),
        };
        // Values written by a dynamic trait come back from the trait itself.
        let from_trait = |key: &str| {
            field != Field::Style
                && self.bound_resolver(id, Field::Trait, key).is_some()
                && component
                    .trait_def(key)
                    .is_some_and(|t| t.changes_prop() == (field == Field::Prop))
        };
        values
            .iter()
            .filter(|(key, _)| !from_trait(key))
            .map(|(key, value)| {
                let saved = self.serializable(id, field, key).unwrap_or_else(|| value.clone());
                (key.clone(), saved)
            })
            .collect()
    }

    /// Keys of `field` bound to collection variables.
    pub(crate) fn collection_variable_keys(&self, id: ComponentId, field: Field) -> Vec<String> {
        let Some(watchers) = self.bindings.watchers.get(id) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = watchers
            .field(field)
            .listeners
            .iter()
            .filter(|(_, &listener)| {
                self.listeners
                    .get(listener)
                    .and_then(|l| self.resolvers.get(l.resolver()))
                    .is_some_and(Resolver::is_collection_variable)
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Store a resolved value without firing events.
    pub(crate) fn store_field(&mut self, id: ComponentId, field: Field, key: &str, value: Value) {
        let Some(component) = self.tree.get_mut(id) else {
            return;
        };
        match field {
            Field::Prop => {
                component.props.insert(key.to_owned(), value);
            }
            Field::Attribute => {
                component.attributes.insert(key.to_owned(), value);
            }
            Field::Style => {
                component.style.insert(key.to_owned(), value);
            }
            Field::Trait => {
                if component.trait_def(key).is_some_and(|t| t.changes_prop()) {
                    component.props.insert(key.to_owned(), value);
                } else {
                    component.attributes.insert(key.to_owned(), value);
                }
            }
            Field::Content => component.content = Some(value),
        }
    }

    fn write_back(&mut self, id: ComponentId, field: Field, key: &str, value: Value) {
        if !self.tree.contains(id) {
            return;
        }
        if field == Field::Content {
            if let Err(err) = self.apply_content(id, value) {
                self.log
                    .error(Channel::Resolver, format!("failed to render resolver content: {err}"));
            }
            return;
        }
        self.store_field(id, field, key, value);
        self.emit(Topic::component(id, EventKind::Change));
    }

    /// Bind dynamic trait values whose target has no value yet.
    pub(crate) fn bind_traits(&mut self, id: ComponentId) -> Result<()> {
        let Some(component) = self.tree.get(id) else {
            return Ok(());
        };
        let pending: Vec<(String, Value)> = component
            .traits
            .iter()
            .filter(|t| component.trait_target_value(t).is_none())
            .filter_map(|t| {
                t.value()
                    .filter(|value| ResolverProps::is_resolver(value))
                    .map(|value| (t.name().to_owned(), value.clone()))
            })
            .collect();
        for (name, value) in pending {
            let resolved = self.bind_value(id, Field::Trait, &name, value)?;
            self.store_field(id, Field::Trait, &name, resolved);
        }
        Ok(())
    }

    /// (Re)bind the resolver a resolver component renders.
    pub(crate) fn bind_content(&mut self, id: ComponentId) -> Result<()> {
        let Some(component) = self.tree.get(id) else {
            return Ok(());
        };
        let kind = component.component_type.clone();
        let mut def = Map::new();
        def.insert("type".into(), Value::String(kind.clone()));
        for key in resolver_component_keys(&kind) {
            if let Some(value) = component.props.get(*key) {
                def.insert((*key).to_owned(), value.clone());
            }
        }
        let props = ResolverProps::from_value(&Value::Object(def))?.ok_or(ResolverError::UnsupportedType(kind))?;
        let value = self.bind_resolver(id, Field::Content, CONTENT_KEY, props)?;
        self.apply_content(id, value)
    }

    /// Render a resolver component's value: content for variables, child
    /// components for conditions.
    pub(crate) fn apply_content(&mut self, id: ComponentId, value: Value) -> Result<()> {
        let Some(component) = self.tree.get(id) else {
            return Ok(());
        };
        if is_condition_component(&component.component_type) {
            let changed = component.content.as_ref() != Some(&value) || self.tree.children(id).is_empty();
            if changed {
                self.store_field(id, Field::Content, CONTENT_KEY, value.clone());
                self.reset_children_with(id, branch_to_defs(value), SetOptions::silent())?;
            }
        } else {
            self.store_field(id, Field::Content, CONTENT_KEY, value);
        }
        self.emit(Topic::component(id, EventKind::Change));
        Ok(())
    }

    /// Push a new collection state to every collection variable bound on
    /// `id`. Listeners write the new values back.
    pub(crate) fn refresh_collection_variables(&mut self, id: ComponentId, state_map: &CollectionStateMap) {
        let Some(watchers) = self.bindings.watchers.get(id) else {
            return;
        };
        let resolvers: Vec<ResolverId> = watchers
            .entries()
            .into_iter()
            .filter_map(|(_, _, listener)| self.listeners.get(listener).map(|l| l.resolver()))
            .filter(|&resolver| self.resolvers.get(resolver).is_some_and(Resolver::is_collection_variable))
            .collect();
        for resolver in resolvers {
            self.update_collections_state_map(resolver, state_map.clone());
        }
    }
}
