//! Symbols: linked component copies kept in sync.
//!
//! A symbol group is one main component plus its instances. Links are
//! stored as component ids on both sides and checked for liveness on every
//! lookup, so a removed member simply drops out of the group. The set of
//! members a change reaches is derived from the current links each time.

use serde_json::{Map, Value};

use super::node::{Component, ComponentDef, ComponentId, SymbolOverride};
use crate::binding::{is_resolver_component, Field};
use crate::editor::{Editor, SetOptions};
use crate::error::{EditorError, Result};
use crate::event::{EventKind, Topic};
use crate::logging::targets;
use crate::resolver::is_collection_variable;

/// Override name covering every attribute.
pub const ATTRIBUTES_OVERRIDE: &str = "attributes";
/// Override name covering the inline style.
pub const STYLE_OVERRIDE: &str = "style";
/// Override name covering classes.
pub const CLASSES_OVERRIDE: &str = "classes";
/// Override name covering child list edits (`components:add`, ...).
pub const COMPONENTS_OVERRIDE: &str = "components";

/// A field change to replay on symbol members.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SymbolChange {
    Props(Map<String, Value>),
    Unset(String),
    Attributes(Map<String, Value>),
    Style(Map<String, Value>),
    Classes(Vec<String>),
}

/// Whether a change of `key` to `value` reaches `target`.
///
/// Overridden keys are skipped, except when the new value is a collection
/// variable: those follow the shared definition and resolve per member.
pub fn should_propagate(target: &Component, key: &str, value: Option<&Value>) -> bool {
    !target.is_symbol_override(key) || value.is_some_and(is_collection_variable)
}

/// Whether a whole-map change (attributes, style) reaches `target`.
fn map_reaches(target: &Component, override_key: &str, values: &Map<String, Value>) -> bool {
    !target.is_symbol_override(override_key) || values.values().any(is_collection_variable)
}

impl Editor {
    /// Live main of `id`, if it is a symbol instance.
    pub fn symbol_main(&self, id: ComponentId) -> Option<ComponentId> {
        self.tree
            .get(id)?
            .symbol
            .filter(|&main| self.tree.contains(main))
    }

    /// Live instances of `id`, if it is a symbol main.
    pub fn symbol_instances(&self, id: ComponentId) -> Vec<ComponentId> {
        let Some(component) = self.tree.get(id) else {
            return Vec::new();
        };
        component
            .symbols
            .iter()
            .copied()
            .filter(|&instance| self.tree.get(instance).is_some_and(|c| c.symbol == Some(id)))
            .collect()
    }

    /// Whether `id` belongs to a symbol group.
    pub fn is_symbol(&self, id: ComponentId) -> bool {
        self.symbol_main(id).is_some() || !self.symbol_instances(id).is_empty()
    }

    /// Members of `id`'s symbol group that a change made on `id` reaches.
    pub(crate) fn symbols_to_update(&self, id: ComponentId, opts: SetOptions) -> Vec<ComponentId> {
        if !opts.propagates() {
            return Vec::new();
        }
        let main = self.symbol_main(id).unwrap_or(id);
        let mut members = Vec::new();
        if main != id {
            members.push(main);
        }
        members.extend(self.symbol_instances(main).into_iter().filter(|&m| m != id));
        members
    }

    fn symbol_group(&self, id: ComponentId) -> ComponentId {
        self.symbol_main(id).unwrap_or(id)
    }

    fn same_symbol_group(&self, a: ComponentId, b: ComponentId) -> bool {
        a != b && self.is_symbol(a) && self.symbol_group(a) == self.symbol_group(b)
    }

    /// Replay a field change on every reached symbol member.
    pub(crate) fn propagate(&mut self, id: ComponentId, change: SymbolChange, opts: SetOptions) -> Result<()> {
        let members = self.symbols_to_update(id, opts);
        if members.is_empty() {
            return Ok(());
        }
        tracing::trace!(target: targets::SYMBOL, ?id, members = members.len(), "propagating change");
        let from = SetOptions::from_instance(id);
        for member in members {
            let Some(target) = self.tree.get(member) else {
                continue;
            };
            match &change {
                SymbolChange::Props(props) => {
                    let reached: Map<String, Value> = props
                        .iter()
                        .filter(|(key, value)| should_propagate(target, key, Some(value)))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    if !reached.is_empty() {
                        self.set_props(member, reached, from)?;
                    }
                }
                SymbolChange::Unset(key) => {
                    if should_propagate(target, key, None) {
                        self.unset_prop_with(member, key, from)?;
                    }
                }
                SymbolChange::Attributes(attributes) => {
                    if map_reaches(target, ATTRIBUTES_OVERRIDE, attributes) {
                        // The id attribute stays per member.
                        let mut next = attributes.clone();
                        next.remove("id");
                        if let Some(own) = self.field_defs(member, Field::Attribute).remove("id") {
                            next.insert("id".into(), own);
                        }
                        self.set_attributes_with(member, next, from)?;
                    }
                }
                SymbolChange::Style(style) => {
                    if map_reaches(target, STYLE_OVERRIDE, style) {
                        self.set_style_with(member, style.clone(), from)?;
                    }
                }
                SymbolChange::Classes(classes) => {
                    if !target.is_symbol_override(CLASSES_OVERRIDE) {
                        self.set_classes_with(member, classes.clone(), from)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Child list edits under collections and resolver components are
    /// managed by those components.
    fn propagates_structure(&self, parent: ComponentId) -> bool {
        self.tree
            .get(parent)
            .is_some_and(|c| !c.is_collection() && !is_resolver_component(&c.component_type))
    }

    /// Members receiving a child list edit `change` (`components:add`, ...)
    /// made on `parent`. None when `parent` itself overrides the edit.
    fn structural_members(&self, parent: ComponentId, change: &str) -> Vec<ComponentId> {
        let overridden = self.tree.get(parent).map_or(true, |c| c.is_symbol_override(change));
        if overridden || !self.propagates_structure(parent) {
            return Vec::new();
        }
        self.symbols_to_update(parent, SetOptions::default())
            .into_iter()
            .filter(|&member| self.tree.get(member).is_some_and(|c| !c.is_symbol_override(change)))
            .collect()
    }

    /// Definition used to copy `id` into another member.
    fn copy_def(&self, id: ComponentId) -> Option<ComponentDef> {
        let mut def = self.serialize(id, false)?;
        def.strip_symbol_refs();
        Some(def)
    }

    pub(crate) fn propagate_add(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        let members = self.structural_members(parent, "components:add");
        let Some(def) = members.first().and_then(|_| self.copy_def(child)) else {
            return Ok(());
        };
        let index = self.tree.index_of(child);
        for member in members {
            let present = self
                .tree
                .children(member)
                .iter()
                .any(|&c| self.same_symbol_group(c, child));
            if present {
                continue;
            }
            let copy = self.insert_with(member, index, def.clone(), SetOptions::from_instance(parent))?;
            self.link_symbol_tree(child, copy);
            for node in self.tree.descendants(copy) {
                self.update_symbol_override(node);
            }
        }
        Ok(())
    }

    pub(crate) fn propagate_remove(&mut self, parent: ComponentId, child: ComponentId) {
        for member in self.structural_members(parent, "components:remove") {
            let copies: Vec<ComponentId> = self
                .tree
                .children(member)
                .iter()
                .copied()
                .filter(|&c| self.same_symbol_group(c, child))
                .collect();
            for copy in copies {
                self.remove_with(copy, SetOptions::from_instance(parent));
            }
        }
    }

    /// Mirror the child list of `parent` on every reached member, reusing
    /// children already linked to the matching source child.
    pub(crate) fn propagate_reset(&mut self, parent: ComponentId) -> Result<()> {
        let sources = self.tree.children(parent).to_vec();
        for member in self.structural_members(parent, "components:reset") {
            let mut available = self.tree.children(member).to_vec();
            let mut order = Vec::with_capacity(sources.len());
            for &source in &sources {
                let reused = available
                    .iter()
                    .position(|&c| self.same_symbol_group(c, source))
                    .map(|index| available.remove(index));
                let child = match reused {
                    Some(child) => child,
                    None => {
                        let Some(def) = self.copy_def(source) else {
                            continue;
                        };
                        let scope = self.bindings.inherited_scope(member);
                        let copy = self.build(def, member, None, scope)?;
                        self.link_symbol_tree(source, copy);
                        for node in self.tree.descendants(copy) {
                            self.update_symbol_override(node);
                        }
                        copy
                    }
                };
                order.push(child);
            }
            for stale in available {
                self.teardown(stale);
                self.tree.remove(stale);
            }
            self.tree.set_children(member, order);
            self.emit(Topic::component(member, EventKind::Reset));
        }
        Ok(())
    }

    /// Link `copy` (and its subtree, position by position) into the symbol
    /// groups of `source`. Collection items are linked by their collection.
    pub(crate) fn link_symbol_tree(&mut self, source: ComponentId, copy: ComponentId) {
        let main = self.symbol_group(source);
        if main == copy {
            return;
        }
        if let Some(component) = self.tree.get_mut(copy) {
            component.symbol = Some(main);
        }
        if let Some(component) = self.tree.get_mut(main) {
            if !component.symbols.contains(&copy) {
                component.symbols.push(copy);
            }
        }
        let descend = self
            .tree
            .get(source)
            .is_some_and(|c| !c.is_collection() && !is_resolver_component(&c.component_type));
        if !descend {
            return;
        }
        let pairs: Vec<(ComponentId, ComponentId)> = self
            .tree
            .children(source)
            .iter()
            .copied()
            .zip(self.tree.children(copy).iter().copied())
            .collect();
        for (source_child, copy_child) in pairs {
            self.link_symbol_tree(source_child, copy_child);
        }
    }

    /// Drop every symbol link of `id`, in both directions.
    pub(crate) fn unlink_symbol(&mut self, id: ComponentId) {
        let Some(component) = self.tree.get_mut(id) else {
            return;
        };
        let main = component.symbol.take();
        let instances = std::mem::take(&mut component.symbols);
        if let Some(main) = main.and_then(|m| self.tree.get_mut(m)) {
            main.symbols.retain(|&s| s != id);
        }
        for instance in instances {
            if let Some(instance) = self.tree.get_mut(instance).filter(|c| c.symbol == Some(id)) {
                instance.symbol = None;
            }
        }
    }

    /// Insert a linked copy of `id` right after it. `id` becomes the main
    /// unless it already belongs to a group.
    pub fn clone_symbol(&mut self, id: ComponentId) -> Result<ComponentId> {
        let parent = self.tree.parent(id).ok_or(EditorError::ComponentNotFound(id))?;
        let def = self.copy_def(id).ok_or(EditorError::ComponentNotFound(id))?;
        let index = self.tree.index_of(id).map(|i| i + 1);
        let copy = self.insert_with(parent, index, def, SetOptions::silent())?;
        self.link_symbol_tree(id, copy);
        tracing::debug!(target: targets::SYMBOL, ?id, ?copy, "symbol cloned");
        Ok(copy)
    }

    /// Detach `id` and all its descendants from their symbol groups.
    pub fn detach_symbol(&mut self, id: ComponentId) {
        for node in self.tree.descendants(id) {
            self.unlink_symbol(node);
        }
        tracing::debug!(target: targets::SYMBOL, ?id, "symbol detached");
    }

    /// Mark properties of `id` as overridden.
    pub fn set_symbol_override(&mut self, id: ComponentId, value: Option<SymbolOverride>) -> Result<()> {
        let component = self.tree.get_mut(id).ok_or(EditorError::ComponentNotFound(id))?;
        component.symbol_override = value;
        self.emit(Topic::component(id, EventKind::Change));
        Ok(())
    }

    /// Record collection-variable bound fields of a collection item as
    /// overrides on its whole symbol group.
    pub(crate) fn update_symbol_override(&mut self, id: ComponentId) {
        if !self.bindings.is_collection_item(id) {
            return;
        }
        let mut keys = self.collection_variable_keys(id, Field::Prop);
        if !self.collection_variable_keys(id, Field::Attribute).is_empty() {
            keys.push(ATTRIBUTES_OVERRIDE.to_owned());
        }
        if !self.collection_variable_keys(id, Field::Style).is_empty() {
            keys.push(STYLE_OVERRIDE.to_owned());
        }
        if keys.is_empty() {
            return;
        }
        let mut members = vec![id];
        members.extend(self.symbols_to_update(id, SetOptions::default()));
        for member in members {
            let Some(component) = self.tree.get_mut(member) else {
                continue;
            };
            match &mut component.symbol_override {
                Some(SymbolOverride::All(true)) => {}
                Some(SymbolOverride::Props(existing)) => {
                    for key in &keys {
                        if !existing.contains(key) {
                            existing.push(key.clone());
                        }
                    }
                }
                slot => *slot = Some(SymbolOverride::Props(keys.clone())),
            }
        }
    }

    /// Turn saved string references into links, once the components they
    /// point at exist.
    pub(crate) fn resolve_symbol_refs(&mut self) {
        for pending in std::mem::take(&mut self.pending_symbol_refs) {
            if !self.tree.contains(pending.id) {
                continue;
            }
            let main = pending.symbol.as_deref().and_then(|uid| self.tree.by_uid(uid));
            let instances: Vec<ComponentId> = pending
                .symbols
                .iter()
                .filter_map(|uid| self.tree.by_uid(uid))
                .collect();
            if pending.symbol.is_some() && main.is_none() {
                tracing::debug!(target: targets::SYMBOL, id = ?pending.id, "unresolved symbol main");
            }
            if let Some(component) = self.tree.get_mut(pending.id) {
                if main.is_some() {
                    component.symbol = main;
                }
                for instance in &instances {
                    if !component.symbols.contains(instance) {
                        component.symbols.push(*instance);
                    }
                }
            }
            if let Some(main) = main.and_then(|m| self.tree.get_mut(m)) {
                if !main.symbols.contains(&pending.id) {
                    main.symbols.push(pending.id);
                }
            }
        }
    }
}
