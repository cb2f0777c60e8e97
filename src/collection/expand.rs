//! Live collection expansion.
//!
//! A collection component keeps one child per planned item. Re-expansion
//! reconciles instead of rebuilding: children whose current item is still
//! present keep their identity and receive the new state, missing ones are
//! built from the template, and stale ones are dropped. The first item is
//! the symbol main of the others.

use std::rc::Rc;

use super::config::{plan_items, watched_resolver, CollectionDataSource, DataCollectionConfig};
use super::state::{merge_state_maps, CollectionStateMap};
use crate::dom::{ComponentDef, ComponentId};
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::event::{EventKind, Topic};
use crate::logging::{targets, Channel};
use crate::resolver::ResolverProps;

impl Editor {
    pub(crate) fn init_collection(&mut self, id: ComponentId) -> Result<()> {
        self.refresh_collection(id)?;
        self.watch_collection_source(id)
    }

    /// (Re)subscribe collection `id` to the data its items come from.
    fn watch_collection_source(&mut self, id: ComponentId) -> Result<()> {
        if let Some(Some(previous)) = self.bindings.collections.remove(id) {
            self.destroy_listener(previous);
        }
        let Some(component) = self.tree.get(id) else {
            return Ok(());
        };
        let parent_state = self.bindings.state_maps.get(id).cloned().unwrap_or_default();
        let watched = component
            .collection_def
            .as_ref()
            .and_then(|def| def.collection_config.as_ref())
            .and_then(|config| config.data_source.as_ref())
            .and_then(|source| watched_resolver(source, &parent_state, &self.log));

        let listener = match watched {
            Some(props) => {
                let resolver = self.create_resolver(props, Some(parent_state))?;
                let listener = self.listen(
                    resolver,
                    true,
                    Rc::new(move |editor: &mut Editor, _| {
                        if let Err(err) = editor.refresh_collection(id) {
                            editor
                                .log
                                .error(Channel::Collection, format!("failed to expand collection: {err}"));
                        }
                    }),
                );
                Some(listener)
            }
            None => None,
        };
        self.bindings.collections.insert(id, listener);
        Ok(())
    }

    /// Template of collection `id`: the current first item when there is
    /// one, so edits made on it are kept, otherwise the stored definition.
    pub(crate) fn collection_template(&self, id: ComponentId) -> Option<ComponentDef> {
        if let Some(&first) = self.tree.children(id).first() {
            let mut def = self.serialize(first, false)?;
            def.strip_symbol_refs();
            def.draggable = None;
            return Some(def);
        }
        self.tree
            .get(id)?
            .collection_def
            .as_ref()?
            .component_def
            .as_deref()
            .cloned()
    }

    /// Re-expand collection `id` against the current data.
    pub fn refresh_collection(&mut self, id: ComponentId) -> Result<()> {
        let Some(component) = self.tree.get(id).filter(|c| c.is_collection()) else {
            return Ok(());
        };
        let mut def = component.collection_def.clone().unwrap_or_default();
        if let Some(template) = self.collection_template(id) {
            def.component_def = Some(Box::new(template));
        }
        let parent_state = self.bindings.state_maps.get(id).cloned().unwrap_or_default();
        let plan = plan_items(&def, &self.data, &parent_state, &self.log);
        let collection_id = def
            .collection_config
            .as_ref()
            .and_then(|config| config.collection_id.clone())
            .unwrap_or_default();

        // Match existing children by the item they show.
        let mut available = self.tree.children(id).to_vec();
        let mut slots = Vec::with_capacity(plan.len());
        for state_map in &plan {
            let item = state_map.get(&collection_id).map(|state| &state.current_item);
            let position = available.iter().position(|&child| {
                self.bindings
                    .state_maps
                    .get(child)
                    .and_then(|map| map.get(&collection_id))
                    .map(|state| &state.current_item)
                    == item
            });
            slots.push(position.map(|index| available.remove(index)));
        }
        for stale in available {
            self.teardown(stale);
            self.tree.remove(stale);
        }

        let mut items = Vec::with_capacity(plan.len());
        if let Some(template) = def.component_def.as_deref() {
            for (slot, state_map) in slots.into_iter().zip(plan) {
                let item = match slot {
                    Some(existing) => {
                        self.apply_collection_state(existing, &state_map)?;
                        existing
                    }
                    None => {
                        let mut item_def = template.clone();
                        item_def.draggable = Some(false);
                        self.build(item_def, id, None, Some(state_map))?
                    }
                };
                items.push(item);
            }
        }
        self.tree.set_children(id, items.clone());
        self.relink_collection_items(&items);
        for &item in &items {
            for node in self.tree.descendants(item) {
                self.update_symbol_override(node);
            }
        }
        tracing::debug!(target: targets::COLLECTION, ?id, items = items.len(), "collection expanded");
        self.emit(Topic::component(id, EventKind::Reset));
        Ok(())
    }

    /// Give a reused item (and everything inside it) a new collection
    /// state. Nested collections fed by a collection variable re-expand.
    fn apply_collection_state(&mut self, item: ComponentId, state_map: &CollectionStateMap) -> Result<()> {
        let nodes = self.tree.descendants(item);
        for &node in &nodes {
            let merged = match self.bindings.state_maps.get(node) {
                Some(existing) => merge_state_maps(existing, state_map),
                None => state_map.clone(),
            };
            if self.bindings.state_maps.get(node) == Some(&merged) {
                continue;
            }
            self.bindings.attach_scope(node, merged.clone());
            self.refresh_collection_variables(node, &merged);
        }
        let nested: Vec<ComponentId> = nodes
            .into_iter()
            .filter(|&node| node != item && self.has_collection_variable_source(node))
            .collect();
        for collection in nested {
            if !self.tree.contains(collection) {
                continue;
            }
            self.watch_collection_source(collection)?;
            self.refresh_collection(collection)?;
        }
        Ok(())
    }

    fn has_collection_variable_source(&self, id: ComponentId) -> bool {
        self.tree
            .get(id)
            .and_then(|c| c.collection_def.as_ref())
            .and_then(|def| def.collection_config.as_ref())
            .and_then(|config| config.data_source.as_ref())
            .is_some_and(|source| {
                matches!(source, CollectionDataSource::Resolver(ResolverProps::CollectionVariable(_)))
            })
    }

    /// Make the first item the symbol main of the rest.
    fn relink_collection_items(&mut self, items: &[ComponentId]) {
        for &item in items {
            for node in self.tree.descendants_where(item, |c| !c.is_collection()) {
                self.unlink_symbol(node);
            }
        }
        let Some((&main, rest)) = items.split_first() else {
            return;
        };
        for &instance in rest {
            self.link_symbol_tree(main, instance);
        }
    }

    /// Replace the configuration of collection `id` and re-expand it.
    pub fn set_collection_config(&mut self, id: ComponentId, config: DataCollectionConfig) -> Result<()> {
        let collection = self
            .tree
            .get_mut(id)
            .and_then(|c| c.collection_def.as_mut())
            .ok_or(EditorError::ComponentNotFound(id))?;
        collection.collection_config = Some(config);
        self.refresh_collection(id)?;
        self.watch_collection_source(id)?;
        self.emit(Topic::component(id, EventKind::Change));
        Ok(())
    }
}
