//! Per-component binding state, kept beside the component tree.
//!
//! Components carry only their resolved values. Which of those values are
//! driven by a resolver, which collection state each component sees, and
//! which collection components are watching their data source all live in
//! these side-tables, keyed by [`ComponentId`].

pub mod watcher;

use slotmap::SecondaryMap;

use crate::collection::CollectionStateMap;
use crate::dom::ComponentId;
use crate::resolver::ListenerId;

pub use watcher::{is_resolver_component, ComponentWatchers, Field, ResolverWatcher};

#[derive(Debug, Default)]
pub(crate) struct Bindings {
    /// Resolver listeners per component field.
    pub watchers: SecondaryMap<ComponentId, ComponentWatchers>,
    /// Collection state seen by every component inside a collection item.
    pub state_maps: SecondaryMap<ComponentId, CollectionStateMap>,
    /// Collection ids whose state a component passes on to children
    /// added later.
    pub scopes: SecondaryMap<ComponentId, Vec<String>>,
    /// Data source listener of each collection component.
    pub collections: SecondaryMap<ComponentId, Option<ListenerId>>,
}

impl Bindings {
    /// Record the collection state of `id` and register it for inheritance.
    pub fn attach_scope(&mut self, id: ComponentId, state_map: CollectionStateMap) {
        self.scopes.insert(id, state_map.keys().cloned().collect());
        self.state_maps.insert(id, state_map);
    }

    /// The state map a new child of `parent` inherits.
    pub fn inherited_scope(&self, parent: ComponentId) -> Option<CollectionStateMap> {
        if !self.scopes.contains_key(parent) {
            return None;
        }
        self.state_maps.get(parent).cloned()
    }

    /// Whether `id` sits inside a collection item.
    pub fn is_collection_item(&self, id: ComponentId) -> bool {
        self.state_maps.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.watchers.clear();
        self.state_maps.clear();
        self.scopes.clear();
        self.collections.clear();
    }
}
