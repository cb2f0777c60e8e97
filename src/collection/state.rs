//! Per-item collection state and the maps that carry it down a subtree.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which piece of collection state a collection variable reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionStateVariableType {
    CurrentIndex,
    StartIndex,
    CurrentItem,
    EndIndex,
    CollectionId,
    TotalItems,
    RemainingItems,
}

impl CollectionStateVariableType {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionStateVariableType::CurrentIndex => "currentIndex",
            CollectionStateVariableType::StartIndex => "startIndex",
            CollectionStateVariableType::CurrentItem => "currentItem",
            CollectionStateVariableType::EndIndex => "endIndex",
            CollectionStateVariableType::CollectionId => "collectionId",
            CollectionStateVariableType::TotalItems => "totalItems",
            CollectionStateVariableType::RemainingItems => "remainingItems",
        }
    }
}

impl fmt::Display for CollectionStateVariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one item of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionState {
    pub collection_id: String,
    pub current_index: usize,
    pub current_item: Value,
    pub start_index: usize,
    pub end_index: usize,
    pub total_items: usize,
    pub remaining_items: usize,
}

impl CollectionState {
    /// The value a collection variable of type `ty` sees.
    pub fn get(&self, ty: CollectionStateVariableType) -> Value {
        match ty {
            CollectionStateVariableType::CurrentIndex => self.current_index.into(),
            CollectionStateVariableType::StartIndex => self.start_index.into(),
            CollectionStateVariableType::CurrentItem => self.current_item.clone(),
            CollectionStateVariableType::EndIndex => self.end_index.into(),
            CollectionStateVariableType::CollectionId => self.collection_id.clone().into(),
            CollectionStateVariableType::TotalItems => self.total_items.into(),
            CollectionStateVariableType::RemainingItems => self.remaining_items.into(),
        }
    }
}

/// Collection id → state, for every collection enclosing a component.
pub type CollectionStateMap = BTreeMap<String, CollectionState>;

/// Overlay `overlay` on `base`; entries of `overlay` win.
pub fn merge_state_maps(base: &CollectionStateMap, overlay: &CollectionStateMap) -> CollectionStateMap {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
