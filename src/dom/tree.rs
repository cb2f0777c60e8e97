//! Tree operations: insert, remove, reorder, walk.

use std::collections::{HashMap, VecDeque};

use slotmap::{SecondaryMap, SlotMap};

use super::node::{Component, ComponentId};

/// Empty slice constant for returning when a component has no children.
const EMPTY_CHILDREN: &[ComponentId] = &[];

/// The component tree, backed by a slotmap arena.
///
/// All components live in a single `SlotMap`. Parent/child relationships are
/// stored in secondary maps so that removal is O(subtree size) and lookup is
/// O(1). Every component also gets a string uid, unique within the tree,
/// which saved symbol references point at.
#[derive(Debug, Default)]
pub struct ComponentTree {
    pub(crate) nodes: SlotMap<ComponentId, Component>,
    children: SecondaryMap<ComponentId, Vec<ComponentId>>,
    parent: SecondaryMap<ComponentId, ComponentId>,
    uids: HashMap<String, ComponentId>,
    next_uid: u64,
    root: Option<ComponentId>,
}

impl ComponentTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_uid(&mut self, id: ComponentId, requested: Option<String>) {
        let uid = match requested {
            Some(uid) if !uid.is_empty() && !self.uids.contains_key(&uid) => uid,
            _ => loop {
                self.next_uid += 1;
                let candidate = format!("c{}", self.next_uid);
                if !self.uids.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        self.uids.insert(uid.clone(), id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.uid = uid;
        }
    }

    /// Insert a root-level component (no parent).
    ///
    /// If no root has been set yet, this component becomes the root.
    pub fn insert(&mut self, data: Component, uid: Option<String>) -> ComponentId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.assign_uid(id, uid);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Insert a component as a child of `parent` at `index` (appended when
    /// `None` or past the end). Returns `None` if `parent` does not exist.
    pub fn insert_child(
        &mut self,
        parent: ComponentId,
        index: Option<usize>,
        data: Component,
        uid: Option<String>,
    ) -> Option<ComponentId> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.parent.insert(id, parent);
        self.assign_uid(id, uid);
        let siblings = self.children.get_mut(parent)?;
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, id);
        Some(id)
    }

    /// Remove a component and all its descendants.
    ///
    /// Returns the removed components, `id` first, in breadth-first order.
    pub fn remove(&mut self, id: ComponentId) -> Vec<(ComponentId, Component)> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }

        // Detach from parent's children list.
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }

        if self.root == Some(id) {
            self.root = None;
        }

        let mut removed = Vec::new();
        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            if let Some(data) = self.nodes.remove(current) {
                if self.uids.get(&data.uid) == Some(&current) {
                    self.uids.remove(&data.uid);
                }
                removed.push((current, data));
            }
        }

        removed
    }

    /// Replace the child list of `parent`.
    ///
    /// Every id in `order` must already be a child of `parent`; ids that
    /// are not are ignored.
    pub fn set_children(&mut self, parent: ComponentId, order: Vec<ComponentId>) {
        let Some(current) = self.children.get(parent) else {
            return;
        };
        let order: Vec<ComponentId> = order.into_iter().filter(|c| current.contains(c)).collect();
        if let Some(slot) = self.children.get_mut(parent) {
            *slot = order;
        }
    }

    /// Get the parent of a component, if it has one.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a component. Returns an empty slice if it has
    /// none or does not exist.
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Position of `id` among its parent's children.
    pub fn index_of(&self, id: ComponentId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Walk from `id` up to the root, collecting ancestor ids.
    ///
    /// The returned vec does **not** include `id` itself; it starts with the
    /// immediate parent and ends at the root.
    pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// `id` and all its descendants, depth-first pre-order.
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        self.descendants_where(id, |_| true)
    }

    /// Like [`descendants`](Self::descendants), but only descends below
    /// components for which `descend` returns `true`.
    pub fn descendants_where(&self, id: ComponentId, descend: impl Fn(&Component) -> bool) -> Vec<ComponentId> {
        let mut result = Vec::new();
        if !self.contains(id) {
            return result;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            if self.nodes.get(current).is_some_and(&descend) {
                stack.extend(self.children(current).iter().rev().copied());
            }
        }
        result
    }

    /// Look up a component by uid.
    pub fn by_uid(&self, uid: &str) -> Option<ComponentId> {
        self.uids.get(uid).copied()
    }

    /// Immutable access to a component.
    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.nodes.get(id)
    }

    /// Mutable access to a component.
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.nodes.get_mut(id)
    }

    /// The current root, if set.
    pub fn root(&self) -> Option<ComponentId> {
        self.root
    }

    /// Number of components in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the tree contains a component with the given id.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small test tree:
    /// ```text
    ///       root
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   d
    /// ```
    fn build_tree() -> (ComponentTree, ComponentId, ComponentId, ComponentId, ComponentId, ComponentId) {
        let mut tree = ComponentTree::new();
        let root = tree.insert(Component::new("wrapper"), None);
        let a = tree.insert_child(root, None, Component::new("box"), None).unwrap();
        let b = tree.insert_child(root, None, Component::new("box"), None).unwrap();
        let c = tree.insert_child(a, None, Component::new("text"), None).unwrap();
        let d = tree.insert_child(a, None, Component::new("text"), None).unwrap();
        (tree, root, a, b, c, d)
    }

    // ── Insert ───────────────────────────────────────────────────────

    #[test]
    fn first_insert_becomes_root() {
        let (tree, root, ..) = build_tree();
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.len(), 5);
        assert!(!tree.is_empty());
    }

    #[test]
    fn insert_at_index() {
        let (mut tree, root, a, b, ..) = build_tree();
        let first = tree.insert_child(root, Some(0), Component::new("x"), None).unwrap();
        let last = tree.insert_child(root, Some(99), Component::new("y"), None).unwrap();
        assert_eq!(tree.children(root), &[first, a, b, last]);
        assert_eq!(tree.index_of(b), Some(2));
        assert_eq!(tree.index_of(root), None);
    }

    #[test]
    fn insert_under_missing_parent() {
        let (mut tree, _, a, ..) = build_tree();
        tree.remove(a);
        assert!(tree.insert_child(a, None, Component::new("x"), None).is_none());
    }

    // ── Uids ─────────────────────────────────────────────────────────

    #[test]
    fn uids_are_unique_and_indexed() {
        let mut tree = ComponentTree::new();
        let root = tree.insert(Component::new("wrapper"), None);
        let a = tree.insert_child(root, None, Component::new("x"), Some("hero".into())).unwrap();
        let b = tree.insert_child(root, None, Component::new("x"), Some("hero".into())).unwrap();
        assert_eq!(tree.get(a).unwrap().uid(), "hero");
        assert_ne!(tree.get(b).unwrap().uid(), "hero");
        assert_eq!(tree.by_uid("hero"), Some(a));

        tree.remove(a);
        assert_eq!(tree.by_uid("hero"), None);
    }

    // ── Remove ───────────────────────────────────────────────────────

    #[test]
    fn remove_returns_subtree() {
        let (mut tree, root, a, b, c, d) = build_tree();
        let removed: Vec<ComponentId> = tree.remove(a).into_iter().map(|(id, _)| id).collect();
        assert_eq!(removed, vec![a, c, d]);
        assert_eq!(tree.children(root), &[b]);
        assert!(!tree.contains(c));
        assert!(tree.remove(a).is_empty());
    }

    // ── Walks ────────────────────────────────────────────────────────

    #[test]
    fn descendants_pre_order() {
        let (tree, root, a, b, c, d) = build_tree();
        assert_eq!(tree.descendants(root), vec![root, a, c, d, b]);
        assert_eq!(tree.ancestors(d), vec![a, root]);
    }

    #[test]
    fn descendants_where_stops_descent() {
        let (tree, root, a, b, ..) = build_tree();
        let ids = tree.descendants_where(root, |c| c.component_type() != "box");
        assert_eq!(ids, vec![root, a, b]);
    }

    #[test]
    fn set_children_reorders() {
        let (mut tree, root, a, b, c, _) = build_tree();
        tree.set_children(root, vec![b, a, c]);
        assert_eq!(tree.children(root), &[b, a]);
        assert_eq!(tree.parent(c), Some(a));
    }
}
