//! BalancedTreeMap: an AVL tree keyed by `K: Ord`.
//!
//! Nodes live in a `SlotMap` arena and link to their children by `NodeId`;
//! a child is owned by exactly one parent and there are no parent links.
//! Rotations only rewrite ids. Every node caches its height (leaf 0, empty
//! subtree -1) and its balance factor `height(left) - height(right)`; both
//! are refreshed bottom-up on the path of every structural change, so the
//! cached factor always equals the real height difference.
//!
//! The recursive insert and delete return `(new subtree root, outcome)`;
//! no per-instance state carries results out of the recursion.

use crate::map::{fmt_entries, AssocMap, Written};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::mem;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct NodeId;
}

#[derive(Clone, Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    left: Option<NodeId>,
    right: Option<NodeId>,
    height: i32,
    balance: i32,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            left: None,
            right: None,
            height: 0,
            balance: 0,
        }
    }
}

#[derive(Clone)]
struct Tree<K, V> {
    nodes: SlotMap<NodeId, Node<K, V>>,
    root: Option<NodeId>,
}

impl<K, V> Tree<K, V> {
    fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
        }
    }

    fn height(&self, link: Option<NodeId>) -> i32 {
        link.map_or(-1, |id| self.nodes[id].height)
    }

    /// Recomputes the cached height and balance factor of `id` from its
    /// children.
    fn refresh(&mut self, id: NodeId) {
        let (left, right) = (self.nodes[id].left, self.nodes[id].right);
        let (hl, hr) = (self.height(left), self.height(right));
        let node = &mut self.nodes[id];
        node.height = hl.max(hr) + 1;
        node.balance = hl - hr;
    }

    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let Some(pivot) = self.nodes[id].right else {
            return id;
        };
        self.nodes[id].right = self.nodes[pivot].left;
        self.nodes[pivot].left = Some(id);
        self.refresh(id);
        self.refresh(pivot);
        log::trace!("avl rotate left: {:?} -> {:?}", id, pivot);
        pivot
    }

    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let Some(pivot) = self.nodes[id].left else {
            return id;
        };
        self.nodes[id].left = self.nodes[pivot].right;
        self.nodes[pivot].right = Some(id);
        self.refresh(id);
        self.refresh(pivot);
        log::trace!("avl rotate right: {:?} -> {:?}", id, pivot);
        pivot
    }

    /// Refreshes `id` and restores the AVL property of its subtree with at
    /// most two rotations. Returns the subtree's new root.
    fn rebalance(&mut self, id: NodeId) -> NodeId {
        self.refresh(id);
        let node = &self.nodes[id];
        let (balance, left, right) = (node.balance, node.left, node.right);
        if balance > 1 {
            if let Some(l) = left {
                if self.nodes[l].balance <= -1 {
                    // left-right
                    let l = self.rotate_left(l);
                    self.nodes[id].left = Some(l);
                }
            }
            return self.rotate_right(id);
        }
        if balance < -1 {
            if let Some(r) = right {
                if self.nodes[r].balance >= 1 {
                    // right-left
                    let r = self.rotate_right(r);
                    self.nodes[id].right = Some(r);
                }
            }
            return self.rotate_left(id);
        }
        id
    }

    fn find<Q>(&self, q: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut link = self.root;
        while let Some(id) = link {
            let node = &self.nodes[id];
            link = match q.cmp(node.key.borrow()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    /// Nearest key above (`above`) or below `q`, or `q` itself when
    /// `inclusive`. One root-to-leaf descent, tracking the best candidate.
    fn seek<Q>(&self, q: &Q, above: bool, inclusive: bool) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut best = None;
        let mut link = self.root;
        while let Some(id) = link {
            let node = &self.nodes[id];
            let ord = q.cmp(node.key.borrow()).reverse();
            if ord == Ordering::Equal && inclusive {
                return Some(id);
            }
            link = if above {
                if ord == Ordering::Greater {
                    best = Some(id);
                    node.left
                } else {
                    node.right
                }
            } else if ord == Ordering::Less {
                best = Some(id);
                node.right
            } else {
                node.left
            };
        }
        best
    }

    fn extreme(&self, leftmost: bool) -> Option<NodeId> {
        let mut id = self.root?;
        loop {
            let node = &self.nodes[id];
            match if leftmost { node.left } else { node.right } {
                Some(next) => id = next,
                None => return Some(id),
            }
        }
    }

    fn insert_at<F>(
        &mut self,
        link: Option<NodeId>,
        key: K,
        value: V,
        insert_missing: bool,
        overwrite: F,
    ) -> (Option<NodeId>, Written<K, V, NodeId>)
    where
        K: Ord,
        F: FnOnce(&V) -> bool,
    {
        let Some(id) = link else {
            if !insert_missing {
                return (None, Written::Missing(key, value));
            }
            let id = self.nodes.insert(Node::leaf(key, value));
            return (Some(id), Written::Inserted);
        };

        let written = match key.cmp(&self.nodes[id].key) {
            Ordering::Equal => {
                let node = &mut self.nodes[id];
                let written = if overwrite(&node.value) {
                    Written::Replaced(mem::replace(&mut node.value, value), key)
                } else {
                    Written::Kept(id, key, value)
                };
                return (Some(id), written);
            }
            Ordering::Less => {
                let left = self.nodes[id].left;
                let (left, written) = self.insert_at(left, key, value, insert_missing, overwrite);
                self.nodes[id].left = left;
                written
            }
            Ordering::Greater => {
                let right = self.nodes[id].right;
                let (right, written) = self.insert_at(right, key, value, insert_missing, overwrite);
                self.nodes[id].right = right;
                written
            }
        };

        match written {
            Written::Inserted => (Some(self.rebalance(id)), written),
            _ => (Some(id), written),
        }
    }

    /// Shared body of `put`, `put_if_absent`, `replace` and `replace_if`.
    fn write<F>(&mut self, key: K, value: V, insert_missing: bool, overwrite: F) -> Written<K, V, NodeId>
    where
        K: Ord,
        F: FnOnce(&V) -> bool,
    {
        let (root, written) = self.insert_at(self.root, key, value, insert_missing, overwrite);
        self.root = root;
        written
    }

    fn delete_at<Q, P>(
        &mut self,
        link: Option<NodeId>,
        q: &Q,
        accept: P,
    ) -> (Option<NodeId>, Option<(K, V)>)
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        P: FnOnce(&V) -> bool,
    {
        let Some(id) = link else {
            return (None, None);
        };

        let removed = match q.cmp(self.nodes[id].key.borrow()) {
            Ordering::Less => {
                let left = self.nodes[id].left;
                let (left, removed) = self.delete_at(left, q, accept);
                self.nodes[id].left = left;
                removed
            }
            Ordering::Greater => {
                let right = self.nodes[id].right;
                let (right, removed) = self.delete_at(right, q, accept);
                self.nodes[id].right = right;
                removed
            }
            Ordering::Equal => {
                if !accept(&self.nodes[id].value) {
                    return (Some(id), None);
                }
                return self.unlink(id);
            }
        };

        match removed {
            Some(_) => (Some(self.rebalance(id)), removed),
            None => (Some(id), None),
        }
    }

    /// Removes node `id` from the subtree it roots.
    ///
    /// With two children the in-order successor is detached from the right
    /// subtree and its entry takes over this node's position.
    fn unlink(&mut self, id: NodeId) -> (Option<NodeId>, Option<(K, V)>) {
        let (left, right) = (self.nodes[id].left, self.nodes[id].right);
        let Some((_, r)) = left.zip(right) else {
            let removed = self.nodes.remove(id).map(|n| (n.key, n.value));
            return (left.or(right), removed);
        };

        let (right, successor) = self.detach_min(r);
        self.nodes[id].right = right;
        let removed = self.nodes.remove(successor).map(|succ| {
            let node = &mut self.nodes[id];
            (
                mem::replace(&mut node.key, succ.key),
                mem::replace(&mut node.value, succ.value),
            )
        });
        (Some(self.rebalance(id)), removed)
    }

    /// Cuts the leftmost node out of the subtree at `id`. Returns the
    /// rebalanced subtree and the detached node, which stays in the arena.
    fn detach_min(&mut self, id: NodeId) -> (Option<NodeId>, NodeId) {
        match self.nodes[id].left {
            None => {
                let right = self.nodes[id].right.take();
                (right, id)
            }
            Some(l) => {
                let (left, min) = self.detach_min(l);
                self.nodes[id].left = left;
                (Some(self.rebalance(id)), min)
            }
        }
    }

    fn remove_where<Q, P>(&mut self, q: &Q, accept: P) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        P: FnOnce(&V) -> bool,
    {
        let (root, removed) = self.delete_at(self.root, q, accept);
        self.root = root;
        removed
    }
}

/// Ordered map backed by an AVL tree.
///
/// Lookups, inserts, removals and the navigation queries (`ceiling_key`,
/// `floor_key`, `higher_key`, `lower_key`) are `O(log n)`. Enumeration is in
/// ascending key order.
#[derive(Clone)]
pub struct BalancedTreeMap<K, V> {
    tree: Tree<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> Default for BalancedTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> BalancedTreeMap<K, V> {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.nodes.is_empty()
    }

    /// Edges on the longest root-to-leaf path; `None` when empty.
    pub fn height(&self) -> Option<usize> {
        self.tree.root.map(|id| self.tree.nodes[id].height as usize)
    }

    pub fn clear(&mut self) {
        let dropped = self.tree.nodes.len();
        self.tree = Tree::new();
        log::debug!("cleared tree map: {} entries dropped", dropped);
    }

    pub fn first_key(&self) -> Option<&K> {
        self.tree.extreme(true).map(|id| &self.tree.nodes[id].key)
    }

    pub fn last_key(&self) -> Option<&K> {
        self.tree.extreme(false).map(|id| &self.tree.nodes[id].key)
    }

    /// In-order iterator.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut it = Iter {
            nodes: &self.tree.nodes,
            stack: Vec::new(),
            remaining: self.len(),
        };
        it.push_left(self.tree.root);
        it
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Keys in ascending order.
    pub fn key_list(&self) -> Vec<&K> {
        self.keys().collect()
    }

    pub fn values_iter(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Values in ascending key order.
    pub fn values(&self) -> Vec<&V> {
        self.values_iter().collect()
    }

    /// Panics unless the tree is a strictly ordered AVL tree whose cached
    /// heights and balance factors are exact and whose node count is `len`.
    pub fn check_consistency(&self)
    where
        K: Ord,
    {
        let mut count = 0;
        self.check_node(self.tree.root, None, None, &mut count);
        assert_eq!(count, self.len(), "unreachable nodes in arena");
    }

    fn check_node(&self, link: Option<NodeId>, lo: Option<&K>, hi: Option<&K>, count: &mut usize) -> i32
    where
        K: Ord,
    {
        let Some(id) = link else {
            return -1;
        };
        let node = &self.tree.nodes[id];
        *count += 1;
        if let Some(lo) = lo {
            assert!(*lo < node.key, "keys out of order");
        }
        if let Some(hi) = hi {
            assert!(node.key < *hi, "keys out of order");
        }
        let hl = self.check_node(node.left, lo, Some(&node.key), count);
        let hr = self.check_node(node.right, Some(&node.key), hi, count);
        assert_eq!(node.height, hl.max(hr) + 1, "stale height");
        assert_eq!(node.balance, hl - hr, "stale balance factor");
        assert!((-1..=1).contains(&node.balance), "unbalanced node");
        node.height
    }
}

impl<K, V> BalancedTreeMap<K, V>
where
    K: Ord,
{
    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.tree.find(q).map(|id| &self.tree.nodes[id].value)
    }

    pub fn get_or_default<'a, Q>(&'a self, q: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get(q).unwrap_or(default)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        let id = self.tree.find(q)?;
        self.tree.nodes.get_mut(id).map(|n| &mut n.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.tree.find(q).is_some()
    }

    /// Full traversal; values are not indexed.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let _g = self.reentrancy.enter();
        self.iter().any(|(_, v)| v == value)
    }

    /// Runs a write inside the guarded section; arguments the tree did not
    /// keep come back out and are dropped by the caller.
    fn guarded_write<F>(&mut self, key: K, value: V, insert_missing: bool, overwrite: F) -> Written<K, V, NodeId>
    where
        F: FnOnce(&V) -> bool,
    {
        let _g = self.reentrancy.enter();
        self.tree.write(key, value, insert_missing, overwrite)
    }

    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.guarded_write(key, value, true, |_| true) {
            Written::Replaced(old, _) => Some(old),
            _ => None,
        }
    }

    /// Inserts only if absent. Returns the value already present, if any.
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        match self.guarded_write(key, value, true, |_| false) {
            Written::Kept(id, ..) => self.tree.nodes.get(id).map(|n| &n.value),
            _ => None,
        }
    }

    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        match self.guarded_write(key, value, false, |_| true) {
            Written::Replaced(old, _) => Some(old),
            _ => None,
        }
    }

    /// Overwrites only while `key` maps to `old`.
    pub fn replace_if(&mut self, key: K, old: &V, new: V) -> bool
    where
        V: PartialEq,
    {
        matches!(
            self.guarded_write(key, new, false, |current| current == old),
            Written::Replaced(..)
        )
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.tree.remove_where(q, |_| true)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Removes `q` only while it maps to `value`.
    pub fn remove_if<Q>(&mut self, q: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        V: PartialEq,
    {
        let removed = {
            let _g = self.reentrancy.enter();
            self.tree.remove_where(q, |current| current == value)
        };
        removed.is_some()
    }

    /// Least key `>= q`.
    pub fn ceiling_key<Q>(&self, q: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.tree.seek(q, true, true).map(|id| &self.tree.nodes[id].key)
    }

    /// Greatest key `<= q`.
    pub fn floor_key<Q>(&self, q: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.tree.seek(q, false, true).map(|id| &self.tree.nodes[id].key)
    }

    /// Least key `> q`.
    pub fn higher_key<Q>(&self, q: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.tree.seek(q, true, false).map(|id| &self.tree.nodes[id].key)
    }

    /// Greatest key `< q`.
    pub fn lower_key<Q>(&self, q: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let _g = self.reentrancy.enter();
        self.tree.seek(q, false, false).map(|id| &self.tree.nodes[id].key)
    }
}

/// In-order iterator over a `BalancedTreeMap`.
pub struct Iter<'a, K, V> {
    nodes: &'a SlotMap<NodeId, Node<K, V>>,
    stack: Vec<NodeId>,
    remaining: usize,
}

impl<K, V> Iter<'_, K, V> {
    fn push_left(&mut self, mut link: Option<NodeId>) {
        while let Some(id) = link {
            self.stack.push(id);
            link = self.nodes[id].left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let nodes = self.nodes;
        let node = &nodes[id];
        self.push_left(node.right);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Keys in ascending order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Values in ascending key order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a BalancedTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> fmt::Display for BalancedTreeMap<K, V>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_entries(f, self.iter())
    }
}

impl<K, V> fmt::Debug for BalancedTreeMap<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Equal when the in-order key and value sequences match.
impl<K, V> PartialEq for BalancedTreeMap<K, V>
where
    K: PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for BalancedTreeMap<K, V> {}

impl<K: Ord, V> Extend<(K, V)> for BalancedTreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for BalancedTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

impl<K: Ord, V> AssocMap<K, V> for BalancedTreeMap<K, V> {
    fn put(&mut self, key: K, value: V) -> Option<V> {
        Self::put(self, key, value)
    }

    fn put_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        Self::put_if_absent(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&V> {
        Self::get(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        Self::contains_key(self, key)
    }

    fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        Self::contains_value(self, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        Self::remove(self, key)
    }

    fn remove_if(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        Self::remove_if(self, key, value)
    }

    fn replace(&mut self, key: K, value: V) -> Option<V> {
        Self::replace(self, key, value)
    }

    fn replace_if(&mut self, key: K, old: &V, new: V) -> bool
    where
        V: PartialEq,
    {
        Self::replace_if(self, key, old, new)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn clear(&mut self) {
        Self::clear(self)
    }

    fn key_list(&self) -> Vec<&K> {
        Self::key_list(self)
    }

    fn values(&self) -> Vec<&V> {
        Self::values(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permutations(items: &[i32]) -> Vec<Vec<i32>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    /// Invariant: navigation answers are independent of insertion order.
    #[test]
    fn navigation_over_odd_keys_in_every_order() {
        for order in permutations(&[1, 3, 5, 7]) {
            let m: BalancedTreeMap<i32, ()> = order.iter().map(|&k| (k, ())).collect();
            m.check_consistency();
            assert_eq!(m.floor_key(&4), Some(&3), "order {order:?}");
            assert_eq!(m.ceiling_key(&4), Some(&5));
            assert_eq!(m.higher_key(&5), Some(&7));
            assert_eq!(m.lower_key(&5), Some(&3));
            assert_eq!(m.first_key(), Some(&1));
            assert_eq!(m.last_key(), Some(&7));
        }
    }

    #[test]
    fn navigation_edges() {
        let m: BalancedTreeMap<i32, ()> = [1, 3, 5, 7].into_iter().map(|k| (k, ())).collect();
        assert_eq!(m.ceiling_key(&5), Some(&5));
        assert_eq!(m.floor_key(&5), Some(&5));
        assert_eq!(m.ceiling_key(&8), None);
        assert_eq!(m.floor_key(&0), None);
        assert_eq!(m.higher_key(&7), None);
        assert_eq!(m.lower_key(&1), None);
        assert_eq!(m.higher_key(&0), Some(&1));
        assert_eq!(m.lower_key(&100), Some(&7));

        let empty: BalancedTreeMap<i32, ()> = BalancedTreeMap::new();
        assert_eq!(empty.first_key(), None);
        assert_eq!(empty.last_key(), None);
        assert_eq!(empty.ceiling_key(&1), None);
        assert_eq!(empty.height(), None);
    }

    /// Invariant: ascending inserts stay logarithmic in height.
    #[test]
    fn sequential_inserts_stay_balanced() {
        let mut m = BalancedTreeMap::new();
        for k in 0..1024 {
            m.put(k, k * 2);
            if k % 97 == 0 {
                m.check_consistency();
            }
        }
        m.check_consistency();
        assert_eq!(m.len(), 1024);
        // A perfect tree of 1024 nodes has height 10; AVL allows ~1.44x.
        assert!(m.height().unwrap() <= 14, "height {:?}", m.height());
        assert_eq!(m.key_list(), (0..1024).collect::<Vec<_>>().iter().collect::<Vec<_>>());
    }

    /// Invariant: removing a two-child node promotes its in-order successor
    /// and keeps the rest of the tree intact.
    #[test]
    fn remove_two_child_node_uses_successor() {
        let mut m: BalancedTreeMap<i32, String> = BalancedTreeMap::new();
        for k in [50, 30, 70, 20, 40, 60, 80, 65] {
            m.put(k, format!("v{k}"));
        }
        m.check_consistency();
        assert_eq!(m.remove(&50), Some("v50".to_string()));
        m.check_consistency();
        assert_eq!(m.get(&50), None);
        assert_eq!(m.len(), 7);
        assert_eq!(m.get(&60), Some(&"v60".to_string()));
        assert_eq!(m.get(&65), Some(&"v65".to_string()));
        assert_eq!(m.key_list(), vec![&20, &30, &40, &60, &65, &70, &80]);
    }

    /// Invariant: AVL shape and exact cached factors survive interleaved
    /// inserts and deletes.
    #[test]
    fn interleaved_insert_delete_keeps_avl_shape() {
        let mut m = BalancedTreeMap::new();
        // Deterministic scramble of 0..500.
        let keys: Vec<u32> = (0..500u32).map(|i| (i * 263) % 500).collect();
        for &k in &keys {
            m.put(k, k);
        }
        m.check_consistency();
        for &k in keys.iter().step_by(3) {
            assert_eq!(m.remove(&k), Some(k));
            m.check_consistency();
        }
        for &k in &keys {
            let expect = if keys.iter().step_by(3).any(|&d| d == k) { None } else { Some(&k) };
            assert_eq!(m.get(&k), expect);
        }
        assert_eq!(m.len(), 500 - keys.iter().step_by(3).count());
    }

    #[test]
    fn conditional_writes() {
        let mut m: BalancedTreeMap<&str, i32> = BalancedTreeMap::new();
        assert_eq!(m.put_if_absent("k", 1), None);
        assert_eq!(m.put_if_absent("k", 2), Some(&1));
        assert_eq!(m.replace("missing", 5), None);
        assert!(!m.contains_key("missing"));
        assert_eq!(m.replace("k", 3), Some(1));

        assert!(!m.replace_if("k", &99, 4), "current value is 3");
        assert_eq!(m.get("k"), Some(&3));
        assert!(m.replace_if("k", &3, 4));
        assert_eq!(m.get_or_default("k", &0), &4);
        assert_eq!(m.get_or_default("nope", &0), &0);

        assert!(!m.remove_if("k", &3));
        assert_eq!(m.len(), 1);
        assert!(m.remove_if("k", &4));
        assert!(m.is_empty());
        m.check_consistency();
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut m: BalancedTreeMap<String, Vec<i32>> = BalancedTreeMap::new();
        m.put("a".to_string(), vec![1]);
        m.get_mut("a").unwrap().push(2);
        assert_eq!(m.get("a"), Some(&vec![1, 2]));
        assert!(m.get_mut("b").is_none());
        assert!(m.contains_value(&vec![1, 2]));
        assert!(!m.contains_value(&vec![1]));
    }

    #[test]
    fn display_debug_and_equality() {
        let a: BalancedTreeMap<i32, &str> = [(3, "c"), (1, "a"), (2, "b")].into_iter().collect();
        let b: BalancedTreeMap<i32, &str> = [(1, "a"), (2, "b"), (3, "c")].into_iter().collect();
        assert_eq!(a.to_string(), "{1=a, 2=b, 3=c}");
        assert_eq!(format!("{a:?}"), r#"{1: "a", 2: "b", 3: "c"}"#);
        assert_eq!(a, b);
        let mut c = b.clone();
        c.put(2, "z");
        assert_ne!(a, c);
        assert_eq!(BalancedTreeMap::<i32, i32>::new().to_string(), "{}");
    }

    #[test]
    fn clear_empties_tree() {
        let mut m: BalancedTreeMap<i32, i32> = (0..10).map(|k| (k, k)).collect();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.first_key(), None);
        m.put(1, 1);
        assert_eq!(m.len(), 1);
        m.check_consistency();
    }

    /// Invariant (debug-only): re-entering the map from within `K: Ord`
    /// during a descent panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_ord_during_get() {
        struct ReentryKey {
            id: u32,
            map: *const BalancedTreeMap<ReentryKey, i32>,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }
        impl Eq for ReentryKey {}
        impl PartialOrd for ReentryKey {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for ReentryKey {
            fn cmp(&self, other: &Self) -> Ordering {
                if !self.map.is_null() {
                    // Attempt to re-enter the same map during descent.
                    unsafe {
                        let m = &*self.map;
                        let _ = m.len();
                        let _ = m.contains_key(other);
                    }
                }
                self.id.cmp(&other.id)
            }
        }

        let mut m: BalancedTreeMap<ReentryKey, i32> = BalancedTreeMap::new();
        m.put(
            ReentryKey {
                id: 1,
                map: core::ptr::null(),
            },
            1,
        );
        let query = ReentryKey {
            id: 2,
            map: &m as *const _,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.get(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    #[test]
    fn values_iter_follows_key_order() {
        let mut m = BalancedTreeMap::new();
        for (k, v) in [(30, "c"), (10, "a"), (50, "e"), (20, "b")] {
            m.put(k, v);
        }
        m.remove(&50);
        let it = m.values_iter();
        assert_eq!(it.len(), 3);
        let from_iter: Vec<&&str> = it.collect();
        assert_eq!(from_iter, vec![&"a", &"b", &"c"]);
        assert_eq!(from_iter, m.values());
        assert_eq!(BalancedTreeMap::<i32, i32>::new().values_iter().next(), None);
    }

    /// Values the tree discards are dropped after the guarded section ends,
    /// so their destructors may read the map.
    #[test]
    fn discarded_values_drop_outside_the_guard() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Reentrant {
            id: i32,
            map: *const BalancedTreeMap<i32, Reentrant>,
            armed: Rc<Cell<bool>>,
            hits: Rc<Cell<usize>>,
        }
        impl PartialEq for Reentrant {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }
        impl Drop for Reentrant {
            fn drop(&mut self) {
                if self.armed.get() {
                    unsafe {
                        let _ = (*self.map).get(&1);
                    }
                    self.hits.set(self.hits.get() + 1);
                }
            }
        }

        let armed = Rc::new(Cell::new(true));
        let hits = Rc::new(Cell::new(0));
        let mut m: BalancedTreeMap<i32, Reentrant> = BalancedTreeMap::new();
        let map: *const _ = &m;
        let v = |id| Reentrant {
            id,
            map,
            armed: armed.clone(),
            hits: hits.clone(),
        };

        assert!(m.put(1, v(10)).is_none());
        assert!(m.put(2, v(20)).is_none());
        assert!(m.put(1, v(11)).is_some());
        assert_eq!(hits.get(), 1);
        assert!(m.put_if_absent(1, v(12)).is_some());
        assert_eq!(hits.get(), 2);
        assert!(m.replace(3, v(30)).is_none());
        assert_eq!(hits.get(), 3);
        assert!(!m.replace_if(1, &v(99), v(13)));
        assert_eq!(hits.get(), 5);
        assert!(m.remove_if(&2, &v(20)));
        assert_eq!(hits.get(), 7);
        assert_eq!(m.len(), 1);
        armed.set(false);
    }
}
