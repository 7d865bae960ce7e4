//! Sets as maps with ignored values.
//!
//! `KeySet<T, M>` only talks to its backend through `AssocMap<T, ()>`; the
//! unit value is the sentinel. Backend-specific constructors, iterators and
//! the ordered navigation queries live on the two concrete aliases.

use crate::balanced_tree_map::{self, BalancedTreeMap};
use crate::error::Result;
use crate::map::{fmt_elements, AssocMap};
use crate::probing_hash_map::{self, ProbingHashMap};
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use std::collections::hash_map::RandomState;

pub struct KeySet<T, M> {
    map: M,
    _elem: PhantomData<fn() -> T>,
}

/// Unordered set over `ProbingHashMap`.
pub type ProbingHashSet<T, S = RandomState> = KeySet<T, ProbingHashMap<T, (), S>>;

/// Ordered set over `BalancedTreeMap`.
pub type BalancedTreeSet<T> = KeySet<T, BalancedTreeMap<T, ()>>;

impl<T, M> KeySet<T, M> {
    fn from_map(map: M) -> Self {
        Self {
            map,
            _elem: PhantomData,
        }
    }

    /// The backing map.
    pub fn as_map(&self) -> &M {
        &self.map
    }
}

impl<T, M> KeySet<T, M>
where
    M: AssocMap<T, ()>,
{
    /// Adds `element`; returns `false` if it was already present.
    pub fn insert(&mut self, element: T) -> bool {
        self.map.put_if_absent(element, ()).is_none()
    }

    pub fn contains(&self, element: &T) -> bool {
        self.map.contains_key(element)
    }

    /// Returns `true` if `element` was present.
    pub fn remove(&mut self, element: &T) -> bool {
        self.map.remove(element).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear()
    }

    /// Snapshot of the elements in the backend's enumeration order.
    pub fn to_vec(&self) -> Vec<&T> {
        self.map.key_list()
    }
}

impl<T> KeySet<T, ProbingHashMap<T, ()>> {
    pub fn new() -> Self {
        Self::from_map(ProbingHashMap::new())
    }

    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        ProbingHashMap::with_capacity(initial_capacity).map(Self::from_map)
    }

    pub fn with_capacity_and_load_factor(initial_capacity: usize, load_factor: f32) -> Result<Self> {
        ProbingHashMap::with_capacity_and_load_factor(initial_capacity, load_factor).map(Self::from_map)
    }
}

impl<T, S> KeySet<T, ProbingHashMap<T, (), S>> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_map(ProbingHashMap::with_hasher(hasher))
    }

    pub fn iter(&self) -> probing_hash_map::Keys<'_, T, ()> {
        self.map.keys()
    }
}

impl<T> KeySet<T, BalancedTreeMap<T, ()>> {
    pub fn new() -> Self {
        Self::from_map(BalancedTreeMap::new())
    }

    /// Ascending iterator.
    pub fn iter(&self) -> balanced_tree_map::Keys<'_, T, ()> {
        self.map.keys()
    }

    pub fn first(&self) -> Option<&T> {
        self.map.first_key()
    }

    pub fn last(&self) -> Option<&T> {
        self.map.last_key()
    }
}

impl<T: Ord> KeySet<T, BalancedTreeMap<T, ()>> {
    /// Least element `>= element`.
    pub fn ceiling(&self, element: &T) -> Option<&T> {
        self.map.ceiling_key(element)
    }

    /// Greatest element `<= element`.
    pub fn floor(&self, element: &T) -> Option<&T> {
        self.map.floor_key(element)
    }

    /// Least element `> element`.
    pub fn higher(&self, element: &T) -> Option<&T> {
        self.map.higher_key(element)
    }

    /// Greatest element `< element`.
    pub fn lower(&self, element: &T) -> Option<&T> {
        self.map.lower_key(element)
    }
}

impl<T, M: Default> Default for KeySet<T, M> {
    fn default() -> Self {
        Self::from_map(M::default())
    }
}

impl<T, M: Clone> Clone for KeySet<T, M> {
    fn clone(&self) -> Self {
        Self::from_map(self.map.clone())
    }
}

impl<T, M> fmt::Display for KeySet<T, M>
where
    T: fmt::Display,
    M: AssocMap<T, ()>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_elements(f, self.map.key_list())
    }
}

impl<T, M> fmt::Debug for KeySet<T, M>
where
    T: fmt::Debug,
    M: AssocMap<T, ()>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.key_list()).finish()
    }
}

/// Sets are equal when they hold the same elements.
impl<T, M> PartialEq for KeySet<T, M>
where
    M: AssocMap<T, ()>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.map.key_list().into_iter().all(|t| other.contains(t))
    }
}

impl<T, M> Eq for KeySet<T, M> where M: AssocMap<T, ()> {}

impl<T, M> Extend<T> for KeySet<T, M>
where
    M: AssocMap<T, ()>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for t in iter {
            self.insert(t);
        }
    }
}

impl<T, M> FromIterator<T> for KeySet<T, M>
where
    M: AssocMap<T, ()> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<'a, T, S> IntoIterator for &'a KeySet<T, ProbingHashMap<T, (), S>>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    type Item = &'a T;
    type IntoIter = probing_hash_map::Keys<'a, T, ()>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Ord> IntoIterator for &'a KeySet<T, BalancedTreeMap<T, ()>> {
    type Item = &'a T;
    type IntoIter = balanced_tree_map::Keys<'a, T, ()>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;

    #[test]
    fn hash_set_insert_reports_novelty() {
        let mut s: ProbingHashSet<String> = ProbingHashSet::new();
        assert!(s.insert("a".to_string()));
        assert!(!s.insert("a".to_string()));
        assert!(s.insert("b".to_string()));
        assert_eq!(s.len(), 2);
        assert!(s.contains(&"a".to_string()));
        assert!(s.remove(&"a".to_string()));
        assert!(!s.remove(&"a".to_string()));
        assert_eq!(s.to_vec(), vec![&"b".to_string()]);
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn hash_set_construction_errors_surface() {
        assert!(matches!(
            ProbingHashSet::<i32>::with_capacity_and_load_factor(8, -1.0),
            Err(MapError::InvalidArgument { .. })
        ));
        assert!(ProbingHashSet::<i32>::with_capacity(0).unwrap().is_empty());
    }

    #[test]
    fn tree_set_navigation_and_display() {
        let s: BalancedTreeSet<i32> = [7, 1, 5, 3].into_iter().collect();
        assert_eq!(s.to_string(), "[1, 3, 5, 7]");
        assert_eq!(format!("{s:?}"), "{1, 3, 5, 7}");
        assert_eq!(s.first(), Some(&1));
        assert_eq!(s.last(), Some(&7));
        assert_eq!(s.ceiling(&4), Some(&5));
        assert_eq!(s.floor(&4), Some(&3));
        assert_eq!(s.higher(&5), Some(&7));
        assert_eq!(s.lower(&5), Some(&3));
        assert_eq!(s.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 7]);
        s.as_map().check_consistency();
    }

    #[test]
    fn equality_is_by_membership() {
        let a: ProbingHashSet<i32> = (0..20).collect();
        let b: ProbingHashSet<i32> = (0..20).rev().collect();
        assert_eq!(a, b);
        let c: ProbingHashSet<i32> = (1..21).collect();
        assert_ne!(a, c);

        let x: BalancedTreeSet<i32> = [3, 1, 2].into_iter().collect();
        let y: BalancedTreeSet<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(x, y);
        assert_eq!(BalancedTreeSet::<i32>::new().to_string(), "[]");
    }
}
