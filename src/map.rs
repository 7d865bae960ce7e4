//! The associative map contract shared by both backends.

use core::fmt;

/// Insert, lookup, conditional replace, removal and enumeration over a map
/// from `K` to `V`.
///
/// `ProbingHashMap` needs `K: Hash + Eq`; `BalancedTreeMap` needs `K: Ord`.
/// Callers that only need the contract, such as the set wrappers, can be
/// written against this trait and pick a backend by the capability their
/// keys offer.
pub trait AssocMap<K, V> {
    /// Inserts or overwrites. Returns the value previously mapped to `key`.
    fn put(&mut self, key: K, value: V) -> Option<V>;

    /// Inserts only if `key` is absent. Returns the value already present,
    /// leaving it untouched, or `None` after inserting.
    fn put_if_absent(&mut self, key: K, value: V) -> Option<&V>;

    fn get(&self, key: &K) -> Option<&V>;

    fn get_or_default<'a>(&'a self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Linear in the number of entries; values are not indexed.
    fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq;

    /// Removes `key`, returning its value.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Removes `key` only while it maps to `value`.
    fn remove_if(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq;

    /// Overwrites only if `key` is present. Returns the replaced value.
    fn replace(&mut self, key: K, value: V) -> Option<V>;

    /// Overwrites only if `key` currently maps to `old`.
    fn replace_if(&mut self, key: K, old: &V, new: V) -> bool
    where
        V: PartialEq;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Snapshot of the keys in the backend's enumeration order.
    fn key_list(&self) -> Vec<&K>;

    /// Snapshot of the values, parallel to `key_list`.
    fn values(&self) -> Vec<&V>;
}

/// Writes `{k1=v1, k2=v2}` for any sequence of entries.
pub(crate) fn fmt_entries<'a, K, V, I>(f: &mut fmt::Formatter<'_>, entries: I) -> fmt::Result
where
    K: fmt::Display + 'a,
    V: fmt::Display + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    f.write_str("{")?;
    for (i, (k, v)) in entries.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k}={v}")?;
    }
    f.write_str("}")
}

/// Writes `[a, b, c]` for any sequence of elements.
pub(crate) fn fmt_elements<'a, T, I>(f: &mut fmt::Formatter<'_>, elements: I) -> fmt::Result
where
    T: fmt::Display + 'a,
    I: IntoIterator<Item = &'a T>,
{
    f.write_str("[")?;
    for (i, t) in elements.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{t}")?;
    }
    f.write_str("]")
}

/// What a guarded write did to the map.
///
/// `L` locates the untouched entry for `Kept`: a slot index in the hash
/// table, a node id in the tree. Arguments the map did not store ride back
/// to the public method, which drops them after leaving its guarded section.
// Leftover fields are only ever dropped.
#[allow(dead_code)]
#[derive(Debug)]
pub(crate) enum Written<K, V, L> {
    /// The key was absent and a new entry now holds the value.
    Inserted,
    /// The key was present; its old value and the unused new key.
    Replaced(V, K),
    /// The key was present and the overwrite condition refused.
    Kept(L, K, V),
    /// The key was absent and insertion was not allowed.
    Missing(K, V),
}
