//! ProbingHashMap: open addressing with quadratic probing and tombstones.
//!
//! Layout
//! - One slot array; each slot is `Empty`, `Tombstone` or `Occupied`.
//!   Occupied slots keep the key's `u64` hash so rebuilding the table never
//!   calls `K: Hash` again.
//! - Capacities are prime. The probe run for a hash is
//!   `(hash + i*i) mod capacity` for `i` in `0..=capacity/2`, which in a
//!   prime table visits `capacity/2 + 1` distinct slots.
//!
//! Deletion and probing
//! - `remove` leaves a `Tombstone`. Lookups walk through tombstones and stop
//!   at the first `Empty` slot or at the end of the run, so keys placed past
//!   a deleted collision stay reachable.
//! - Insertion scans the whole run for the key, then reuses the first
//!   tombstone it passed, else the `Empty` slot that ended the run.
//!
//! Growth
//! - Checked before every insert that may add a key: if `len` exceeds
//!   `load_factor * capacity` the table moves to the next prime at or above
//!   twice the capacity. If only `len + tombstones` exceeds it, the table is
//!   rebuilt at the same capacity, which drops the tombstones.
//! - A run with no free slot also forces growth; this is the only trigger
//!   when `load_factor >= 1`.

use crate::config::{HashMapConfig, DEFAULT_CAPACITY};
use crate::error::{MapError, Result};
use crate::map::{fmt_entries, AssocMap, Written};
use crate::reentrancy::DebugReentrancy;
use core::alloc::Layout;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use std::collections::hash_map::RandomState;

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

#[derive(Clone, Debug)]
enum Slot<K, V> {
    Empty,
    Tombstone,
    Occupied(Entry<K, V>),
}

/// Where a key lives, or where it would go.
enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

/// Slot visited at step `i` of the probe run for `hash`.
#[inline]
fn probe_index(hash: u64, i: usize, capacity: usize) -> usize {
    let step = (i as u128) * (i as u128);
    ((u128::from(hash) + step) % capacity as u128) as usize
}

#[inline]
fn probe_len(capacity: usize) -> usize {
    if capacity == 0 {
        0
    } else {
        capacity / 2 + 1
    }
}

fn is_prime(n: usize) -> bool {
    if n < 4 {
        return n >= 2;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime `>= n`, and at least 2.
fn next_prime(n: usize) -> usize {
    let mut c = n.max(2);
    while !is_prime(c) {
        c += 1;
    }
    c
}

/// Slot count for a requested capacity; zero stays zero until first insert.
fn table_capacity(requested: usize) -> usize {
    if requested == 0 {
        0
    } else {
        next_prime(requested)
    }
}

#[derive(Clone)]
struct Table<K, V> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    tombstones: usize,
    config: HashMapConfig,
}

impl<K, V> Table<K, V> {
    fn new(capacity: usize, config: HashMapConfig) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Empty);
        Self {
            slots,
            len: 0,
            tombstones: 0,
            config,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn value(&self, idx: usize) -> Option<&V> {
        match &self.slots[idx] {
            Slot::Occupied(e) => Some(&e.value),
            _ => None,
        }
    }

    fn value_mut(&mut self, idx: usize) -> Option<&mut V> {
        match &mut self.slots[idx] {
            Slot::Occupied(e) => Some(&mut e.value),
            _ => None,
        }
    }

    fn find<Q>(&self, hash: u64, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let cap = self.capacity();
        for i in 0..probe_len(cap) {
            let idx = probe_index(hash, i, cap);
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied(e) => {
                    if e.hash == hash && e.key.borrow() == q {
                        return Some(idx);
                    }
                }
            }
        }
        None
    }

    fn locate(&self, hash: u64, key: &K) -> Probe
    where
        K: Eq,
    {
        let cap = self.capacity();
        let mut reusable = None;
        for i in 0..probe_len(cap) {
            let idx = probe_index(hash, i, cap);
            match &self.slots[idx] {
                Slot::Empty => return Probe::Vacant(reusable.unwrap_or(idx)),
                Slot::Tombstone => {
                    if reusable.is_none() {
                        reusable = Some(idx);
                    }
                }
                Slot::Occupied(e) => {
                    if e.hash == hash && e.key == *key {
                        return Probe::Found(idx);
                    }
                }
            }
        }
        reusable.map_or(Probe::Full, Probe::Vacant)
    }

    fn place(&mut self, idx: usize, entry: Entry<K, V>) {
        if let Slot::Tombstone = self.slots[idx] {
            self.tombstones -= 1;
        }
        self.slots[idx] = Slot::Occupied(entry);
        self.len += 1;
    }

    fn take(&mut self, idx: usize) -> Option<Entry<K, V>> {
        match mem::replace(&mut self.slots[idx], Slot::Tombstone) {
            Slot::Occupied(e) => {
                self.len -= 1;
                self.tombstones += 1;
                Some(e)
            }
            other => {
                self.slots[idx] = other;
                None
            }
        }
    }

    /// Insert into a table known not to contain the key nor any tombstone.
    fn place_unique(&mut self, entry: Entry<K, V>) -> core::result::Result<(), Entry<K, V>> {
        let cap = self.capacity();
        for i in 0..probe_len(cap) {
            let idx = probe_index(entry.hash, i, cap);
            if let Slot::Empty = self.slots[idx] {
                self.slots[idx] = Slot::Occupied(entry);
                self.len += 1;
                return Ok(());
            }
        }
        Err(entry)
    }

    fn drain_entries(&mut self) -> Vec<Entry<K, V>> {
        let entries = mem::take(&mut self.slots)
            .into_iter()
            .filter_map(|s| match s {
                Slot::Occupied(e) => Some(e),
                _ => None,
            })
            .collect();
        self.len = 0;
        self.tombstones = 0;
        entries
    }

    /// Reinserts every live entry into a fresh array of `capacity` slots,
    /// moving on to larger primes while some entry finds no free slot.
    fn rebuild(&mut self, capacity: usize) {
        let old_capacity = self.capacity();
        let purged = self.tombstones;
        let mut pending = self.drain_entries();
        let mut capacity = capacity;
        loop {
            let mut table = Table::new(capacity, self.config);
            let mut overflow = None;
            while let Some(entry) = pending.pop() {
                if let Err(entry) = table.place_unique(entry) {
                    overflow = Some(entry);
                    break;
                }
            }
            match overflow {
                None => {
                    log::debug!(
                        "rehashed probing table: {} -> {} slots, {} live, {} tombstones purged",
                        old_capacity,
                        capacity,
                        table.len,
                        purged
                    );
                    *self = table;
                    return;
                }
                Some(entry) => {
                    pending.push(entry);
                    pending.extend(table.drain_entries());
                    capacity = next_prime(capacity.saturating_mul(2));
                }
            }
        }
    }

    fn grow(&mut self) {
        self.rebuild(next_prime(self.capacity().saturating_mul(2)));
    }

    /// Makes room for one more key ahead of an insert.
    fn reserve_one(&mut self) {
        let cap = self.capacity();
        if cap == 0 {
            self.rebuild(next_prime(DEFAULT_CAPACITY));
            return;
        }
        let threshold = self.config.threshold(cap);
        if self.len as f64 > threshold {
            self.grow();
        } else if (self.len + self.tombstones) as f64 > threshold {
            self.rebuild(cap);
        }
    }

    /// Shared body of `put`, `put_if_absent`, `replace` and `replace_if`.
    ///
    /// A present key is overwritten when `overwrite` accepts its current
    /// value; an absent key is inserted only if `insert_missing`.
    fn write<F>(
        &mut self,
        hash: u64,
        key: K,
        value: V,
        insert_missing: bool,
        overwrite: F,
    ) -> Written<K, V, usize>
    where
        K: Eq,
        F: FnOnce(&V) -> bool,
    {
        if insert_missing {
            self.reserve_one();
        }
        loop {
            match self.locate(hash, &key) {
                Probe::Found(idx) => {
                    if let Some(current) = self.value_mut(idx) {
                        if overwrite(&*current) {
                            return Written::Replaced(mem::replace(current, value), key);
                        }
                    }
                    return Written::Kept(idx, key, value);
                }
                Probe::Vacant(idx) => {
                    if !insert_missing {
                        return Written::Missing(key, value);
                    }
                    self.place(idx, Entry { key, value, hash });
                    return Written::Inserted;
                }
                Probe::Full => {
                    if !insert_missing {
                        return Written::Missing(key, value);
                    }
                    self.grow();
                }
            }
        }
    }
}

/// Hash map with open addressing and quadratic probing.
///
/// The hasher is an explicit `BuildHasher` capability; equality comes from
/// `K: Eq`. Enumeration follows slot order, which changes across rehashes.
#[derive(Clone)]
pub struct ProbingHashMap<K, V, S = RandomState> {
    hasher: S,
    table: Table<K, V>,
    reentrancy: DebugReentrancy,
}

fn checked_capacity<K, V>(requested: usize) -> Result<usize> {
    let too_large = || {
        MapError::invalid(
            "initial_capacity",
            format!("{requested} slots exceed the maximum table size"),
        )
    };
    Layout::array::<Slot<K, V>>(requested).map_err(|_| too_large())?;
    let capacity = table_capacity(requested);
    Layout::array::<Slot<K, V>>(capacity).map_err(|_| too_large())?;
    Ok(capacity)
}

impl<K, V> ProbingHashMap<K, V> {
    /// Empty map with 16 requested slots and load factor 0.75.
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        Self::with_config(HashMapConfig::default().with_initial_capacity(initial_capacity))
    }

    pub fn with_capacity_and_load_factor(initial_capacity: usize, load_factor: f32) -> Result<Self> {
        Self::with_config(
            HashMapConfig::default()
                .with_initial_capacity(initial_capacity)
                .with_load_factor(load_factor),
        )
    }

    pub fn with_config(config: HashMapConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V> Default for ProbingHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ProbingHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        let config = HashMapConfig::default();
        Self {
            hasher,
            table: Table::new(table_capacity(config.initial_capacity), config),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_config_and_hasher(config: HashMapConfig, hasher: S) -> Result<Self> {
        config.validate()?;
        let capacity = checked_capacity::<K, V>(config.initial_capacity)?;
        Ok(Self {
            hasher,
            table: Table::new(capacity, config),
            reentrancy: DebugReentrancy::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.table.len
    }

    pub fn is_empty(&self) -> bool {
        self.table.len == 0
    }

    /// Current number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Slots holding a deletion marker.
    pub fn tombstones(&self) -> usize {
        self.table.tombstones
    }

    pub fn load_factor(&self) -> f32 {
        self.table.config.load_factor
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Drops every entry and resets the table to the default capacity.
    pub fn clear(&mut self) {
        let config = self.table.config;
        let old = mem::replace(
            &mut self.table,
            Table::new(next_prime(DEFAULT_CAPACITY), config),
        );
        log::debug!("cleared probing map: {} entries dropped", old.len);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.table.slots.iter(),
            remaining: self.table.len,
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Snapshot of the keys in slot order.
    pub fn key_list(&self) -> Vec<&K> {
        self.keys().collect()
    }

    pub fn values_iter(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Snapshot of the values in slot order.
    pub fn values(&self) -> Vec<&V> {
        self.values_iter().collect()
    }
}

impl<K, V, S> ProbingHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(q);
        self.table
            .find(hash, q)
            .and_then(|idx| self.table.value(idx))
    }

    pub fn get_or_default<'a, Q>(&'a self, q: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).unwrap_or(default)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(q);
        let idx = self.table.find(hash, q)?;
        self.table.value_mut(idx)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(q);
        self.table.find(hash, q).is_some()
    }

    /// Linear scan of the occupied slots.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let _g = self.reentrancy.enter();
        self.iter().any(|(_, v)| v == value)
    }

    /// Runs a write inside the guarded section. Whatever the table did not
    /// keep is returned, so it is dropped only after the guard is released.
    fn guarded_write<F>(&mut self, key: K, value: V, insert_missing: bool, overwrite: F) -> Written<K, V, usize>
    where
        F: FnOnce(&V) -> bool,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(&key);
        self.table.write(hash, key, value, insert_missing, overwrite)
    }

    /// Inserts or overwrites, returning the previous value.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.guarded_write(key, value, true, |_| true) {
            Written::Replaced(old, _) => Some(old),
            _ => None,
        }
    }

    /// Inserts only if absent. Returns the value already present, if any.
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        match self.guarded_write(key, value, true, |_| false) {
            Written::Kept(idx, ..) => self.table.value(idx),
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

    /// Removes `q`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(q);
        let idx = self.table.find(hash, q)?;
        self.table.take(idx).map(|e| (e.key, e.value))
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Removes `q` only while it maps to `value`.
    pub fn remove_if<Q>(&mut self, q: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        let taken = {
            let _g = self.reentrancy.enter();
            let hash = self.hasher.hash_one(q);
            match self.table.find(hash, q) {
                Some(idx) if self.table.value(idx) == Some(value) => self.table.take(idx),
                _ => None,
            }
        };
        taken.is_some()
    }
}

/// Iterator over entries in slot order.
pub struct Iter<'a, K, V> {
    it: core::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.it.by_ref() {
            if let Slot::Occupied(e) = slot {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over keys in slot order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Iterator over values in slot order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a ProbingHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> fmt::Display for ProbingHashMap<K, V, S>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_entries(f, self.iter())
    }
}

impl<K, V, S> fmt::Debug for ProbingHashMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Maps are equal when they hold the same keys mapped to equal values,
/// whatever their slot layout.
impl<K, V, S> PartialEq for ProbingHashMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for ProbingHashMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Extend<(K, V)> for ProbingHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ProbingHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::with_hasher(S::default());
        m.extend(iter);
        m
    }
}

impl<K, V, S> AssocMap<K, V> for ProbingHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
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
