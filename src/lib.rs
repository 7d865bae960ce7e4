//! assoc-maps: two in-memory associative maps behind one contract.
//!
//! - `ProbingHashMap<K, V, S>`: open addressing with quadratic probing over
//!   a prime-sized slot array. Keys need `Hash + Eq`; hashing goes through
//!   an explicit `BuildHasher`.
//! - `BalancedTreeMap<K, V>`: an AVL tree ordered by `K: Ord`, with in-order
//!   enumeration and ceiling/floor/higher/lower navigation.
//!
//! Both implement `AssocMap<K, V>`: insert, lookup, conditional replace,
//! conditional remove and snapshot enumeration. `ProbingHashSet` and
//! `BalancedTreeSet` are thin sets built on that trait with `()` values.
//!
//! Internal Design:
//!
//! Probing table
//! - Slots are `Empty`, `Tombstone` or `Occupied`. Each occupied slot keeps
//!   the key's `u64` hash; rehashing reuses it and never calls `K: Hash`.
//! - Slot `i` of the probe run for hash `h` is `(h + i*i) mod capacity`.
//!   Capacities are prime and a run visits `capacity / 2 + 1` distinct
//!   slots, so a run that finds no free slot triggers growth.
//! - Removal leaves a tombstone. Lookups walk past tombstones; inserts
//!   reuse the first one seen once the key is known to be absent.
//! - Before an insert the table doubles (to the next prime) when the live
//!   count exceeds `load_factor * capacity`, or rebuilds at the same size
//!   when only tombstones push it over.
//!
//! AVL tree
//! - Nodes live in a `slotmap` arena and link to each other by `NodeId`;
//!   there are no parent links and no `unsafe`.
//! - Each node caches its height and balance factor. Insert and delete
//!   recurse down and return the rebalanced subtree root on the way up.
//! - Removing a node with two children detaches its in-order successor and
//!   moves that entry into the removed node's position.
//!
//! Reentrancy
//! - Every public method that can call `Hash`, `Eq` or `Ord` enters a
//!   debug-only guard. A key whose comparison calls back into the same map
//!   panics in debug builds instead of observing a half-updated structure.
//!
//! Threading
//! - Maps are `Send` when their contents are, never `Sync`. Share one
//!   across threads behind a lock.

mod balanced_tree_map_proptest;
mod probing_hash_map_proptest;
mod reentrancy;

pub mod balanced_tree_map;
pub mod config;
pub mod error;
pub mod key_set;
pub mod map;
pub mod probing_hash_map;

// Public surface
pub use balanced_tree_map::BalancedTreeMap;
pub use config::{HashMapConfig, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR};
pub use error::{MapError, Result};
pub use key_set::{BalancedTreeSet, KeySet, ProbingHashSet};
pub use map::AssocMap;
pub use probing_hash_map::ProbingHashMap;
