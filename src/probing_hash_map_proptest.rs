#![cfg(test)]

// Property tests for ProbingHashMap kept inside the crate so the colliding
// test hashers stay private.

use crate::probing_hash_map::test_hashers::{ConstBuildHasher, IdentityBuildHasher};
use crate::probing_hash_map::ProbingHashMap;
use proptest::prelude::*;
use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::BuildHasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys, the pool shrinks,
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    PutIfAbsent(usize, i32),
    Replace(usize, i32),
    // `true` passes the current value as the expected one.
    ReplaceIf(usize, bool, i32),
    Remove(usize),
    RemoveIf(usize, bool),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::PutIfAbsent(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            1 => (idx.clone(), any::<bool>(), any::<i32>()).prop_map(|(i, b, v)| OpI::ReplaceIf(i, b, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            1 => (idx.clone(), any::<bool>()).prop_map(|(i, b)| OpI::RemoveIf(i, b)),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap. Shared by
// every hasher variant below.
fn run_state_machine<S: BuildHasher>(
    mut sut: ProbingHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.put(k.clone(), v), model.insert(k, v));
            }
            OpI::PutIfAbsent(i, v) => {
                let k = key_from(pool, i);
                let expected = model.get(&k).copied();
                prop_assert_eq!(sut.put_if_absent(k.clone(), v).copied(), expected);
                model.entry(k).or_insert(v);
            }
            OpI::Replace(i, v) => {
                let k = key_from(pool, i);
                let expected = model.get_mut(&k).map(|slot| std::mem::replace(slot, v));
                prop_assert_eq!(sut.replace(k, v), expected);
            }
            OpI::ReplaceIf(i, matching, v) => {
                let k = key_from(pool, i);
                let old = match model.get(&k) {
                    Some(&cur) if matching => cur,
                    Some(&cur) => cur.wrapping_add(1),
                    None => v,
                };
                let should = model.get(&k) == Some(&old);
                prop_assert_eq!(sut.replace_if(k.clone(), &old, v), should);
                if should {
                    model.insert(k, v);
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(k.0.as_str()), model.remove(&k));
                prop_assert!(sut.get(&k).is_none());
            }
            OpI::RemoveIf(i, matching) => {
                let k = key_from(pool, i);
                let probe = match model.get(&k) {
                    Some(&cur) if matching => cur,
                    Some(&cur) => cur.wrapping_add(1),
                    None => 0,
                };
                let should = model.get(&k) == Some(&probe);
                prop_assert_eq!(sut.remove_if(&k, &probe), should);
                if should {
                    model.remove(&k);
                }
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(vr) = sut.get_mut(&k) {
                    *vr = vr.wrapping_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.wrapping_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Iterate => {
                let s_entries: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m_entries: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s_entries, m_entries);
                // key_list and values are parallel snapshots.
                let pairs: Vec<_> = sut.key_list().into_iter().zip(sut.values()).collect();
                let iterated: Vec<_> = sut.iter().collect();
                prop_assert_eq!(pairs, iterated);
                for v in model.values() {
                    prop_assert!(sut.contains_value(v));
                }
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.tombstones(), 0);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.len() + sut.tombstones() <= sut.capacity());
        let distinct: BTreeSet<_> = sut.keys().collect();
        prop_assert_eq!(distinct.len(), sut.len());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: ProbingHashMap<Key, i32> = ProbingHashMap::new();
        run_state_machine(sut, &pool, ops)?;
    }

    // Every key lands on the same home slot; lookups must walk past
    // tombstones and foreign keys along a single probe run.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = ProbingHashMap::with_hasher(ConstBuildHasher);
        run_state_machine(sut, &pool, ops)?;
    }

    // Tiny tables with a high load factor grow through full probe runs as
    // well as through the threshold.
    #[test]
    fn prop_state_machine_small_dense_table((pool, ops) in arb_scenario(), cap in 1usize..8) {
        let sut = ProbingHashMap::<Key, i32, RandomState>::with_capacity_and_load_factor(cap, 2.0)
            .expect("valid parameters");
        run_state_machine(sut, &pool, ops)?;
    }

    // Integer keys under the identity hasher cluster in predictable runs.
    #[test]
    fn prop_identity_hashed_integers(ops in proptest::collection::vec((any::<bool>(), 0u64..64), 1..200)) {
        let mut sut = ProbingHashMap::with_hasher(IdentityBuildHasher);
        let mut model: HashMap<u64, u64> = HashMap::new();
        for (insert, k) in ops {
            if insert {
                prop_assert_eq!(sut.put(k, k * 3), model.insert(k, k * 3));
            } else {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            prop_assert_eq!(sut.len(), model.len());
        }
        for k in 0u64..64 {
            prop_assert_eq!(sut.get(&k), model.get(&k));
        }
    }
}
