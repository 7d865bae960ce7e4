#![cfg(test)]

// Property tests for BalancedTreeMap: model equivalence against BTreeMap and
// structural checks after every mutation.

use crate::balanced_tree_map::BalancedTreeMap;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

#[derive(Clone, Debug)]
enum Op {
    Put(i16, i32),
    PutIfAbsent(i16, i32),
    Replace(i16, i32),
    Remove(i16),
    RemoveIf(i16, bool),
    Navigate(i16),
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    // Narrow key range so removals and replacements hit live keys often.
    let key = -64i16..64;
    let op = prop_oneof![
        5 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::PutIfAbsent(k, v)),
        1 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Replace(k, v)),
        4 => key.clone().prop_map(Op::Remove),
        1 => (key.clone(), any::<bool>()).prop_map(|(k, b)| Op::RemoveIf(k, b)),
        3 => (-70i16..70).prop_map(Op::Navigate),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..200)
}

fn height_bound(len: usize) -> f64 {
    1.45 * ((len + 2) as f64).log2()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    // Property: the tree answers every query like BTreeMap, stays a valid
    // AVL tree, and enumerates in ascending key order.
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        let mut sut: BalancedTreeMap<i16, i32> = BalancedTreeMap::new();
        let mut model: BTreeMap<i16, i32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    prop_assert_eq!(sut.put(k, v), model.insert(k, v));
                }
                Op::PutIfAbsent(k, v) => {
                    let expected = model.get(&k).copied();
                    prop_assert_eq!(sut.put_if_absent(k, v).copied(), expected);
                    model.entry(k).or_insert(v);
                }
                Op::Replace(k, v) => {
                    let expected = model.get_mut(&k).map(|slot| std::mem::replace(slot, v));
                    prop_assert_eq!(sut.replace(k, v), expected);
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                    prop_assert!(!sut.contains_key(&k));
                }
                Op::RemoveIf(k, matching) => {
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
                Op::Navigate(q) => {
                    prop_assert_eq!(sut.get(&q), model.get(&q));
                    prop_assert_eq!(sut.ceiling_key(&q), model.range(q..).next().map(|(k, _)| k));
                    prop_assert_eq!(sut.floor_key(&q), model.range(..=q).next_back().map(|(k, _)| k));
                    prop_assert_eq!(
                        sut.higher_key(&q),
                        model.range((Excluded(q), Unbounded)).next().map(|(k, _)| k)
                    );
                    prop_assert_eq!(sut.lower_key(&q), model.range(..q).next_back().map(|(k, _)| k));
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }

            // Post-conditions after each op
            sut.check_consistency();
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.first_key(), model.keys().next());
            prop_assert_eq!(sut.last_key(), model.keys().next_back());
            match sut.height() {
                None => prop_assert!(model.is_empty()),
                Some(h) => prop_assert!((h as f64) <= height_bound(sut.len())),
            }
        }

        let s_entries: Vec<_> = sut.iter().collect();
        let m_entries: Vec<_> = model.iter().collect();
        prop_assert_eq!(s_entries, m_entries);
    }

    // Property: bulk-building from any key order yields the same map, and
    // draining it in any order keeps it balanced down to empty.
    #[test]
    fn prop_build_and_drain(keys in proptest::collection::vec(any::<i32>(), 0..300), seed in any::<u64>()) {
        let sut: BalancedTreeMap<i32, usize> = keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        let model: BTreeMap<i32, usize> = keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        prop_assert_eq!(sut.key_list(), model.keys().collect::<Vec<_>>());
        prop_assert_eq!(sut.values(), model.values().collect::<Vec<_>>());

        let mut sut = sut;
        let mut order: Vec<i32> = model.keys().copied().collect();
        // Deterministic shuffle from the seed.
        let mut s = seed | 1;
        for i in (1..order.len()).rev() {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            order.swap(i, (s >> 33) as usize % (i + 1));
        }
        for k in order {
            prop_assert_eq!(sut.remove(&k), model.get(&k).copied());
            sut.check_consistency();
        }
        prop_assert!(sut.is_empty());
        prop_assert_eq!(sut.height(), None);
    }
}
