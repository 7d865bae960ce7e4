use assoc_maps::BalancedTreeMap;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

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

#[test]
fn navigation_over_odd_keys_in_every_insertion_order() {
    init_logging();
    let orders = permutations(&[1, 3, 5, 7]);
    assert_eq!(orders.len(), 24);
    for order in orders {
        let m: BalancedTreeMap<i32, ()> = order.iter().map(|&k| (k, ())).collect();
        m.check_consistency();
        assert_eq!(m.floor_key(&4), Some(&3), "order {order:?}");
        assert_eq!(m.ceiling_key(&4), Some(&5), "order {order:?}");
        assert_eq!(m.higher_key(&5), Some(&7), "order {order:?}");
        assert_eq!(m.lower_key(&5), Some(&3), "order {order:?}");
        assert_eq!(m.first_key(), Some(&1));
        assert_eq!(m.last_key(), Some(&7));
    }
}

#[test]
fn navigation_past_the_ends_is_absent() {
    let m: BalancedTreeMap<i32, &str> = [(10, "a"), (20, "b")].into_iter().collect();
    assert_eq!(m.lower_key(&10), None);
    assert_eq!(m.floor_key(&9), None);
    assert_eq!(m.higher_key(&20), None);
    assert_eq!(m.ceiling_key(&21), None);
    assert_eq!(m.floor_key(&10), Some(&10));
    assert_eq!(m.ceiling_key(&20), Some(&20));

    let empty: BalancedTreeMap<i32, ()> = BalancedTreeMap::new();
    assert_eq!(empty.first_key(), None);
    assert_eq!(empty.last_key(), None);
    assert_eq!(empty.ceiling_key(&0), None);
    assert_eq!(empty.height(), None);
}

#[test]
fn ascending_inserts_stay_logarithmic() {
    init_logging();
    let mut m = BalancedTreeMap::new();
    for i in 0..4096u32 {
        m.put(i, i);
    }
    m.check_consistency();
    // A perfectly balanced tree of 4096 nodes has 12 edges from root to
    // its deepest leaf; AVL stays within 1.44x of that.
    assert!(m.height().unwrap() <= 17);
    let keys: Vec<u32> = m.keys().copied().collect();
    assert_eq!(keys, (0..4096).collect::<Vec<_>>());
}

#[test]
fn removals_keep_order_and_balance() {
    init_logging();
    let mut m: BalancedTreeMap<u32, String> = (0..300).map(|i| (i, i.to_string())).collect();
    for i in (0..300).step_by(3) {
        assert_eq!(m.remove(&i), Some(i.to_string()));
        m.check_consistency();
    }
    assert_eq!(m.len(), 200);
    assert!(m.key_list().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(m.remove(&0), None);
    assert_eq!(m.get(&1).map(String::as_str), Some("1"));
}

#[test]
fn borrowed_lookup_with_string_keys() {
    let mut m: BalancedTreeMap<String, usize> = BalancedTreeMap::new();
    for w in ["pear", "apple", "fig", "kiwi"] {
        m.put(w.to_string(), w.len());
    }
    assert_eq!(m.get("fig"), Some(&3));
    assert_eq!(m.ceiling_key("b").map(String::as_str), Some("fig"));
    assert_eq!(m.floor_key("z").map(String::as_str), Some("pear"));
    assert!(m.remove_if("kiwi", &4));
    assert!(!m.contains_key("kiwi"));
    assert_eq!(m.to_string(), "{apple=5, fig=3, pear=4}");
}

#[test]
fn conditional_replace_and_put_if_absent() {
    let mut m = BalancedTreeMap::new();
    m.put('k', 1);
    assert!(!m.replace_if('k', &2, 5));
    assert_eq!(m.get(&'k'), Some(&1));
    assert!(m.replace_if('k', &1, 5));
    assert_eq!(m.replace('k', 6), Some(5));
    assert_eq!(m.replace('z', 6), None);
    assert_eq!(m.len(), 1);
    assert_eq!(m.put_if_absent('k', 9), Some(&6));
    assert_eq!(m.put_if_absent('a', 9), None);
    assert_eq!(m.values(), vec![&9, &6]);
    assert!(m.contains_value(&9));
    assert_eq!(*m.get_or_default(&'q', &0), 0);
}

#[test]
fn maps_built_in_different_orders_are_equal() {
    let a: BalancedTreeMap<i32, i32> = (0..64).map(|i| (i, -i)).collect();
    let b: BalancedTreeMap<i32, i32> = (0..64).rev().map(|i| (i, -i)).collect();
    assert_eq!(a, b);
    let mut c = a.clone();
    c.put(10, 10);
    assert_ne!(a, c);
    c.clear();
    assert!(c.is_empty());
    assert_eq!(c.to_string(), "{}");
}
