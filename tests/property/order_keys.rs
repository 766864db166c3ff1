//! Property-based tests for fractional order keys

use proptest::prelude::*;
use sordello::order::{between, generate_initial, OrderKey};

/// Keys without a trailing zero symbol, so distinct strings are distinct positions
fn key_strategy() -> impl Strategy<Value = OrderKey> {
    "[a-z]{0,4}[b-z]".prop_map(|s| OrderKey::parse(&s).unwrap())
}

proptest! {
    #[test]
    fn test_between_is_strictly_inside(a in key_strategy(), b in key_strategy()) {
        prop_assume!(a != b);
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let mid = between(Some(&low), Some(&high)).unwrap();
        prop_assert!(low < mid, "{} !< {}", low, mid);
        prop_assert!(mid < high, "{} !< {}", mid, high);
    }

    #[test]
    fn test_between_open_upper_bound(low in key_strategy()) {
        let mid = between(Some(&low), None).unwrap();
        prop_assert!(low < mid);
    }

    #[test]
    fn test_initial_keys_are_sorted_and_unique(count in 0usize..2000) {
        let keys = generate_initial(count);
        prop_assert_eq!(keys.len(), count);
        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    /// Inserting between any neighbours of an initial run keeps the run ordered
    #[test]
    fn test_insert_into_initial_run(count in 1usize..100, position in 0usize..100) {
        let mut keys = generate_initial(count);
        let position = position % (count + 1);
        let before = position.checked_sub(1).map(|i| &keys[i]);
        let after = keys.get(position);
        let key = between(before, after).unwrap();
        keys.insert(position, key);
        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }
}
