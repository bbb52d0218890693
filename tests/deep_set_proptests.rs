// DeepSet property tests.
//
// Property 1: idempotent insert.
//  - Inserting the same record twice gives the same size and membership as
//    inserting it once.
// Property 2: has/insert symmetry.
//  - For a record absent from an arbitrary set, contains is false before
//    insert and true right after.
// Property 3: remove/has consistency.
//  - Removing a present record returns true, after which contains is false
//    and a second remove returns false. Other members are untouched.
// Property 4: size accounting.
//  - After any op sequence, len() equals the number of enumerated elements
//    and no two enumerated elements are deep-equal.
// Property 5: crafted collisions.
//  - Under a hasher that maps every record to one of two digests,
//    distinct records are all retained and all found.
// Property 6: copy isolation.
//  - With copy-on-insert, mutating caller-held shared state after insertion
//    changes neither membership nor enumeration.
use core::hash::{BuildHasher, Hasher};
use deep_set::{DeepEq, DeepSet, Options};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::hash_map::{DefaultHasher, RandomState};
use std::collections::BTreeMap;
use std::rc::Rc;

type Record = BTreeMap<String, Vec<u8>>;

fn arb_record() -> impl Strategy<Value = Record> {
    proptest::collection::btree_map("[a-d]", proptest::collection::vec(0u8..4, 0..3), 0..3)
}

fn arb_records() -> impl Strategy<Value = Vec<Record>> {
    proptest::collection::vec(arb_record(), 0..24)
}

// Truncates every digest to its low `bits` bits, so unrelated records
// collide constantly while equal records still agree.
#[derive(Clone)]
struct NarrowBuildHasher {
    bits: u32,
}
struct NarrowHasher {
    inner: DefaultHasher,
    bits: u32,
}
impl BuildHasher for NarrowBuildHasher {
    type Hasher = NarrowHasher;
    fn build_hasher(&self) -> Self::Hasher {
        NarrowHasher {
            inner: DefaultHasher::new(),
            bits: self.bits,
        }
    }
}
impl Hasher for NarrowHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.inner.write(bytes);
    }
    fn finish(&self) -> u64 {
        self.inner.finish() & ((1u64 << self.bits) - 1)
    }
}

fn distinct_count(records: &[Record]) -> usize {
    let mut seen: Vec<&Record> = Vec::new();
    for r in records {
        if !seen.iter().any(|s| s.deep_eq(r)) {
            seen.push(r);
        }
    }
    seen.len()
}

proptest! {
    // Property 1
    #[test]
    fn prop_insert_is_idempotent(initial in arb_records(), r in arb_record()) {
        let mut once = DeepSet::from_values(initial.clone(), Options::default());
        let mut twice = DeepSet::from_values(initial, Options::default());
        once.insert(r.clone());
        twice.add(r.clone()).add(r.clone());
        prop_assert_eq!(once.len(), twice.len());
        prop_assert!(twice.contains(&r));
        for m in once.iter() {
            prop_assert!(twice.contains(&m));
        }
    }

    // Property 2
    #[test]
    fn prop_has_insert_symmetry(initial in arb_records(), r in arb_record()) {
        let mut set = DeepSet::from_values(initial, Options::default());
        set.remove(&r);
        prop_assert!(!set.contains(&r));
        prop_assert!(set.insert(r.clone()));
        prop_assert!(set.contains(&r));
    }

    // Property 3
    #[test]
    fn prop_remove_then_has(initial in proptest::collection::vec(arb_record(), 1..24), pick in any::<prop::sample::Index>()) {
        let target = pick.get(&initial).clone();
        let mut set = DeepSet::from_values(initial.clone(), Options::default());
        let before = set.len();
        prop_assert!(set.remove(&target));
        prop_assert!(!set.contains(&target));
        prop_assert!(!set.remove(&target));
        prop_assert_eq!(set.len(), before - 1);
        for r in &initial {
            if !r.deep_eq(&target) {
                prop_assert!(set.contains(r));
            }
        }
    }

    // Property 4
    #[test]
    fn prop_size_accounting(
        records in arb_records(),
        removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..12),
        bits in 1u32..4,
    ) {
        let mut set = DeepSet::with_options_and_hasher(Options::default(), NarrowBuildHasher { bits });
        set.add_all(records.clone());
        prop_assert_eq!(set.len(), distinct_count(&records));
        if !records.is_empty() {
            for ix in removals {
                set.remove(ix.get(&records));
            }
        }
        let seen: Vec<Record> = set.iter().map(|m| (*m).clone()).collect();
        prop_assert_eq!(seen.len(), set.len());
        prop_assert_eq!(distinct_count(&seen), seen.len());
        prop_assert!(set.bucket_count() <= set.len());
    }

    // Property 5
    #[test]
    fn prop_crafted_collisions_are_retained(records in arb_records()) {
        let mut set = DeepSet::with_options_and_hasher(Options::default(), NarrowBuildHasher { bits: 1 });
        for r in &records {
            set.insert(r.clone());
        }
        prop_assert!(set.bucket_count() <= 2);
        prop_assert_eq!(set.len(), distinct_count(&records));
        for r in &records {
            prop_assert!(set.contains(r));
        }
    }

    // Property 6
    #[test]
    fn prop_copy_on_insert_isolates(records in proptest::collection::vec(arb_record(), 1..12), extra in arb_record()) {
        let shared: Vec<Rc<RefCell<Record>>> =
            records.iter().cloned().map(|r| Rc::new(RefCell::new(r))).collect();
        let set = DeepSet::from_values(shared.iter().cloned(), Options::default());
        let snapshot: Vec<Record> = set.iter().map(|m| m.borrow().clone()).collect();

        for s in &shared {
            s.borrow_mut().insert("zz".to_string(), vec![9]);
            s.borrow_mut().extend(extra.clone());
        }

        let after: Vec<Record> = set.iter().map(|m| m.borrow().clone()).collect();
        prop_assert_eq!(snapshot, after);
        for r in &records {
            prop_assert!(set.contains(&Rc::new(RefCell::new(r.clone()))));
        }
    }
}

// A concrete crafted collision: two different records sharing a digest
// under a one-bit hasher are both kept.
#[test]
fn two_colliding_records_both_retained() {
    let hasher = NarrowBuildHasher { bits: 1 };
    let candidates: Vec<Record> = (0u8..3)
        .map(|i| [("k".to_string(), vec![i])].into())
        .collect();
    let digest = |r: &Record| deep_set::structural::digest_with(&hasher, r);
    // Pigeonhole: three records over two digests always give a pair.
    let (a, b) = (0..3)
        .flat_map(|i| (i + 1..3).map(move |j| (i, j)))
        .map(|(i, j)| (&candidates[i], &candidates[j]))
        .find(|(a, b)| digest(*a) == digest(*b))
        .expect("three records over two digests must collide");

    let mut set = DeepSet::with_options_and_hasher(Options::default(), hasher.clone());
    set.insert(a.clone());
    set.insert(b.clone());
    assert_eq!(set.len(), 2);
    assert_eq!(set.bucket_count(), 1);
    assert!(set.contains(a));
    assert!(set.contains(b));
}

// Default hasher sanity: a fresh RandomState still agrees with itself.
#[test]
fn random_state_set_roundtrip() {
    let mut set: DeepSet<Record, RandomState> = DeepSet::with_hasher(RandomState::new());
    let r: Record = [("a".to_string(), vec![1, 2])].into();
    set.insert(r.clone());
    assert!(set.contains(&r));
}
