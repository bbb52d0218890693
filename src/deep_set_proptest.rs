#![cfg(test)]

// Property tests for DeepSet kept inside the crate so they can check the
// bucket-level invariants through `assert_invariants`.

use crate::deep_set::{DeepSet, Options};
use crate::structural::DeepEq;
use core::hash::{BuildHasher, Hasher};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::hash_map::RandomState;
use std::collections::BTreeMap;

type Record = BTreeMap<String, Vec<i8>>;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// records, the pool shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize),
    AddTwice(usize),
    Remove(usize),
    Take(usize),
    Contains(usize),
    Clear,
    Iterate,
}

fn arb_record() -> impl Strategy<Value = Record> {
    proptest::collection::btree_map("[a-c]{1,2}", proptest::collection::vec(-2i8..=2, 0..3), 0..3)
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Record>, Vec<OpI>)> {
    proptest::collection::vec(arb_record(), 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => idx.clone().prop_map(OpI::Insert),
            1 => idx.clone().prop_map(OpI::AddTwice),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Take),
            2 => idx.clone().prop_map(OpI::Contains),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn model_position(model: &[Record], r: &Record) -> Option<usize> {
    model.iter().position(|m| m.deep_eq(r))
}

// State-machine equivalence against a Vec model scanned with `deep_eq`:
// - insert reports novelty exactly when the model lacks the record;
// - remove/take succeed exactly when present, and only once;
// - enumeration yields each model element once and nothing else;
// - len parity and the bucket invariants hold after every step.
fn run_scenario<S: BuildHasher>(
    mut sut: DeepSet<Record, S>,
    pool: &[Record],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: Vec<Record> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i) => {
                let r = pool[i].clone();
                let fresh = model_position(&model, &r).is_none();
                prop_assert_eq!(sut.insert(r.clone()), fresh);
                if fresh {
                    model.push(r);
                }
            }
            OpI::AddTwice(i) => {
                let r = pool[i].clone();
                sut.add(r.clone()).add(r.clone());
                if model_position(&model, &r).is_none() {
                    model.push(r);
                }
            }
            OpI::Remove(i) => {
                let r = &pool[i];
                let pos = model_position(&model, r);
                prop_assert_eq!(sut.remove(r), pos.is_some());
                if let Some(p) = pos {
                    model.swap_remove(p);
                }
                prop_assert!(!sut.remove(r), "second removal must report false");
            }
            OpI::Take(i) => {
                let r = &pool[i];
                let pos = model_position(&model, r);
                let taken = sut.take(r);
                prop_assert_eq!(taken.is_some(), pos.is_some());
                if let (Some(t), Some(p)) = (taken, pos) {
                    prop_assert!(t.deep_eq(r));
                    model.swap_remove(p);
                }
            }
            OpI::Contains(i) => {
                let r = &pool[i];
                prop_assert_eq!(sut.contains(r), model_position(&model, r).is_some());
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), 0);
            }
            OpI::Iterate => {
                let seen: Vec<Record> = sut.iter().map(|m| (*m).clone()).collect();
                prop_assert_eq!(seen.len(), model.len());
                for s in &seen {
                    prop_assert!(model_position(&model, s).is_some());
                }
                for (i, a) in seen.iter().enumerate() {
                    for b in &seen[i + 1..] {
                        prop_assert!(!a.deep_eq(b), "enumeration yielded duplicates");
                    }
                }
                for (a, b) in sut.entries() {
                    prop_assert!(a.deep_eq(&b));
                }
            }
        }

        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.bucket_count() <= sut.len());
        for r in pool {
            prop_assert_eq!(sut.contains(r), model_position(&model, r).is_some());
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut = DeepSet::with_options_and_hasher(Options::default(), RandomState::new());
        run_scenario(sut, &pool, ops)?;
    }
}

// Collision variant: every record hashes to the same digest, so all of them
// share one bucket and only `deep_eq` tells them apart.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = DeepSet::with_options_and_hasher(Options::shared(), ConstBuildHasher);
        run_scenario(sut, &pool, ops)?;
    }
}
