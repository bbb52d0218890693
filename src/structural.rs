//! Structural collaborators: digest feed, deep equality and deep copy.
//!
//! A `DeepSet` never looks at reference identity. It asks the element type
//! three questions through the traits below, and relies on one contract
//! tying them together: if `a.deep_eq(&b)` then `a.deep_hash(h)` and
//! `b.deep_hash(h)` feed identical bytes. The converse need not hold; two
//! different values may share a digest and the set resolves that by scanning.
//!
//! Shared pointers are looked through: `Rc<RefCell<T>>` compares and hashes
//! by the `T` it points at, and `deep_clone` gives it a fresh allocation, so
//! a deep copy shares no mutable substructure with its source.

use core::cell::RefCell;
use core::hash::{BuildHasher, Hash, Hasher};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// Feeds a value's structure into a hasher.
pub trait DeepHash {
    fn deep_hash<H: Hasher>(&self, state: &mut H);
}

/// Structural equivalence, independent of where the values live.
pub trait DeepEq {
    fn deep_eq(&self, other: &Self) -> bool;
}

/// A copy that is deep-equal to `self` and shares no mutable substructure.
pub trait DeepClone {
    fn deep_clone(&self) -> Self;
}

/// Everything a `DeepSet` element needs.
pub trait Structural: DeepHash + DeepEq + DeepClone {}

impl<T: DeepHash + DeepEq + DeepClone> Structural for T {}

/// Digest of a single value under `hasher`.
#[inline]
pub fn digest_with<T, S>(hasher: &S, value: &T) -> u64
where
    T: ?Sized + DeepHash,
    S: BuildHasher,
{
    let mut state = hasher.build_hasher();
    value.deep_hash(&mut state);
    state.finish()
}

// Order-independent combination for unordered containers. Each item is
// hashed on its own with a fixed-key hasher and the results are summed, so
// iteration order of the container never reaches the outer state.
pub(crate) fn hash_unordered<I, F, H>(len: usize, items: I, mut feed: F, state: &mut H)
where
    I: Iterator,
    F: FnMut(I::Item, &mut DefaultHasher),
    H: Hasher,
{
    let mut acc: u64 = 0;
    for item in items {
        let mut h = DefaultHasher::new();
        feed(item, &mut h);
        acc = acc.wrapping_add(h.finish());
    }
    state.write_usize(len);
    state.write_u64(acc);
}

fn hash_seq<'a, T, I, H>(len: usize, items: I, state: &mut H)
where
    T: DeepHash + 'a,
    I: Iterator<Item = &'a T>,
    H: Hasher,
{
    state.write_usize(len);
    for item in items {
        item.deep_hash(state);
    }
}

fn eq_seq<'a, T, I>(a_len: usize, a: I, b_len: usize, b: I) -> bool
where
    T: DeepEq + 'a,
    I: Iterator<Item = &'a T>,
{
    a_len == b_len && a.zip(b).all(|(x, y)| x.deep_eq(y))
}

macro_rules! impl_by_value {
    ($($t:ty),* $(,)?) => {$(
        impl DeepHash for $t {
            #[inline]
            fn deep_hash<H: Hasher>(&self, state: &mut H) {
                Hash::hash(self, state);
            }
        }
        impl DeepEq for $t {
            #[inline]
            fn deep_eq(&self, other: &Self) -> bool {
                *self == *other
            }
        }
        impl DeepClone for $t {
            #[inline]
            fn deep_clone(&self) -> Self {
                *self
            }
        }
    )*};
}

impl_by_value!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize,
);

// Floats compare so that the relation stays an equivalence: every NaN equals
// every other NaN, and the two zeros are equal. The digest follows suit.
macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl DeepHash for $t {
            fn deep_hash<H: Hasher>(&self, state: &mut H) {
                let canonical = if self.is_nan() {
                    <$t>::NAN
                } else if *self == 0.0 {
                    0.0
                } else {
                    *self
                };
                canonical.to_bits().hash(state);
            }
        }
        impl DeepEq for $t {
            fn deep_eq(&self, other: &Self) -> bool {
                self == other || (self.is_nan() && other.is_nan())
            }
        }
        impl DeepClone for $t {
            #[inline]
            fn deep_clone(&self) -> Self {
                *self
            }
        }
    )*};
}

impl_float!(f32, f64);

impl DeepHash for str {
    #[inline]
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        Hash::hash(self, state);
    }
}

impl DeepEq for str {
    #[inline]
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl DeepHash for String {
    #[inline]
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().deep_hash(state);
    }
}

impl DeepEq for String {
    #[inline]
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl DeepClone for String {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized + DeepHash> DeepHash for Box<T> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        (**self).deep_hash(state);
    }
}

impl<T: ?Sized + DeepEq> DeepEq for Box<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        (**self).deep_eq(&**other)
    }
}

impl<T: DeepClone> DeepClone for Box<T> {
    fn deep_clone(&self) -> Self {
        Box::new((**self).deep_clone())
    }
}

impl<T: ?Sized + DeepHash> DeepHash for Rc<T> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        (**self).deep_hash(state);
    }
}

impl<T: ?Sized + DeepEq> DeepEq for Rc<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).deep_eq(&**other)
    }
}

impl<T: DeepClone> DeepClone for Rc<T> {
    fn deep_clone(&self) -> Self {
        Rc::new((**self).deep_clone())
    }
}

// A mutably borrowed cell panics here; that is the collaborator failing and
// it propagates to the caller unchanged.
impl<T: ?Sized + DeepHash> DeepHash for RefCell<T> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        self.borrow().deep_hash(state);
    }
}

impl<T: ?Sized + DeepEq> DeepEq for RefCell<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other) || self.borrow().deep_eq(&*other.borrow())
    }
}

impl<T: DeepClone> DeepClone for RefCell<T> {
    fn deep_clone(&self) -> Self {
        RefCell::new(self.borrow().deep_clone())
    }
}

impl<T: DeepHash> DeepHash for Option<T> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        match self {
            None => state.write_u8(0),
            Some(v) => {
                state.write_u8(1);
                v.deep_hash(state);
            }
        }
    }
}

impl<T: DeepEq> DeepEq for Option<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.deep_eq(b),
            _ => false,
        }
    }
}

impl<T: DeepClone> DeepClone for Option<T> {
    fn deep_clone(&self) -> Self {
        self.as_ref().map(DeepClone::deep_clone)
    }
}

impl<T: DeepHash> DeepHash for [T] {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        hash_seq(self.len(), self.iter(), state);
    }
}

impl<T: DeepEq> DeepEq for [T] {
    fn deep_eq(&self, other: &Self) -> bool {
        eq_seq(self.len(), self.iter(), other.len(), other.iter())
    }
}

impl<T: DeepHash> DeepHash for Vec<T> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().deep_hash(state);
    }
}

impl<T: DeepEq> DeepEq for Vec<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.as_slice().deep_eq(other.as_slice())
    }
}

impl<T: DeepClone> DeepClone for Vec<T> {
    fn deep_clone(&self) -> Self {
        self.iter().map(DeepClone::deep_clone).collect()
    }
}

impl<T: DeepHash> DeepHash for VecDeque<T> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        hash_seq(self.len(), self.iter(), state);
    }
}

impl<T: DeepEq> DeepEq for VecDeque<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        eq_seq(self.len(), self.iter(), other.len(), other.iter())
    }
}

impl<T: DeepClone> DeepClone for VecDeque<T> {
    fn deep_clone(&self) -> Self {
        self.iter().map(DeepClone::deep_clone).collect()
    }
}

impl<T: DeepHash, const N: usize> DeepHash for [T; N] {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().deep_hash(state);
    }
}

impl<T: DeepEq, const N: usize> DeepEq for [T; N] {
    fn deep_eq(&self, other: &Self) -> bool {
        self.as_slice().deep_eq(other.as_slice())
    }
}

impl<T: DeepClone, const N: usize> DeepClone for [T; N] {
    fn deep_clone(&self) -> Self {
        core::array::from_fn(|i| self[i].deep_clone())
    }
}

macro_rules! impl_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: DeepHash),+> DeepHash for ($($name,)+) {
            fn deep_hash<H: Hasher>(&self, state: &mut H) {
                $(self.$idx.deep_hash(state);)+
            }
        }
        impl<$($name: DeepEq),+> DeepEq for ($($name,)+) {
            fn deep_eq(&self, other: &Self) -> bool {
                $(self.$idx.deep_eq(&other.$idx))&&+
            }
        }
        impl<$($name: DeepClone),+> DeepClone for ($($name,)+) {
            fn deep_clone(&self) -> Self {
                ($(self.$idx.deep_clone(),)+)
            }
        }
    };
}

impl_tuple!(A 0);
impl_tuple!(A 0, B 1);
impl_tuple!(A 0, B 1, C 2);
impl_tuple!(A 0, B 1, C 2, D 3);

// Sorted containers iterate in key order, so a positional walk is already
// independent of insertion order.
impl<K: DeepHash, V: DeepHash> DeepHash for BTreeMap<K, V> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for (k, v) in self {
            k.deep_hash(state);
            v.deep_hash(state);
        }
    }
}

impl<K: DeepEq, V: DeepEq> DeepEq for BTreeMap<K, V> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ka, va), (kb, vb))| ka.deep_eq(kb) && va.deep_eq(vb))
    }
}

impl<K: DeepClone + Ord, V: DeepClone> DeepClone for BTreeMap<K, V> {
    fn deep_clone(&self) -> Self {
        self.iter()
            .map(|(k, v)| (k.deep_clone(), v.deep_clone()))
            .collect()
    }
}

impl<T: DeepHash> DeepHash for BTreeSet<T> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        hash_seq(self.len(), self.iter(), state);
    }
}

impl<T: DeepEq> DeepEq for BTreeSet<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        eq_seq(self.len(), self.iter(), other.len(), other.iter())
    }
}

impl<T: DeepClone + Ord> DeepClone for BTreeSet<T> {
    fn deep_clone(&self) -> Self {
        self.iter().map(DeepClone::deep_clone).collect()
    }
}

// Hashed containers: lookups go through the key's own `Eq`/`Hash`, values
// are compared deeply.
impl<K: DeepHash, V: DeepHash, S> DeepHash for HashMap<K, V, S> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        hash_unordered(
            self.len(),
            self.iter(),
            |(k, v), h| {
                k.deep_hash(h);
                v.deep_hash(h);
            },
            state,
        );
    }
}

impl<K, V, S> DeepEq for HashMap<K, V, S>
where
    K: Eq + Hash,
    V: DeepEq,
    S: BuildHasher,
{
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| v.deep_eq(ov)))
    }
}

impl<K, V, S> DeepClone for HashMap<K, V, S>
where
    K: DeepClone + Eq + Hash,
    V: DeepClone,
    S: BuildHasher + Clone,
{
    fn deep_clone(&self) -> Self {
        let mut out = HashMap::with_capacity_and_hasher(self.len(), self.hasher().clone());
        for (k, v) in self {
            out.insert(k.deep_clone(), v.deep_clone());
        }
        out
    }
}

impl<T: DeepHash, S> DeepHash for HashSet<T, S> {
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        hash_unordered(self.len(), self.iter(), |t, h| t.deep_hash(h), state);
    }
}

impl<T, S> DeepEq for HashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|t| other.contains(t))
    }
}

impl<T, S> DeepClone for HashSet<T, S>
where
    T: DeepClone + Eq + Hash,
    S: BuildHasher + Clone,
{
    fn deep_clone(&self) -> Self {
        let mut out = HashSet::with_capacity_and_hasher(self.len(), self.hasher().clone());
        for t in self {
            out.insert(t.deep_clone());
        }
        out
    }
}

/// Adapter for plain record types that already implement `Hash`, `Eq` and
/// `Clone`: hashing, equality and copying go through those impls.
///
/// Suitable when the type owns all of its data. A record holding `Rc`
/// links or floats should use [`deep_record!`](crate::deep_record) instead.
///
/// ```
/// use deep_set::{ByValue, DeepSet};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let mut set = DeepSet::new();
/// set.add(ByValue(Point { x: 1, y: 2 })).add(ByValue(Point { x: 1, y: 2 }));
/// assert_eq!(set.len(), 1);
/// assert!(set.contains(&ByValue(Point { x: 1, y: 2 })));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ByValue<T>(pub T);

impl<T> ByValue<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for ByValue<T> {
    fn from(value: T) -> Self {
        ByValue(value)
    }
}

impl<T> core::ops::Deref for ByValue<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Hash> DeepHash for ByValue<T> {
    #[inline]
    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T: Eq> DeepEq for ByValue<T> {
    #[inline]
    fn deep_eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Clone> DeepClone for ByValue<T> {
    #[inline]
    fn deep_clone(&self) -> Self {
        ByValue(self.0.clone())
    }
}

/// Implements `DeepHash`, `DeepEq` and `DeepClone` for a struct, field by
/// field. Every field must be listed; each field type must itself be
/// structural.
///
/// ```
/// use deep_set::{deep_record, DeepSet};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// struct Sample {
///     label: String,
///     weight: f64,
///     tags: Rc<RefCell<Vec<String>>>,
/// }
/// deep_record!(Sample { label, weight, tags });
///
/// let make = || Sample {
///     label: "a".into(),
///     weight: 0.5,
///     tags: Rc::new(RefCell::new(vec!["t".into()])),
/// };
/// let mut set = DeepSet::new();
/// set.add(make()).add(make());
/// assert_eq!(set.len(), 1);
/// ```
#[macro_export]
macro_rules! deep_record {
    ($ty:ident { $($field:ident),+ $(,)? }) => {
        impl $crate::DeepHash for $ty {
            fn deep_hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                $( $crate::DeepHash::deep_hash(&self.$field, state); )+
            }
        }
        impl $crate::DeepEq for $ty {
            fn deep_eq(&self, other: &Self) -> bool {
                true $( && $crate::DeepEq::deep_eq(&self.$field, &other.$field) )+
            }
        }
        impl $crate::DeepClone for $ty {
            fn deep_clone(&self) -> Self {
                $ty {
                    $( $field: $crate::DeepClone::deep_clone(&self.$field), )+
                }
            }
        }
    };
}
