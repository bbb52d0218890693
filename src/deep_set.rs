//! DeepSet: digest-bucketed set with deep-equality membership.

use crate::probe_guard::ProbeGuard;
use crate::structural::{digest_with, DeepClone, DeepEq, Structural};
use core::fmt;
use core::hash::BuildHasher;
use core::iter::FusedIterator;
use core::ops::Deref;
use hashbrown::hash_table::{self, HashTable};
use std::collections::hash_map::RandomState;

/// Copy policy, fixed when the set is built.
///
/// `copy_on_insert` deep-copies every value before it is stored, so nothing
/// the caller still holds aliases an entry. `copy_on_read` hands out deep
/// copies from enumeration instead of shared borrows.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Options {
    pub copy_on_insert: bool,
    pub copy_on_read: bool,
}

impl Options {
    /// Both directions on or both off.
    pub const fn clone_deep(enabled: bool) -> Self {
        Self {
            copy_on_insert: enabled,
            copy_on_read: enabled,
        }
    }

    /// No copies in either direction; entries may share `Rc` substructure
    /// with the caller.
    pub const fn shared() -> Self {
        Self::clone_deep(false)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::clone_deep(true)
    }
}

/// All stored values sharing one digest. Never empty while in the table.
struct Bucket<T> {
    digest: u64,
    entries: Vec<T>,
}

impl<T: DeepClone> Clone for Bucket<T> {
    fn clone(&self) -> Self {
        Self {
            digest: self.digest,
            entries: self.entries.iter().map(DeepClone::deep_clone).collect(),
        }
    }
}

// Structural layer: digest -> bucket plus the size counter. Callers compute
// the digest; nothing here touches the hasher.
struct Table<T> {
    buckets: HashTable<Bucket<T>>,
    size: usize,
}

impl<T: DeepClone> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            size: self.size,
        }
    }
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            buckets: HashTable::new(),
            size: 0,
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
        self.size = 0;
    }

    fn raw_iter(&self) -> RawIter<'_, T> {
        RawIter {
            buckets: self.buckets.iter(),
            current: Default::default(),
            remaining: self.size,
        }
    }
}

impl<T: DeepEq> Table<T> {
    fn contains(&self, digest: u64, probe: &T) -> bool {
        self.buckets
            .find(digest, |b| b.digest == digest)
            .is_some_and(|b| b.entries.iter().any(|e| probe.deep_eq(e)))
    }

    /// Returns false when a deep-equal entry already exists.
    fn insert(&mut self, digest: u64, candidate: T) -> bool {
        match self
            .buckets
            .entry(digest, |b| b.digest == digest, |b| b.digest)
        {
            hash_table::Entry::Occupied(mut occupied) => {
                let bucket = occupied.get_mut();
                if bucket.entries.iter().any(|e| candidate.deep_eq(e)) {
                    return false;
                }
                bucket.entries.push(candidate);
                tracing::trace!(
                    digest,
                    bucket_len = bucket.entries.len(),
                    "digest collision: appended to existing bucket"
                );
            }
            hash_table::Entry::Vacant(vacant) => {
                let _ = vacant.insert(Bucket {
                    digest,
                    entries: vec![candidate],
                });
            }
        }
        self.size += 1;
        true
    }

    // A miss never reserves or rehashes.
    fn remove(&mut self, digest: u64, probe: &T) -> Option<T> {
        let mut occupied = self
            .buckets
            .find_entry(digest, |b| b.digest == digest)
            .ok()?;
        let bucket = occupied.get_mut();
        let pos = bucket.entries.iter().position(|e| probe.deep_eq(e))?;
        let removed = bucket.entries.remove(pos);
        if bucket.entries.is_empty() {
            let _ = occupied.remove();
            tracing::trace!(digest, "bucket emptied and dropped");
        }
        self.size -= 1;
        Some(removed)
    }
}

/// A set of values compared by structure rather than identity.
///
/// Each value's digest (its `DeepHash` fed through `S`) selects a bucket;
/// the bucket is scanned linearly with `DeepEq`, so two different values that
/// share a digest are both kept. Enumeration order is an artifact of the
/// table layout and carries no meaning.
pub struct DeepSet<T, S = RandomState> {
    hasher: S,
    table: Table<T>,
    options: Options,
    guard: ProbeGuard,
}

impl<T> DeepSet<T>
where
    T: Structural,
{
    pub fn new() -> Self {
        Self::with_options_and_hasher(Options::default(), Default::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self::with_options_and_hasher(options, Default::default())
    }

    /// Build from any finite sequence; later duplicates collapse into
    /// earlier ones.
    pub fn from_values<I>(initial: I, options: Options) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut set = Self::with_options(options);
        set.extend(initial);
        set
    }
}

impl<T, S> DeepSet<T, S>
where
    T: Structural,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_options_and_hasher(Options::default(), hasher)
    }

    pub fn with_options_and_hasher(options: Options, hasher: S) -> Self {
        Self {
            hasher,
            table: Table::new(),
            options,
            guard: ProbeGuard::new(),
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn len(&self) -> usize {
        self.table.size
    }

    pub fn is_empty(&self) -> bool {
        self.table.size == 0
    }

    /// Number of distinct digests currently stored. Equal to `len()` unless
    /// some values collide.
    pub fn bucket_count(&self) -> usize {
        self.table.buckets.len()
    }

    /// Insert `value`, returning true if no deep-equal element was present.
    pub fn insert(&mut self, value: T) -> bool {
        let _g = self.guard.enter("insert");
        let candidate = if self.options.copy_on_insert {
            value.deep_clone()
        } else {
            value
        };
        let digest = digest_with(&self.hasher, &candidate);
        self.table.insert(digest, candidate)
    }

    /// Chaining form of [`insert`](Self::insert).
    pub fn add(&mut self, value: T) -> &mut Self {
        self.insert(value);
        self
    }

    /// Insert every value in order. No short-circuit on duplicates.
    pub fn add_all<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
    {
        for v in values {
            self.insert(v);
        }
        self
    }

    /// Whether a deep-equal element is present. `value` is only read.
    pub fn contains(&self, value: &T) -> bool {
        let _g = self.guard.enter("contains");
        let digest = digest_with(&self.hasher, value);
        self.table.contains(digest, value)
    }

    /// Remove the element deep-equal to `value`, if any.
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Remove and return the stored element deep-equal to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let _g = self.guard.enter("take");
        let digest = digest_with(&self.hasher, value);
        self.table.remove(digest, value)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.table.clear();
        self
    }

    /// Every element once, walking buckets in table order and then each
    /// bucket in arrival order. Each call starts a fresh traversal.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            raw: self.table.raw_iter(),
            copy: self.options.copy_on_read,
        }
    }

    /// Same as [`iter`](Self::iter).
    pub fn keys(&self) -> Iter<'_, T> {
        self.iter()
    }

    /// Same as [`iter`](Self::iter).
    pub fn values(&self) -> Iter<'_, T> {
        self.iter()
    }

    /// Each element paired with itself. Under `copy_on_read` the two halves
    /// are separate deep copies.
    pub fn entries(&self) -> Entries<'_, T> {
        Entries {
            raw: self.table.raw_iter(),
            copy: self.options.copy_on_read,
        }
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(Member<'_, T>),
    {
        for m in self.iter() {
            f(m);
        }
    }

    /// `for_each` with an explicit receiver threaded through every call.
    pub fn for_each_with<C, F>(&self, ctx: &mut C, mut f: F)
    where
        F: FnMut(&mut C, Member<'_, T>),
    {
        for m in self.iter() {
            f(ctx, m);
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut total = 0;
        for bucket in self.table.buckets.iter() {
            assert!(!bucket.entries.is_empty(), "empty bucket left in table");
            for (i, e) in bucket.entries.iter().enumerate() {
                assert_eq!(
                    digest_with(&self.hasher, e),
                    bucket.digest,
                    "entry resides in the wrong bucket"
                );
                for other in &bucket.entries[i + 1..] {
                    assert!(!e.deep_eq(other), "deep-equal entries share a bucket");
                }
            }
            total += bucket.entries.len();
        }
        assert_eq!(total, self.table.size, "size out of sync with buckets");
    }
}

impl<T> Default for DeepSet<T>
where
    T: Structural,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Clone for DeepSet<T, S>
where
    T: Structural,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            table: self.table.clone(),
            options: self.options,
            guard: ProbeGuard::new(),
        }
    }
}

impl<T, S> Extend<T> for DeepSet<T, S>
where
    T: Structural,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}

impl<T> FromIterator<T> for DeepSet<T>
where
    T: Structural,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_values(iter, Options::default())
    }
}

impl<'a, T, S> IntoIterator for &'a DeepSet<T, S>
where
    T: Structural,
    S: BuildHasher,
{
    type Item = Member<'a, T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, S> fmt::Debug for DeepSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.raw_iter()).finish()
    }
}

/// Debug rendering of the contents, e.g. `DeepSet(1, 2)`. Not format-stable.
impl<T: fmt::Debug, S> fmt::Display for DeepSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeepSet(")?;
        for (i, e) in self.table.raw_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{e:?}")?;
        }
        f.write_str(")")
    }
}

/// An element handed out by enumeration: a borrow of the stored entry, or a
/// deep copy of it when the set copies on read.
pub enum Member<'a, T> {
    Shared(&'a T),
    Copied(T),
}

impl<'a, T: DeepClone> Member<'a, T> {
    fn new(entry: &'a T, copy: bool) -> Self {
        if copy {
            Member::Copied(entry.deep_clone())
        } else {
            Member::Shared(entry)
        }
    }
}

impl<T> Member<'_, T> {
    pub fn is_copied(&self) -> bool {
        matches!(self, Member::Copied(_))
    }
}

impl<T: Clone> Member<'_, T> {
    /// Owned value. A shared member is cloned with `T::clone`, which keeps
    /// any `Rc` links to the stored entry.
    pub fn into_owned(self) -> T {
        match self {
            Member::Shared(r) => r.clone(),
            Member::Copied(v) => v,
        }
    }
}

impl<T> Deref for Member<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self {
            Member::Shared(r) => r,
            Member::Copied(v) => v,
        }
    }
}

impl<T> AsRef<T> for Member<'_, T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for Member<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: fmt::Display> fmt::Display for Member<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

// Borrowing walk over every stored entry.
struct RawIter<'a, T> {
    buckets: hash_table::Iter<'a, Bucket<T>>,
    current: core::slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for RawIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some(e);
            }
            self.current = self.buckets.next()?.entries.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Iterator over the elements of a `DeepSet`.
pub struct Iter<'a, T> {
    raw: RawIter<'a, T>,
    copy: bool,
}

impl<'a, T: DeepClone> Iterator for Iter<'a, T> {
    type Item = Member<'a, T>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|e| Member::new(e, self.copy))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T: DeepClone> ExactSizeIterator for Iter<'_, T> {}
impl<T: DeepClone> FusedIterator for Iter<'_, T> {}

/// Iterator over `(element, element)` pairs of a `DeepSet`.
pub struct Entries<'a, T> {
    raw: RawIter<'a, T>,
    copy: bool,
}

impl<'a, T: DeepClone> Iterator for Entries<'a, T> {
    type Item = (Member<'a, T>, Member<'a, T>);

    fn next(&mut self) -> Option<Self::Item> {
        self.raw
            .next()
            .map(|e| (Member::new(e, self.copy), Member::new(e, self.copy)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T: DeepClone> ExactSizeIterator for Entries<'_, T> {}
impl<T: DeepClone> FusedIterator for Entries<'_, T> {}
