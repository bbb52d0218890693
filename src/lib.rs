//! deep-set: a single-threaded set whose membership test is deep structural
//! equality rather than identity.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: sub-linear membership for structurally compared values while
//!   staying exact when two different values share a digest.
//! - Layers:
//!   - `structural`: the collaborators. `DeepHash` feeds a value's shape
//!     into a hasher, `DeepEq` compares shapes, `DeepClone` copies without
//!     sharing mutable substructure. User records join through the
//!     `ByValue` wrapper or the `deep_record!` macro.
//!   - `Table<T>` (inside `deep_set`): a `hashbrown::HashTable` of buckets
//!     keyed by a precomputed `u64` digest, plus the size counter. It never
//!     calls the hasher; callers hand it the digest.
//!   - `DeepSet<T, S>`: public API. Applies the copy policy, computes the
//!     digest with `S`, and delegates to the table.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by design (no locking).
//! - `size` equals the sum of bucket lengths; no bucket is stored empty; no
//!   two entries of a bucket are deep-equal; every entry's digest maps it to
//!   the bucket holding it.
//! - Lookup cost is one table probe plus a linear scan of one bucket.
//!   Buckets are assumed small.
//! - Mutations either fully commit or leave the set unchanged.
//!
//! Copy policy
//! - `Options::copy_on_insert` deep-copies every inserted value, so caller
//!   state never aliases an entry. `Options::copy_on_read` makes enumeration
//!   yield deep copies instead of borrows. Both default to on and are fixed
//!   at construction.
//! - With copying off, entries may share `Rc` substructure with the caller;
//!   mutating it afterwards in a way that changes digest or equality breaks
//!   the bucket invariants.
//!
//! Reentrancy policy
//! - Each mutating or probing operation holds a debug-only guard while it
//!   runs collaborator code. A collaborator that calls back into the same
//!   set panics in debug builds. Enumeration and `for_each` do not hold the
//!   guard, so callbacks may query the set.
//!
//! Errors
//! - The only failure is `DeepSetError::InvalidArgument`, raised when a set is
//!   built from a dynamic JSON value that is not iterable. Collaborator
//!   panics propagate unchanged.
//!
//! Notes and non-goals
//! - Enumeration order is an artifact of the table layout, stable for a
//!   fixed state but otherwise unspecified. Insertion order is not kept.
//! - No concurrent mutation.

pub mod deep_set;
pub mod error;
#[cfg(feature = "json")]
pub mod json;
mod probe_guard;
pub mod structural;

#[cfg(test)]
mod deep_set_proptest;

// Public surface
pub use deep_set::{DeepSet, Entries, Iter, Member, Options};
pub use error::DeepSetError;
pub use structural::{ByValue, DeepClone, DeepEq, DeepHash, Structural};
