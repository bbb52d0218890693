//! Construction errors.

use core::fmt;

/// Raised only when building a set from a dynamic value that cannot be
/// iterated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeepSetError {
    /// The initial collection was present but not iterable. `found` names
    /// the kind of value that was supplied (e.g. `"object"`).
    InvalidArgument { found: &'static str },
}

impl fmt::Display for DeepSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeepSetError::InvalidArgument { found } => write!(
                f,
                "DeepSet constructor received a non iterable argument ({found})"
            ),
        }
    }
}

impl std::error::Error for DeepSetError {}
