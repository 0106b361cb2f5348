/// Errors that abort a tick or a tree build.
///
/// Numerical edge cases met while evaluating forces (near-coincident bodies) are never reported
/// here; the offending pairwise contribution is skipped instead.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The bodies handed over cannot be used to build a tree, e.g. the collection is empty or a
    /// position is not finite.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value or a body mass is out of its valid range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The node arena could not grow.
    #[error("failed to allocate quadtree nodes")]
    Allocation,
}

impl From<std::collections::TryReserveError> for Error {
    #[inline]
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::Allocation
    }
}

/// Result type returned by fallible operations of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
