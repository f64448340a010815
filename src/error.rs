use std::io;

use thiserror::Error;

/// Failure reported by an [`Arena`](crate::Arena) provider.
#[derive(Debug, Error)]
pub enum ArenaError {
  #[error("arena exhausted: requested {requested} bytes, {available} available")]
  Exhausted { requested: usize, available: usize },

  #[error("failed to map arena: {0}")]
  Map(#[source] io::Error),
}

/// Failure of an allocator operation.
///
/// A zero-sized request is not an error; it yields `Ok(None)`.
#[derive(Debug, Error)]
pub enum AllocError {
  #[error(transparent)]
  Arena(#[from] ArenaError),

  #[error("request of {requested} bytes exceeds the largest encodable block")]
  TooLarge { requested: usize },

  #[error("invalid configuration: {0}")]
  InvalidConfig(&'static str),
}

impl AllocError {
  /// True when the arena provider refused to grow.
  pub fn is_exhausted(&self) -> bool {
    matches!(self, AllocError::Arena(ArenaError::Exhausted { .. }))
  }
}

/// Inconsistency found by [`Allocator::check`](crate::Allocator::check).
///
/// Offsets are payload offsets unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("prologue is damaged")]
  BadPrologue,

  #[error("epilogue at header offset {0} is damaged")]
  BadEpilogue(usize),

  #[error("payload {0} is not double-word aligned")]
  Misaligned(usize),

  #[error("block {offset} has invalid size {size}")]
  BadSize { offset: usize, size: usize },

  #[error("block {0} runs past the end of the arena")]
  OutOfBounds(usize),

  #[error("block {0} header and footer disagree")]
  TagMismatch(usize),

  #[error("free blocks {0} and {1} are adjacent")]
  AdjacentFree(usize, usize),

  #[error("free block {0} is not in any bucket")]
  Unlisted(usize),

  #[error("block {offset} is filed in bucket {found}, expected {expected}")]
  WrongBucket {
    offset: usize,
    found: usize,
    expected: usize,
  },

  #[error("allocated block {0} is on a free list")]
  ListedAllocated(usize),

  #[error("bucket {0} is not sorted by size")]
  Unordered(usize),

  #[error("bucket {bucket} has a broken back-link at {offset}")]
  BrokenLink { bucket: usize, offset: usize },

  #[error("bucket {bucket} links to {offset}, which is not a block")]
  StrayLink { bucket: usize, offset: usize },

  #[error("bucket {0} contains a cycle")]
  Cycle(usize),
}
