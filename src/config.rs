use crate::{align::DSIZE, error::AllocError};

/// Size of the first heap extension made by init.
pub const INIT_CHUNK: usize = 1 << 6;

/// Minimum growth when no free block fits.
pub const CHUNK: usize = 1 << 12;

/// Slack added to every resize target.
pub const REALLOC_BUFFER: usize = 1 << 7;

/// Tuning knobs for the allocator.
///
/// None of these affect correctness, only how eagerly the arena grows and how
/// aggressively resizes reserve room to grow in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub initial_chunk: usize,
  pub chunk: usize,
  pub realloc_buffer: usize,
  /// The successor of a resized block is tagged when the slack left in the
  /// block drops below `tag_threshold * realloc_buffer`.
  pub tag_threshold: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      initial_chunk: INIT_CHUNK,
      chunk: CHUNK,
      realloc_buffer: REALLOC_BUFFER,
      tag_threshold: 2,
    }
  }
}

impl Config {
  pub fn with_initial_chunk(
    mut self,
    bytes: usize,
  ) -> Self {
    self.initial_chunk = bytes;
    self
  }

  pub fn with_chunk(
    mut self,
    bytes: usize,
  ) -> Self {
    self.chunk = bytes;
    self
  }

  pub fn with_realloc_buffer(
    mut self,
    bytes: usize,
  ) -> Self {
    self.realloc_buffer = bytes;
    self
  }

  pub fn with_tag_threshold(
    mut self,
    factor: usize,
  ) -> Self {
    self.tag_threshold = factor;
    self
  }

  pub fn validate(&self) -> Result<(), AllocError> {
    if self.initial_chunk == 0 || self.initial_chunk % DSIZE != 0 {
      return Err(AllocError::InvalidConfig(
        "initial chunk must be a non-zero multiple of 8",
      ));
    }
    if self.chunk == 0 || self.chunk % DSIZE != 0 {
      return Err(AllocError::InvalidConfig(
        "chunk must be a non-zero multiple of 8",
      ));
    }
    if self.realloc_buffer % DSIZE != 0 {
      return Err(AllocError::InvalidConfig(
        "realloc buffer must be a multiple of 8",
      ));
    }
    if u32::try_from(self.chunk.max(self.initial_chunk)).is_err() {
      return Err(AllocError::InvalidConfig("chunk does not fit in a block"));
    }
    Ok(())
  }

  pub(crate) fn tag_slack(&self) -> usize {
    self.tag_threshold.saturating_mul(self.realloc_buffer)
  }
}
