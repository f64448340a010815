//! Heap traversal and diagnostic printing.

use std::{fmt, iter};

use crate::{
  arena::Arena,
  buckets::LIST_LIMIT,
  segregated::{Allocator, Payload},
};

/// One block as seen by a linear walk of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub payload: Payload,
  pub size: usize,
  pub allocated: bool,
  pub tagged: bool,
}

/// Occupancy snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
  pub arena_bytes: usize,
  pub allocated_blocks: usize,
  pub allocated_bytes: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
}

impl Stats {
  /// Fraction of the arena covered by allocated blocks.
  pub fn utilisation(&self) -> f64 {
    if self.arena_bytes == 0 {
      return 0.0;
    }
    self.allocated_bytes as f64 / self.arena_bytes as f64
  }
}

impl<A: Arena> Allocator<A> {
  /// Walks the blocks between the prologue and the epilogue in address
  /// order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    let mem = self.arena.bytes();
    let mut cursor = self.prologue.next(mem);

    iter::from_fn(move || {
      let tag = cursor.tag(mem);
      if tag.size == 0 {
        return None;
      }

      let info = BlockInfo {
        payload: cursor.into(),
        size: tag.size,
        allocated: tag.allocated,
        tagged: tag.tagged,
      };
      cursor = cursor.next(mem);
      Some(info)
    })
  }

  /// Blocks filed in one size class, in list order.
  ///
  /// Follows the links blindly; use [`check`](Self::check) first on a heap
  /// that may be corrupt.
  pub fn bucket(
    &self,
    class: usize,
  ) -> impl Iterator<Item = Payload> + '_ {
    self
      .buckets
      .iter(self.arena.bytes(), class)
      .map(Payload::from)
  }

  pub fn stats(&self) -> Stats {
    self.blocks().fold(
      Stats {
        arena_bytes: self.arena.high() - self.arena.low(),
        ..Stats::default()
      },
      |mut stats, info| {
        if info.allocated {
          stats.allocated_blocks += 1;
          stats.allocated_bytes += info.size;
        } else {
          stats.free_blocks += 1;
          stats.free_bytes += info.size;
        }
        stats
      },
    )
  }
}

impl<A: Arena> fmt::Display for Allocator<A> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(
      f,
      "heap [{}, {}) prologue at {}",
      self.arena.low(),
      self.arena.high(),
      self.prologue.offset()
    )?;

    for info in self.blocks() {
      writeln!(
        f,
        "  {:>8}  {:>8}  {}{}",
        info.payload.offset(),
        info.size,
        if info.allocated { "alloc" } else { "free " },
        if info.tagged { "  [tagged]" } else { "" }
      )?;
    }

    write!(f, "buckets:")?;
    for class in 0..LIST_LIMIT {
      let count = self.bucket(class).count();
      if count > 0 {
        write!(f, " {}:{}", class, count)?;
      }
    }
    writeln!(f)
  }
}

#[cfg(test)]
mod tests {
  use crate::Allocator;

  #[test]
  fn test_stats_cover_whole_heap() {
    let mut allocator = Allocator::with_defaults().unwrap();
    allocator.allocate(24).unwrap();
    allocator.allocate(100).unwrap();

    let stats = allocator.stats();

    assert_eq!(stats.allocated_blocks, 2);
    assert_eq!(stats.allocated_bytes, 32 + 112);
    assert_eq!(stats.free_blocks, 1);
    // Pad, prologue and epilogue account for the remaining 16 bytes.
    assert_eq!(stats.allocated_bytes + stats.free_bytes + 16, stats.arena_bytes);
    assert!(stats.utilisation() > 0.0 && stats.utilisation() < 1.0);
  }

  #[test]
  fn test_display_lists_blocks_and_buckets() {
    let mut allocator = Allocator::with_defaults().unwrap();
    allocator.allocate(24).unwrap();

    let dump = allocator.to_string();

    assert!(dump.starts_with("heap [0, 80) prologue at 8"));
    assert!(dump.contains("      16        32  alloc"));
    assert!(dump.contains("      48        32  free"));
    assert!(dump.contains("buckets: 5:1"));
  }
}
