//! Segregated free lists.
//!
//! Bucket `i` holds free blocks whose size lies in `[2^i, 2^(i+1))`; the last
//! bucket takes everything larger. Each list is doubly linked through the
//! blocks' own payload and kept sorted by ascending size, so the first fit
//! found in a bucket is also the tightest one in that bucket.
//!
//! ```text
//!   heads
//!   ┌────┐
//!   │ 4  │──► [16] ◄─► [24] ◄─► [24]
//!   │ 5  │──► ∅
//!   │ 6  │──► [64] ◄─► [112]
//!   │ .. │
//!   │ 19 │──► [4096] ◄─► [1 MiB]
//!   └────┘
//! ```

use crate::block::{Block, Links};

/// Number of size classes.
pub const LIST_LIMIT: usize = 20;

/// Size class of a block: `floor(log2(size))`, capped at the last bucket.
pub fn class_of(size: usize) -> usize {
  if size <= 1 {
    return 0;
  }
  (size.ilog2() as usize).min(LIST_LIMIT - 1)
}

#[derive(Debug, Clone, Default)]
pub struct Buckets {
  heads: [Option<Block>; LIST_LIMIT],
}

impl Buckets {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&mut self) {
    self.heads = [None; LIST_LIMIT];
  }

  pub fn head(
    &self,
    class: usize,
  ) -> Option<Block> {
    self.heads[class]
  }

  /// Files a free block under the class of the size in its header, in front
  /// of the first block that is at least as large.
  pub fn insert(
    &mut self,
    mem: &mut [u8],
    block: Block,
  ) {
    let size = block.size(mem);
    let class = class_of(size);

    let mut prev = None;
    let mut cursor = self.heads[class];
    while let Some(current) = cursor {
      if current.size(mem) >= size {
        break;
      }
      prev = Some(current);
      cursor = current.links(mem).next;
    }

    block.set_links(
      mem,
      Links {
        prev,
        next: cursor,
      },
    );

    if let Some(next) = cursor {
      next.set_prev(mem, Some(block));
    }
    match prev {
      Some(prev) => prev.set_next(mem, Some(block)),
      None => self.heads[class] = Some(block),
    }
  }

  /// Unlinks a free block. Its header must still hold the size it was filed
  /// under.
  pub fn remove(
    &mut self,
    mem: &mut [u8],
    block: Block,
  ) {
    let class = class_of(block.size(mem));
    let Links { prev, next } = block.links(mem);

    match prev {
      Some(prev) => prev.set_next(mem, next),
      None => self.heads[class] = next,
    }
    if let Some(next) = next {
      next.set_prev(mem, prev);
    }
  }

  /// First block of at least `size` bytes, starting at the matching class
  /// and moving up. Blocks carrying a reallocation tag are skipped.
  pub fn search(
    &self,
    mem: &[u8],
    size: usize,
  ) -> Option<Block> {
    (class_of(size)..LIST_LIMIT).find_map(|class| {
      let mut cursor = self.heads[class];
      while let Some(block) = cursor {
        let tag = block.tag(mem);
        if tag.size >= size && !tag.tagged {
          return Some(block);
        }
        cursor = block.links(mem).next;
      }
      None
    })
  }

  /// Walks one bucket front to back.
  pub fn iter<'a>(
    &self,
    mem: &'a [u8],
    class: usize,
  ) -> impl Iterator<Item = Block> + 'a {
    let mut cursor = self.heads[class];
    std::iter::from_fn(move || {
      let block = cursor?;
      cursor = block.links(mem).next;
      Some(block)
    })
  }
}
