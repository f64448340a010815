//! Boundary-tag coalescing.
//!
//! ```text
//!   case       prev    next     result
//!   ─────────  ──────  ──────   ─────────────────────────────
//!   1          alloc   alloc    block unchanged
//!   2          alloc   free     block + next
//!   3          free    alloc    prev + block
//!   4          free    free     prev + block + next
//! ```
//!
//! A free predecessor that carries the reallocation tag counts as allocated:
//! the block in front of it was resized recently and may want to grow into
//! it. Free successors are absorbed as a run, so a tagged block that lost its
//! tag never stays stranded next to another free block.

use crate::{arena::Arena, block::Block, segregated::Allocator};

impl<A: Arena> Allocator<A> {
  /// Merges a free block that is already filed in its bucket with its free
  /// neighbours and refiles the result.
  pub(crate) fn coalesce(
    &mut self,
    block: Block,
  ) -> Block {
    let mem = self.arena.bytes_mut();

    let prev = block.prev(mem);
    let prev_tag = prev.tag(mem);
    let prev_free = !prev_tag.allocated && !prev_tag.tagged;
    let next_free = !block.next(mem).is_allocated(mem);

    let (start, mut size) = match (prev_free, next_free) {
      (false, false) => return block,
      (false, true) => {
        self.buckets.remove(mem, block);
        (block, block.size(mem))
      }
      (true, false) | (true, true) => {
        self.buckets.remove(mem, block);
        self.buckets.remove(mem, prev);
        (prev, prev.size(mem) + block.size(mem))
      }
    };

    let mut next = block.next(mem);
    while !next.is_allocated(mem) {
      self.buckets.remove(mem, next);
      size += next.size(mem);
      next = next.next(mem);
    }

    start.write(mem, size, false);
    self.buckets.insert(mem, start);

    log::trace!(
      "coalesced block {} into {} ({} bytes)",
      block.offset(),
      start.offset(),
      size
    );

    start
  }
}

#[cfg(test)]
mod tests {
  use crate::{Allocator, VecArena};

  fn layout(allocator: &Allocator<VecArena>) -> Vec<(usize, bool)> {
    allocator
      .blocks()
      .map(|info| (info.size, info.allocated))
      .collect()
  }

  #[test]
  fn test_release_merges_both_neighbours() {
    let mut allocator = Allocator::new(VecArena::new()).unwrap();
    let a = allocator.allocate(24).unwrap();
    let b = allocator.allocate(24).unwrap();
    let c = allocator.allocate(24).unwrap();
    let guard = allocator.allocate(24).unwrap();

    allocator.release(a);
    allocator.release(c);
    allocator.release(b);

    let blocks = layout(&allocator);
    assert_eq!(blocks[0], (96, false));
    assert_eq!(blocks[1], (32, true));
    assert_eq!(allocator.blocks().nth(1).map(|info| info.payload), guard);
    allocator.check().unwrap();
  }

  #[test]
  fn test_tagged_predecessor_is_not_absorbed() {
    let mut allocator = Allocator::new(VecArena::new()).unwrap();
    let p = allocator.allocate(200).unwrap();
    let x = allocator.allocate(24).unwrap();
    let y = allocator.allocate(24).unwrap();
    let _guard = allocator.allocate(24).unwrap();

    // A resize that already fits leaves no slack, so the free `x` after
    // `p` gets tagged. Freeing `y` must not swallow it.
    allocator.release(x);
    assert_eq!(allocator.resize(p, 72).unwrap(), p);
    allocator.release(y);

    let after: Vec<_> = allocator.blocks().take(3).collect();
    assert!(after[1].tagged && !after[1].allocated);
    assert!(!after[2].allocated && !after[2].tagged);
    allocator.check().unwrap();

    // Releasing `p` clears the tag and merges the whole run.
    allocator.release(p);
    let first = allocator.blocks().next().unwrap();
    assert_eq!((first.size, first.allocated, first.tagged), (272, false, false));
    allocator.check().unwrap();
  }
}
