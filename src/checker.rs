//! Heap consistency auditing.
//!
//! Nothing in the allocation paths calls this; it exists for tests and for
//! anyone debugging a corrupted arena.

use std::collections::{BTreeSet, HashSet};

use crate::{
  align::{DSIZE, WSIZE},
  arena::Arena,
  block::{Block, MIN_BLOCK_SIZE, Tag},
  buckets::{LIST_LIMIT, class_of},
  error::Violation,
  segregated::Allocator,
};

impl<A: Arena> Allocator<A> {
  /// Audits the whole arena and every bucket, stopping at the first
  /// violation.
  ///
  /// Two free blocks may sit next to each other only when the first one
  /// carries the reallocation tag, since coalescing deliberately leaves
  /// tagged blocks alone.
  pub fn check(&self) -> Result<(), Violation> {
    let mem = self.arena.bytes();
    let high = self.arena.high();

    if self.prologue.tag(mem) != Tag::new(DSIZE, true)
      || self.prologue.footer_tag(mem) != Tag::new(DSIZE, true)
    {
      return Err(Violation::BadPrologue);
    }

    let mut blocks = BTreeSet::new();
    let mut free = BTreeSet::new();
    let mut previous: Option<(Block, Tag)> = None;
    let mut cursor = self.prologue.next(mem);

    loop {
      if cursor.header() + WSIZE > high {
        return Err(Violation::OutOfBounds(cursor.offset()));
      }

      let tag = cursor.tag(mem);
      if tag.size == 0 {
        if !tag.allocated || cursor.header() + WSIZE != high {
          return Err(Violation::BadEpilogue(cursor.header()));
        }
        break;
      }

      if cursor.offset() % DSIZE != 0 {
        return Err(Violation::Misaligned(cursor.offset()));
      }
      if tag.size % DSIZE != 0 || tag.size < MIN_BLOCK_SIZE {
        return Err(Violation::BadSize {
          offset: cursor.offset(),
          size: tag.size,
        });
      }
      if cursor.offset() + tag.size > high {
        return Err(Violation::OutOfBounds(cursor.offset()));
      }

      let footer = cursor.footer_tag(mem);
      if footer.size != tag.size || footer.allocated != tag.allocated || footer.tagged {
        return Err(Violation::TagMismatch(cursor.offset()));
      }

      if !tag.allocated {
        if let Some((prev, prev_tag)) = previous {
          if !prev_tag.allocated && !prev_tag.tagged {
            return Err(Violation::AdjacentFree(prev.offset(), cursor.offset()));
          }
        }
        free.insert(cursor.offset());
      }

      blocks.insert(cursor.offset());
      previous = Some((cursor, tag));
      cursor = cursor.next(mem);
    }

    let mut listed = HashSet::new();
    for class in 0..LIST_LIMIT {
      self.check_bucket(class, &blocks, &mut listed)?;
    }

    match free.iter().find(|offset| !listed.contains(*offset)) {
      Some(offset) => Err(Violation::Unlisted(*offset)),
      None => Ok(()),
    }
  }

  fn check_bucket(
    &self,
    class: usize,
    blocks: &BTreeSet<usize>,
    listed: &mut HashSet<usize>,
  ) -> Result<(), Violation> {
    let mem = self.arena.bytes();
    let mut prev: Option<Block> = None;
    let mut last_size = 0;
    let mut cursor = self.buckets.head(class);

    while let Some(block) = cursor {
      if !blocks.contains(&block.offset()) {
        return Err(Violation::StrayLink {
          bucket: class,
          offset: block.offset(),
        });
      }
      if !listed.insert(block.offset()) {
        return Err(Violation::Cycle(class));
      }

      let tag = block.tag(mem);
      if tag.allocated {
        return Err(Violation::ListedAllocated(block.offset()));
      }

      let expected = class_of(tag.size);
      if expected != class {
        return Err(Violation::WrongBucket {
          offset: block.offset(),
          found: class,
          expected,
        });
      }
      if tag.size < last_size {
        return Err(Violation::Unordered(class));
      }

      let links = block.links(mem);
      if links.prev != prev {
        return Err(Violation::BrokenLink {
          bucket: class,
          offset: block.offset(),
        });
      }

      prev = Some(block);
      last_size = tag.size;
      cursor = links.next;
    }

    Ok(())
  }
}
