//! Boundary-tag block layout.
//!
//! ```text
//!   Allocated block:
//!   ┌────────┬───────────────────────────────────────┬────────┐
//!   │ header │               payload                 │ footer │
//!   └────────┴───────────────────────────────────────┴────────┘
//!            ▲ block offset
//!
//!   Free block:
//!   ┌────────┬────────┬────────┬─────────────────────┬────────┐
//!   │ header │  prev  │  next  │      (unused)       │ footer │
//!   └────────┴────────┴────────┴─────────────────────┴────────┘
//!
//!   Header / footer word:
//!   ┌──────────────────────────────────────┬───┬───┬───┐
//!   │           size (multiple of 8)       │ 0 │ R │ A │
//!   └──────────────────────────────────────┴───┴───┴───┘
//!     A: allocated    R: reallocation tag (header only)
//! ```
//!
//! A block is named by the offset of its payload. The free-list links only
//! exist while the allocated bit is clear; once a block is handed out those
//! bytes belong to the caller.

use crate::align::{DSIZE, WSIZE};

/// Header, two links and footer.
pub const MIN_BLOCK_SIZE: usize = 2 * DSIZE;

/// Largest size or offset a header word can encode.
pub const MAX_BLOCK_SIZE: usize = (u32::MAX & !0x7) as usize;

const ALLOC_BIT: u32 = 0x1;
const TAG_BIT: u32 = 0x2;
const SIZE_MASK: u32 = !0x7;

/// Link value meaning "end of list". Offset 0 is the alignment pad word and
/// can never be a payload.
const NIL: u32 = 0;

/// Decoded header or footer word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
  pub size: usize,
  pub allocated: bool,
  pub tagged: bool,
}

impl Tag {
  pub fn new(
    size: usize,
    allocated: bool,
  ) -> Self {
    Self {
      size,
      allocated,
      tagged: false,
    }
  }

  pub fn pack(self) -> u32 {
    debug_assert_eq!(self.size % DSIZE, 0);
    debug_assert!(self.size <= SIZE_MASK as usize);

    let mut word = self.size as u32;
    if self.allocated {
      word |= ALLOC_BIT;
    }
    if self.tagged {
      word |= TAG_BIT;
    }
    word
  }

  pub fn unpack(word: u32) -> Self {
    Self {
      size: (word & SIZE_MASK) as usize,
      allocated: word & ALLOC_BIT != 0,
      tagged: word & TAG_BIT != 0,
    }
  }
}

pub fn get(
  mem: &[u8],
  offset: usize,
) -> u32 {
  let mut word = [0u8; WSIZE];
  word.copy_from_slice(&mem[offset..offset + WSIZE]);
  u32::from_ne_bytes(word)
}

pub fn put(
  mem: &mut [u8],
  offset: usize,
  word: u32,
) {
  mem[offset..offset + WSIZE].copy_from_slice(&word.to_ne_bytes());
}

/// Free-list neighbours of a free block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Links {
  pub prev: Option<Block>,
  pub next: Option<Block>,
}

fn decode_link(word: u32) -> Option<Block> {
  (word != NIL).then(|| Block(word as usize))
}

fn encode_link(link: Option<Block>) -> u32 {
  link.map_or(NIL, |block| block.0 as u32)
}

/// Handle to a block, by payload offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(usize);

impl Block {
  pub const fn new(offset: usize) -> Self {
    debug_assert!(offset % DSIZE == 0);
    Self(offset)
  }

  pub const fn offset(self) -> usize {
    self.0
  }

  pub fn header(self) -> usize {
    self.0 - WSIZE
  }

  pub fn footer(
    self,
    mem: &[u8],
  ) -> usize {
    self.0 + self.size(mem) - DSIZE
  }

  pub fn tag(
    self,
    mem: &[u8],
  ) -> Tag {
    Tag::unpack(get(mem, self.header()))
  }

  pub fn footer_tag(
    self,
    mem: &[u8],
  ) -> Tag {
    Tag::unpack(get(mem, self.footer(mem)))
  }

  pub fn size(
    self,
    mem: &[u8],
  ) -> usize {
    self.tag(mem).size
  }

  pub fn is_allocated(
    self,
    mem: &[u8],
  ) -> bool {
    self.tag(mem).allocated
  }

  pub fn is_tagged(
    self,
    mem: &[u8],
  ) -> bool {
    self.tag(mem).tagged
  }

  /// The epilogue is the only block of size zero.
  pub fn is_epilogue(
    self,
    mem: &[u8],
  ) -> bool {
    self.size(mem) == 0
  }

  pub fn next(
    self,
    mem: &[u8],
  ) -> Block {
    Block(self.0 + self.size(mem))
  }

  /// Reads the previous block's footer, which sits right below our header.
  pub fn prev(
    self,
    mem: &[u8],
  ) -> Block {
    let size = Tag::unpack(get(mem, self.0 - DSIZE)).size;
    Block(self.0 - size)
  }

  /// Rewrites header and footer, keeping whatever reallocation tag the
  /// header carried. The footer never carries the tag.
  pub fn write(
    self,
    mem: &mut [u8],
    size: usize,
    allocated: bool,
  ) {
    let tagged = self.is_tagged(mem);
    self.write_tag(mem, size, allocated, tagged);
  }

  /// Rewrites header and footer and clears the reallocation tag.
  pub fn write_untagged(
    self,
    mem: &mut [u8],
    size: usize,
    allocated: bool,
  ) {
    self.write_tag(mem, size, allocated, false);
  }

  fn write_tag(
    self,
    mem: &mut [u8],
    size: usize,
    allocated: bool,
    tagged: bool,
  ) {
    let tag = Tag {
      size,
      allocated,
      tagged,
    };
    put(mem, self.header(), tag.pack());
    put(mem, self.0 + size - DSIZE, Tag::new(size, allocated).pack());
  }

  /// Writes a zero-size allocated header at this position.
  pub fn write_epilogue(
    self,
    mem: &mut [u8],
  ) {
    put(mem, self.header(), Tag::new(0, true).pack());
  }

  pub fn set_tagged(
    self,
    mem: &mut [u8],
    tagged: bool,
  ) {
    let word = get(mem, self.header());
    let word = if tagged {
      word | TAG_BIT
    } else {
      word & !TAG_BIT
    };
    put(mem, self.header(), word);
  }

  pub fn links(
    self,
    mem: &[u8],
  ) -> Links {
    debug_assert!(!self.is_allocated(mem));
    Links {
      prev: decode_link(get(mem, self.0)),
      next: decode_link(get(mem, self.0 + WSIZE)),
    }
  }

  pub fn set_links(
    self,
    mem: &mut [u8],
    links: Links,
  ) {
    self.set_prev(mem, links.prev);
    self.set_next(mem, links.next);
  }

  pub fn set_prev(
    self,
    mem: &mut [u8],
    prev: Option<Block>,
  ) {
    put(mem, self.0, encode_link(prev));
  }

  pub fn set_next(
    self,
    mem: &mut [u8],
    next: Option<Block>,
  ) {
    put(mem, self.0 + WSIZE, encode_link(next));
  }
}
