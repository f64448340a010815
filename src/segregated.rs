use crate::{
  align::{self, DSIZE, WSIZE},
  arena::{Arena, VecArena},
  block::{self, Block, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE},
  buckets::Buckets,
  config::Config,
  error::AllocError,
};

/// Handle to an allocated payload: its byte offset inside the arena.
///
/// Offsets are always multiples of 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Payload(usize);

impl Payload {
  pub fn offset(self) -> usize {
    self.0
  }
}

impl From<Block> for Payload {
  fn from(block: Block) -> Self {
    Payload(block.offset())
  }
}

impl From<Payload> for Block {
  fn from(payload: Payload) -> Self {
    Block::new(payload.0)
  }
}

/// Segregated-fits allocator over a single growable arena.
///
/// ```text
///   ┌─────┬────────────┬───────┬─────────┬───────┬─────────┬──────────┐
///   │ pad │  prologue  │ block │  block  │ block │   ...   │ epilogue │
///   │  0  │  8 / alloc │       │         │       │         │ 0 / alloc│
///   └─────┴────────────┴───────┴─────────┴───────┴─────────┴──────────┘
///   low                                                             high
/// ```
///
/// The sentinels mean every real block has a neighbour on both sides, so
/// coalescing never has to special-case the ends of the arena.
pub struct Allocator<A: Arena = VecArena> {
  pub(crate) arena: A,
  pub(crate) buckets: Buckets,
  pub(crate) config: Config,
  pub(crate) prologue: Block,
}

/// Block size needed to serve `size` payload bytes.
fn adjust(size: usize) -> Result<usize, AllocError> {
  if size <= DSIZE {
    return Ok(MIN_BLOCK_SIZE);
  }
  size
    .checked_add(DSIZE)
    .and_then(align::checked_align)
    .filter(|asize| *asize <= MAX_BLOCK_SIZE)
    .ok_or(AllocError::TooLarge { requested: size })
}

impl Allocator<VecArena> {
  /// Allocator over a fresh [`VecArena`] with the default limits.
  pub fn with_defaults() -> Result<Self, AllocError> {
    Self::new(VecArena::new())
  }
}

impl<A: Arena> Allocator<A> {
  pub fn new(arena: A) -> Result<Self, AllocError> {
    Self::with_config(arena, Config::default())
  }

  pub fn with_config(
    arena: A,
    config: Config,
  ) -> Result<Self, AllocError> {
    config.validate()?;

    let mut allocator = Self {
      arena,
      buckets: Buckets::new(),
      config,
      prologue: Block::new(DSIZE),
    };
    allocator.init()?;
    Ok(allocator)
  }

  /// Lays down the pad word and the sentinels at the current break, then
  /// grows by the initial chunk.
  fn init(&mut self) -> Result<(), AllocError> {
    self.buckets.clear();

    let start = self.grow_arena(4 * WSIZE)?;
    let mem = self.arena.bytes_mut();
    block::put(mem, start, 0);

    let prologue = Block::new(start + DSIZE);
    prologue.write_untagged(mem, DSIZE, true);
    prologue.next(mem).write_epilogue(mem);
    self.prologue = prologue;

    self.extend(self.config.initial_chunk)?;

    log::debug!(
      "initialised allocator, arena [{}, {})",
      self.arena.low(),
      self.arena.high()
    );
    Ok(())
  }

  fn grow_arena(
    &mut self,
    bytes: usize,
  ) -> Result<usize, AllocError> {
    self.arena.grow(bytes).map_err(|err| {
      log::warn!("arena refused to grow by {} bytes: {}", bytes, err);
      AllocError::from(err)
    })
  }

  /// Grows the arena by at least `bytes` and returns the resulting free
  /// block, already merged with a free block that ended at the old epilogue.
  pub(crate) fn extend(
    &mut self,
    bytes: usize,
  ) -> Result<Block, AllocError> {
    let size = align::checked_align(bytes)
      .map(|size| size.max(MIN_BLOCK_SIZE))
      .filter(|size| {
        self
          .arena
          .high()
          .checked_add(*size)
          .is_some_and(|end| end <= MAX_BLOCK_SIZE)
      })
      .ok_or(AllocError::TooLarge { requested: bytes })?;

    let old = self.grow_arena(size)?;
    debug_assert_eq!(self.arena.high(), old + size);

    // The new block's header lands on the old epilogue.
    let block = Block::new(old);
    let mem = self.arena.bytes_mut();
    block.write_untagged(mem, size, false);
    block.next(mem).write_epilogue(mem);
    self.buckets.insert(mem, block);

    log::debug!("extended arena by {} bytes, break at {}", size, self.arena.high());

    Ok(self.coalesce(block))
  }

  /// Allocates at least `size` bytes. A zero-sized request yields `Ok(None)`.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Option<Payload>, AllocError> {
    if size == 0 {
      return Ok(None);
    }

    let block = self.allocate_block(adjust(size)?)?;
    log::trace!("allocate({}) -> {}", size, block.offset());
    Ok(Some(block.into()))
  }

  fn allocate_block(
    &mut self,
    asize: usize,
  ) -> Result<Block, AllocError> {
    let block = match self.buckets.search(self.arena.bytes(), asize) {
      Some(block) => block,
      None => self.extend(asize.max(self.config.chunk))?,
    };
    Ok(self.place(block, asize))
  }

  /// Marks the first `asize` bytes of a free block allocated, splitting off
  /// the rest when it can stand as a block of its own.
  fn place(
    &mut self,
    block: Block,
    asize: usize,
  ) -> Block {
    let mem = self.arena.bytes_mut();
    let size = block.size(mem);
    debug_assert!(size >= asize);

    self.buckets.remove(mem, block);

    if size - asize >= MIN_BLOCK_SIZE {
      block.write(mem, asize, true);
      let rest = block.next(mem);
      rest.write_untagged(mem, size - asize, false);
      self.buckets.insert(mem, rest);
    } else {
      block.write(mem, size, true);
    }

    block
  }

  /// Frees a payload. `None` is a no-op.
  pub fn release(
    &mut self,
    payload: Option<Payload>,
  ) {
    let Some(payload) = payload else {
      return;
    };

    let block = Block::from(payload);
    let mem = self.arena.bytes_mut();
    debug_assert!(block.is_allocated(mem), "double release of {}", block.offset());

    let size = block.size(mem);
    block.write(mem, size, false);
    block.next(mem).set_tagged(mem, false);
    self.buckets.insert(mem, block);

    log::trace!("release({})", block.offset());

    self.coalesce(block);
  }

  /// Resizes a payload, moving it only when it cannot grow in place.
  ///
  /// `None` behaves like [`allocate`](Self::allocate) and a size of zero like
  /// [`release`](Self::release). On error the original payload is untouched.
  ///
  /// A block that already holds `size` bytes stays where it is. Otherwise the
  /// target is padded by the configured buffer. When the block is left
  /// with little slack, its successor is tagged so that nothing else claims
  /// it before the next resize:
  ///
  /// ```text
  ///   ┌────────────────────────┬───────────┐
  ///   │ payload ....... buffer │ successor │  <- tagged, kept for growth
  ///   └────────────────────────┴───────────┘
  /// ```
  pub fn resize(
    &mut self,
    payload: Option<Payload>,
    size: usize,
  ) -> Result<Option<Payload>, AllocError> {
    let Some(payload) = payload else {
      return self.allocate(size);
    };
    if size == 0 {
      self.release(Some(payload));
      return Ok(None);
    }

    let needed = adjust(size)?;
    let target = needed
      .checked_add(self.config.realloc_buffer)
      .filter(|target| *target <= MAX_BLOCK_SIZE)
      .ok_or(AllocError::TooLarge { requested: size })?;

    let block = Block::from(payload);
    let current = block.size(self.arena.bytes());

    let block = if current >= needed {
      block
    } else if let Some(block) = self.grow_in_place(block, target)? {
      log::debug!("resize({}, {}) grew in place", payload.offset(), size);
      block
    } else {
      let fresh = self.allocate_block(target)?;
      let len = (current - DSIZE).min(size);
      self
        .arena
        .bytes_mut()
        .copy_within(block.offset()..block.offset() + len, fresh.offset());
      self.release(Some(payload));

      log::debug!(
        "resize({}, {}) moved to {}",
        payload.offset(),
        size,
        fresh.offset()
      );
      fresh
    };

    let mem = self.arena.bytes_mut();
    if block.size(mem).saturating_sub(target) < self.config.tag_slack() {
      block.next(mem).set_tagged(mem, true);
    }

    log::trace!("resize({}, {}) -> {}", payload.offset(), size, block.offset());
    Ok(Some(block.into()))
  }

  /// Absorbs the free blocks after `block`, growing the arena first when
  /// they run up to the epilogue and still fall short. `None` when the
  /// block is hemmed in by an allocated neighbour.
  fn grow_in_place(
    &mut self,
    block: Block,
    target: usize,
  ) -> Result<Option<Block>, AllocError> {
    let current = block.size(self.arena.bytes());
    let (mut run, mut end) = self.free_run(block);

    if current + run < target {
      if !end.is_epilogue(self.arena.bytes()) {
        return Ok(None);
      }
      self.extend((target - current - run).max(self.config.chunk))?;
      (run, end) = self.free_run(block);
      if current + run < target {
        return Ok(None);
      }
    }

    let mem = self.arena.bytes_mut();
    let mut cursor = block.next(mem);
    while cursor != end {
      let next = cursor.next(mem);
      self.buckets.remove(mem, cursor);
      cursor = next;
    }
    block.write_untagged(mem, current + run, true);

    Ok(Some(block))
  }

  /// Total size of the free blocks right after `block`, and the first
  /// allocated block (or the epilogue) that ends the run.
  fn free_run(
    &self,
    block: Block,
  ) -> (usize, Block) {
    let mem = self.arena.bytes();
    let mut run = 0;
    let mut cursor = block.next(mem);
    while !cursor.is_allocated(mem) {
      run += cursor.size(mem);
      cursor = cursor.next(mem);
    }
    (run, cursor)
  }

  /// Bytes the caller may use at `payload`.
  pub fn usable_size(
    &self,
    payload: Payload,
  ) -> usize {
    Block::from(payload).size(self.arena.bytes()) - DSIZE
  }

  pub fn payload(
    &self,
    payload: Payload,
  ) -> &[u8] {
    let len = self.usable_size(payload);
    &self.arena.bytes()[payload.0..payload.0 + len]
  }

  pub fn payload_mut(
    &mut self,
    payload: Payload,
  ) -> &mut [u8] {
    let len = self.usable_size(payload);
    &mut self.arena.bytes_mut()[payload.0..payload.0 + len]
  }

  /// Real address of a payload, for callers that need a pointer.
  pub fn address(
    &self,
    payload: Payload,
  ) -> *const u8 {
    self.arena.base().wrapping_add(payload.0)
  }

  pub fn arena(&self) -> &A {
    &self.arena
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Drops all bookkeeping and hands the arena back.
  pub fn teardown(self) -> A {
    self.arena
  }
}
