//! Arena providers.
//!
//! An arena is a contiguous byte range that only grows at its high end. The
//! allocator addresses it purely by offset, so a provider is free to move its
//! storage around as long as the bytes below the break are preserved.

use std::{mem, slice};

use crate::{align, align::DSIZE, error::ArenaError};

/// Default upper bound on an arena, 20 MiB.
pub const MAX_HEAP: usize = 20 * (1 << 20);

/// The growth primitive the allocator is built on.
pub trait Arena {
  /// Extends the break by `incr` bytes, rounded up to the double-word unit,
  /// and returns the offset at which the new region starts.
  ///
  /// On failure the arena is left untouched.
  fn grow(
    &mut self,
    incr: usize,
  ) -> Result<usize, ArenaError>;

  /// Offset of the first byte of the arena.
  fn low(&self) -> usize {
    0
  }

  /// Offset one past the last byte of the arena.
  fn high(&self) -> usize;

  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];

  /// Real address of offset 0. Always double-word aligned.
  fn base(&self) -> *const u8 {
    self.bytes().as_ptr()
  }
}

/// A bounded arena backed by a heap-allocated buffer.
///
/// The buffer is made of `u64`s so the base address is always 8-aligned.
#[derive(Debug, Clone)]
pub struct VecArena {
  words: Vec<u64>,
  max_heap: usize,
}

impl VecArena {
  pub fn new() -> Self {
    Self::with_max_heap(MAX_HEAP)
  }

  /// `max_heap` is rounded down to the double-word unit.
  pub fn with_max_heap(max_heap: usize) -> Self {
    Self {
      words: Vec::new(),
      max_heap: max_heap & !(DSIZE - 1),
    }
  }

  pub fn max_heap(&self) -> usize {
    self.max_heap
  }
}

impl Default for VecArena {
  fn default() -> Self {
    Self::new()
  }
}

impl Arena for VecArena {
  fn grow(
    &mut self,
    incr: usize,
  ) -> Result<usize, ArenaError> {
    let old = self.high();
    let available = self.max_heap - old;
    let incr = align::checked_align(incr)
      .filter(|incr| *incr <= available)
      .ok_or(ArenaError::Exhausted {
        requested: incr,
        available,
      })?;

    self.words.resize((old + incr) / mem::size_of::<u64>(), 0);
    Ok(old)
  }

  fn high(&self) -> usize {
    self.words.len() * mem::size_of::<u64>()
  }

  fn bytes(&self) -> &[u8] {
    // u8 has no invalid bit patterns and weaker alignment than u64.
    unsafe { slice::from_raw_parts(self.words.as_ptr() as *const u8, self.high()) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    let len = self.high();
    unsafe { slice::from_raw_parts_mut(self.words.as_mut_ptr() as *mut u8, len) }
  }
}

#[cfg(unix)]
pub use self::mmap::MmapArena;

#[cfg(unix)]
mod mmap {
  use std::{io, ptr, ptr::NonNull, slice};

  use libc::{
    MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap,
    munmap,
  };

  use super::{Arena, DSIZE};
  use crate::{align, error::ArenaError};

  /// An arena carved out of a private anonymous mapping.
  ///
  /// The whole capacity is reserved up front with `MAP_NORESERVE`; pages are
  /// only backed once the break moves over them and they are touched. The
  /// mapping never moves, so payload addresses stay stable for the lifetime
  /// of the arena.
  ///
  /// ```text
  ///   base                    break                     base + capacity
  ///   ├───────────────────────┼─────────────────────────────────┤
  ///   │     handed out        │         reserved, untouched     │
  ///   └───────────────────────┴─────────────────────────────────┘
  /// ```
  #[derive(Debug)]
  pub struct MmapArena {
    base: NonNull<u8>,
    brk: usize,
    capacity: usize,
  }

  impl MmapArena {
    /// Reserves `capacity` bytes of address space, rounded down to the
    /// double-word unit.
    pub fn reserve(capacity: usize) -> Result<Self, ArenaError> {
      let capacity = capacity & !(DSIZE - 1);
      if capacity == 0 {
        return Err(ArenaError::Map(io::Error::from(io::ErrorKind::InvalidInput)));
      }

      let address = unsafe {
        mmap(
          ptr::null_mut(),
          capacity,
          PROT_READ | PROT_WRITE,
          MAP_PRIVATE | MAP_ANONYMOUS | MAP_NORESERVE,
          -1,
          0,
        )
      };

      if address == MAP_FAILED {
        return Err(ArenaError::Map(io::Error::last_os_error()));
      }

      let base = NonNull::new(address as *mut u8)
        .ok_or_else(|| ArenaError::Map(io::Error::from(io::ErrorKind::AddrNotAvailable)))?;

      log::debug!("reserved {} bytes of address space at {:?}", capacity, base);

      Ok(Self {
        base,
        brk: 0,
        capacity,
      })
    }

    pub fn capacity(&self) -> usize {
      self.capacity
    }
  }

  impl Arena for MmapArena {
    fn grow(
      &mut self,
      incr: usize,
    ) -> Result<usize, ArenaError> {
      let available = self.capacity - self.brk;
      let incr = align::checked_align(incr)
        .filter(|incr| *incr <= available)
        .ok_or(ArenaError::Exhausted {
          requested: incr,
          available,
        })?;

      let old = self.brk;
      self.brk += incr;
      Ok(old)
    }

    fn high(&self) -> usize {
      self.brk
    }

    fn bytes(&self) -> &[u8] {
      unsafe { slice::from_raw_parts(self.base.as_ptr(), self.brk) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
      unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.brk) }
    }
  }

  impl Drop for MmapArena {
    fn drop(&mut self) {
      unsafe {
        munmap(self.base.as_ptr() as *mut c_void, self.capacity);
      }
    }
  }
}
