//! # segalloc - A Segregated-Fits Memory Allocator Library
//!
//! This crate provides a **segregated free-list allocator** with boundary-tag
//! coalescing, built over a single arena that only ever grows at its high
//! end. All bookkeeping lives inside the arena itself.
//!
//! ## Overview
//!
//! Free blocks are filed into power-of-two size classes. An allocation starts
//! at the class matching the request and takes the first block that fits,
//! moving up a class when the current one has nothing suitable:
//!
//! ```text
//!   Size classes:
//!
//!   ┌────┬──────────────────────────────────────────────────────────────┐
//!   │ 4  │ [16,32)     ──► ▢ ──► ▢▢                                     │
//!   │ 5  │ [32,64)     ──► ▢▢▢                                          │
//!   │ 6  │ [64,128)    ──► ∅                                            │
//!   │ .. │                                                              │
//!   │ 19 │ [512K,∞)    ──► ▢▢▢▢▢▢▢▢▢▢▢▢▢▢▢▢▢▢▢▢                         │
//!   └────┴──────────────────────────────────────────────────────────────┘
//!
//!   Miss in every class -> grow the arena by max(request, 4 KiB).
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment macro (align!) and word sizes
//!   ├── arena      - Arena trait, VecArena, MmapArena (libc mmap)
//!   ├── block      - Header/footer boundary tags, free-list links (internal)
//!   ├── buckets    - Size-class index (internal)
//!   ├── coalesce   - Merging of adjacent free blocks (internal)
//!   ├── segregated - Allocator: allocate / release / resize
//!   ├── config     - Tuning knobs
//!   ├── error      - ArenaError, AllocError, Violation
//!   ├── checker    - Heap consistency audit
//!   └── walk       - Heap traversal, stats and printing
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::{Allocator, VecArena};
//!
//! let mut allocator = Allocator::new(VecArena::new()).unwrap();
//!
//! let p = allocator.allocate(100).unwrap().unwrap();
//! allocator.payload_mut(p)[..5].copy_from_slice(b"hello");
//!
//! // Grows in place when the neighbourhood allows it.
//! let p = allocator.resize(Some(p), 200).unwrap().unwrap();
//! assert_eq!(&allocator.payload(p)[..5], b"hello");
//!
//! allocator.release(Some(p));
//! allocator.check().unwrap();
//! ```
//!
//! ## How It Works
//!
//! Every block carries its size and allocated bit twice, in a header before
//! the payload and a footer after it, so both neighbours can be found in
//! constant time:
//!
//! ```text
//!   ┌────────┬──────────────────────────────┬────────┬────────┬─────────
//!   │ 32 | A │          payload             │ 32 | A │ 48 | - │  free...
//!   └────────┴──────────────────────────────┴────────┴────────┴─────────
//!                                                ▲        ▲
//!                               previous footer ─┘        └─ next header
//! ```
//!
//! Released blocks are merged with free neighbours right away, so no two
//! untagged free blocks are ever adjacent.
//!
//! Resizes pad their target with a buffer and tag the block that follows
//! when little slack is left. A tagged block is skipped by allocation and
//! never absorbed backwards by coalescing, so a payload that keeps growing a
//! few bytes at a time can expand into its neighbour instead of moving.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **One arena per allocator**: The arena never shrinks
//! - **4 GiB cap**: Sizes and offsets are stored in 32-bit words
//!
//! ## Addressing
//!
//! Payloads are identified by their byte offset in the arena, not by raw
//! pointers. [`Allocator::payload`] and [`Allocator::payload_mut`] give
//! bounds-checked access; [`Allocator::address`] turns an offset into a real
//! address when one is needed.

pub mod align;
pub mod arena;
mod block;
mod buckets;
mod checker;
mod coalesce;
pub mod config;
mod error;
mod segregated;
mod walk;

#[cfg(unix)]
pub use arena::MmapArena;
pub use arena::{Arena, MAX_HEAP, VecArena};
pub use buckets::{LIST_LIMIT, class_of};
pub use config::Config;
pub use error::{AllocError, ArenaError, Violation};
pub use segregated::{Allocator, Payload};
pub use walk::{BlockInfo, Stats};
