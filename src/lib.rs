//! # brkalloc - A Free-List Memory Allocator Library
//!
//! This crate provides a **free-list allocator** that manages a growable
//! arena carved out of the program break with `sbrk`, without relying on any
//! other allocator for its own bookkeeping.
//!
//! ## Overview
//!
//! Every chunk of the arena is a *block*: a one-word header recording the
//! block's total length followed by the payload handed to the caller.
//! Released blocks are threaded into a singly linked free list whose links
//! live inside the released payloads themselves:
//!
//! ```text
//!   Arena:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                                                                      │
//!   │   ┌──┬─────┬──┬──────────┬──┬───┬──┬───────────────────────────┐     │
//!   │   │h │ A1  │h │ free ────┼─►│A2 │h │ free (batch remainder)    │     │
//!   │   └──┴─────┴──┴──────────┴──┴───┴──┴───────────────────────────┘     │
//!   │                                                                 ▲    │
//!   │                                                                 │    │
//!   │                                                             Program  │
//!   │                                                              Break   │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   h = header (total block length), links stored in free payloads.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Word alignment (align!, checked_align)
//!   ├── block      - Header codec (internal)
//!   ├── free_list  - First-fit search, splitting, coalescing (internal)
//!   ├── arena      - Batched growth and trailing shrink (internal)
//!   ├── boundary   - Boundary trait, Sbrk and BufferBoundary
//!   ├── config     - ArenaOptions / ArenaConfig
//!   ├── error      - AllocError
//!   └── allocator  - FreeListAllocator
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkalloc::{ArenaConfig, BufferBoundary, FreeListAllocator};
//!
//! let boundary = BufferBoundary::new(64 * 1024);
//! let mut allocator = FreeListAllocator::with_boundary(boundary, ArenaConfig::default());
//!
//! let allocation = allocator.allocate(64).unwrap();
//! let ptr = allocation.as_ptr().unwrap().cast::<usize>();
//!
//! unsafe {
//!     ptr.write(42);
//!     assert_eq!(42, ptr.read());
//!     allocator.deallocate(allocation);
//! }
//! ```
//!
//! ## How It Works
//!
//! - **Allocate**: the request is rounded to a word and a header is added. The
//!   free list is searched first-fit; a block that is much too large is split
//!   and its tail goes back on the list.
//! - **Grow**: when nothing fits, small requests move the break by a whole
//!   batch (124 words by default) and keep the rest for later; large
//!   requests move it by exactly what they need.
//! - **Deallocate**: the block is pushed on the list, then free blocks that
//!   touch each other are merged until none do.
//! - **Shrink**: a free block ending exactly at the break and at least the
//!   shrink threshold (1024 bytes by default) is handed back with a negative
//!   `sbrk`.
//!
//! ```text
//!   Split:                          Coalesce:
//!
//!   ┌──┬──────────────────────┐     ┌──┬──────┐┌──┬──────┐
//!   │h │        free          │     │h │ free ││h │ free │
//!   └──┴──────────────────────┘     └──┴──────┘└──┴──────┘
//!              │                               │
//!              ▼                               ▼
//!   ┌──┬──────┬──┬────────────┐     ┌──┬────────────────┐
//!   │h │served│h │ remainder  │     │h │      free      │
//!   └──┴──────┴──┴────────────┘     └──┴────────────────┘
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: an allocator is `Send` but not `Sync`
//! - **Word alignment only**: payloads are aligned to `size_of::<usize>()`
//! - **Unix-only**: the crate binds `sbrk` through `libc`
//!
//! ## Safety
//!
//! Handing memory back is inherently unsafe: `deallocate`, `reallocate` and
//! `usable_size` trust that the allocation came from the same allocator and
//! is still live.

pub mod align;
mod allocator;
mod arena;
mod block;
mod boundary;
mod config;
mod error;
mod free_list;

pub use allocator::{Allocation, FreeListAllocator, FreeSpan};
pub use block::{LINK_SIZE, MIN_BLOCK_SIZE, OVERHEAD};
pub use boundary::{Boundary, BoundaryError, BufferBoundary, Sbrk};
pub use config::{ArenaConfig, ArenaOptions, DEFAULT_BATCH_SIZE, DEFAULT_SHRINK_THRESHOLD};
pub use error::{AllocError, Result};
