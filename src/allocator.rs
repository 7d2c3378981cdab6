use core::ptr::{self, NonNull};

use tracing::trace;

use crate::{
  align,
  arena::Arena,
  block::{Block, OVERHEAD, block_size},
  boundary::{Boundary, Sbrk},
  config::ArenaConfig,
  error::{AllocError, Result},
  free_list::FreeList,
};

/// Outcome of a successful allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
  /// The handle for a zero-length request. It owns no memory.
  Empty,
  /// Payload of a live block.
  Block(NonNull<u8>),
}

impl Allocation {
  /// Wraps a raw payload pointer; null maps to [`Allocation::Empty`].
  pub fn from_ptr(ptr: *mut u8) -> Self {
    NonNull::new(ptr).map_or(Self::Empty, Self::Block)
  }

  pub fn as_ptr(self) -> Option<NonNull<u8>> {
    match self {
      Self::Empty => None,
      Self::Block(ptr) => Some(ptr),
    }
  }

  pub fn is_empty(self) -> bool {
    matches!(self, Self::Empty)
  }
}

/// A free block as seen from outside the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FreeSpan {
  /// Address of the block header.
  pub start: usize,
  /// Total length, header included.
  pub size: usize,
}

impl FreeSpan {
  pub fn end(&self) -> usize {
    self.start + self.size
  }
}

pub struct FreeListAllocator<B: Boundary = Sbrk> {
  free_list: FreeList,
  arena: Arena<B>,
}

unsafe impl<B: Boundary + Send> Send for FreeListAllocator<B> {}

impl FreeListAllocator<Sbrk> {
  /// Allocator over the process program break with the default policy.
  pub fn new() -> Self {
    Self::with_boundary(Sbrk, ArenaConfig::default())
  }
}

impl Default for FreeListAllocator<Sbrk> {
  fn default() -> Self {
    Self::new()
  }
}

impl<B: Boundary> FreeListAllocator<B> {
  pub fn with_boundary(
    boundary: B,
    config: ArenaConfig,
  ) -> Self {
    Self {
      free_list: FreeList::new(),
      arena: Arena::new(boundary, config),
    }
  }

  pub fn boundary(&self) -> &B {
    self.arena.boundary()
  }

  pub fn config(&self) -> &ArenaConfig {
    self.arena.config()
  }

  /// Current arena top.
  pub fn top(&self) -> usize {
    self.arena.boundary().current().addr()
  }

  /// Free blocks in list order.
  pub fn free_blocks(&self) -> impl Iterator<Item = FreeSpan> + '_ {
    self.free_list.iter().map(|block| FreeSpan {
      start: block.start(),
      size: unsafe { block.size() },
    })
  }

  /// Total bytes, headers included, sitting on the free list.
  pub fn free_bytes(&self) -> usize {
    self.free_blocks().map(|span| span.size).sum()
  }

  /// Allocates at least `size` bytes.
  ///
  /// A zero `size` yields [`Allocation::Empty`] without touching the arena.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Allocation> {
    if size == 0 {
      return Ok(Allocation::Empty);
    }

    let total = block_size(size).ok_or(AllocError::OutOfMemory { requested: size })?;

    let reused = if self.free_list.is_empty() {
      None
    } else {
      self.free_list.find_free_block(total)
    };

    let block = match reused {
      Some(block) => block,
      None => self.arena.grow(&mut self.free_list, total)?,
    };

    trace!(size, total, payload = ?block.payload(), "allocated");
    Ok(Allocation::Block(block.payload()))
  }

  /// Allocates room for `count` elements of `size` bytes, zeroed.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<Allocation> {
    let len = count
      .checked_mul(size)
      .ok_or(AllocError::Overflow { count, size })?;

    let allocation = self.allocate(len)?;
    if let Allocation::Block(payload) = allocation {
      // `allocate` already proved `align!(len)` fits the block.
      unsafe { payload.as_ptr().write_bytes(0, align!(len)) };
    }

    Ok(allocation)
  }

  /// Returns a block to the allocator.
  ///
  /// [`Allocation::Empty`] is ignored.
  ///
  /// # Safety
  ///
  /// `allocation` must come from this allocator and not have been
  /// deallocated or reallocated away since.
  pub unsafe fn deallocate(
    &mut self,
    allocation: Allocation,
  ) {
    let Allocation::Block(payload) = allocation else {
      return;
    };

    let block = unsafe { Block::from_payload(payload) };
    trace!(?payload, size = unsafe { block.size() }, "deallocated");
    unsafe { self.free_list.push(block) };
    self.settle();
  }

  /// Resizes an allocation to hold at least `new_size` bytes.
  ///
  /// Shrinking happens in place. Growing moves the payload to a new block;
  /// if that fails the original allocation is left untouched. An
  /// [`Allocation::Empty`] input behaves like [`allocate`](Self::allocate),
  /// and a zero `new_size` releases the block and yields
  /// [`Allocation::Empty`].
  ///
  /// # Safety
  ///
  /// Same contract as [`deallocate`](Self::deallocate).
  pub unsafe fn reallocate(
    &mut self,
    allocation: Allocation,
    new_size: usize,
  ) -> Result<Allocation> {
    let Allocation::Block(payload) = allocation else {
      return self.allocate(new_size);
    };

    if new_size == 0 {
      unsafe { self.deallocate(allocation) };
      return Ok(Allocation::Empty);
    }

    let block = unsafe { Block::from_payload(payload) };
    let current = unsafe { block.size() };
    let target = block_size(new_size).ok_or(AllocError::OutOfMemory { requested: new_size })?;

    if target == current {
      return Ok(allocation);
    }

    if target < current {
      let served = unsafe { self.free_list.split(block, target) };
      if unsafe { served.size() } < current {
        trace!(?payload, from = current, to = target, "shrunk in place");
        self.settle();
      }
      return Ok(allocation);
    }

    let moved = self.allocate(new_size)?;
    if let Allocation::Block(new_payload) = moved {
      unsafe {
        ptr::copy_nonoverlapping(payload.as_ptr(), new_payload.as_ptr(), current - OVERHEAD);
        self.deallocate(allocation);
      }
    }

    Ok(moved)
  }

  /// Bytes the caller may use behind `allocation`.
  ///
  /// # Safety
  ///
  /// `allocation` must be live and come from this allocator.
  pub unsafe fn usable_size(
    &self,
    allocation: Allocation,
  ) -> usize {
    match allocation {
      Allocation::Empty => 0,
      Allocation::Block(payload) => unsafe { Block::from_payload(payload).capacity() },
    }
  }

  /// Restores the no-adjacent-free-blocks invariant and trims the arena.
  fn settle(&mut self) {
    self.free_list.coalesce();
    self.arena.shrink(&mut self.free_list);
  }
}
