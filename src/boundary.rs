//! The arena's upper boundary.
//!
//! The allocator only ever talks to the operating system through
//! [`Boundary`]. [`Sbrk`] moves the real program break; [`BufferBoundary`]
//! simulates one over an owned buffer so that independent allocators can
//! coexist in one process.

use core::ptr::NonNull;
use std::io;

use libc::{c_void, intptr_t, sbrk};

/// Failure to move the arena boundary.
#[derive(Debug, thiserror::Error)]
#[error("moving the arena boundary by {delta} bytes failed: {source}")]
pub struct BoundaryError {
  pub delta: isize,
  pub source: io::Error,
}

/// An adjustable upper end of a contiguous region.
pub trait Boundary {
  /// Address one past the last byte of the region.
  fn current(&self) -> *mut u8;

  /// Moves the boundary by `delta` bytes and returns the previous boundary.
  ///
  /// # Safety
  ///
  /// A negative `delta` releases memory: nothing may still reference the
  /// `delta` bytes directly below the current boundary.
  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Result<*mut u8, BoundaryError>;
}

/// The process program break, moved with `sbrk(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

impl Boundary for Sbrk {
  fn current(&self) -> *mut u8 {
    unsafe { sbrk(0) }.cast()
  }

  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Result<*mut u8, BoundaryError> {
    let previous = unsafe { sbrk(delta as intptr_t) };

    if previous == usize::MAX as *mut c_void {
      return Err(BoundaryError {
        delta,
        source: io::Error::last_os_error(),
      });
    }

    Ok(previous.cast())
  }
}

/// A simulated program break over a fixed-capacity owned buffer.
///
/// Growing past the capacity fails the way `sbrk` does when the system runs
/// out of memory.
pub struct BufferBoundary {
  // Words keep the base address aligned for block headers.
  _memory: Vec<usize>,
  base: NonNull<u8>,
  capacity: usize,
  len: usize,
}

unsafe impl Send for BufferBoundary {}

impl BufferBoundary {
  /// Reserves `capacity` bytes, rounded up to a whole word.
  pub fn new(capacity: usize) -> Self {
    let mut memory = vec![0usize; capacity.div_ceil(crate::align::WORD)];
    let base = NonNull::from(memory.as_mut_slice()).cast();
    let capacity = memory.len() * crate::align::WORD;

    Self {
      _memory: memory,
      base,
      capacity,
      len: 0,
    }
  }

  /// First byte of the buffer.
  pub fn base(&self) -> *mut u8 {
    self.base.as_ptr()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes currently below the boundary.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

impl Boundary for BufferBoundary {
  fn current(&self) -> *mut u8 {
    self.base.as_ptr().wrapping_add(self.len)
  }

  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Result<*mut u8, BoundaryError> {
    let len = match self.len.checked_add_signed(delta) {
      Some(len) if len <= self.capacity => len,
      Some(_) => {
        return Err(BoundaryError {
          delta,
          source: io::ErrorKind::OutOfMemory.into(),
        });
      }
      None => {
        return Err(BoundaryError {
          delta,
          source: io::ErrorKind::InvalidInput.into(),
        });
      }
    };

    let previous = self.current();
    self.len = len;
    Ok(previous)
  }
}
