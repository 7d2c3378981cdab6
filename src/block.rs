//! Block header codec.
//!
//! Every block starts with a one-word header holding its total length, header
//! included. The address handed out to callers is the payload that follows
//! the header, and a free block reuses the first payload word as the link to
//! the next free block:
//!
//! ```text
//!   start              payload (address of record)          end
//!   ┌──────────────────┬───────────────────────────────────┐
//!   │ size (1 word)    │ next free (1 word, free only) ... │
//!   └──────────────────┴───────────────────────────────────┘
//!   ◄───────────────────────── size ─────────────────────────►
//! ```
//!
//! All offset arithmetic between a payload and its header lives here.

use core::{fmt, mem, ptr::NonNull};

use crate::align::{WORD, checked_align};

/// Size of the header preceding every payload.
pub const OVERHEAD: usize = WORD;

/// Size of the intrusive free-list link stored in a free payload.
pub const LINK_SIZE: usize = mem::size_of::<*mut u8>();

/// Smallest block that can still be linked into the free list.
pub const MIN_BLOCK_SIZE: usize = OVERHEAD + LINK_SIZE;

/// Total block length needed to serve `payload` bytes.
pub(crate) fn block_size(payload: usize) -> Option<usize> {
  checked_align(payload)?.checked_add(OVERHEAD)
}

/// Handle to a block, identified by its payload address.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block(NonNull<u8>);

impl Block {
  /// Writes a header of `size` bytes at `start` and returns the new block.
  ///
  /// # Safety
  ///
  /// `start` must be word aligned and `start..start + size` must be arena
  /// memory owned by the allocator, with `size >= MIN_BLOCK_SIZE`.
  pub unsafe fn format(
    start: NonNull<u8>,
    size: usize,
  ) -> Self {
    debug_assert!(size >= MIN_BLOCK_SIZE);
    debug_assert_eq!(start.as_ptr().addr() % WORD, 0);

    let block = Self(unsafe { start.add(OVERHEAD) });
    unsafe { block.set_size(size) };
    block
  }

  /// Recovers the block behind a payload pointer previously handed out.
  ///
  /// # Safety
  ///
  /// `payload` must be the payload address of a live block of this arena.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
    Self(payload)
  }

  pub fn payload(self) -> NonNull<u8> {
    self.0
  }

  fn header(self) -> NonNull<usize> {
    // The header directly precedes the payload within the same block.
    unsafe { self.0.sub(OVERHEAD) }.cast()
  }

  /// Address of the header, the first byte of the block.
  pub fn start(self) -> usize {
    self.0.as_ptr().addr() - OVERHEAD
  }

  /// Address one past the last byte of the block.
  ///
  /// # Safety
  ///
  /// The block's header must be intact.
  pub unsafe fn end(self) -> usize {
    self.start() + unsafe { self.size() }
  }

  /// Total block length, header included.
  ///
  /// # Safety
  ///
  /// The block's header must be intact.
  pub unsafe fn size(self) -> usize {
    unsafe { self.header().read() }
  }

  /// # Safety
  ///
  /// The block must be owned by the allocator and `size` must describe
  /// exactly the bytes it spans.
  pub unsafe fn set_size(
    self,
    size: usize,
  ) {
    unsafe { self.header().write(size) }
  }

  /// Bytes available to the caller.
  ///
  /// # Safety
  ///
  /// The block's header must be intact.
  pub unsafe fn capacity(self) -> usize {
    unsafe { self.size() - OVERHEAD }
  }

  /// Reads the free-list link out of the payload.
  ///
  /// # Safety
  ///
  /// The block must be free.
  pub unsafe fn next_free(self) -> Option<Self> {
    let next = unsafe { self.0.cast::<*mut u8>().read() };
    NonNull::new(next).map(Self)
  }

  /// Stores the free-list link into the payload.
  ///
  /// # Safety
  ///
  /// The block must be free; its payload is overwritten.
  pub unsafe fn set_next_free(
    self,
    next: Option<Self>,
  ) {
    let next = next.map_or(core::ptr::null_mut(), |block| block.0.as_ptr());
    unsafe { self.0.cast::<*mut u8>().write(next) }
  }

  /// Carves the trailing `self.size() - size` bytes into a block of their own
  /// and shrinks `self` to `size`.
  ///
  /// # Safety
  ///
  /// `size` must be word aligned, at least `MIN_BLOCK_SIZE`, and leave a
  /// remainder of at least `MIN_BLOCK_SIZE`.
  pub unsafe fn cut(
    self,
    size: usize,
  ) -> Self {
    let total = unsafe { self.size() };
    debug_assert!(total - size >= MIN_BLOCK_SIZE);

    let cut_point = unsafe { self.header().cast::<u8>().add(size) };
    let remainder = unsafe { Self::format(cut_point, total - size) };
    unsafe { self.set_size(size) };
    remainder
  }
}

impl fmt::Debug for Block {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_tuple("Block").field(&self.0).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn arena<const N: usize>() -> [usize; N] {
    [0; N]
  }

  fn start_of(words: &mut [usize]) -> NonNull<u8> {
    NonNull::from(words).cast()
  }

  #[test]
  fn test_block_size() {
    assert_eq!(Some(WORD + OVERHEAD), block_size(1));
    assert_eq!(Some(2 * WORD + OVERHEAD), block_size(WORD + 1));
    assert_eq!(None, block_size(usize::MAX));
    assert_eq!(None, block_size(usize::MAX - WORD));
  }

  #[test]
  fn test_header_precedes_payload() {
    let mut words = arena::<8>();
    let start = start_of(&mut words);

    unsafe {
      let block = Block::format(start, 4 * WORD);

      assert_eq!(start.as_ptr().addr() + OVERHEAD, block.payload().as_ptr().addr());
      assert_eq!(start.as_ptr().addr(), block.start());
      assert_eq!(4 * WORD, block.size());
      assert_eq!(start.as_ptr().addr() + 4 * WORD, block.end());
      assert_eq!(3 * WORD, block.capacity());
    }

    assert_eq!(4 * WORD, words[0]);
  }

  #[test]
  fn test_capacity_excludes_header() {
    let mut words = arena::<10>();
    let start = start_of(&mut words);

    unsafe {
      let block = Block::format(start, 10 * WORD);
      assert_eq!(10 * WORD - OVERHEAD, block.capacity());

      let remainder = block.cut(4 * WORD);
      assert_eq!(4 * WORD - OVERHEAD, block.capacity());
      assert_eq!(6 * WORD - OVERHEAD, remainder.capacity());
    }
  }

  #[test]
  fn test_from_payload_reads_same_header() {
    let mut words = arena::<4>();
    let start = start_of(&mut words);

    unsafe {
      let block = Block::format(start, 4 * WORD);
      let again = Block::from_payload(block.payload());

      assert_eq!(block, again);
      assert_eq!(4 * WORD, again.size());
    }
  }

  #[test]
  fn test_free_link_lives_in_payload() {
    let mut words = arena::<8>();
    let start = start_of(&mut words);

    unsafe {
      let first = Block::format(start, 4 * WORD);
      let second = Block::format(start.add(4 * WORD), 4 * WORD);

      first.set_next_free(Some(second));
      assert_eq!(Some(second), first.next_free());

      second.set_next_free(None);
      assert_eq!(None, second.next_free());
    }

    assert_eq!(4 * WORD, words[0]);
    assert_eq!(4 * WORD, words[4]);
    assert_eq!(0, words[5]);
  }

  #[test]
  fn test_cut_preserves_total_length() {
    let mut words = arena::<10>();
    let start = start_of(&mut words);

    unsafe {
      let block = Block::format(start, 10 * WORD);
      let remainder = block.cut(4 * WORD);

      assert_eq!(4 * WORD, block.size());
      assert_eq!(6 * WORD, remainder.size());
      assert_eq!(block.end(), remainder.start());
      assert_eq!(start.as_ptr().addr() + 10 * WORD, remainder.end());
    }
  }
}
