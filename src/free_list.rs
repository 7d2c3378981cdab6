//! Intrusive free list: first-fit search, splitting and coalescing.
//!
//! The list is kept in insertion order. Nothing about its order says anything
//! about addresses, so adjacency has to be discovered by scanning.

use tracing::{debug, trace};

use crate::block::{Block, MIN_BLOCK_SIZE};

#[derive(Debug, Default)]
pub(crate) struct FreeList {
  head: Option<Block>,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None }
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Pushes a block on the head of the list.
  ///
  /// # Safety
  ///
  /// `block` must be owned by the allocator and not already in the list.
  pub unsafe fn push(
    &mut self,
    block: Block,
  ) {
    unsafe { block.set_next_free(self.head) };
    self.head = Some(block);
  }

  /// Iterates over the free blocks, head first.
  pub fn iter(&self) -> Iter {
    Iter { current: self.head }
  }

  /// Finds the first block matching `pred` together with its predecessor.
  fn position(
    &self,
    mut pred: impl FnMut(Block) -> bool,
  ) -> Option<(Option<Block>, Block)> {
    let mut prev = None;
    let mut current = self.head;

    while let Some(block) = current {
      if pred(block) {
        return Some((prev, block));
      }
      prev = Some(block);
      current = unsafe { block.next_free() };
    }

    None
  }

  /// Splices `block` out of the list given its predecessor.
  unsafe fn unlink(
    &mut self,
    prev: Option<Block>,
    block: Block,
  ) {
    let next = unsafe { block.next_free() };
    match prev {
      Some(prev) => unsafe { prev.set_next_free(next) },
      None => self.head = next,
    }
  }

  /// Unlinks and returns the first block matching `pred`.
  pub fn take(
    &mut self,
    pred: impl FnMut(Block) -> bool,
  ) -> Option<Block> {
    let (prev, block) = self.position(pred)?;
    unsafe { self.unlink(prev, block) };
    Some(block)
  }

  /// First-fit search for a block of at least `size` bytes.
  ///
  /// The block found is unlinked and split down to `size`.
  pub fn find_free_block(
    &mut self,
    size: usize,
  ) -> Option<Block> {
    let Some(block) = self.take(|block| unsafe { block.size() } >= size) else {
      trace!(size, "no free block fits");
      return None;
    };

    trace!(size, found = unsafe { block.size() }, "free block reused");
    Some(unsafe { self.split(block, size) })
  }

  /// Serves the leading `size` bytes of `block` and pushes the rest back onto
  /// the list, unless the rest could not hold a block of its own.
  ///
  /// # Safety
  ///
  /// `block` must be owned by the allocator, not linked into the list, and at
  /// least `size` bytes long. `size` must be word aligned and at least
  /// `MIN_BLOCK_SIZE`.
  pub unsafe fn split(
    &mut self,
    block: Block,
    size: usize,
  ) -> Block {
    let total = unsafe { block.size() };
    if total - size < MIN_BLOCK_SIZE {
      return block;
    }

    let remainder = unsafe { block.cut(size) };
    trace!(served = size, remainder = total - size, "block split");
    unsafe { self.push(remainder) };
    block
  }

  /// Merges address-adjacent free blocks until no two of them touch.
  ///
  /// Returns the number of merges performed.
  pub fn coalesce(&mut self) -> usize {
    let mut merges = 0;

    loop {
      let merges_before = merges;
      let mut current = self.head;

      while let Some(block) = current {
        let end = unsafe { block.end() };

        if let Some((prev, neighbour)) = self.position(|other| other.start() == end) {
          unsafe {
            self.unlink(prev, neighbour);
            block.set_size(block.size() + neighbour.size());
          }
          merges += 1;
          // `block` may now touch another free block; look again.
          continue;
        }

        current = unsafe { block.next_free() };
      }

      if merges == merges_before {
        break;
      }
    }

    if merges > 0 {
      debug!(merges, "free blocks coalesced");
    }
    merges
  }
}

pub(crate) struct Iter {
  current: Option<Block>,
}

impl Iterator for Iter {
  type Item = Block;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.current?;
    self.current = unsafe { block.next_free() };
    Some(block)
  }
}

#[cfg(test)]
mod tests {
  use core::ptr::NonNull;

  use super::*;
  use crate::align::WORD;

  /// Formats `sizes` (in words) as consecutive blocks over `words`.
  fn carve(
    words: &mut [usize],
    sizes: &[usize],
  ) -> Vec<Block> {
    let base: NonNull<u8> = NonNull::from(words).cast();
    let mut offset = 0;
    let mut blocks = Vec::new();

    for &size in sizes {
      let block = unsafe { Block::format(base.add(offset * WORD), size * WORD) };
      blocks.push(block);
      offset += size;
    }

    blocks
  }

  fn spans(list: &FreeList) -> Vec<(usize, usize)> {
    let mut spans: Vec<_> = list
      .iter()
      .map(|block| (block.start(), unsafe { block.size() }))
      .collect();
    spans.sort_unstable();
    spans
  }

  #[test]
  fn test_push_is_lifo() {
    let mut words = [0usize; 8];
    let blocks = carve(&mut words, &[4, 4]);
    let mut list = FreeList::new();
    assert!(list.is_empty());

    unsafe {
      list.push(blocks[0]);
      list.push(blocks[1]);
    }

    let order: Vec<_> = list.iter().collect();
    assert_eq!(vec![blocks[1], blocks[0]], order);
  }

  #[test]
  fn test_find_free_block_first_fit() {
    let mut words = [0usize; 16];
    let blocks = carve(&mut words, &[2, 6, 8]);
    let mut list = FreeList::new();

    unsafe {
      list.push(blocks[2]);
      list.push(blocks[1]);
      list.push(blocks[0]);
    }

    // blocks[0] is too small, blocks[1] is the first that fits and is served
    // whole because a 1-word remainder is useless.
    let found = list.find_free_block(5 * WORD).unwrap();
    assert_eq!(blocks[1], found);
    assert_eq!(6 * WORD, unsafe { found.size() });

    let remaining: Vec<_> = list.iter().collect();
    assert_eq!(vec![blocks[0], blocks[2]], remaining);
  }

  #[test]
  fn test_find_free_block_misses() {
    let mut words = [0usize; 4];
    let blocks = carve(&mut words, &[4]);
    let mut list = FreeList::new();

    assert!(list.find_free_block(2 * WORD).is_none());

    unsafe { list.push(blocks[0]) };
    assert!(list.find_free_block(5 * WORD).is_none());
    assert_eq!(1, list.iter().count());
  }

  #[test]
  fn test_split_keeps_useful_remainder() {
    let mut words = [0usize; 10];
    let blocks = carve(&mut words, &[10]);
    let mut list = FreeList::new();

    let served = unsafe { list.split(blocks[0], 4 * WORD) };

    assert_eq!(blocks[0], served);
    assert_eq!(4 * WORD, unsafe { served.size() });
    let remainder = list.iter().next().unwrap();
    assert_eq!(unsafe { served.end() }, remainder.start());
    assert_eq!(6 * WORD, unsafe { remainder.size() });
  }

  #[test]
  fn test_split_refuses_tiny_remainder() {
    let mut words = [0usize; 5];
    let blocks = carve(&mut words, &[5]);
    let mut list = FreeList::new();

    let served = unsafe { list.split(blocks[0], 4 * WORD) };

    assert_eq!(5 * WORD, unsafe { served.size() });
    assert!(list.is_empty());
  }

  #[test]
  fn test_coalesce_pair() {
    let mut words = [0usize; 8];
    let blocks = carve(&mut words, &[4, 4]);
    let base = blocks[0].start();
    let mut list = FreeList::new();

    unsafe {
      list.push(blocks[0]);
      list.push(blocks[1]);
    }

    assert_eq!(1, list.coalesce());
    assert_eq!(vec![(base, 8 * WORD)], spans(&list));
  }

  #[test]
  fn test_coalesce_run_in_any_order() {
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];

    for order in orders {
      let mut words = [0usize; 16];
      let blocks = carve(&mut words, &[4, 4, 4, 4]);
      let base = blocks[0].start();
      let mut list = FreeList::new();

      for index in order {
        unsafe { list.push(blocks[index]) };
      }

      assert_eq!(3, list.coalesce(), "order {order:?}");
      assert_eq!(vec![(base, 16 * WORD)], spans(&list), "order {order:?}");
    }
  }

  #[test]
  fn test_coalesce_leaves_gaps_alone() {
    let mut words = [0usize; 16];
    let blocks = carve(&mut words, &[4, 4, 4, 4]);
    let mut list = FreeList::new();

    // blocks[1] stays allocated, splitting the arena in two runs.
    unsafe {
      list.push(blocks[3]);
      list.push(blocks[0]);
      list.push(blocks[2]);
    }

    assert_eq!(1, list.coalesce());
    assert_eq!(
      vec![(blocks[0].start(), 4 * WORD), (blocks[2].start(), 8 * WORD)],
      spans(&list)
    );
    assert_eq!(0, list.coalesce());
  }

  #[test]
  fn test_take_unlinks_from_middle() {
    let mut words = [0usize; 12];
    let blocks = carve(&mut words, &[4, 4, 4]);
    let mut list = FreeList::new();

    unsafe {
      list.push(blocks[0]);
      list.push(blocks[1]);
      list.push(blocks[2]);
    }

    let taken = list.take(|block| block == blocks[1]);
    assert_eq!(Some(blocks[1]), taken);
    assert_eq!(vec![blocks[2], blocks[0]], list.iter().collect::<Vec<_>>());
    assert_eq!(None, list.take(|block| block == blocks[1]));
  }
}
