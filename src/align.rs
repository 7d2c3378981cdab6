use core::mem;

/// Size of a machine word, the allocator's alignment unit.
pub const WORD: usize = mem::size_of::<usize>();

/// Rounds the given size up to the next multiple of the machine word size.
///
/// The expression must not be within a word of `usize::MAX`; use
/// [`checked_align`] for sizes that come straight from a caller.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align;
///
/// match core::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::WORD - 1) & !($crate::align::WORD - 1)
  };
}

/// Word alignment that reports overflow instead of wrapping.
pub const fn checked_align(value: usize) -> Option<usize> {
  match value.checked_add(WORD - 1) {
    Some(padded) => Some(padded & !(WORD - 1)),
    None => None,
  }
}

/// Bytes needed to move `addr` forward to the next word boundary.
pub const fn padding_for(addr: usize) -> usize {
  addr.wrapping_neg() & (WORD - 1)
}
