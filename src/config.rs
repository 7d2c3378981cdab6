use crate::{
  align::WORD,
  block::MIN_BLOCK_SIZE,
  error::{AllocError, Result},
};

/// Default growth batch: 124 machine words.
pub const DEFAULT_BATCH_SIZE: usize = WORD * 124;

/// Default smallest trailing free block worth giving back.
pub const DEFAULT_SHRINK_THRESHOLD: usize = 1024;

/// Validated arena growth and shrink policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
  pub(crate) batch_size: usize,
  pub(crate) shrink_threshold: usize,
}

impl Default for ArenaConfig {
  fn default() -> Self {
    Self {
      batch_size: DEFAULT_BATCH_SIZE,
      shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
    }
  }
}

impl ArenaConfig {
  /// Requests smaller than this are served from a batch of this size.
  pub fn batch_size(&self) -> usize {
    self.batch_size
  }

  /// A free block touching the boundary is returned once it reaches this size.
  pub fn shrink_threshold(&self) -> usize {
    self.shrink_threshold
  }
}

#[derive(Debug)]
pub struct ArenaOptions {
  batch_size: usize,
  shrink_threshold: usize,
}

impl Default for ArenaOptions {
  fn default() -> Self {
    let config = ArenaConfig::default();
    Self {
      batch_size: config.batch_size,
      shrink_threshold: config.shrink_threshold,
    }
  }
}

impl ArenaOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bytes requested from the boundary for any small allocation.
  pub fn batch_size(
    &mut self,
    size: usize,
  ) -> &mut Self {
    self.batch_size = size;
    self
  }

  /// Smallest trailing free block handed back to the boundary.
  pub fn shrink_threshold(
    &mut self,
    size: usize,
  ) -> &mut Self {
    self.shrink_threshold = size;
    self
  }

  pub fn build(&self) -> Result<ArenaConfig> {
    if !self.batch_size.is_multiple_of(WORD) {
      return Err(AllocError::InvalidConfig(format!(
        "batch size {} is not a multiple of {WORD}",
        self.batch_size
      )));
    }
    if self.batch_size < MIN_BLOCK_SIZE {
      return Err(AllocError::InvalidConfig(format!(
        "batch size {} cannot hold a {MIN_BLOCK_SIZE} byte block",
        self.batch_size
      )));
    }
    if isize::try_from(self.batch_size).is_err() {
      return Err(AllocError::InvalidConfig(format!(
        "batch size {} exceeds isize::MAX",
        self.batch_size
      )));
    }

    Ok(ArenaConfig {
      batch_size: self.batch_size,
      shrink_threshold: self.shrink_threshold,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_are_valid() {
    let config = ArenaOptions::new().build().unwrap();
    assert_eq!(ArenaConfig::default(), config);
    assert_eq!(124 * WORD, config.batch_size());
    assert_eq!(1024, config.shrink_threshold());
  }

  #[test]
  fn test_builder_overrides() {
    let config = ArenaOptions::new()
      .batch_size(64 * WORD)
      .shrink_threshold(0)
      .build()
      .unwrap();

    assert_eq!(64 * WORD, config.batch_size());
    assert_eq!(0, config.shrink_threshold());
  }

  #[test]
  fn test_rejects_unaligned_batch() {
    let err = ArenaOptions::new().batch_size(WORD * 8 + 1).build().unwrap_err();
    assert!(matches!(err, AllocError::InvalidConfig(_)));
  }

  #[test]
  fn test_rejects_tiny_batch() {
    let err = ArenaOptions::new().batch_size(WORD).build().unwrap_err();
    assert!(matches!(err, AllocError::InvalidConfig(_)));

    let err = ArenaOptions::new().batch_size(0).build().unwrap_err();
    assert!(matches!(err, AllocError::InvalidConfig(_)));
  }
}
