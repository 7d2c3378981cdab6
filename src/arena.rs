//! Arena growth and shrink policy over a [`Boundary`].

use core::ptr::NonNull;

use tracing::{debug, warn};

use crate::{
  align::padding_for,
  block::Block,
  boundary::Boundary,
  config::ArenaConfig,
  error::{AllocError, Result},
  free_list::FreeList,
};

pub(crate) struct Arena<B> {
  boundary: B,
  config: ArenaConfig,
}

impl<B: Boundary> Arena<B> {
  pub fn new(
    boundary: B,
    config: ArenaConfig,
  ) -> Self {
    Self { boundary, config }
  }

  pub fn boundary(&self) -> &B {
    &self.boundary
  }

  pub fn config(&self) -> &ArenaConfig {
    &self.config
  }

  /// Extends the arena to serve a block of `size` bytes.
  ///
  /// Small requests take a whole batch and leave the unused tail on
  /// `free_list`; requests of at least one batch extend by exactly `size`.
  pub fn grow(
    &mut self,
    free_list: &mut FreeList,
    size: usize,
  ) -> Result<Block> {
    let batched = size < self.config.batch_size;
    let extent = if batched { self.config.batch_size } else { size };

    // A foreign break may sit mid-word; headers have to start on a word.
    let padding = padding_for(self.boundary.current().addr());
    let delta = extent
      .checked_add(padding)
      .and_then(|delta| isize::try_from(delta).ok())
      .ok_or(AllocError::OutOfMemory { requested: size })?;

    let previous = match unsafe { self.boundary.adjust(delta) } {
      Ok(previous) => previous,
      Err(err) => {
        debug!(%err, size, "arena growth refused");
        return Err(AllocError::OutOfMemory { requested: size });
      }
    };

    let start = NonNull::new(previous.wrapping_add(padding))
      .ok_or(AllocError::OutOfMemory { requested: size })?;
    let block = unsafe { Block::format(start, extent) };
    debug!(extent, padding, batched, "arena grown");

    if batched {
      Ok(unsafe { free_list.split(block, size) })
    } else {
      Ok(block)
    }
  }

  /// Gives the free block touching the boundary back, if it is big enough.
  ///
  /// A refused shrink puts the block back on `free_list`.
  pub fn shrink(
    &mut self,
    free_list: &mut FreeList,
  ) {
    let top = self.boundary.current().addr();
    let threshold = self.config.shrink_threshold;

    let Some(block) = free_list.take(|block| unsafe {
      block.end() == top && block.size() >= threshold
    }) else {
      return;
    };

    let size = unsafe { block.size() };
    let result = match isize::try_from(size) {
      Ok(size) => unsafe { self.boundary.adjust(-size) },
      Err(_) => {
        warn!(size, "trailing block too large to release");
        unsafe { free_list.push(block) };
        return;
      }
    };

    match result {
      Ok(_) => debug!(size, "arena shrunk"),
      Err(err) => {
        warn!(%err, size, "arena shrink failed, keeping block");
        unsafe { free_list.push(block) };
      }
    }
  }
}
