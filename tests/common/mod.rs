use brkalloc::{ArenaConfig, ArenaOptions, BufferBoundary, FreeListAllocator};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
  let _ = tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer().with_test_writer())
    .with(EnvFilter::from_default_env())
    .try_init();
}

/// Allocator over a private simulated break of `capacity` bytes.
pub fn allocator(capacity: usize) -> FreeListAllocator<BufferBoundary> {
  init_tracing();
  FreeListAllocator::with_boundary(BufferBoundary::new(capacity), ArenaConfig::default())
}

pub fn allocator_with(
  capacity: usize,
  options: &ArenaOptions,
) -> anyhow::Result<FreeListAllocator<BufferBoundary>> {
  init_tracing();
  Ok(FreeListAllocator::with_boundary(
    BufferBoundary::new(capacity),
    options.build()?,
  ))
}
