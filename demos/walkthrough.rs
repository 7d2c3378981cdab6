use std::io::Read;

use brkalloc::{Allocation, FreeListAllocator};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits until the user presses ENTER when `BRKALLOC_PAUSE` is set.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `gdb`, or just watch the program break move between steps.
fn pause() {
  if std::env::var_os("BRKALLOC_PAUSE").is_none() {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn report(
  label: &str,
  allocator: &FreeListAllocator,
) {
  println!(
    "[{}] PID = {}, program break = {:#x}, free blocks = {}, free bytes = {}",
    label,
    std::process::id(),
    allocator.top(),
    allocator.free_blocks().count(),
    allocator.free_bytes(),
  );
}

fn address(allocation: Allocation) -> String {
  match allocation.as_ptr() {
    Some(ptr) => format!("{ptr:?}"),
    None => "<empty>".to_owned(),
  }
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer())
    .with(EnvFilter::from_default_env())
    .init();

  let mut allocator = FreeListAllocator::new();
  report("start", &allocator);
  pause();

  // --------------------------------------------------------------------
  // 1) A small request moves the break by a whole batch.
  // --------------------------------------------------------------------
  let first = allocator.allocate(size_of::<u32>())?;
  println!("\n[1] allocate(4) -> {}", address(first));
  if let Some(ptr) = first.as_ptr() {
    let ptr = ptr.cast::<u32>();
    unsafe { ptr.write(0xDEAD_BEEF) };
    println!("[1] value written = {:#X}", unsafe { ptr.read() });
  }
  report("1", &allocator);
  pause();

  // --------------------------------------------------------------------
  // 2) Further small requests are carved out of the batch remainder.
  // --------------------------------------------------------------------
  let second = allocator.allocate(12)?;
  let third = allocator.allocate(size_of::<u64>())?;
  println!("\n[2] allocate(12) -> {}", address(second));
  println!("[2] allocate(8)  -> {}", address(third));
  report("2", &allocator);
  pause();

  // --------------------------------------------------------------------
  // 3) Zero-length requests never touch the arena.
  // --------------------------------------------------------------------
  let empty = allocator.allocate(0)?;
  println!("\n[3] allocate(0) -> {}", address(empty));
  pause();

  // --------------------------------------------------------------------
  // 4) Freeing and allocating again reuses the freed block.
  // --------------------------------------------------------------------
  unsafe { allocator.deallocate(first) };
  let reused = allocator.allocate(2)?;
  println!(
    "\n[4] allocate(2) -> {} ({})",
    address(reused),
    if reused == first { "reused the freed block" } else { "allocated elsewhere" }
  );
  report("4", &allocator);
  pause();

  // --------------------------------------------------------------------
  // 5) A large request bypasses batching; freeing it hands it back.
  // --------------------------------------------------------------------
  let big = allocator.zero_allocate(64, 1024)?;
  println!("\n[5] zero_allocate(64, 1024) -> {}", address(big));
  report("5 after large alloc", &allocator);
  unsafe { allocator.deallocate(big) };
  report("5 after large free", &allocator);
  pause();

  // --------------------------------------------------------------------
  // 6) Shrinking in place keeps the address; growing moves the payload.
  // --------------------------------------------------------------------
  let resized = unsafe { allocator.reallocate(second, 4) }?;
  println!("\n[6] reallocate(second, 4)    -> {}", address(resized));
  let moved = unsafe { allocator.reallocate(third, 4096) }?;
  println!("[6] reallocate(third, 4096)  -> {}", address(moved));
  report("6", &allocator);
  pause();

  // --------------------------------------------------------------------
  // 7) Releasing everything coalesces the arena back together.
  // --------------------------------------------------------------------
  unsafe {
    allocator.deallocate(reused);
    allocator.deallocate(resized);
    allocator.deallocate(moved);
    allocator.deallocate(empty);
  }
  report("7", &allocator);

  println!("\n[8] End of walkthrough.");
  Ok(())
}
