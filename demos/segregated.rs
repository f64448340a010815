use std::io::Read;

use segalloc::{Allocator, Arena, MmapArena, Payload};

/// Waits until the user presses ENTER, when run with `--step`.
/// Useful to inspect the process with `pmap` or `gdb` between steps.
fn block_until_enter_pressed(step: bool) {
  if !step {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_heap(
  label: &str,
  allocator: &Allocator<MmapArena>,
) {
  let stats = allocator.stats();
  println!(
    "\n[{}] break = {} bytes, {} allocated / {} free blocks, utilisation {:.1}%",
    label,
    allocator.arena().high(),
    stats.allocated_blocks,
    stats.free_blocks,
    stats.utilisation() * 100.0,
  );
  print!("{}", allocator);

  if let Err(violation) = allocator.check() {
    println!("[{}] HEAP CORRUPTED: {}", label, violation);
  }
}

fn print_alloc(
  allocator: &Allocator<MmapArena>,
  size: usize,
  payload: Payload,
) {
  println!(
    "Allocated {} bytes, offset = {}, address = {:?}, usable = {}",
    size,
    payload.offset(),
    allocator.address(payload),
    allocator.usable_size(payload),
  );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let step = std::env::args().any(|arg| arg == "--step");

  // 64 MiB of address space; only the pages we touch get backed.
  let arena = MmapArena::reserve(64 << 20)?;
  let mut allocator = Allocator::new(arena)?;

  print_heap("start", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 1) A small allocation comes out of the initial 64-byte chunk.
  // --------------------------------------------------------------------
  let first = allocator.allocate(4)?.ok_or("zero-sized request")?;
  println!("\n[1] Allocate 4 bytes");
  print_alloc(&allocator, 4, first);
  allocator.payload_mut(first)[..4].copy_from_slice(&0xDEADBEEFu32.to_ne_bytes());
  print_heap("1", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 2) A request that no bucket can serve grows the arena by a chunk.
  // --------------------------------------------------------------------
  let second = allocator.allocate(300)?.ok_or("zero-sized request")?;
  println!("\n[2] Allocate 300 bytes (arena grows)");
  print_alloc(&allocator, 300, second);
  allocator.payload_mut(second)[..300].fill(0xAB);
  print_heap("2", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 3) Releasing the first block and asking for the same size again
  //    hands back the same offset.
  // --------------------------------------------------------------------
  allocator.release(Some(first));
  let third = allocator.allocate(4)?.ok_or("zero-sized request")?;
  println!(
    "\n[3] Release + allocate 4 bytes: reused = {}",
    third == first
  );
  print_heap("3", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 4) Grow a buffer one byte at a time. After the first move the block
  //    keeps growing into its tagged successor.
  // --------------------------------------------------------------------
  let mut buffer = allocator.allocate(1)?.ok_or("zero-sized request")?;
  let mut moves = 0;
  for n in 2..=5000 {
    let grown = allocator.resize(Some(buffer), n)?.ok_or("zero-sized request")?;
    if grown != buffer {
      moves += 1;
    }
    buffer = grown;
    allocator.payload_mut(buffer)[n - 1] = n as u8;
  }
  println!("\n[4] Grew a buffer to 5000 bytes one byte at a time, {} move(s)", moves);
  print_alloc(&allocator, 5000, buffer);
  print_heap("4", &allocator);
  block_until_enter_pressed(step);

  // --------------------------------------------------------------------
  // 5) Release everything; the heap collapses back into one free block.
  // --------------------------------------------------------------------
  allocator.release(Some(second));
  allocator.release(Some(third));
  allocator.release(Some(buffer));
  print_heap("5", &allocator);

  let arena = allocator.teardown();
  println!(
    "\n[6] End of example. {} of {} reserved bytes were used; the mapping is released on drop.",
    arena.high(),
    arena.capacity()
  );
  Ok(())
}
