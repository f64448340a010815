use segalloc::{AllocError, Allocator, Arena, Config, Payload, VecArena};

fn allocator() -> Allocator {
  Allocator::with_defaults().unwrap()
}

fn fill(
  allocator: &mut Allocator,
  payload: Payload,
  len: usize,
  seed: u8,
) {
  for (i, byte) in allocator.payload_mut(payload)[..len].iter_mut().enumerate() {
    *byte = seed.wrapping_add(i as u8);
  }
}

fn holds(
  allocator: &Allocator,
  payload: Payload,
  len: usize,
  seed: u8,
) -> bool {
  allocator.payload(payload)[..len]
    .iter()
    .enumerate()
    .all(|(i, byte)| *byte == seed.wrapping_add(i as u8))
}

#[test]
fn test_allocate_release_allocate() {
  let mut allocator = allocator();

  let a = allocator.allocate(100).unwrap().unwrap();
  assert!(allocator.usable_size(a) >= 100);
  assert!(allocator.blocks().any(|info| info.payload == a && info.allocated));

  allocator.release(Some(a));
  assert!(allocator.blocks().any(|info| info.payload == a && !info.allocated));
  allocator.check().unwrap();

  let b = allocator.allocate(100).unwrap().unwrap();
  assert_eq!(b, a);
  assert!(allocator.blocks().any(|info| info.payload == b && info.allocated));
  allocator.check().unwrap();
}

#[test]
fn test_reuse_after_release_keeps_neighbour_intact() {
  let mut allocator = allocator();

  let first = allocator.allocate(16).unwrap().unwrap();
  let second = allocator.allocate(16).unwrap().unwrap();
  fill(&mut allocator, second, 16, 0x40);

  allocator.release(Some(first));
  let third = allocator.allocate(40).unwrap().unwrap();

  assert!(holds(&allocator, second, 16, 0x40));
  let second_end = second.offset() + allocator.usable_size(second);
  let third_end = third.offset() + allocator.usable_size(third);
  assert!(third_end <= second.offset() || third.offset() >= second_end);
  allocator.check().unwrap();
}

#[test]
fn test_resize_into_free_successor_does_not_move() {
  let mut allocator = allocator();

  let p = allocator.allocate(24).unwrap().unwrap();
  let q = allocator.allocate(2000).unwrap();
  let _guard = allocator.allocate(24).unwrap();
  fill(&mut allocator, p, 24, 1);
  allocator.release(q);

  let high = allocator.arena().high();
  let resized = allocator.resize(Some(p), 500).unwrap().unwrap();

  assert_eq!(resized, p);
  assert!(allocator.usable_size(p) >= 500);
  assert!(holds(&allocator, p, 24, 1));
  assert_eq!(allocator.arena().high(), high);
  allocator.check().unwrap();
}

#[test]
fn test_resize_next_to_allocated_block_moves() {
  let mut allocator = allocator();

  let p = allocator.allocate(24).unwrap().unwrap();
  let _q = allocator.allocate(24).unwrap();
  fill(&mut allocator, p, 24, 9);

  let moved = allocator.resize(Some(p), 100).unwrap().unwrap();

  assert_ne!(moved, p);
  assert!(allocator.usable_size(moved) >= 100);
  assert!(holds(&allocator, moved, 24, 9));
  assert!(allocator.blocks().any(|info| info.payload == p && !info.allocated));
  allocator.check().unwrap();
}

#[test]
fn test_resize_shrink_stays_put() {
  let mut allocator = allocator();

  let p = allocator.allocate(1000).unwrap().unwrap();
  fill(&mut allocator, p, 1000, 3);

  let shrunk = allocator.resize(Some(p), 10).unwrap().unwrap();

  assert_eq!(shrunk, p);
  assert!(holds(&allocator, p, 10, 3));
  allocator.check().unwrap();
}

#[test]
fn test_shrink_then_regrow_within_block_stays_put() {
  let mut allocator = allocator();

  let p = allocator.allocate(100).unwrap().unwrap();
  let _guard = allocator.allocate(24).unwrap();
  fill(&mut allocator, p, 100, 5);

  let shrunk = allocator.resize(Some(p), 50).unwrap().unwrap();
  assert_eq!(shrunk, p);
  allocator.check().unwrap();

  let regrown = allocator.resize(Some(p), 100).unwrap().unwrap();
  assert_eq!(regrown, p);
  assert_eq!(allocator.usable_size(p), 104);
  assert!(holds(&allocator, p, 50, 5));
  allocator.check().unwrap();
}

#[test]
fn test_growing_one_byte_at_a_time_moves_at_most_once() {
  let mut allocator = allocator();

  let mut p = allocator.allocate(1).unwrap().unwrap();
  let _guard = allocator.allocate(40).unwrap();
  allocator.payload_mut(p)[0] = 1;

  let mut addresses = vec![p];
  for n in 2..=6000 {
    p = allocator.resize(Some(p), n).unwrap().unwrap();
    allocator.payload_mut(p)[n - 1] = (n % 251) as u8;
    if addresses.last() != Some(&p) {
      addresses.push(p);
    }
  }

  assert!(addresses.len() <= 2, "moved {} times", addresses.len() - 1);
  assert!(
    allocator.payload(p)[..6000]
      .iter()
      .enumerate()
      .all(|(i, byte)| *byte == ((i + 1) % 251) as u8)
  );
  allocator.check().unwrap();
}

#[test]
fn test_payloads_are_aligned() {
  let mut allocator = allocator();

  for size in 1..200 {
    let p = allocator.allocate(size).unwrap().unwrap();
    assert_eq!(p.offset() % 8, 0);
    assert_eq!(allocator.address(p) as usize % 8, 0);
  }
  allocator.check().unwrap();
}

#[test]
fn test_release_none_and_allocate_zero() {
  let mut allocator = allocator();
  let before = allocator.stats();

  allocator.release(None);
  assert_eq!(allocator.allocate(0).unwrap(), None);

  assert_eq!(allocator.stats(), before);
}

#[test]
fn test_exhaustion_is_reported_and_recoverable() {
  let mut allocator = Allocator::new(VecArena::with_max_heap(8192)).unwrap();

  let p = allocator.allocate(1000).unwrap();
  let err = allocator.allocate(10_000).unwrap_err();
  assert!(matches!(err, AllocError::Arena(_)));
  allocator.check().unwrap();

  let q = allocator.allocate(1000).unwrap();
  assert!(q.is_some());
  assert_ne!(p, q);
  allocator.check().unwrap();
}

#[test]
fn test_too_large_request() {
  let mut allocator = allocator();

  let err = allocator.allocate(usize::MAX - 4).unwrap_err();

  assert!(matches!(err, AllocError::TooLarge { .. }));
  allocator.check().unwrap();
}

#[test]
fn test_custom_config_without_buffer() {
  let config = Config::default()
    .with_chunk(256)
    .with_realloc_buffer(0)
    .with_tag_threshold(0);
  let mut allocator = Allocator::with_config(VecArena::new(), config).unwrap();

  let p = allocator.allocate(24).unwrap().unwrap();
  let p = allocator.resize(Some(p), 24).unwrap().unwrap();

  assert_eq!(allocator.usable_size(p), 24);
  assert!(allocator.blocks().all(|info| !info.tagged));
  allocator.check().unwrap();
}

#[test]
fn test_release_everything_collapses_to_one_block() {
  let mut allocator = allocator();

  let payloads: Vec<_> = (1..50)
    .map(|i| allocator.allocate(i * 13).unwrap())
    .collect();
  for (i, p) in payloads.iter().enumerate() {
    if i % 2 == 0 {
      allocator.release(*p);
    }
  }
  allocator.check().unwrap();
  for (i, p) in payloads.iter().enumerate() {
    if i % 2 == 1 {
      allocator.release(*p);
    }
  }

  let stats = allocator.stats();
  assert_eq!(stats.allocated_blocks, 0);
  assert_eq!(stats.free_blocks, 1);
  allocator.check().unwrap();
}

#[cfg(unix)]
#[test]
fn test_mmap_arena_backs_allocator() {
  use segalloc::MmapArena;

  let arena = MmapArena::reserve(1 << 20).unwrap();
  let mut allocator = Allocator::new(arena).unwrap();

  let p = allocator.allocate(4000).unwrap().unwrap();
  allocator.payload_mut(p)[3999] = 0x5A;
  let address = allocator.address(p);

  let q = allocator.allocate(64).unwrap().unwrap();
  assert_eq!(allocator.address(p), address);
  assert_eq!(allocator.payload(p)[3999], 0x5A);
  assert_eq!(allocator.address(q) as usize % 8, 0);

  assert!(allocator.allocate(2 << 20).unwrap_err().is_exhausted());
  allocator.check().unwrap();

  let arena = allocator.teardown();
  assert!(arena.high() <= arena.capacity());
}
