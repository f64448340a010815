use proptest::prelude::*;
use segalloc::{Allocator, Config, Payload, VecArena};

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  Release(usize),
  Resize(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => (1usize..600).prop_map(Op::Allocate),
    2 => any::<usize>().prop_map(Op::Release),
    2 => (any::<usize>(), 0usize..900).prop_map(|(i, n)| Op::Resize(i, n)),
  ]
}

struct Live {
  payload: Payload,
  content: Vec<u8>,
}

fn pattern(
  len: usize,
  seed: u8,
) -> Vec<u8> {
  (0..len).map(|i| seed.wrapping_mul(31).wrapping_add(i as u8)).collect()
}

fn replay(
  config: Config,
  ops: Vec<Op>,
) -> Result<(), TestCaseError> {
  let mut allocator = Allocator::with_config(VecArena::with_max_heap(1 << 20), config).unwrap();
  let mut live: Vec<Live> = Vec::new();

  for (step, op) in ops.into_iter().enumerate() {
    let seed = step as u8;

    match op {
      Op::Allocate(size) => {
        let payload = allocator.allocate(size).unwrap().unwrap();
        let content = pattern(size, seed);
        allocator.payload_mut(payload)[..size].copy_from_slice(&content);
        live.push(Live { payload, content });
      }
      Op::Release(i) => {
        if live.is_empty() {
          continue;
        }
        let gone = live.swap_remove(i % live.len());
        allocator.release(Some(gone.payload));
      }
      Op::Resize(i, size) => {
        if live.is_empty() {
          continue;
        }
        let index = i % live.len();
        let old = &live[index];
        let kept = old.content.len().min(size);

        match allocator.resize(Some(old.payload), size).unwrap() {
          None => {
            prop_assert_eq!(size, 0);
            live.swap_remove(index);
          }
          Some(payload) => {
            prop_assert!(allocator.usable_size(payload) >= size);
            prop_assert_eq!(&allocator.payload(payload)[..kept], &old.content[..kept]);

            let content = pattern(size, seed);
            allocator.payload_mut(payload)[..size].copy_from_slice(&content);
            live[index] = Live { payload, content };
          }
        }
      }
    }

    prop_assert_eq!(allocator.check(), Ok(()));

    let mut spans: Vec<(usize, usize)> = live
      .iter()
      .map(|l| (l.payload.offset(), l.payload.offset() + allocator.usable_size(l.payload)))
      .collect();
    spans.sort();
    for pair in spans.windows(2) {
      prop_assert!(pair[0].1 <= pair[1].0, "overlap: {:?}", pair);
    }

    for l in &live {
      prop_assert_eq!(l.payload.offset() % 8, 0);
      prop_assert_eq!(&allocator.payload(l.payload)[..l.content.len()], &l.content[..]);
      prop_assert!(
        allocator
          .blocks()
          .any(|info| info.payload == l.payload && info.allocated)
      );
    }
  }

  Ok(())
}

proptest! {
  #[test]
  fn test_random_traces_with_default_config(ops in prop::collection::vec(op(), 1..80)) {
    replay(Config::default(), ops)?;
  }

  #[test]
  fn test_random_traces_with_small_chunks(ops in prop::collection::vec(op(), 1..80)) {
    let config = Config::default()
      .with_initial_chunk(16)
      .with_chunk(64)
      .with_realloc_buffer(16);
    replay(config, ops)?;
  }

  #[test]
  fn test_random_traces_without_buffer(ops in prop::collection::vec(op(), 1..80)) {
    let config = Config::default().with_realloc_buffer(0);
    replay(config, ops)?;
  }
}
