use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bitradix::{
    sort_sequential, sort_sequential_threaded, Keyed, QueueMode, RadixKey, SortIndex, ThreadConfig,
    ThreadStats,
};

fn assert_sorted<K: RadixKey, E: Keyed<K>>(d: &[E], up: bool) {
    let ranks: Vec<K::Bits> = d.iter().map(|e| K::to_ordered(e.key_bits())).collect();
    if up {
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "not ascending");
    } else {
        assert!(ranks.windows(2).all(|w| w[0] >= w[1]), "not descending");
    }
}

fn assert_same_multiset<E: Ord + Copy + std::fmt::Debug>(a: &[E], b: &[E]) {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b, "multiset changed");
}

#[test]
fn signed_wraparound() {
    let input = [3i32, -1, 0, i32::MIN, i32::MAX];
    let mut d: Vec<u32> = input.iter().map(|v| *v as u32).collect();
    sort_sequential::<i32, u32, true>(&mut d, 0, 4, 0);
    let back: Vec<i32> = d.iter().map(|v| *v as i32).collect();
    assert_eq!(back, vec![i32::MIN, -1, 0, 3, i32::MAX]);
}

#[test]
fn float_sign_magnitude() {
    let input = [
        0.0f32,
        -0.0,
        1.5,
        -1.5,
        f32::INFINITY,
        f32::NEG_INFINITY,
        f32::NAN,
    ];
    let mut d: Vec<u32> = input.iter().map(|v| v.to_bits()).collect();
    sort_sequential::<f32, u32, true>(&mut d, 0, 6, 0);
    let back: Vec<f32> = d.iter().map(|v| f32::from_bits(*v)).collect();
    assert_eq!(back[0], f32::NEG_INFINITY);
    assert_eq!(back[1], -1.5);
    assert_eq!(back[2].to_bits(), (-0.0f32).to_bits());
    assert_eq!(back[3].to_bits(), 0.0f32.to_bits());
    assert_eq!(back[4], 1.5);
    assert_eq!(back[5], f32::INFINITY);
    assert!(back[6].is_nan());

    // The NaN placement must not depend on the backend.
    let mut threaded: Vec<u32> = input.iter().map(|v| v.to_bits()).collect();
    let config = ThreadConfig::new(4);
    sort_sequential_threaded::<f32, u32, true>(&config, None, &mut threaded, 0, 6, 0);
    assert_eq!(threaded, d);
}

#[test]
fn duplicates_terminate() {
    let mut d: Vec<u32> = vec![7; 5];
    sort_sequential::<u32, u32, true>(&mut d, 0, 4, 0);
    assert_eq!(d, vec![7; 5]);
}

#[test]
fn single_element() {
    let mut d: Vec<u32> = vec![42];
    sort_sequential::<u32, u32, true>(&mut d, 0, 0, 16);
    assert_eq!(d, vec![42]);
}

#[test]
fn threshold_fallback_matches_radix() {
    let mut rng = StdRng::seed_from_u64(7);
    let input: Vec<u32> = (0..16).map(|_| rng.gen()).collect();
    let mut fallback = input.clone();
    let mut radix = input.clone();
    sort_sequential::<u32, u32, true>(&mut fallback, 0, 15, 16);
    sort_sequential::<u32, u32, true>(&mut radix, 0, 15, 0);
    assert_eq!(fallback, radix);
}

#[test]
fn threaded_stress_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(42);
    let input: Vec<u32> = (0..1_000_000).map(|_| rng.gen()).collect();
    let last = input.len() as SortIndex - 1;

    let mut seq = input.clone();
    sort_sequential::<u32, u32, true>(&mut seq, 0, last, 64);

    let config = ThreadConfig {
        num_threads: 8,
        queue_mode: QueueMode::Fifo,
        use_slaves: true,
        slave_fac: 1.0,
    };
    let mut threaded = input.clone();
    sort_sequential_threaded::<u32, u32, true>(&config, None, &mut threaded, 0, last, 64);

    assert_eq!(threaded, seq);
}

#[test]
fn permutation_and_order_across_key_types() {
    let mut rng = StdRng::seed_from_u64(1);
    let len = 10_000usize;
    let last = len as SortIndex - 1;

    let input: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    let mut d = input.clone();
    sort_sequential::<u8, u8, true>(&mut d, 0, last, 8);
    assert_sorted::<u8, u8>(&d, true);
    assert_same_multiset(&input, &d);

    let input: Vec<u16> = (0..len).map(|_| rng.gen()).collect();
    let mut d = input.clone();
    sort_sequential::<i16, u16, true>(&mut d, 0, last, 8);
    assert_sorted::<i16, u16>(&d, true);
    assert_same_multiset(&input, &d);

    let input: Vec<u32> = (0..len).map(|_| rng.gen()).collect();
    let mut d = input.clone();
    sort_sequential::<i32, u32, false>(&mut d, 0, last, 8);
    assert_sorted::<i32, u32>(&d, false);
    assert_same_multiset(&input, &d);

    let input: Vec<u64> = (0..len).map(|_| rng.gen()).collect();
    let mut d = input.clone();
    sort_sequential::<u64, u64, true>(&mut d, 0, last, 8);
    assert_sorted::<u64, u64>(&d, true);
    assert_same_multiset(&input, &d);

    // Raw bit patterns cover NaNs, infinities and denormals.
    let input: Vec<u64> = (0..len).map(|_| rng.gen()).collect();
    let mut d = input.clone();
    sort_sequential::<f64, u64, true>(&mut d, 0, last, 8);
    assert_sorted::<f64, u64>(&d, true);
    assert_same_multiset(&input, &d);
}

#[test]
fn payload_bearing_elements() {
    let mut rng = StdRng::seed_from_u64(2);
    let len = 10_000usize;
    let last = len as SortIndex - 1;

    // u32 key in the low half of a u64 element.
    let input: Vec<u64> = (0..len).map(|_| rng.gen()).collect();
    let mut d = input.clone();
    sort_sequential::<u32, u64, true>(&mut d, 0, last, 16);
    assert_sorted::<u32, u64>(&d, true);
    assert_same_multiset(&input, &d);

    // u64 key in the low half of a u128 element, threaded.
    let input: Vec<u128> = (0..len)
        .map(|_| ((rng.gen::<u64>() as u128) << 64) | rng.gen::<u64>() as u128)
        .collect();
    let mut d = input.clone();
    let config = ThreadConfig::new(4);
    sort_sequential_threaded::<u64, u128, true>(&config, None, &mut d, 0, last, 16);
    assert_sorted::<u64, u128>(&d, true);
    assert_same_multiset(&input, &d);
}

#[test]
fn nothing_outside_the_range_moves() {
    let mut rng = StdRng::seed_from_u64(3);
    let len = 4_096usize;
    let mut d: Vec<u32> = (0..len).map(|_| rng.gen()).collect();
    let sentinel_head: Vec<u32> = d[..8].to_vec();
    let sentinel_tail: Vec<u32> = d[len - 8..].to_vec();
    let inner = d[8..len - 8].to_vec();

    sort_sequential::<u32, u32, true>(&mut d, 8, (len - 9) as SortIndex, 16);

    assert_eq!(&d[..8], &sentinel_head[..]);
    assert_eq!(&d[len - 8..], &sentinel_tail[..]);
    assert_sorted::<u32, u32>(&d[8..len - 8], true);
    assert_same_multiset(&inner, &d[8..len - 8]);
}

#[test]
fn threaded_configs_agree_with_sequential() {
    let mut rng = StdRng::seed_from_u64(4);
    let len = 100_000usize;
    let last = len as SortIndex - 1;
    let input: Vec<u64> = (0..len).map(|_| rng.gen()).collect();

    let mut seq = input.clone();
    sort_sequential::<i64, u64, true>(&mut seq, 0, last, 32);

    for config in [
        ThreadConfig::new(1),
        ThreadConfig {
            num_threads: 3,
            queue_mode: QueueMode::Lifo,
            ..ThreadConfig::new(3)
        },
        ThreadConfig {
            use_slaves: false,
            ..ThreadConfig::new(4)
        },
        ThreadConfig {
            slave_fac: 2.5,
            ..ThreadConfig::new(4)
        },
    ] {
        let mut d = input.clone();
        sort_sequential_threaded::<i64, u64, true>(&config, None, &mut d, 0, last, 32);
        assert_eq!(d, seq, "config {config:?} diverged");
    }
}

#[test]
fn threaded_descending() {
    let mut rng = StdRng::seed_from_u64(5);
    let len = 50_000usize;
    let last = len as SortIndex - 1;
    let input: Vec<u64> = (0..len).map(|_| rng.gen()).collect();

    let mut d = input.clone();
    let config = ThreadConfig::new(4);
    sort_sequential_threaded::<f64, u64, false>(&config, None, &mut d, 0, last, 32);
    assert_sorted::<f64, u64>(&d, false);
    assert_same_multiset(&input, &d);
}

#[test]
fn stats_are_collected() {
    let mut rng = StdRng::seed_from_u64(6);
    let len = 100_000usize;
    let last = len as SortIndex - 1;
    let mut d: Vec<u32> = (0..len).map(|_| rng.gen()).collect();

    let config = ThreadConfig::new(4);
    let mut stats = ThreadStats::new(config.num_threads);
    sort_sequential_threaded::<u32, u32, true>(&config, Some(&mut stats), &mut d, 0, last, 32);

    assert_eq!(stats.elements.len(), 4);
    assert_eq!(stats.chunks.len(), 4);
    assert!(stats.chunks.iter().sum::<SortIndex>() >= 1);
    // Every element is partitioned at least once on the first bit level.
    assert!(stats.elements.iter().sum::<SortIndex>() >= len as SortIndex);
    assert!(stats.max_queue_len >= 1);
}

#[test]
fn tiny_inputs_on_a_large_pool() {
    for len in 0..16usize {
        let mut d: Vec<u32> = (0..len as u32).rev().collect();
        let config = ThreadConfig::new(8);
        let last = len as SortIndex - 1;
        sort_sequential_threaded::<u32, u32, true>(&config, None, &mut d, 0, last, 2);
        let expect: Vec<u32> = (0..len as u32).collect();
        assert_eq!(d, expect);
    }
}

#[test]
#[should_panic(expected = "num_threads")]
fn zero_threads_is_fatal() {
    let config = ThreadConfig {
        num_threads: 0,
        ..ThreadConfig::default()
    };
    let mut d: Vec<u32> = vec![1, 2, 3];
    sort_sequential_threaded::<u32, u32, true>(&config, None, &mut d, 0, 2, 0);
}
