use argh::FromArgs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bitradix::par::cached_available_parallelism;
use bitradix::{
    sort_sequential, sort_sequential_threaded, QueueMode, SortIndex, ThreadConfig, ThreadStats,
    Timer,
};

#[derive(FromArgs)]
/// Sort random 64-bit keys with each backend and verify the results agree.
struct Args {
    /// number of elements
    #[argh(option, default = "1_000_000")]
    len: usize,
    /// worker threads for the threaded backend
    #[argh(option, default = "cached_available_parallelism()")]
    threads: usize,
    /// queue mode: 'fifo' or 'lifo'
    #[argh(option, default = "QueueMode::Fifo")]
    queue: QueueMode,
    /// comparison cutover
    #[argh(option, default = "32")]
    cmp_thresh: SortIndex,
}

fn main() {
    let args: Args = argh::from_env();

    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<u64> = (0..args.len).map(|_| rng.gen()).collect();
    let last = data.len() as SortIndex - 1;

    let mut seq = data.clone();
    {
        let _t = Timer::new("sort_sequential");
        sort_sequential::<u64, u64, true>(&mut seq, 0, last, args.cmp_thresh);
    }
    assert!(seq.is_sorted());

    #[cfg(all(
        target_arch = "x86_64",
        target_feature = "avx512f",
        target_feature = "avx512bw",
        target_feature = "avx512dq"
    ))]
    {
        let mut simd = data.clone();
        let _t = Timer::new("sort_simd");
        bitradix::sort_simd::<u64, u64, true>(&mut simd, 0, last, args.cmp_thresh);
        drop(_t);
        assert_eq!(simd, seq);
    }

    let config = ThreadConfig {
        num_threads: args.threads,
        queue_mode: args.queue,
        ..ThreadConfig::default()
    };
    let mut stats = ThreadStats::new(config.num_threads);
    let mut threaded = data.clone();
    {
        let _t = Timer::new("sort_sequential_threaded");
        sort_sequential_threaded::<u64, u64, true>(
            &config,
            Some(&mut stats),
            &mut threaded,
            0,
            last,
            args.cmp_thresh,
        );
    }
    assert_eq!(threaded, seq);

    #[cfg(all(
        target_arch = "x86_64",
        target_feature = "avx512f",
        target_feature = "avx512bw",
        target_feature = "avx512dq"
    ))]
    {
        let mut threaded_simd = data.clone();
        let _t = Timer::new("sort_simd_threaded");
        bitradix::sort_simd_threaded::<u64, u64, true>(
            &config,
            None,
            &mut threaded_simd,
            0,
            last,
            args.cmp_thresh,
        );
        drop(_t);
        assert_eq!(threaded_simd, seq);
    }

    println!(
        "threads {} chunks {:?} queue high-water {}",
        config.num_threads, stats.chunks, stats.max_queue_len
    );
}
