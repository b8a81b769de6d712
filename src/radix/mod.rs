pub mod insertion;
pub mod key;
pub mod scalar;
#[cfg(all(
    target_arch = "x86_64",
    target_feature = "avx512f",
    target_feature = "avx512bw",
    target_feature = "avx512dq"
))]
pub mod simd;
pub mod sorter;
