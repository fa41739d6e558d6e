//! Stable seeds for simulated results.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a hash of `input`. Stable across builds and platforms, so simulated
/// metrics derived from an identifier are reproducible.
pub fn stable_seed(input: &str) -> u64 {
    input.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
