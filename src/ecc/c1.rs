//! C1 decoding of DAT block pairs.
//!
//! A block pair is 64 bytes: two 32-byte blocks whose bytes interleave two
//! independent C1 codewords. The even bytes of the pair form one codeword,
//! the odd bytes the other; each is checked against the four-syndrome P
//! matrix. A codeword that cannot be repaired marks all of its 32 pair
//! positions unknown.

use super::matrix::hp;
use super::rs;
use super::Recovered;

/// Bytes per DAT block.
pub const BLOCK_LEN: usize = 32;

/// Bytes per block pair.
pub const PAIR_LEN: usize = 2 * BLOCK_LEN;

/// Deinterleave a block pair into its two C1 codeword vectors.
///
/// For i in 0..16: `v1[i] = a[2i]`, `v1[i+16] = b[2i]`, `v2[i] = a[2i+1]`,
/// `v2[i+16] = b[2i+1]`, where `a` and `b` are the pair's two blocks.
pub fn vps_for_block_pair(pair: &[u8; PAIR_LEN]) -> ([u8; BLOCK_LEN], [u8; BLOCK_LEN]) {
    let (a, b) = pair.split_at(BLOCK_LEN);
    let mut v1 = [0u8; BLOCK_LEN];
    let mut v2 = [0u8; BLOCK_LEN];
    for i in 0..16 {
        v1[i] = a[2 * i];
        v1[i + 16] = b[2 * i];
        v2[i] = a[2 * i + 1];
        v2[i + 16] = b[2 * i + 1];
    }
    (v1, v2)
}

/// Interleave two C1 codeword vectors back into a block pair.
///
/// Inverse of [`vps_for_block_pair`].
pub fn block_pair_from_vps(v1: &[u8; BLOCK_LEN], v2: &[u8; BLOCK_LEN]) -> [u8; PAIR_LEN] {
    let mut pair = [0u8; PAIR_LEN];
    for i in 0..16 {
        pair[2 * i] = v1[i];
        pair[BLOCK_LEN + 2 * i] = v1[i + 16];
        pair[2 * i + 1] = v2[i];
        pair[BLOCK_LEN + 2 * i + 1] = v2[i + 16];
    }
    pair
}

/// Detect and correct the errors in a 64-byte block pair.
///
/// `erasures` are byte indices into the pair (0..64) known bad before
/// decoding; they split by parity onto the two codewords. Each returned
/// element is the repaired byte, or `None` when its codeword was
/// uncorrectable.
pub fn correct_block_pair(pair: &[u8; PAIR_LEN], erasures: &[usize]) -> [Recovered; PAIR_LEN] {
    let (v1, v2) = vps_for_block_pair(pair);

    let v1_erasures: Vec<usize> = erasures
        .iter()
        .filter(|&&k| k % 2 == 0)
        .map(|&k| k / 2)
        .collect();
    let v2_erasures: Vec<usize> = erasures
        .iter()
        .filter(|&&k| k % 2 == 1)
        .map(|&k| k / 2)
        .collect();

    let c1 = rs::correct_codeword(&v1, hp(), &v1_erasures);
    let c2 = rs::correct_codeword(&v2, hp(), &v2_erasures);

    let mut out = [None; PAIR_LEN];
    for i in 0..16 {
        out[2 * i] = c1.as_ref().map(|v| v[i]);
        out[BLOCK_LEN + 2 * i] = c1.as_ref().map(|v| v[i + 16]);
        out[2 * i + 1] = c2.as_ref().map(|v| v[i]);
        out[BLOCK_LEN + 2 * i + 1] = c2.as_ref().map(|v| v[i + 16]);
    }
    out
}
