//! Reed-Solomon erasures-and-errors decoding.
//!
//! The decoder follows the hardware-oriented Sarwate-Yan formulation of the
//! extended Euclidean algorithm, which folds erasure preconditioning and the
//! key-equation solve into one uniform iteration. A codeword is checked
//! against a [`CheckMatrix`], the key equation yields the error locator σ and
//! evaluator ω, a Chien search finds the locator roots, and Forney's formula
//! (with the DAT starting power b₀ = 0) produces the error magnitudes.
//!
//! Failure at any stage has a single external meaning: the codeword is
//! uncorrectable, and the caller substitutes sentinels for every byte.

use super::gf;
use super::matrix::CheckMatrix;
use super::poly::{is_zero, poly_add, poly_eval, scalar_mul};

/// Compute the syndrome vector `S[i] = Σ_j V[j] * H[i][j]`.
///
/// All-zero syndromes mean the codeword is clean.
pub fn syndromes(v: &[u8], h: &CheckMatrix) -> Vec<u8> {
    debug_assert_eq!(v.len(), h.len());
    (0..h.syndromes())
        .map(|i| {
            v.iter()
                .enumerate()
                .fold(0u8, |acc, (j, &b)| acc ^ gf::mul(b, h.at(i, j)))
        })
        .collect()
}

/// Prepend a zero coefficient, keeping at most `two_t` terms of `p`.
///
/// This is the "raise powers" step of the iteration: multiply by z while
/// discarding terms the algorithm no longer tracks.
fn raised(p: &[u8], two_t: usize) -> Vec<u8> {
    let mut r = Vec::with_capacity(two_t + 1);
    r.push(0);
    r.extend_from_slice(&p[..p.len().min(two_t)]);
    r
}

/// Solve the key equation for errors-and-erasures decoding.
///
/// `s` is the syndrome vector (length 2t). `chi` holds one coefficient per
/// known erasure, α^(n-1-c) for erasure position c, consumed front to back
/// one per iteration.
///
/// Returns `(sigma, omega, ok)`: the error locator (≤ 2t+1 coefficients),
/// the error evaluator (≤ 2t coefficients), and whether the error pattern is
/// correctable. The pattern is correctable iff the degree register ends
/// negative and every erasure coefficient was consumed.
pub fn sarwate_yan(s: &[u8], chi: &[u8]) -> (Vec<u8>, Vec<u8>, bool) {
    let two_t = s.len();

    // U starts as z^(2t); V tracks the syndromes, X the locator candidate.
    let mut u = vec![0u8; two_t + 1];
    u[two_t] = 1;
    let mut v = s.to_vec();
    let mut x = vec![1u8];
    let mut w = vec![0u8];
    let mut l: i32 = -1;
    let mut chi = chi.to_vec();

    for _ in 0..two_t {
        let first = !chi.is_empty();
        let swap = !first && v[two_t - 1] != 0 && l < 0;

        let (g, z) = if first {
            (chi[0], 1)
        } else {
            (u[two_t], v[two_t - 1])
        };

        if swap {
            l = -(l + 1);
        } else if !first {
            l -= 1;
        }

        if first {
            chi.remove(0);
        }

        let (v_adjust, x_adjust) = if first {
            (scalar_mul(&v, z), scalar_mul(&x, z))
        } else {
            (scalar_mul(&u, z), scalar_mul(&w, z))
        };

        let v_shift = raised(&v, two_t);
        let x_shift = raised(&x, two_t);

        let new_v = poly_add(&scalar_mul(&v_shift, g), &v_adjust);
        let new_x = poly_add(&scalar_mul(&x_shift, g), &x_adjust);

        if swap {
            u = v_shift;
            w = x_shift;
        }
        v = new_v;
        x = new_x;
    }

    let ok = l < 0 && chi.is_empty();
    x.truncate(two_t + 1);
    v.truncate(two_t);
    (x, v, ok)
}

/// Chien search: every `i` in `[0, max_power)` for which `p(α^-i) == 0`.
///
/// Root exponents index error positions from the units end of the codeword;
/// the corresponding vector position is `n - 1 - i`.
pub fn primitive_roots(p: &[u8], max_power: usize) -> Vec<usize> {
    (0..max_power)
        .filter(|&i| {
            let inv_beta = gf::ALPHA_POWERS[(255 - i) % 255];
            poly_eval(p, inv_beta) == 0
        })
        .collect()
}

/// Forney's formula: the error magnitude for locator root exponent `i`.
///
/// With b₀ = 0 the numerator is just ω(β⁻¹). The denominator is
/// σ'(β⁻¹)·β⁻¹; in characteristic 2 the formal derivative keeps only the
/// odd-index terms of σ.
pub fn error_magnitude(sigma: &[u8], omega: &[u8], i: usize) -> u8 {
    let inv_beta = gf::ALPHA_POWERS[(255 - i) % 255];
    let top = poly_eval(omega, inv_beta);

    let mut deriv = 0;
    let mut y = 1;
    for (j, &c) in sigma.iter().enumerate().skip(1) {
        if j & 1 == 1 {
            deriv ^= gf::mul(c, y);
        }
        y = gf::mul(y, inv_beta);
    }
    let bottom = gf::mul(deriv, inv_beta);

    gf::mul(top, gf::INVERSES[bottom as usize])
}

/// Detect and correct the errors in one codeword.
///
/// `erasures` are positions known bad before decoding. Returns the repaired
/// codeword, or `None` when the pattern is uncorrectable: the key equation
/// reports failure, no locator root lies in range, or the corrected word
/// still has a nonzero syndrome.
pub fn correct_codeword(v: &[u8], h: &CheckMatrix, erasures: &[usize]) -> Option<Vec<u8>> {
    let n = v.len();
    debug_assert_eq!(n, h.len());

    let mut s = syndromes(v, h);
    if is_zero(&s) {
        return Some(v.to_vec());
    }

    let chi: Vec<u8> = erasures
        .iter()
        .map(|&c| gf::ALPHA_POWERS[n - 1 - c])
        .collect();

    let (sigma, omega, ok) = sarwate_yan(&s, &chi);
    if !ok {
        return None;
    }

    let roots = primitive_roots(&sigma, n);
    if roots.is_empty() {
        return None;
    }

    let mut out = v.to_vec();
    for &i in &roots {
        let err = error_magnitude(&sigma, &omega, i);
        let pos = n - 1 - i;
        out[pos] ^= err;
        for (k, sk) in s.iter_mut().enumerate() {
            *sk ^= gf::mul(h.at(k, pos), err);
        }
    }

    if is_zero(&s) {
        Some(out)
    } else {
        None
    }
}
