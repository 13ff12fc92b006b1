//! Check matrices for the DAT/DDS Reed-Solomon codes.
//!
//! All three codes share the same construction: row `i`, column `n-1-j`
//! holds α^(i·j), so the first row is all ones (the codes use a starting
//! power b₀ of zero). The row count is the syndrome count 2t.

use std::sync::OnceLock;

use super::gf;

/// A Reed-Solomon parity check matrix.
#[derive(Debug, Clone)]
pub struct CheckMatrix {
    rows: Vec<Vec<u8>>,
    len: usize,
}

impl CheckMatrix {
    fn generate(syndromes: usize, len: usize) -> Self {
        let mut rows = vec![vec![0u8; len]; syndromes];
        for (i, row) in rows.iter_mut().enumerate() {
            for j in 0..len {
                row[len - 1 - j] = gf::pow(gf::ALPHA, (i * j) as u32);
            }
        }
        Self { rows, len }
    }

    /// Number of syndrome rows (2t).
    pub fn syndromes(&self) -> usize {
        self.rows.len()
    }

    /// Codeword length n (column count).
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the matrix has no columns. Never the case for the built-in
    /// matrices; present for completeness.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The element at row `i`, column `j`.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> u8 {
        self.rows[i][j]
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[u8] {
        &self.rows[i]
    }
}

/// The C1/C2 "P" check matrix: 4 syndromes over 32-byte codewords.
pub fn hp() -> &'static CheckMatrix {
    static HP: OnceLock<CheckMatrix> = OnceLock::new();
    HP.get_or_init(|| CheckMatrix::generate(4, 32))
}

/// The C2 "Q" check matrix: 6 syndromes over 32-byte codewords.
pub fn hq() -> &'static CheckMatrix {
    static HQ: OnceLock<CheckMatrix> = OnceLock::new();
    HQ.get_or_init(|| CheckMatrix::generate(6, 32))
}

/// The DDS C3 "I" check matrix: 2 syndromes over 46-byte codewords.
pub fn hi() -> &'static CheckMatrix {
    static HI: OnceLock<CheckMatrix> = OnceLock::new();
    HI.get_or_init(|| CheckMatrix::generate(2, 46))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        assert_eq!(hp().syndromes(), 4);
        assert_eq!(hp().len(), 32);
        assert_eq!(hq().syndromes(), 6);
        assert_eq!(hq().len(), 32);
        assert_eq!(hi().syndromes(), 2);
        assert_eq!(hi().len(), 46);
    }

    #[test]
    fn test_first_row_is_ones() {
        for m in [hp(), hq(), hi()] {
            assert!(m.row(0).iter().all(|&x| x == 1));
        }
    }

    #[test]
    fn test_power_layout() {
        // Row 1 runs a^(n-1) .. a^1, 1 left to right.
        let hp = hp();
        assert_eq!(hp.at(1, 31), 1);
        assert_eq!(hp.at(1, 30), 2);
        assert_eq!(hp.at(1, 0), gf::pow(gf::ALPHA, 31));
        // Row i is row 1 raised elementwise to i.
        for j in 0..32 {
            assert_eq!(hp.at(2, j), gf::mul(hp.at(1, j), hp.at(1, j)));
        }
        let hi = hi();
        assert_eq!(hi.at(1, 0), gf::pow(gf::ALPHA, 45));
    }
}
