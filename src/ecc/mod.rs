//! Reed-Solomon error correction for the DAT/DDS tape codes.
//!
//! This module implements the error-correction layers a DAT/DDS deck applies
//! on tape: GF(2⁸) arithmetic over the polynomial 0x11D ([`gf`], [`poly`]),
//! the C1/C2/C3 parity check matrices ([`matrix`]), an erasures-and-errors
//! Reed-Solomon decoder ([`rs`]), and the C1 block-pair front end ([`c1`])
//! that repairs raw 64-byte block pairs before group assembly.
//!
//! The decoders never guess: a codeword that cannot be repaired is reported
//! position by position as unknown, so later layers (or the caller) can see
//! exactly which bytes survive.

pub mod c1;
pub mod gf;
pub mod matrix;
pub mod poly;
pub mod rs;

/// A decoded byte: `None` marks a position the decoder could not recover.
pub type Recovered = Option<u8>;

pub use c1::{block_pair_from_vps, correct_block_pair, vps_for_block_pair};
pub use matrix::{hi, hp, hq, CheckMatrix};
pub use rs::correct_codeword;
