//! DCLZ decompression (ECMA-198, Data Compression for Lempel-Ziv).
//!
//! DCLZ is an LZW-style code with variable-width codewords (9 to 12 bits,
//! consumed LSB-first within each byte) and explicit control codewords for
//! dictionary reset and freeze, codeword-size increment, and end-of-record
//! padding. Codewords 8..=263 are literal bytes; 264..=4095 reference
//! dictionary strings built from previously emitted output.
//!
//! A decoder owns its dictionary, bit reservoir and output counter for the
//! lifetime of one entity. Input exhaustion, whether between codewords or in
//! the middle of one, ends decoding cleanly; the entity layer checks the
//! decompressed size afterwards.

use std::io::Write;

use tracing::trace;

use crate::error::{RecoverError, Result};
use crate::types::DecodeOptions;

/// First dictionary codeword.
const FIRST_DICT_CODE: u32 = 264;

/// One past the last dictionary codeword; reaching it freezes the dictionary.
const DICT_LIMIT: u32 = 4096;

/// Longest string the dictionary will accept. Longer candidates are skipped
/// without consuming a slot.
const MAX_STRING_LEN: usize = 128;

/// Initial codeword width in bits.
const MIN_CW_SIZE: u32 = 9;

/// Widest codeword the protocol allows.
const MAX_CW_SIZE: u32 = 12;

/// Control codeword: freeze the dictionary.
const CW_FREEZE: u32 = 0;
/// Control codeword: reset the dictionary and codeword size.
const CW_RESET: u32 = 1;
/// Control codeword: widen codewords by one bit.
const CW_INCREMENT: u32 = 2;
/// Control codeword: end of record; the next codeword is byte-padded.
const CW_END_RECORD: u32 = 3;

/// A DCLZ decoder over one compressed input buffer.
pub struct Dclz<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bit reservoir: unread stream bits live in the low `bits` positions.
    accum: u32,
    bits: u32,
    cw_size: u32,
    mask: u32,
    /// Strings for codewords 264.., dense from the front.
    dictionary: Vec<Vec<u8>>,
    frozen: bool,
    last_string: Vec<u8>,
    /// The next codeword is byte-padded (set by end-of-record).
    pad_pending: bool,
    /// Suppress the last-string update on the next emit.
    end_record_pending: bool,
    total_written: u64,
    verbosity: u8,
}

impl<'a> Dclz<'a> {
    /// Create a decoder over a compressed entity payload.
    pub fn new(data: &'a [u8], options: &DecodeOptions) -> Self {
        let mut dclz = Self {
            data,
            pos: 0,
            accum: 0,
            bits: 0,
            cw_size: 0,
            mask: 0,
            dictionary: Vec::new(),
            frozen: false,
            last_string: Vec::new(),
            pad_pending: false,
            end_record_pending: false,
            total_written: 0,
            verbosity: options.verbosity,
        };
        dclz.set_cw_size(MIN_CW_SIZE);
        dclz
    }

    /// Total bytes written to the sink so far.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// The dictionary slot the next added string will occupy.
    fn next_entry(&self) -> u32 {
        FIRST_DICT_CODE + self.dictionary.len() as u32
    }

    fn set_cw_size(&mut self, n: u32) {
        self.cw_size = n;
        self.mask = (1 << n) - 1;
    }

    fn increment_cw_size(&mut self) -> Result<()> {
        if self.cw_size >= MAX_CW_SIZE {
            return Err(RecoverError::DclzProtocol {
                message: format!("codeword size past {MAX_CW_SIZE} bits"),
            });
        }
        self.set_cw_size(self.cw_size + 1);
        Ok(())
    }

    fn reset_dictionary(&mut self) {
        self.dictionary.clear();
        self.frozen = false;
        self.last_string.clear();
        self.set_cw_size(MIN_CW_SIZE);
    }

    /// Drop every bit still in the reservoir.
    fn flush(&mut self) {
        self.accum = 0;
        self.bits = 0;
    }

    fn add_to_dictionary(&mut self, entry: Vec<u8>) {
        if entry.len() > MAX_STRING_LEN {
            return;
        }
        if self.verbosity > 2 {
            trace!(slot = self.next_entry(), entry = %hex::encode(&entry), "dictionary add");
        }
        self.dictionary.push(entry);
        if self.next_entry() == DICT_LIMIT {
            self.frozen = true;
        }
    }

    /// Extract the next codeword, refilling the reservoir byte by byte.
    ///
    /// `None` means the input ran out, either between codewords or while
    /// refilling; both end the stream. A pending byte-pad discards whatever
    /// the reservoir still holds after the extraction, so the padded
    /// codeword occupies whole input bytes.
    fn next_code(&mut self) -> Option<u32> {
        while self.bits < self.cw_size {
            let &byte = self.data.get(self.pos)?;
            self.accum |= u32::from(byte) << self.bits;
            self.pos += 1;
            self.bits += 8;
        }

        let cw = self.accum & self.mask;
        if self.pad_pending {
            self.flush();
            self.pad_pending = false;
        } else {
            self.accum >>= self.cw_size;
            self.bits -= self.cw_size;
        }
        Some(cw)
    }

    /// Write one decoded string and fold it into the dictionary state.
    fn emit<W: Write>(&mut self, item: Vec<u8>, out: &mut W) -> Result<()> {
        out.write_all(&item)?;
        self.total_written += item.len() as u64;

        if !self.frozen && !self.last_string.is_empty() {
            let mut entry = self.last_string.clone();
            entry.push(item[0]);
            self.add_to_dictionary(entry);
        }

        if self.end_record_pending {
            self.end_record_pending = false;
            self.last_string.clear();
        } else {
            self.last_string = item;
        }
        Ok(())
    }

    /// Decompress the whole input into `out`; returns the bytes written.
    pub fn expand<W: Write>(&mut self, out: &mut W) -> Result<u64> {
        while let Some(cw) = self.next_code() {
            if self.verbosity > 2 {
                trace!(cw, cw_size = self.cw_size, "codeword");
            }
            match cw {
                CW_FREEZE => self.frozen = true,
                CW_RESET => {
                    self.reset_dictionary();
                    self.flush();
                }
                CW_INCREMENT => self.increment_cw_size()?,
                CW_END_RECORD => {
                    self.flush();
                    self.pad_pending = true;
                    self.end_record_pending = true;
                }
                4..=7 => {
                    return Err(RecoverError::DclzProtocol {
                        message: format!("illegal control codeword {cw}"),
                    });
                }
                8..=263 => {
                    self.emit(vec![(cw - 8) as u8], out)?;
                }
                _ => {
                    // A reference to the very next free slot is legal: it can
                    // only mean the string the encoder is about to define,
                    // the last string plus its own first byte.
                    let item = if cw == self.next_entry() {
                        let first = *self.last_string.first().ok_or_else(|| {
                            RecoverError::DclzProtocol {
                                message: format!("codeword {cw} references the next slot with no previous string"),
                            }
                        })?;
                        let mut s = self.last_string.clone();
                        s.push(first);
                        s
                    } else {
                        self.dictionary
                            .get((cw - FIRST_DICT_CODE) as usize)
                            .cloned()
                            .ok_or_else(|| RecoverError::DclzProtocol {
                                message: format!("reference to unwritten dictionary slot {cw}"),
                            })?
                    };
                    self.emit(item, out)?;
                }
            }
        }
        Ok(self.total_written)
    }
}
