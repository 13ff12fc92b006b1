//! DCLZ compression entities.
//!
//! A compressed entity is an 8-byte header followed by a DCLZ bitstream.
//! The header pins the compression scheme (access point 0x20 means DCLZ)
//! and declares the uncompressed geometry: record length times record
//! count is the exact number of bytes the payload must expand to.

use std::io::Write;

use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

use crate::dclz::Dclz;
use crate::error::{RecoverError, Result};
use crate::types::DecodeOptions;

/// Size of the entity header.
pub const ENTITY_HEADER_SIZE: usize = 8;

/// Access point identifier for DCLZ compression.
pub const ACCESS_POINT_DCLZ: u8 = 0x20;

/// The unpacked entity header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHeader {
    /// Uncompressed length of each record in the entity.
    pub unprocessed_record_length: u32,
    /// Number of records compressed into the entity.
    pub processed_record_count: u16,
}

impl EntityHeader {
    /// Parse and check an entity header against its validity bytes.
    pub fn parse(data: &[u8], validity: &[u8]) -> Result<Self> {
        if data.len() < ENTITY_HEADER_SIZE {
            return Err(RecoverError::EntityHeader {
                message: format!("{} bytes is too short", data.len()),
            });
        }
        if validity.iter().take(ENTITY_HEADER_SIZE).any(|&v| v == 0) {
            return Err(RecoverError::EntityHeader {
                message: "header bytes are not valid".to_string(),
            });
        }

        let header_size = data[0];
        if usize::from(header_size) != ENTITY_HEADER_SIZE {
            return Err(RecoverError::EntityHeader {
                message: format!("header size {header_size}, expected {ENTITY_HEADER_SIZE}"),
            });
        }
        if data[1] != 0 {
            return Err(RecoverError::EntityHeader {
                message: format!("reserved byte {:#04x}, expected zero", data[1]),
            });
        }
        if data[2] != ACCESS_POINT_DCLZ {
            return Err(RecoverError::EntityHeader {
                message: format!("access point {:#04x}, expected {ACCESS_POINT_DCLZ:#04x}", data[2]),
            });
        }

        Ok(Self {
            unprocessed_record_length: BigEndian::read_u24(&data[3..6]),
            processed_record_count: BigEndian::read_u16(&data[6..8]),
        })
    }

    /// The exact number of bytes the entity must decompress to.
    pub fn expected_size(&self) -> u64 {
        u64::from(self.unprocessed_record_length) * u64::from(self.processed_record_count)
    }
}

/// Decompress a complete entity into `out` and check its size.
///
/// Returns the number of bytes written. A decompressed total different from
/// the header's record geometry is a [`RecoverError::SizeMismatch`].
pub fn expand_entity<W: Write>(
    data: &[u8],
    validity: &[u8],
    options: &DecodeOptions,
    out: &mut W,
) -> Result<u64> {
    let header = EntityHeader::parse(data, validity)?;
    debug!(
        record_length = header.unprocessed_record_length,
        record_count = header.processed_record_count,
        compressed = data.len() - ENTITY_HEADER_SIZE,
        "expanding entity"
    );

    let mut dclz = Dclz::new(&data[ENTITY_HEADER_SIZE..], options);
    let written = dclz.expand(out)?;

    let expected = header.expected_size();
    if written != expected {
        return Err(RecoverError::SizeMismatch {
            expected,
            actual: written,
        });
    }
    Ok(written)
}

/// Build an entity for tests: `payload` as 9-bit literal codewords after a
/// dictionary reset, declared as one record of `payload.len()` bytes.
#[cfg(test)]
pub(crate) fn literal_entity(payload: &[u8]) -> Vec<u8> {
    let mut data = vec![
        ENTITY_HEADER_SIZE as u8,
        0,
        ACCESS_POINT_DCLZ,
        0,
        0,
        0,
        0,
        1,
    ];
    BigEndian::write_u24(&mut data[3..6], payload.len() as u32);

    // Reset consumes two whole bytes; literals pack continuously after.
    let mut bits: u64 = 0;
    let mut nbits = 0;
    data.push(0x01);
    data.push(0x00);
    for &b in payload {
        bits |= u64::from(8 + u16::from(b)) << nbits;
        nbits += 9;
        while nbits >= 8 {
            data.push((bits & 0xFF) as u8);
            bits >>= 8;
            nbits -= 8;
        }
    }
    if nbits > 0 {
        data.push((bits & 0xFF) as u8);
    }
    data
}
