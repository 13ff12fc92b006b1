//! Basic Group parsing.
//!
//! A DDS Basic Group is exactly 126 632 bytes: a 126 600-byte payload
//! followed by a 32-byte trailer. The block access table (BAT) grows from
//! the trailer downward into the top of the payload area, four bytes per
//! entry. All multi-byte fields are big-endian.
//!
//! Each group byte has a companion validity byte from the channel decode;
//! zero means the byte was never recovered. The trailer and every BAT entry
//! must be fully valid before anything here is trusted. Interpreting the BAT
//! is the job of [`crate::stream`]; this module only unpacks it.

use std::path::Path;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{RecoverError, Result};
use crate::types::DecodeOptions;

/// Size of a Basic Group in bytes.
pub const GROUP_SIZE: usize = 126_632;

/// Size of the group trailer.
pub const TRAILER_SIZE: usize = 32;

/// Offset of the trailer; also the exclusive end of the payload.
pub const TRAILER_OFFSET: usize = GROUP_SIZE - TRAILER_SIZE;

/// Size of one block access table entry.
pub const BAT_ENTRY_SIZE: usize = 4;

/// Bit 3 of the Item byte is an ignore-me flag and is always masked off.
const ITEM_MASK: u8 = 0xF7;

/// One block access table entry: a masked Item code and a 24-bit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatEntry {
    /// Item code with bit 3 cleared.
    pub item: u8,
    /// 24-bit big-endian byte count (meaning depends on the Item).
    pub count: u32,
}

impl BatEntry {
    fn parse(bytes: &[u8]) -> Self {
        Self {
            item: bytes[0] & ITEM_MASK,
            count: BigEndian::read_u24(&bytes[1..4]),
        }
    }
}

/// The unpacked 32-byte group trailer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupTrailer {
    /// Running number of this group on tape.
    pub group_number: u16,
    /// Number of BAT entries.
    pub block_access_table_count: u16,
    /// Records written up to and including this group.
    pub record_count: u32,
    /// Separator 1 marks (file marks) written up to and including this group.
    pub separator1_count: u32,
    /// Separator 2 marks (set marks) written up to and including this group.
    pub separator2_count: u16,
    /// Records beginning in this group.
    pub group_record_count: u16,
    /// Last group in which a record began.
    pub previous_record_group_number: u16,
    /// Separator 1 marks in this group.
    pub group_separator1_count: u16,
    /// Last group containing a separator 1 mark.
    pub previous_separator1_group_number: u16,
    /// Separator 2 marks in this group.
    pub group_separator2_count: u16,
    /// Last group containing a separator 2 mark.
    pub previous_separator2_group_number: u16,
}

impl GroupTrailer {
    fn parse(t: &[u8]) -> Self {
        Self {
            group_number: BigEndian::read_u16(&t[0..2]),
            block_access_table_count: BigEndian::read_u16(&t[2..4]),
            record_count: BigEndian::read_u32(&t[4..8]),
            separator1_count: BigEndian::read_u32(&t[8..12]),
            // bytes 12..14 reserved
            separator2_count: BigEndian::read_u16(&t[14..16]),
            group_record_count: BigEndian::read_u16(&t[16..18]),
            previous_record_group_number: BigEndian::read_u16(&t[18..20]),
            group_separator1_count: BigEndian::read_u16(&t[20..22]),
            previous_separator1_group_number: BigEndian::read_u16(&t[22..24]),
            group_separator2_count: BigEndian::read_u16(&t[24..26]),
            previous_separator2_group_number: BigEndian::read_u16(&t[26..28]),
            // bytes 28..32 reserved
        }
    }
}

/// A parsed Basic Group with its validity bitmap.
#[derive(Debug, Clone)]
pub struct BasicGroup {
    data: Vec<u8>,
    validity: Vec<u8>,
    trailer: GroupTrailer,
    bat: Vec<BatEntry>,
}

impl BasicGroup {
    /// Parse a group from its raw bytes and validity bitmap.
    ///
    /// Unless `options.relax_validity` is set, every byte of the group must
    /// be valid. The trailer and the referenced BAT entries must be valid in
    /// either mode.
    pub fn parse(data: Vec<u8>, validity: Vec<u8>, options: &DecodeOptions) -> Result<Self> {
        if data.len() != GROUP_SIZE {
            return Err(RecoverError::GroupSize {
                expected: GROUP_SIZE,
                actual: data.len(),
            });
        }
        if validity.len() != GROUP_SIZE {
            return Err(RecoverError::ValiditySize {
                expected: GROUP_SIZE,
                actual: validity.len(),
            });
        }

        if !options.relax_validity {
            if let Some(offset) = validity.iter().position(|&v| v == 0) {
                return Err(RecoverError::StrictValidity { offset });
            }
        } else if let Some(rel) = validity[TRAILER_OFFSET..].iter().position(|&v| v == 0) {
            return Err(RecoverError::TrailerInvalid {
                offset: TRAILER_OFFSET + rel,
            });
        }

        let trailer = GroupTrailer::parse(&data[TRAILER_OFFSET..]);

        let mut bat = Vec::with_capacity(usize::from(trailer.block_access_table_count));
        for i in 0..usize::from(trailer.block_access_table_count) {
            let pos = TRAILER_OFFSET
                .checked_sub((i + 1) * BAT_ENTRY_SIZE)
                .ok_or(RecoverError::BatEntryInvalid { index: i })?;
            let entry = &data[pos..pos + BAT_ENTRY_SIZE];
            if validity[pos..pos + BAT_ENTRY_SIZE].iter().any(|&v| v == 0) {
                return Err(RecoverError::BatEntryInvalid { index: i });
            }
            bat.push(BatEntry::parse(entry));
        }

        Ok(Self {
            data,
            validity,
            trailer,
            bat,
        })
    }

    /// Load a group from a `.bin` file and its companion `.val` file.
    ///
    /// A missing validity file means every byte decoded cleanly; an
    /// unreadable one means no byte can be trusted, which strict mode then
    /// rejects.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        path: P,
        valid_path: Q,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let data = std::fs::read(path)?;
        let validity = match std::fs::read(valid_path) {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![1; data.len()],
            Err(_) => vec![0; data.len()],
        };
        Self::parse(data, validity, options)
    }

    /// The user-data payload, everything below the trailer.
    pub fn payload(&self) -> &[u8] {
        &self.data[..TRAILER_OFFSET]
    }

    /// Validity bytes covering the payload.
    pub fn payload_validity(&self) -> &[u8] {
        &self.validity[..TRAILER_OFFSET]
    }

    /// The unpacked trailer.
    pub fn trailer(&self) -> &GroupTrailer {
        &self.trailer
    }

    /// BAT entries in walk order (entry 0 first).
    pub fn bat(&self) -> &[BatEntry] {
        &self.bat
    }
}

/// Build a fully valid synthetic group for tests: trailer counters plus a
/// BAT given as (item, count) pairs.
#[cfg(test)]
pub(crate) fn make_group(
    group_number: u16,
    record_count: u32,
    separator1_count: u32,
    group_separator1_count: u16,
    bat: &[(u8, u32)],
) -> Vec<u8> {
    let mut data = vec![0u8; GROUP_SIZE];
    let t = &mut data[TRAILER_OFFSET..];
    BigEndian::write_u16(&mut t[0..2], group_number);
    BigEndian::write_u16(&mut t[2..4], bat.len() as u16);
    BigEndian::write_u32(&mut t[4..8], record_count);
    BigEndian::write_u32(&mut t[8..12], separator1_count);
    BigEndian::write_u16(&mut t[20..22], group_separator1_count);
    for (i, &(item, count)) in bat.iter().enumerate() {
        let pos = TRAILER_OFFSET - (i + 1) * BAT_ENTRY_SIZE;
        data[pos] = item;
        BigEndian::write_u24(&mut data[pos + 1..pos + 4], count);
    }
    data
}
