//! Stream reassembly across Basic Groups.
//!
//! The block access table of each group describes what every span of its
//! payload means: record bytes, padding to skip, separator marks, or pieces
//! of a compressed entity. The assembler walks the table with a byte cursor,
//! copies record bytes for the requested file to the sink, and feeds
//! entities through DCLZ. Partial entities may span groups; the assembler
//! buffers the pieces and decompresses at the terminal entry.
//!
//! The driver pulls consecutively numbered groups from a [`GroupSource`]
//! until the source reports the end of input.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::entity::expand_entity;
use crate::error::{RecoverError, Result};
use crate::group::BasicGroup;
use crate::types::{DecodeOptions, ExtractSummary};

/// Separator mark. A count of zero is a file mark, nonzero a set mark.
pub const ITEM_SEPARATOR_MARK: u8 = 0x07;
/// First part of a record continued in the next group.
pub const ITEM_RECORD_START: u8 = 0x40;
/// Middle part of a record spanning whole groups.
pub const ITEM_RECORD_MIDDLE: u8 = 0x42;
/// Final part of a spanning record.
pub const ITEM_RECORD_END: u8 = 0x60;
/// A record wholly contained in this group.
pub const ITEM_RECORD_WHOLE: u8 = 0x63;
/// Padding bytes with no meaning.
pub const ITEM_SKIP: u8 = 0x80;
/// A compressed entity wholly contained in one BAT entry.
pub const ITEM_ENTITY_WHOLE: u8 = 0x73;
/// First part of a compressed entity.
pub const ITEM_ENTITY_START: u8 = 0x52;
/// Continuation of a compressed entity.
pub const ITEM_ENTITY_CONTINUE: u8 = 0x50;
/// Final part of a compressed entity.
pub const ITEM_ENTITY_END: u8 = 0x70;
/// Uncompressed-size annotation for the entity just completed.
pub const ITEM_ENTITY_SIZE: u8 = 0x11;

/// A supplier of Basic Groups by number.
///
/// `Ok(None)` means the requested group does not exist, which the driver
/// treats as the benign end of available input.
pub trait GroupSource {
    /// Load the group with the given number.
    fn load(&mut self, group_number: u32) -> Result<Option<BasicGroup>>;
}

/// Conventional file name of a group dump: `g<NNNNNN>.bin`.
pub fn group_file_name(number: u32) -> String {
    format!("g{number:06}.bin")
}

/// Conventional file name of a group validity bitmap: `g<NNNNNN>.val`.
pub fn group_validity_file_name(number: u32) -> String {
    format!("g{number:06}.val")
}

/// A [`GroupSource`] reading `g<NNNNNN>.bin`/`.val` pairs from a directory.
#[derive(Debug, Clone)]
pub struct DirGroupSource {
    dir: PathBuf,
    options: DecodeOptions,
}

impl DirGroupSource {
    /// Create a source over the given directory.
    pub fn new<P: AsRef<Path>>(dir: P, options: DecodeOptions) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            options,
        }
    }
}

impl GroupSource for DirGroupSource {
    fn load(&mut self, group_number: u32) -> Result<Option<BasicGroup>> {
        let bin = self.dir.join(group_file_name(group_number));
        let val = self.dir.join(group_validity_file_name(group_number));
        match BasicGroup::from_files(&bin, &val, &self.options) {
            Ok(group) => Ok(Some(group)),
            Err(RecoverError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Reassembles the byte stream of one file from successive groups.
pub struct StreamAssembler<'w, W: Write> {
    sink: &'w mut W,
    file_no: u32,
    options: DecodeOptions,
    entity_bytes: Vec<u8>,
    entity_valid: Vec<u8>,
    summary: ExtractSummary,
}

impl<'w, W: Write> StreamAssembler<'w, W> {
    /// Create an assembler writing file `file_no` to `sink`.
    pub fn new(sink: &'w mut W, file_no: u32, options: DecodeOptions) -> Self {
        Self {
            sink,
            file_no,
            options,
            entity_bytes: Vec::new(),
            entity_valid: Vec::new(),
            summary: ExtractSummary::default(),
        }
    }

    /// The running totals so far.
    pub fn summary(&self) -> ExtractSummary {
        self.summary
    }

    fn span<'d>(data: &'d [u8], index: usize, pos: usize, count: usize) -> Result<&'d [u8]> {
        data.get(pos..pos + count)
            .ok_or(RecoverError::BatOverrun { index, pos, count })
    }

    /// Walk one group's block access table.
    ///
    /// The group is skipped wholesale unless the target file overlaps it:
    /// the file of the group's first byte is `Separator1Count -
    /// GroupSeparator1Count`, and file marks inside the group advance the
    /// counter from there.
    pub fn push_group(&mut self, group: &BasicGroup) -> Result<()> {
        let trailer = group.trailer();
        let mut g_file = trailer
            .separator1_count
            .saturating_sub(u32::from(trailer.group_separator1_count));

        info!(
            group = trailer.group_number,
            file = g_file,
            bat_entries = trailer.block_access_table_count,
            "scanning group"
        );
        self.summary.groups_scanned += 1;

        if !(g_file <= self.file_no && self.file_no <= trailer.separator1_count) {
            self.summary.groups_skipped += 1;
            debug!(group = trailer.group_number, "no data for requested file");
            return Ok(());
        }

        let data = group.payload();
        let valid = group.payload_validity();
        let mut pos = 0usize;

        for (index, entry) in group.bat().iter().enumerate() {
            let count = entry.count as usize;
            match entry.item {
                ITEM_SEPARATOR_MARK => {
                    if entry.count == 0 {
                        g_file += 1;
                        self.summary.file_marks += 1;
                        debug!(file = g_file, "file mark");
                    }
                }
                ITEM_RECORD_START | ITEM_RECORD_MIDDLE | ITEM_RECORD_END | ITEM_RECORD_WHOLE => {
                    let span = Self::span(data, index, pos, count)?;
                    if g_file == self.file_no {
                        trace!(bytes = count, offset = pos, "record bytes");
                        self.sink.write_all(span)?;
                        self.summary.records_written += 1;
                        self.summary.bytes_written += count as u64;
                        if self.options.ascii_newlines
                            && matches!(entry.item, ITEM_RECORD_END | ITEM_RECORD_WHOLE)
                        {
                            self.sink.write_all(b"\n")?;
                            self.summary.bytes_written += 1;
                        }
                    }
                    pos += count;
                }
                ITEM_SKIP => {
                    Self::span(data, index, pos, count)?;
                    trace!(bytes = count, "skip entry");
                    pos += count;
                }
                ITEM_ENTITY_WHOLE => {
                    let span = Self::span(data, index, pos, count)?;
                    if g_file == self.file_no {
                        debug!(bytes = count, "whole entity");
                        let written = expand_entity(
                            span,
                            &valid[pos..pos + count],
                            &self.options,
                            &mut *self.sink,
                        )?;
                        self.summary.entities_decoded += 1;
                        self.summary.bytes_written += written;
                    }
                    pos += count;
                }
                ITEM_ENTITY_START => {
                    if !self.entity_bytes.is_empty() {
                        return Err(RecoverError::EntityChain {
                            message: format!(
                                "entity start with {} bytes already buffered",
                                self.entity_bytes.len()
                            ),
                        });
                    }
                    let span = Self::span(data, index, pos, count)?;
                    debug!(bytes = count, "entity start");
                    self.entity_bytes.extend_from_slice(span);
                    self.entity_valid.extend_from_slice(&valid[pos..pos + count]);
                    pos += count;
                }
                ITEM_ENTITY_CONTINUE => {
                    if self.entity_bytes.is_empty() {
                        return Err(RecoverError::EntityChain {
                            message: "entity continuation with nothing buffered".to_string(),
                        });
                    }
                    let span = Self::span(data, index, pos, count)?;
                    debug!(bytes = count, "entity continuation");
                    self.entity_bytes.extend_from_slice(span);
                    self.entity_valid.extend_from_slice(&valid[pos..pos + count]);
                    pos += count;
                }
                ITEM_ENTITY_END => {
                    if self.entity_bytes.is_empty() {
                        return Err(RecoverError::EntityChain {
                            message: "entity end with nothing buffered".to_string(),
                        });
                    }
                    let span = Self::span(data, index, pos, count)?;
                    self.entity_bytes.extend_from_slice(span);
                    self.entity_valid.extend_from_slice(&valid[pos..pos + count]);
                    debug!(total = self.entity_bytes.len(), "entity complete");

                    let bytes = std::mem::take(&mut self.entity_bytes);
                    let validity = std::mem::take(&mut self.entity_valid);
                    if g_file == self.file_no {
                        let written =
                            expand_entity(&bytes, &validity, &self.options, &mut *self.sink)?;
                        self.summary.entities_decoded += 1;
                        self.summary.bytes_written += written;
                    }
                    pos += count;
                }
                ITEM_ENTITY_SIZE => {
                    trace!(total = entry.count, "entity size annotation");
                }
                other => {
                    debug!(item = other, "unknown BAT entry");
                }
            }
        }
        Ok(())
    }
}

/// Extract one file from consecutively numbered groups.
///
/// Groups are pulled from `source` starting at `start_group` and walked in
/// order until the source runs out of input. Returns the extraction totals.
pub fn extract<S: GroupSource, W: Write>(
    source: &mut S,
    start_group: u32,
    file_no: u32,
    options: &DecodeOptions,
    sink: &mut W,
) -> Result<ExtractSummary> {
    let mut assembler = StreamAssembler::new(sink, file_no, *options);
    assembler.summary.start_group = start_group;

    let mut number = start_group;
    while let Some(group) = source.load(number)? {
        assembler.push_group(&group)?;
        number += 1;
    }
    info!(group = number, "no more groups");
    Ok(assembler.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::literal_entity;
    use crate::group::{make_group, GROUP_SIZE};
    use pretty_assertions::assert_eq;

    fn parse(data: Vec<u8>) -> BasicGroup {
        BasicGroup::parse(data, vec![1; GROUP_SIZE], &DecodeOptions::new()).unwrap()
    }

    /// Fill the payload with a counting pattern so span copies are visible.
    fn patterned(mut data: Vec<u8>, len: usize) -> Vec<u8> {
        for i in 0..len {
            data[i] = (i % 251) as u8;
        }
        data
    }

    #[test]
    fn test_record_then_file_mark_then_record() {
        // First record belongs to file 0; the file mark moves the counter
        // past it, so the second record is not ours.
        let data = patterned(
            make_group(1, 2, 0, 0, &[(0x40, 100), (0x07, 0), (0x40, 200)]),
            300,
        );
        let expect = data[..100].to_vec();
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 0, DecodeOptions::new());
        asm.push_group(&group).unwrap();
        let summary = asm.summary();
        assert_eq!(out, expect);
        assert_eq!(summary.records_written, 1);
        assert_eq!(summary.file_marks, 1);
        assert_eq!(summary.bytes_written, 100);
    }

    #[test]
    fn test_second_file_after_mark() {
        let data = patterned(
            make_group(1, 2, 1, 1, &[(0x40, 100), (0x07, 0), (0x40, 200)]),
            300,
        );
        let expect = data[100..300].to_vec();
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 1, DecodeOptions::new());
        asm.push_group(&group).unwrap();
        assert_eq!(out, expect);
    }

    #[test]
    fn test_skip_entry_consumes_bytes() {
        let data = patterned(make_group(1, 1, 0, 0, &[(0x80, 50), (0x40, 10)]), 60);
        let expect = data[50..60].to_vec();
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 0, DecodeOptions::new());
        asm.push_group(&group).unwrap();
        assert_eq!(out, expect);
    }

    #[test]
    fn test_ascii_newlines_after_terminators() {
        let data = patterned(make_group(1, 2, 0, 0, &[(0x63, 4), (0x40, 3)]), 7);
        let group = parse(data.clone());

        let mut out = Vec::new();
        let options = DecodeOptions {
            ascii_newlines: true,
            ..DecodeOptions::new()
        };
        let mut asm = StreamAssembler::new(&mut out, 0, options);
        asm.push_group(&group).unwrap();

        let mut expect = data[..4].to_vec();
        expect.push(b'\n');
        expect.extend_from_slice(&data[4..7]);
        assert_eq!(out, expect);
    }

    #[test]
    fn test_group_without_our_file_is_skipped() {
        let data = patterned(make_group(1, 1, 0, 0, &[(0x40, 100)]), 100);
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 5, DecodeOptions::new());
        asm.push_group(&group).unwrap();
        let summary = asm.summary();
        assert!(out.is_empty());
        assert_eq!(summary.groups_skipped, 1);
    }

    #[test]
    fn test_whole_entity() {
        let entity = literal_entity(b"squeeze me");
        let mut data = make_group(1, 1, 0, 0, &[(0x73, entity.len() as u32)]);
        data[..entity.len()].copy_from_slice(&entity);
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 0, DecodeOptions::new());
        asm.push_group(&group).unwrap();
        let summary = asm.summary();
        assert_eq!(out, b"squeeze me".to_vec());
        assert_eq!(summary.entities_decoded, 1);
        assert_eq!(summary.bytes_written, 10);
    }

    #[test]
    fn test_entity_split_within_group() {
        let entity = literal_entity(b"two pieces");
        let first = 7usize;
        let rest = entity.len() - first;
        let mut data = make_group(
            1,
            1,
            0,
            0,
            &[(0x52, first as u32), (0x70, rest as u32), (0x11, 10)],
        );
        data[..entity.len()].copy_from_slice(&entity);
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 0, DecodeOptions::new());
        asm.push_group(&group).unwrap();
        assert_eq!(out, b"two pieces".to_vec());
    }

    #[test]
    fn test_entity_split_across_groups() {
        let entity = literal_entity(b"spans two groups");
        let first = 5usize;
        let rest = entity.len() - first;

        let mut data1 = make_group(1, 0, 0, 0, &[(0x52, first as u32)]);
        data1[..first].copy_from_slice(&entity[..first]);
        let mut data2 = make_group(2, 1, 0, 0, &[(0x50, 0), (0x70, rest as u32)]);
        data2[..rest].copy_from_slice(&entity[first..]);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 0, DecodeOptions::new());
        asm.push_group(&parse(data1)).unwrap();
        asm.push_group(&parse(data2)).unwrap();
        let summary = asm.summary();
        assert_eq!(out, b"spans two groups".to_vec());
        assert_eq!(summary.entities_decoded, 1);
    }

    #[test]
    fn test_entity_continuation_without_start_fails() {
        let data = make_group(1, 1, 0, 0, &[(0x50, 4)]);
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 0, DecodeOptions::new());
        assert!(matches!(
            asm.push_group(&group),
            Err(RecoverError::EntityChain { .. })
        ));
    }

    #[test]
    fn test_bat_overrun_is_reported() {
        let data = make_group(1, 1, 0, 0, &[(0x40, 200_000)]);
        let group = parse(data);

        let mut out = Vec::new();
        let mut asm = StreamAssembler::new(&mut out, 0, DecodeOptions::new());
        assert!(matches!(
            asm.push_group(&group),
            Err(RecoverError::BatOverrun { index: 0, .. })
        ));
    }

    #[test]
    fn test_extract_drives_until_missing_group() {
        let dir = tempfile::tempdir().unwrap();
        let data1 = patterned(make_group(1, 1, 0, 0, &[(0x40, 8)]), 8);
        let data2 = patterned(make_group(2, 2, 0, 0, &[(0x42, 6)]), 6);
        let mut expect = data1[..8].to_vec();
        expect.extend_from_slice(&data2[..6]);
        std::fs::write(dir.path().join("g000001.bin"), &data1).unwrap();
        std::fs::write(dir.path().join("g000002.bin"), &data2).unwrap();

        let mut source = DirGroupSource::new(dir.path(), DecodeOptions::new());
        let mut out = Vec::new();
        let summary = extract(&mut source, 1, 0, &DecodeOptions::new(), &mut out).unwrap();

        assert_eq!(out, expect);
        assert_eq!(summary.start_group, 1);
        assert_eq!(summary.groups_scanned, 2);
        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.bytes_written, 14);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(group_file_name(1), "g000001.bin");
        assert_eq!(group_validity_file_name(123_456), "g123456.val");
    }
}
