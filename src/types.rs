//! Shared types for DDS recovery.
//!
//! This module holds the decoder configuration and the reporting types the
//! extraction driver accumulates. Configuration is an explicit value passed
//! through the reassembler and DCLZ constructors; there is no module-level
//! mutable state anywhere in the crate.

use serde::{Deserialize, Serialize};

/// Options controlling group validation and stream extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Accept groups whose body contains undecoded bytes. The trailer and
    /// block access table must be fully valid regardless.
    pub relax_validity: bool,
    /// Append a newline after each record terminator (Items 0x60/0x63).
    pub ascii_newlines: bool,
    /// Diagnostic verbosity, 0..3. Levels above 2 enable per-codeword DCLZ
    /// tracing, which is very noisy.
    pub verbosity: u8,
}

impl DecodeOptions {
    /// Create options with default settings: strict validity, binary
    /// output, quiet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options that tolerate undecoded bytes in group bodies.
    pub fn relaxed() -> Self {
        Self {
            relax_validity: true,
            ..Self::default()
        }
    }
}

/// Running totals for one extraction, reported when the driver stops.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExtractSummary {
    /// First group number the driver was asked to load.
    pub start_group: u32,
    /// Groups loaded and walked.
    pub groups_scanned: u32,
    /// Groups skipped because they held no data for the target file.
    pub groups_skipped: u32,
    /// Record entries written to the sink.
    pub records_written: u64,
    /// Compressed entities decompressed into the sink.
    pub entities_decoded: u32,
    /// File marks observed while walking block access tables.
    pub file_marks: u32,
    /// Total bytes written to the sink, newlines included.
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let opts = DecodeOptions::new();
        assert!(!opts.relax_validity);
        assert!(!opts.ascii_newlines);
        assert_eq!(opts.verbosity, 0);
        assert!(DecodeOptions::relaxed().relax_validity);
    }

    #[test]
    fn test_summary_serializes() {
        let summary = ExtractSummary {
            start_group: 1,
            groups_scanned: 3,
            bytes_written: 4096,
            ..Default::default()
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"groups_scanned\":3"));
        assert!(json.contains("\"bytes_written\":4096"));
    }
}
