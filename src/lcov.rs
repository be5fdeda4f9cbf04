//! LCOV tracefile access.
//!
//! The coverage database is an LCOV tracefile as emitted by `cargo llvm-cov`,
//! `grcov`, or `lcov` itself. Only `SF:` and `DA:` records matter here: `DA`
//! with a positive hit count marks an executed line, a zero hit count marks
//! an executable line that never ran, and lines with no `DA` record are not
//! executable. Everything else (`FN:`, `BRDA:`, `TN:`, ...) is ignored.

use crate::error::Error;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Line-number sets recorded for one measured source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineHits {
    /// Lines that executed at least once.
    pub executed: BTreeSet<u32>,
    /// Executable lines that never executed.
    pub missed: BTreeSet<u32>,
}

/// Measured file path mapped to its line-number sets.
///
/// A `BTreeMap` keeps iteration order stable so repeated runs over the same
/// tracefile produce identical reports.
pub type Report = BTreeMap<PathBuf, LineHits>;

/// Parse an LCOV tracefile into per-file line hit sets.
pub fn load(path: &Path) -> Result<Report, Error> {
    let text = fs::read_to_string(path)?;
    let mut report = Report::new();
    let mut current: Option<PathBuf> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(source) = line.strip_prefix("SF:") {
            let path = PathBuf::from(source);
            report.entry(path.clone()).or_default();
            current = Some(path);
        } else if let Some(record) = line.strip_prefix("DA:") {
            let Some(path) = current.as_ref() else {
                tracing::warn!("ignoring DA record before any SF record: {line}");
                continue;
            };
            let Some((line_no, hits)) = parse_da(record) else {
                tracing::warn!("ignoring malformed DA record: {line}");
                continue;
            };
            let hits_entry = report.entry(path.clone()).or_default();
            if hits > 0 {
                hits_entry.executed.insert(line_no);
            } else {
                hits_entry.missed.insert(line_no);
            }
        } else if line == "end_of_record" {
            current = None;
        }
    }

    Ok(report)
}

/// Split a `DA:` record body (`<line>,<hits>[,<checksum>]`) into its parts.
fn parse_da(record: &str) -> Option<(u32, u64)> {
    let mut fields = record.split(',');
    let line_no = fields.next()?.parse().ok()?;
    let hits = fields.next()?.parse().ok()?;
    Some((line_no, hits))
}
